//! Control effectiveness component.

use chrono::{DateTime, Utc};

use super::{days_since, within, ComponentResult, WeightedMean};
use crate::types::Control;

/// Testing older than this many days decays effectiveness.
const STALE_TEST_DAYS: f64 = 90.0;

/// Decay constant in days applied to stale effectiveness.
const TEST_DECAY_DAYS: f64 = 180.0;

/// Coverage-weighted mean control strength on a 0–1 scale.
///
/// Per control: `effectiveness * 0.5 + coverage/100 * 0.3 + maturity/5 * 0.2`.
/// If the control was last tested more than 90 days ago its effectiveness is
/// first multiplied by `exp(-days_since_test / 180)`. Controls that were
/// never tested are taken at face value.
pub fn control_effectiveness(controls: &[Control], now: DateTime<Utc>) -> ComponentResult {
    let mut mean = WeightedMean::default();

    for control in controls {
        if !within(control.effectiveness, 0.0, 1.0)
            || !within(control.coverage_percentage, 0.0, 100.0)
            || !within(control.maturity_level, 0.0, 5.0)
        {
            mean.skip();
            continue;
        }

        let mut effectiveness = control.effectiveness;
        if let Some(tested) = control.last_tested {
            let age = days_since(now, tested);
            if age > STALE_TEST_DAYS {
                effectiveness *= (-age / TEST_DECAY_DAYS).exp();
            }
        }

        let coverage = control.coverage_percentage / 100.0;
        let strength = effectiveness * 0.5 + coverage * 0.3 + (control.maturity_level / 5.0) * 0.2;
        mean.add(strength, coverage);
    }

    mean.finish()
}
