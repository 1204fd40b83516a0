//! Incident history component.

use chrono::{DateTime, Utc};

use super::{days_since, ComponentResult, WeightedMean};
use crate::types::Incident;

/// Decay constant in days for incident recency.
const DECAY_DAYS: f64 = 90.0;

/// Incident count at which the frequency amplifier saturates.
const FREQUENCY_SATURATION: f64 = 10.0;

/// Time-decayed mean incident severity, amplified by frequency.
///
/// Per incident: severity weight (Critical 4, High 3, Medium 2, Low 1) times
/// `exp(-age_days / 90)`. The mean of those values is multiplied by
/// `1 + min(count / 10, 1)`, so ten or more incidents double the score.
pub fn incident_history_score(incidents: &[Incident], now: DateTime<Utc>) -> ComponentResult {
    let mut mean = WeightedMean::default();

    for incident in incidents {
        let age = days_since(now, incident.created_date);
        let decayed = incident.severity.weight() * (-age / DECAY_DAYS).exp();
        mean.add(decayed, 1.0);
    }

    let mut result = mean.finish();
    if result.evaluated > 0 {
        let frequency = (result.evaluated as f64 / FREQUENCY_SATURATION).min(1.0);
        result.value *= 1.0 + frequency;
    }
    result
}
