//! Component calculators.
//!
//! Each calculator is a pure function of telemetry records (and, where time
//! decay applies, an explicit `now`). None of them touch storage.
//!
//! Calculators return a [`ComponentResult`] rather than a bare number: the
//! value together with how many records were evaluated and how many were
//! skipped as malformed (non-finite or out-of-range fields). A component
//! computed from partial data is therefore distinguishable from one computed
//! from no data at all.
//!
//! | Calculator | Scale | Empty input |
//! |------------|-------|-------------|
//! | [`asset_criticality`] | 0–9 | 0 |
//! | [`service_criticality`] | 0–10 | 0 |
//! | [`vulnerability_score`] | 0–10 | 0 |
//! | [`threat_intelligence_score`] | 0–10 | 0 |
//! | [`incident_history_score`] | 0–8 | 0 |
//! | [`control_effectiveness`] | 0–1 | 0 |
//! | [`context_multiplier`] | > 0 | 1.0 |

mod asset;
mod context;
mod control;
mod incident;
mod service;
mod threat;
mod vulnerability;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use asset::asset_criticality;
pub use context::{context_multiplier, AppliedMultiplier, ContextMultiplier, OrganizationSignals};
pub use control::control_effectiveness;
pub use incident::incident_history_score;
pub use service::service_criticality;
pub use threat::threat_intelligence_score;
pub use vulnerability::vulnerability_score;

/// Output of a component calculator.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ComponentResult {
    /// Component value on the calculator's native scale.
    pub value: f64,
    /// Records that contributed to `value`.
    pub evaluated: usize,
    /// Records ignored because a field was malformed.
    pub skipped: usize,
}

impl ComponentResult {
    /// A component with no usable records.
    #[must_use]
    pub fn empty(skipped: usize) -> Self {
        Self {
            value: 0.0,
            evaluated: 0,
            skipped,
        }
    }

    /// Whether this component carried signal into the aggregate.
    #[must_use]
    pub fn has_data(&self) -> bool {
        self.value != 0.0
    }
}

/// Accumulates a weighted mean while counting evaluated and skipped records.
#[derive(Debug, Default)]
struct WeightedMean {
    weighted_sum: f64,
    total_weight: f64,
    evaluated: usize,
    skipped: usize,
}

impl WeightedMean {
    fn add(&mut self, value: f64, weight: f64) {
        self.weighted_sum += value * weight;
        self.total_weight += weight;
        self.evaluated += 1;
    }

    fn skip(&mut self) {
        self.skipped += 1;
    }

    fn finish(self) -> ComponentResult {
        if self.evaluated == 0 || self.total_weight <= 0.0 {
            return ComponentResult {
                value: 0.0,
                evaluated: self.evaluated,
                skipped: self.skipped,
            };
        }
        ComponentResult {
            value: self.weighted_sum / self.total_weight,
            evaluated: self.evaluated,
            skipped: self.skipped,
        }
    }
}

/// Whether `value` is finite and inside `[min, max]`.
fn within(value: f64, min: f64, max: f64) -> bool {
    value.is_finite() && (min..=max).contains(&value)
}

/// Fractional days elapsed from `then` to `now`; future timestamps count as 0.
fn days_since(now: DateTime<Utc>, then: DateTime<Utc>) -> f64 {
    let millis = (now - then).num_milliseconds().max(0);
    millis as f64 / 86_400_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_weighted_mean_empty() {
        let result = WeightedMean::default().finish();
        assert_eq!(result, ComponentResult::empty(0));
        assert!(!result.has_data());
    }

    #[test]
    fn test_weighted_mean_counts() {
        let mut mean = WeightedMean::default();
        mean.add(10.0, 1.0);
        mean.add(4.0, 2.0);
        mean.skip();
        let result = mean.finish();
        assert!((result.value - 6.0).abs() < 1e-12);
        assert_eq!(result.evaluated, 2);
        assert_eq!(result.skipped, 1);
    }

    #[test]
    fn test_days_since() {
        let now = Utc::now();
        assert!((days_since(now, now - Duration::hours(36)) - 1.5).abs() < 1e-9);
        assert_eq!(days_since(now, now + Duration::days(3)), 0.0);
    }

    #[test]
    fn test_within() {
        assert!(within(5.0, 0.0, 10.0));
        assert!(within(0.0, 0.0, 10.0));
        assert!(!within(10.1, 0.0, 10.0));
        assert!(!within(f64::NAN, 0.0, 10.0));
        assert!(!within(f64::INFINITY, 0.0, 10.0));
    }
}
