//! Level classification.

use crate::config::ScoringThresholds;
use crate::types::{RiskAppetite, RiskLevel};

/// Thresholds after the appetite factor is applied.
#[must_use]
pub fn effective_thresholds(
    thresholds: &ScoringThresholds,
    appetite: RiskAppetite,
) -> ScoringThresholds {
    thresholds.scaled(appetite)
}

/// Map a score to a level.
///
/// Levels are checked from critical downward with `score >= threshold`.
/// A score below the low threshold is [`RiskLevel::Minimal`].
#[must_use]
pub fn classify(score: f64, thresholds: &ScoringThresholds, appetite: RiskAppetite) -> RiskLevel {
    let effective = effective_thresholds(thresholds, appetite);

    if score >= effective.critical {
        RiskLevel::Critical
    } else if score >= effective.high {
        RiskLevel::High
    } else if score >= effective.medium {
        RiskLevel::Medium
    } else if score >= effective.low {
        RiskLevel::Low
    } else {
        RiskLevel::Minimal
    }
}
