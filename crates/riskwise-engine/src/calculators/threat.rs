//! Threat intelligence component.

use super::{within, ComponentResult, WeightedMean};
use crate::types::ThreatIntelSignal;

/// Confidence-weighted mean of `severity * relevance` over active signals.
///
/// Inactive signals are ignored. Signals with confidence or relevance outside
/// 0–1, or severity outside 0–10, are skipped.
pub fn threat_intelligence_score(signals: &[ThreatIntelSignal]) -> ComponentResult {
    let mut mean = WeightedMean::default();

    for signal in signals.iter().filter(|s| s.active) {
        if !within(signal.confidence_level, 0.0, 1.0)
            || !within(signal.severity_score, 0.0, 10.0)
            || !within(signal.relevance_score, 0.0, 1.0)
        {
            mean.skip();
            continue;
        }
        mean.add(
            signal.severity_score * signal.relevance_score,
            signal.confidence_level,
        );
    }

    mean.finish()
}
