//! Score aggregation.
//!
//! Combines the register's qualitative probability × impact with the
//! component calculators into one score on a 0–100 scale.
//!
//! # Algorithm
//!
//! | Step | Formula |
//! |------|---------|
//! | Base risk | `min(impact × probability × 4, 100)` |
//! | Telemetry components | `min(value × 10, 100)` each |
//! | Control component | `min(value × 100, 100)` (native scale is 0–1) |
//! | Weighted sum | `base × w_asset + asset × w_asset + service × w_service + vuln × w_vuln + threat × w_threat + incident × w_incident` |
//! | Context | `weighted × multiplier` |
//! | Controls | `− control × abs(w_control)` |
//! | Final | clamp to `[0, 100]` |
//!
//! The base risk is weighted by the asset-criticality weight; there is no
//! dedicated base weight. Stored configurations are tuned against this, so
//! it is kept as-is.
//!
//! Confidence starts at 0.5 and gains 0.1 for every one of the six
//! components that came out non-zero, capped at 1.0.

use serde::{Deserialize, Serialize};

use crate::calculators::{AppliedMultiplier, ComponentResult, ContextMultiplier};
use crate::config::ScoringWeights;

/// Lowest and highest possible final score.
pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 100.0;

const BASE_CONFIDENCE: f64 = 0.5;
const CONFIDENCE_PER_COMPONENT: f64 = 0.1;
const MAX_CONFIDENCE: f64 = 1.0;

/// Component names as they appear in breakdowns.
pub mod names {
    pub const BASE_RISK: &str = "base_risk";
    pub const ASSET_CRITICALITY: &str = "asset_criticality";
    pub const SERVICE_CRITICALITY: &str = "service_criticality";
    pub const VULNERABILITY: &str = "vulnerability";
    pub const THREAT_INTELLIGENCE: &str = "threat_intelligence";
    pub const INCIDENT_HISTORY: &str = "incident_history";
    pub const CONTROL_EFFECTIVENESS: &str = "control_effectiveness";
    pub const CONTEXT: &str = "context";
}

/// Outputs of every calculator for one risk.
#[derive(Debug, Clone, Default)]
pub struct ComponentSet {
    pub asset_criticality: ComponentResult,
    pub service_criticality: ComponentResult,
    pub vulnerability: ComponentResult,
    pub threat_intelligence: ComponentResult,
    pub incident_history: ComponentResult,
    pub control_effectiveness: ComponentResult,
    pub context: ContextMultiplier,
    /// Components whose data source could not be read.
    pub unavailable: Vec<&'static str>,
}

impl ComponentSet {
    fn is_available(&self, name: &str) -> bool {
        !self.unavailable.iter().any(|u| *u == name)
    }
}

/// How one component entered the final score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentContribution {
    pub name: String,
    /// Calculator output on its native scale.
    pub raw: f64,
    /// Value on the 0–100 scale.
    pub normalized: f64,
    pub weight: f64,
    /// Signed effect on the score before the context multiplier for additive
    /// components, after it for the control reduction.
    pub contribution: f64,
    pub evaluated: usize,
    pub skipped: usize,
    pub available: bool,
}

/// Full explanation of an aggregated score, persisted with every history record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentBreakdown {
    pub components: Vec<ComponentContribution>,
    pub weighted_sum: f64,
    pub context_multiplier: f64,
    pub context_sources: Vec<AppliedMultiplier>,
    pub control_reduction: f64,
    /// Score before clamping to `[0, 100]`.
    pub unclamped_score: f64,
    /// Data sources that could not be read, including the context feeds.
    pub unavailable: Vec<String>,
}

impl ComponentBreakdown {
    /// Look up a component by name.
    #[must_use]
    pub fn component(&self, name: &str) -> Option<&ComponentContribution> {
        self.components.iter().find(|c| c.name == name)
    }
}

/// Result of aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedScore {
    /// Final score in `[0, 100]`.
    pub score: f64,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    pub breakdown: ComponentBreakdown,
}

/// Base risk from qualitative probability and impact, on the 0–100 scale.
#[must_use]
pub fn base_risk(probability: u8, impact: u8) -> f64 {
    (f64::from(impact) * f64::from(probability) * 4.0).min(MAX_SCORE)
}

/// Scale a 0–10 component to 0–100.
fn normalize_tenths(value: f64) -> f64 {
    (value * 10.0).min(MAX_SCORE)
}

/// Scale a 0–1 component to 0–100.
fn normalize_fraction(value: f64) -> f64 {
    (value * 100.0).min(MAX_SCORE)
}

/// Combine the base risk and components into a final score.
pub fn aggregate(
    probability: u8,
    impact: u8,
    components: &ComponentSet,
    weights: &ScoringWeights,
) -> AggregatedScore {
    let base = base_risk(probability, impact);

    let mut contributions = vec![ComponentContribution {
        name: names::BASE_RISK.to_string(),
        raw: f64::from(probability) * f64::from(impact),
        normalized: base,
        weight: weights.asset_criticality,
        contribution: base * weights.asset_criticality,
        evaluated: 1,
        skipped: 0,
        available: true,
    }];

    let additive = [
        (names::ASSET_CRITICALITY, components.asset_criticality, weights.asset_criticality),
        (names::SERVICE_CRITICALITY, components.service_criticality, weights.service_criticality),
        (names::VULNERABILITY, components.vulnerability, weights.vulnerability),
        (names::THREAT_INTELLIGENCE, components.threat_intelligence, weights.threat_intelligence),
        (names::INCIDENT_HISTORY, components.incident_history, weights.incident_history),
    ];

    for (name, result, weight) in additive {
        let normalized = normalize_tenths(result.value);
        contributions.push(ComponentContribution {
            name: name.to_string(),
            raw: result.value,
            normalized,
            weight,
            contribution: normalized * weight,
            evaluated: result.evaluated,
            skipped: result.skipped,
            available: components.is_available(name),
        });
    }

    let weighted_sum: f64 = contributions.iter().map(|c| c.contribution).sum();
    let adjusted = weighted_sum * components.context.value;

    let control = components.control_effectiveness;
    let control_normalized = normalize_fraction(control.value);
    let control_reduction = control_normalized * weights.control_reduction();
    contributions.push(ComponentContribution {
        name: names::CONTROL_EFFECTIVENESS.to_string(),
        raw: control.value,
        normalized: control_normalized,
        weight: weights.control_effectiveness,
        contribution: -control_reduction,
        evaluated: control.evaluated,
        skipped: control.skipped,
        available: components.is_available(names::CONTROL_EFFECTIVENESS),
    });

    let unclamped = adjusted - control_reduction;
    let score = if unclamped.is_nan() {
        MIN_SCORE
    } else {
        unclamped.clamp(MIN_SCORE, MAX_SCORE)
    };

    let with_data = [
        components.asset_criticality,
        components.service_criticality,
        components.vulnerability,
        components.threat_intelligence,
        components.incident_history,
        control,
    ]
    .iter()
    .filter(|c| c.has_data())
    .count();
    let confidence =
        (BASE_CONFIDENCE + CONFIDENCE_PER_COMPONENT * with_data as f64).min(MAX_CONFIDENCE);

    AggregatedScore {
        score,
        confidence,
        breakdown: ComponentBreakdown {
            components: contributions,
            weighted_sum,
            context_multiplier: components.context.value,
            context_sources: components.context.applied.clone(),
            control_reduction,
            unclamped_score: unclamped,
            unavailable: components.unavailable.iter().map(ToString::to_string).collect(),
        },
    }
}
