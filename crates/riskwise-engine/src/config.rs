//! Scoring and runtime configuration.
//!
//! Two kinds of configuration live here:
//!
//! - [`ScoringConfig`]: appetite, per-component weights and level thresholds.
//!   Stored alongside the register and replaced at runtime through
//!   [`crate::store::ScoringConfigStore`]. Weights are one named field per
//!   component and are validated when loaded, so a missing or misspelled
//!   weight is rejected instead of silently producing `NaN` scores.
//! - [`EngineConfig`]: process-level knobs (recalculation interval, batch
//!   concurrency and time budget) read from environment variables.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{EngineError, Result};
use crate::ids::ScoringConfigId;
use crate::types::RiskAppetite;

// ============================================================================
// Scoring configuration
// ============================================================================

/// Per-component aggregation coefficients.
///
/// `control_effectiveness` is configured as a negative number to signal that
/// it reduces the score; the aggregator subtracts its magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoringWeights {
    /// Applied to both the asset component and the base probability × impact risk.
    pub asset_criticality: f64,
    pub service_criticality: f64,
    pub vulnerability: f64,
    pub threat_intelligence: f64,
    pub incident_history: f64,
    pub control_effectiveness: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            asset_criticality: 0.30,
            service_criticality: 0.20,
            vulnerability: 0.35,
            threat_intelligence: 0.15,
            incident_history: 0.10,
            control_effectiveness: -0.20,
        }
    }
}

impl ScoringWeights {
    /// Parse and validate a weight map received from an external caller.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        let weights: Self = serde_json::from_value(value)
            .map_err(|e| EngineError::invalid_config("weights", e.to_string()))?;
        weights.validate()?;
        Ok(weights)
    }

    /// Check that every weight is finite and has the expected sign.
    pub fn validate(&self) -> Result<()> {
        let additive = [
            ("weights.asset_criticality", self.asset_criticality),
            ("weights.service_criticality", self.service_criticality),
            ("weights.vulnerability", self.vulnerability),
            ("weights.threat_intelligence", self.threat_intelligence),
            ("weights.incident_history", self.incident_history),
        ];
        for (field, weight) in additive {
            if !weight.is_finite() {
                return Err(EngineError::invalid_config(field, "must be a finite number"));
            }
            if weight < 0.0 {
                return Err(EngineError::invalid_config(
                    field,
                    format!("must not be negative, got {weight}"),
                ));
            }
        }

        if !self.control_effectiveness.is_finite() {
            return Err(EngineError::invalid_config(
                "weights.control_effectiveness",
                "must be a finite number",
            ));
        }
        if self.control_effectiveness > 0.0 {
            return Err(EngineError::invalid_config(
                "weights.control_effectiveness",
                format!(
                    "must be zero or negative (a reduction), got {}",
                    self.control_effectiveness
                ),
            ));
        }
        Ok(())
    }

    /// Magnitude of the control weight; always non-negative.
    #[must_use]
    pub fn control_reduction(&self) -> f64 {
        self.control_effectiveness.abs()
    }
}

/// Score cut points for each level, before appetite scaling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoringThresholds {
    pub critical: f64,
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

impl Default for ScoringThresholds {
    fn default() -> Self {
        Self {
            critical: 80.0,
            high: 60.0,
            medium: 40.0,
            low: 20.0,
        }
    }
}

impl ScoringThresholds {
    /// Validate threshold ordering: `0 < low < medium < high < critical <= 100`.
    pub fn validate(&self) -> Result<()> {
        let all = [
            ("thresholds.critical", self.critical),
            ("thresholds.high", self.high),
            ("thresholds.medium", self.medium),
            ("thresholds.low", self.low),
        ];
        if let Some((field, _)) = all.iter().find(|(_, v)| !v.is_finite()) {
            return Err(EngineError::invalid_config(*field, "must be a finite number"));
        }
        if self.low <= 0.0 {
            return Err(EngineError::invalid_config(
                "thresholds.low",
                "must be greater than 0",
            ));
        }
        if self.low >= self.medium {
            return Err(EngineError::invalid_config(
                "thresholds.medium",
                format!("low ({}) must be less than medium ({})", self.low, self.medium),
            ));
        }
        if self.medium >= self.high {
            return Err(EngineError::invalid_config(
                "thresholds.high",
                format!("medium ({}) must be less than high ({})", self.medium, self.high),
            ));
        }
        if self.high >= self.critical {
            return Err(EngineError::invalid_config(
                "thresholds.critical",
                format!(
                    "high ({}) must be less than critical ({})",
                    self.high, self.critical
                ),
            ));
        }
        if self.critical > 100.0 {
            return Err(EngineError::invalid_config(
                "thresholds.critical",
                format!("must be at most 100, got {}", self.critical),
            ));
        }
        Ok(())
    }

    /// Thresholds after applying the appetite factor.
    #[must_use]
    pub fn scaled(&self, appetite: RiskAppetite) -> Self {
        let factor = appetite.threshold_factor();
        Self {
            critical: self.critical * factor,
            high: self.high * factor,
            medium: self.medium * factor,
            low: self.low * factor,
        }
    }
}

/// The scoring configuration used for a calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub id: ScoringConfigId,
    pub name: String,
    pub risk_appetite: RiskAppetite,
    pub weights: ScoringWeights,
    pub thresholds: ScoringThresholds,
    pub active: bool,
    pub updated_at: DateTime<Utc>,
}

impl ScoringConfig {
    /// Name given to the built-in fallback configuration.
    pub const BUILTIN_NAME: &'static str = "builtin-default";

    /// The documented defaults used when no active configuration exists.
    #[must_use]
    pub fn builtin_default() -> Self {
        Self {
            id: ScoringConfigId::from_uuid(uuid::Uuid::nil()),
            name: Self::BUILTIN_NAME.to_string(),
            risk_appetite: RiskAppetite::Moderate,
            weights: ScoringWeights::default(),
            thresholds: ScoringThresholds::default(),
            active: true,
            updated_at: DateTime::<Utc>::default(),
        }
    }

    /// Validate weights and thresholds.
    pub fn validate(&self) -> Result<()> {
        self.weights.validate()?;
        self.thresholds.validate()
    }

    /// Whether this is the built-in fallback rather than a stored config.
    #[must_use]
    pub fn is_builtin(&self) -> bool {
        self.id.into_inner().is_nil()
    }
}

// ============================================================================
// Runtime configuration
// ============================================================================

/// Default gap between recalculations of a risk.
pub const DEFAULT_RECALC_INTERVAL_SECS: u64 = 3600;

/// Default number of risks calculated concurrently in a batch.
pub const DEFAULT_BATCH_CONCURRENCY: usize = 4;

/// Default wall-clock budget for one batch sweep.
pub const DEFAULT_BATCH_TIME_BUDGET_SECS: u64 = 300;

/// Default polling interval of the worker loop.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Upper bound for every interval setting: one year.
pub const MAX_INTERVAL_SECS: u64 = 366 * 24 * 60 * 60;

/// Errors raised while reading [`EngineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Process-level engine settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Gap until `next_calculation` after a successful run.
    pub recalculation_interval: Duration,
    /// Maximum risks calculated at once in a batch. 1 means sequential.
    pub batch_concurrency: usize,
    /// No new risks are started once a batch has run this long.
    pub batch_time_budget: Duration,
    /// How often the worker invokes the batch scheduler.
    pub poll_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            recalculation_interval: Duration::from_secs(DEFAULT_RECALC_INTERVAL_SECS),
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
            batch_time_budget: Duration::from_secs(DEFAULT_BATCH_TIME_BUDGET_SECS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional:
    /// - `RISK_RECALC_INTERVAL_SECS`: seconds until the next recalculation (default: 3600)
    /// - `RISK_BATCH_CONCURRENCY`: concurrent calculations per batch, at least 1 (default: 4)
    /// - `RISK_BATCH_TIME_BUDGET_SECS`: batch deadline in seconds (default: 300)
    /// - `RISK_SCHEDULER_POLL_SECS`: worker polling interval in seconds (default: 60)
    ///
    /// No interval may exceed [`MAX_INTERVAL_SECS`].
    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        Self::from_reader(|key| std::env::var(key))
    }

    /// Load configuration from a custom variable reader.
    ///
    /// This allows tests to supply variables without mutating process-global
    /// environment state.
    pub fn from_reader<F>(reader: F) -> std::result::Result<Self, ConfigError>
    where
        F: Fn(&str) -> std::result::Result<String, std::env::VarError>,
    {
        let recalc_secs = parse_interval(&reader, "RISK_RECALC_INTERVAL_SECS", DEFAULT_RECALC_INTERVAL_SECS)?;

        let batch_concurrency =
            parse_var(&reader, "RISK_BATCH_CONCURRENCY", DEFAULT_BATCH_CONCURRENCY)?;
        if batch_concurrency == 0 {
            return Err(ConfigError::InvalidValue(
                "RISK_BATCH_CONCURRENCY".into(),
                "must be at least 1".into(),
            ));
        }

        let budget_secs = parse_var(
            &reader,
            "RISK_BATCH_TIME_BUDGET_SECS",
            DEFAULT_BATCH_TIME_BUDGET_SECS,
        )?;
        if budget_secs > MAX_INTERVAL_SECS {
            return Err(ConfigError::InvalidValue(
                "RISK_BATCH_TIME_BUDGET_SECS".into(),
                format!("must be at most {MAX_INTERVAL_SECS}"),
            ));
        }
        let poll_secs = parse_interval(&reader, "RISK_SCHEDULER_POLL_SECS", DEFAULT_POLL_INTERVAL_SECS)?;

        Ok(Self {
            recalculation_interval: Duration::from_secs(recalc_secs),
            batch_concurrency,
            batch_time_budget: Duration::from_secs(budget_secs),
            poll_interval: Duration::from_secs(poll_secs),
        })
    }
}

/// Parse an interval in seconds, between 1 and [`MAX_INTERVAL_SECS`].
fn parse_interval<F>(reader: &F, key: &str, default: u64) -> std::result::Result<u64, ConfigError>
where
    F: Fn(&str) -> std::result::Result<String, std::env::VarError>,
{
    let secs = parse_var(reader, key, default)?;
    if secs == 0 || secs > MAX_INTERVAL_SECS {
        return Err(ConfigError::InvalidValue(
            key.to_string(),
            format!("must be between 1 and {MAX_INTERVAL_SECS}"),
        ));
    }
    Ok(secs)
}

fn parse_var<F, T>(reader: &F, key: &str, default: T) -> std::result::Result<T, ConfigError>
where
    F: Fn(&str) -> std::result::Result<String, std::env::VarError>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match reader(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}
