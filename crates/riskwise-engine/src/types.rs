//! Type definitions for the risk register and its telemetry.
//!
//! Includes the register entry itself, the telemetry records the calculators
//! read, and the enums that classify them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::{
    AssetId, ContextFactorId, ControlId, HistoryRecordId, IncidentId, RiskId, ServiceId,
    ThreatSignalId, VulnerabilityId,
};

// ============================================================================
// Classification enums
// ============================================================================

/// Discrete risk level produced by the classifier.
///
/// Variants are declared from lowest to highest so that `Ord` follows
/// severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    /// Below the lowest configured threshold.
    Minimal,
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Minimal => write!(f, "MINIMAL"),
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Direction of recent score movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskTrend {
    Increasing,
    #[default]
    Stable,
    Decreasing,
}

impl fmt::Display for RiskTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Increasing => write!(f, "INCREASING"),
            Self::Stable => write!(f, "STABLE"),
            Self::Decreasing => write!(f, "DECREASING"),
        }
    }
}

/// Business criticality of an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetCriticality {
    Critical,
    High,
    Medium,
    Low,
    Minimal,
}

impl AssetCriticality {
    /// Base value on the 1–5 criticality scale.
    #[must_use]
    pub fn base_value(self) -> f64 {
        match self {
            Self::Critical => 5.0,
            Self::High => 4.0,
            Self::Medium => 3.0,
            Self::Low => 2.0,
            Self::Minimal => 1.0,
        }
    }
}

/// Network exposure of an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExposureLevel {
    InternetFacing,
    Dmz,
    Internal,
    Isolated,
}

impl ExposureLevel {
    /// Multiplier applied to the asset's criticality.
    #[must_use]
    pub fn factor(self) -> f64 {
        match self {
            Self::InternetFacing => 1.8,
            Self::Dmz => 1.4,
            Self::Internal => 1.0,
            Self::Isolated => 0.6,
        }
    }
}

/// CVSS attack complexity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttackComplexity {
    Low,
    #[default]
    Medium,
    High,
}

impl AttackComplexity {
    /// Multiplier applied to the vulnerability score.
    #[must_use]
    pub fn multiplier(self) -> f64 {
        match self {
            Self::Low => 1.5,
            Self::Medium => 1.0,
            Self::High => 0.7,
        }
    }
}

/// Severity of a security incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentSeverity {
    Critical,
    High,
    Medium,
    Low,
}

impl IncidentSeverity {
    /// Weight of an incident of this severity before time decay.
    #[must_use]
    pub fn weight(self) -> f64 {
        match self {
            Self::Critical => 4.0,
            Self::High => 3.0,
            Self::Medium => 2.0,
            Self::Low => 1.0,
        }
    }

    /// Critical and High incidents escalate the context multiplier.
    #[must_use]
    pub fn is_elevated(self) -> bool {
        matches!(self, Self::Critical | Self::High)
    }
}

/// Lifecycle status of an incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentStatus {
    #[default]
    Open,
    Investigating,
    Contained,
    Resolved,
    Closed,
}

/// Organizational tolerance for risk, which scales classification thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskAppetite {
    /// Lowers thresholds: higher levels are reached sooner.
    Conservative,
    #[default]
    Moderate,
    /// Raises thresholds: higher levels are reached later.
    Aggressive,
}

impl RiskAppetite {
    /// Factor applied to every configured threshold.
    #[must_use]
    pub fn threshold_factor(self) -> f64 {
        match self {
            Self::Conservative => 0.8,
            Self::Moderate => 1.0,
            Self::Aggressive => 1.2,
        }
    }
}

impl fmt::Display for RiskAppetite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conservative => write!(f, "conservative"),
            Self::Moderate => write!(f, "moderate"),
            Self::Aggressive => write!(f, "aggressive"),
        }
    }
}

/// Why a calculation was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerReason {
    /// Picked up by the batch scheduler because `next_calculation` elapsed.
    Scheduled,
    /// Requested for a single risk by a user.
    Manual,
    /// Scoring weights were replaced.
    ConfigChange,
}

impl fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scheduled => write!(f, "scheduled"),
            Self::Manual => write!(f, "manual"),
            Self::ConfigChange => write!(f, "config_change"),
        }
    }
}

/// State of a single per-risk calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CalculationState {
    Pending,
    Calculating,
    Complete,
    Failed,
}

impl CalculationState {
    /// Returns true for `Complete` and `Failed`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

impl fmt::Display for CalculationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Calculating => write!(f, "CALCULATING"),
            Self::Complete => write!(f, "COMPLETE"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

// ============================================================================
// Risk register
// ============================================================================

/// A risk register entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Risk {
    pub id: RiskId,
    pub title: String,
    /// Qualitative probability, 1–5.
    pub probability: u8,
    /// Qualitative impact, 1–5.
    pub impact: u8,
    /// Last calculated dynamic score (0–100).
    pub dynamic_score: Option<f64>,
    pub dynamic_level: Option<RiskLevel>,
    pub dynamic_trend: Option<RiskTrend>,
    /// Confidence of the last calculation (0–1).
    pub confidence_score: Option<f64>,
    pub last_calculated: Option<DateTime<Utc>>,
    /// When the scheduler should next pick this risk up. `None` means now.
    pub next_calculation: Option<DateTime<Utc>>,
}

impl Risk {
    /// Create a register entry that has never been scored.
    pub fn new(title: impl Into<String>, probability: u8, impact: u8) -> Self {
        Self {
            id: RiskId::new(),
            title: title.into(),
            probability,
            impact,
            dynamic_score: None,
            dynamic_level: None,
            dynamic_trend: None,
            confidence_score: None,
            last_calculated: None,
            next_calculation: None,
        }
    }

    /// Whether the scheduler should recalculate this risk at `now`.
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.next_calculation.map_or(true, |next| next <= now)
    }

    /// Snapshot of the engine-owned fields.
    #[must_use]
    pub fn score_state(&self) -> RiskScoreState {
        RiskScoreState {
            dynamic_score: self.dynamic_score,
            dynamic_level: self.dynamic_level,
            dynamic_trend: self.dynamic_trend,
            confidence_score: self.confidence_score,
            last_calculated: self.last_calculated,
            next_calculation: self.next_calculation,
        }
    }

    /// Overwrite the engine-owned fields.
    pub fn apply_score_state(&mut self, state: &RiskScoreState) {
        self.dynamic_score = state.dynamic_score;
        self.dynamic_level = state.dynamic_level;
        self.dynamic_trend = state.dynamic_trend;
        self.confidence_score = state.confidence_score;
        self.last_calculated = state.last_calculated;
        self.next_calculation = state.next_calculation;
    }
}

/// The fields of a [`Risk`] written by the engine, updated as one unit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RiskScoreState {
    pub dynamic_score: Option<f64>,
    pub dynamic_level: Option<RiskLevel>,
    pub dynamic_trend: Option<RiskTrend>,
    pub confidence_score: Option<f64>,
    pub last_calculated: Option<DateTime<Utc>>,
    pub next_calculation: Option<DateTime<Utc>>,
}

// ============================================================================
// Telemetry
// ============================================================================

/// An asset linked to a risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub name: String,
    pub criticality: AssetCriticality,
    pub exposure: ExposureLevel,
    /// Device risk reported by an external source, on the 1–5 criticality scale.
    #[serde(default)]
    pub external_risk_score: Option<f64>,
    /// Services that depend on this asset.
    #[serde(default)]
    pub service_ids: Vec<ServiceId>,
}

impl Asset {
    pub fn new(name: impl Into<String>, criticality: AssetCriticality, exposure: ExposureLevel) -> Self {
        Self {
            id: AssetId::new(),
            name: name.into(),
            criticality,
            exposure,
            external_risk_score: None,
            service_ids: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_external_risk(mut self, score: f64) -> Self {
        self.external_risk_score = Some(score);
        self
    }

    #[must_use]
    pub fn with_services(mut self, service_ids: Vec<ServiceId>) -> Self {
        self.service_ids = service_ids;
        self
    }
}

/// A vulnerability finding on an asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vulnerability {
    pub id: VulnerabilityId,
    pub asset_id: AssetId,
    /// CVSS base score, 0–10.
    pub cvss_score: f64,
    pub severity: String,
    pub exploit_available: bool,
    pub public_exploit: bool,
    pub patch_available: bool,
    /// Days since a patch became available, if one exists.
    #[serde(default)]
    pub days_since_patch: Option<u32>,
    #[serde(default)]
    pub attack_complexity: AttackComplexity,
}

impl Vulnerability {
    /// A patched, unexploited finding of medium complexity.
    pub fn new(asset_id: AssetId, cvss_score: f64) -> Self {
        Self {
            id: VulnerabilityId::new(),
            asset_id,
            cvss_score,
            severity: severity_label(cvss_score).to_string(),
            exploit_available: false,
            public_exploit: false,
            patch_available: true,
            days_since_patch: Some(0),
            attack_complexity: AttackComplexity::Medium,
        }
    }

    #[must_use]
    pub fn exploited(mut self) -> Self {
        self.exploit_available = true;
        self
    }

    #[must_use]
    pub fn publicly_exploited(mut self) -> Self {
        self.exploit_available = true;
        self.public_exploit = true;
        self
    }

    #[must_use]
    pub fn unpatched(mut self) -> Self {
        self.patch_available = false;
        self.days_since_patch = None;
        self
    }

    #[must_use]
    pub fn patch_pending_for(mut self, days: u32) -> Self {
        self.patch_available = true;
        self.days_since_patch = Some(days);
        self
    }

    #[must_use]
    pub fn with_complexity(mut self, complexity: AttackComplexity) -> Self {
        self.attack_complexity = complexity;
        self
    }
}

/// CVSS v3 qualitative rating for a base score.
fn severity_label(cvss: f64) -> &'static str {
    if cvss >= 9.0 {
        "critical"
    } else if cvss >= 7.0 {
        "high"
    } else if cvss >= 4.0 {
        "medium"
    } else if cvss > 0.0 {
        "low"
    } else {
        "none"
    }
}

/// A security incident recorded against an asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: IncidentId,
    pub asset_id: AssetId,
    pub severity: IncidentSeverity,
    #[serde(default)]
    pub status: IncidentStatus,
    pub created_date: DateTime<Utc>,
}

impl Incident {
    pub fn new(asset_id: AssetId, severity: IncidentSeverity, created_date: DateTime<Utc>) -> Self {
        Self {
            id: IncidentId::new(),
            asset_id,
            severity,
            status: IncidentStatus::Open,
            created_date,
        }
    }
}

/// A business service linked to a risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub name: String,
    /// Criticality on a 0–10 scale.
    pub criticality_score: f64,
    /// Required availability as a fraction, e.g. 0.999.
    pub availability_requirement: f64,
    /// Number of users affected by an outage.
    pub user_impact: u64,
    /// Financial impact of an outage per hour.
    pub financial_impact_per_hour: f64,
    /// Number of downstream dependencies.
    pub dependencies: u32,
}

/// A threat intelligence signal relevant to a risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatIntelSignal {
    pub id: ThreatSignalId,
    pub source: String,
    /// Confidence in the signal, 0–1.
    pub confidence_level: f64,
    /// Severity, 0–10.
    pub severity_score: f64,
    /// Relevance to the organization, 0–1.
    pub relevance_score: f64,
    pub observed_at: DateTime<Utc>,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// A mitigating control linked to a risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Control {
    pub id: ControlId,
    pub name: String,
    /// Measured effectiveness, 0–1.
    pub effectiveness: f64,
    /// Coverage of the risk surface, 0–100.
    pub coverage_percentage: f64,
    /// Maturity level, 0–5.
    pub maturity_level: f64,
    #[serde(default)]
    pub last_tested: Option<DateTime<Utc>>,
}

/// A time-bounded, explicitly recorded condition that scales a risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextFactor {
    pub id: ContextFactorId,
    pub risk_id: RiskId,
    /// Free-form label, e.g. "merger_integration".
    pub factor_type: String,
    pub impact_multiplier: f64,
    pub valid_from: DateTime<Utc>,
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl ContextFactor {
    /// Whether the factor applies at `now`.
    #[must_use]
    pub fn is_in_effect(&self, now: DateTime<Utc>) -> bool {
        self.active && self.valid_from <= now && self.valid_until.map_or(true, |until| now <= until)
    }
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Audit trail
// ============================================================================

/// Append-only record of one recalculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationHistoryRecord {
    pub id: HistoryRecordId,
    pub risk_id: RiskId,
    /// Score before this calculation; 0 for the first calculation.
    pub previous_score: f64,
    pub new_score: f64,
    pub delta: f64,
    pub level: RiskLevel,
    pub confidence: f64,
    pub trigger: TriggerReason,
    /// Serialized component breakdown.
    pub components: serde_json::Value,
    pub calculated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_risk_level_ordering_and_display() {
        assert!(RiskLevel::Critical > RiskLevel::High);
        assert!(RiskLevel::Low > RiskLevel::Minimal);
        assert_eq!(RiskLevel::Critical.to_string(), "CRITICAL");
        assert_eq!(
            serde_json::to_string(&RiskLevel::Minimal).unwrap(),
            "\"MINIMAL\""
        );
    }

    #[test]
    fn test_enum_serialization() {
        assert_eq!(
            serde_json::to_string(&ExposureLevel::InternetFacing).unwrap(),
            "\"internet_facing\""
        );
        assert_eq!(
            serde_json::to_string(&TriggerReason::ConfigChange).unwrap(),
            "\"config_change\""
        );
        assert_eq!(
            serde_json::to_string(&RiskTrend::Decreasing).unwrap(),
            "\"DECREASING\""
        );
    }

    #[test]
    fn test_appetite_factors_loosen_in_order() {
        assert!(
            RiskAppetite::Conservative.threshold_factor()
                < RiskAppetite::Moderate.threshold_factor()
        );
        assert!(
            RiskAppetite::Moderate.threshold_factor() < RiskAppetite::Aggressive.threshold_factor()
        );
    }

    #[test]
    fn test_risk_is_stale() {
        let now = Utc::now();
        let mut risk = Risk::new("Data centre outage", 3, 4);
        assert!(risk.is_stale(now));

        risk.next_calculation = Some(now + Duration::minutes(5));
        assert!(!risk.is_stale(now));

        risk.next_calculation = Some(now);
        assert!(risk.is_stale(now));
    }

    #[test]
    fn test_score_state_round_trip() {
        let mut risk = Risk::new("Ransomware", 4, 5);
        let state = RiskScoreState {
            dynamic_score: Some(72.5),
            dynamic_level: Some(RiskLevel::High),
            dynamic_trend: Some(RiskTrend::Increasing),
            confidence_score: Some(0.8),
            last_calculated: Some(Utc::now()),
            next_calculation: None,
        };
        risk.apply_score_state(&state);
        assert_eq!(risk.score_state(), state);
    }

    #[test]
    fn test_context_factor_window() {
        let now = Utc::now();
        let mut factor = ContextFactor {
            id: ContextFactorId::new(),
            risk_id: RiskId::new(),
            factor_type: "merger".to_string(),
            impact_multiplier: 1.6,
            valid_from: now - Duration::days(1),
            valid_until: Some(now + Duration::days(1)),
            active: true,
        };
        assert!(factor.is_in_effect(now));

        factor.valid_until = Some(now - Duration::hours(1));
        assert!(!factor.is_in_effect(now));

        factor.valid_until = None;
        factor.active = false;
        assert!(!factor.is_in_effect(now));
    }

    #[test]
    fn test_vulnerability_builders() {
        let vuln = Vulnerability::new(AssetId::new(), 9.8)
            .publicly_exploited()
            .unpatched();
        assert_eq!(vuln.severity, "critical");
        assert!(vuln.exploit_available && vuln.public_exploit);
        assert!(!vuln.patch_available);
        assert_eq!(vuln.days_since_patch, None);
    }
}
