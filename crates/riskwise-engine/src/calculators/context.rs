//! Context multiplier.
//!
//! Transient organizational or threat conditions scale the weighted score.
//! Candidates come from two places: explicit [`ContextFactor`] records on the
//! risk, and heuristics evaluated at calculation time. The multiplier is the
//! **maximum** of all applicable candidates, never their product or sum, so
//! coincident conditions cannot compound.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::types::{ContextFactor, Incident, ThreatIntelSignal};

/// Multiplier when no candidate applies.
pub const NEUTRAL_MULTIPLIER: f64 = 1.0;

pub const PEAK_HOURS_MULTIPLIER: f64 = 1.3;
pub const AUDIT_PERIOD_MULTIPLIER: f64 = 1.2;
pub const RECENT_INCIDENT_MULTIPLIER: f64 = 1.4;
pub const THREAT_SURGE_MULTIPLIER: f64 = 1.5;

const PEAK_START_HOUR: u32 = 8;
const PEAK_END_HOUR: u32 = 18;
const RECENT_INCIDENT_DAYS: i64 = 7;
const THREAT_SURGE_HOURS: i64 = 24;
const THREAT_SURGE_MIN_SEVERITY: f64 = 7.0;
const THREAT_SURGE_COUNT: usize = 5;

/// Organization-wide telemetry the heuristics look at, independent of the
/// risk being scored.
#[derive(Debug, Clone, Default)]
pub struct OrganizationSignals {
    /// Incidents anywhere in the organization, at least the last 7 days.
    pub recent_incidents: Vec<Incident>,
    /// Threat signals anywhere in the organization, at least the last 24 hours.
    pub recent_threats: Vec<ThreatIntelSignal>,
}

/// One candidate that applied to this calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedMultiplier {
    pub source: String,
    pub multiplier: f64,
}

/// Result of the context multiplier calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextMultiplier {
    /// The multiplier applied to the weighted score.
    pub value: f64,
    /// Every candidate that applied; `value` is the largest of them.
    pub applied: Vec<AppliedMultiplier>,
    /// Explicit factors ignored because their multiplier was not a positive number.
    pub skipped: usize,
}

impl Default for ContextMultiplier {
    fn default() -> Self {
        Self {
            value: NEUTRAL_MULTIPLIER,
            applied: Vec::new(),
            skipped: 0,
        }
    }
}

/// Compute the context multiplier for a risk at `now`.
pub fn context_multiplier(
    factors: &[ContextFactor],
    org: &OrganizationSignals,
    now: DateTime<Utc>,
) -> ContextMultiplier {
    let mut applied = Vec::new();
    let mut skipped = 0;

    for factor in factors.iter().filter(|f| f.is_in_effect(now)) {
        if !factor.impact_multiplier.is_finite() || factor.impact_multiplier <= 0.0 {
            skipped += 1;
            continue;
        }
        applied.push(AppliedMultiplier {
            source: factor.factor_type.clone(),
            multiplier: factor.impact_multiplier,
        });
    }

    if is_peak_business_hours(now) {
        applied.push(heuristic("peak_business_hours", PEAK_HOURS_MULTIPLIER));
    }
    if is_audit_period(now) {
        applied.push(heuristic("audit_period", AUDIT_PERIOD_MULTIPLIER));
    }
    if has_recent_elevated_incident(&org.recent_incidents, now) {
        applied.push(heuristic("recent_incident", RECENT_INCIDENT_MULTIPLIER));
    }
    if has_threat_surge(&org.recent_threats, now) {
        applied.push(heuristic("threat_surge", THREAT_SURGE_MULTIPLIER));
    }

    let value = applied
        .iter()
        .map(|a| a.multiplier)
        .reduce(f64::max)
        .unwrap_or(NEUTRAL_MULTIPLIER);

    ContextMultiplier {
        value,
        applied,
        skipped,
    }
}

fn heuristic(source: &str, multiplier: f64) -> AppliedMultiplier {
    AppliedMultiplier {
        source: source.to_string(),
        multiplier,
    }
}

/// Monday to Friday, 08:00 to 17:59 UTC.
fn is_peak_business_hours(now: DateTime<Utc>) -> bool {
    let weekday = !matches!(now.weekday(), Weekday::Sat | Weekday::Sun);
    weekday && (PEAK_START_HOUR..PEAK_END_HOUR).contains(&now.hour())
}

/// Fourth and first quarter: October through March.
fn is_audit_period(now: DateTime<Utc>) -> bool {
    matches!(now.month(), 10..=12 | 1..=3)
}

fn has_recent_elevated_incident(incidents: &[Incident], now: DateTime<Utc>) -> bool {
    let since = now - Duration::days(RECENT_INCIDENT_DAYS);
    incidents
        .iter()
        .any(|i| i.severity.is_elevated() && i.created_date >= since && i.created_date <= now)
}

fn has_threat_surge(threats: &[ThreatIntelSignal], now: DateTime<Utc>) -> bool {
    let since = now - Duration::hours(THREAT_SURGE_HOURS);
    threats
        .iter()
        .filter(|t| {
            t.active
                && t.severity_score >= THREAT_SURGE_MIN_SEVERITY
                && t.observed_at >= since
                && t.observed_at <= now
        })
        .count()
        > THREAT_SURGE_COUNT
}
