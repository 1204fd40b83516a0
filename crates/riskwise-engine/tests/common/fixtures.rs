//! Fixture builders for register entries and telemetry.

use chrono::{DateTime, Duration, Utc};
use riskwise_engine::{
    Asset, AssetCriticality, CalculationHistoryRecord, ContextFactor, ContextFactorId, Control,
    ControlId, ExposureLevel, HistoryRecordId, Risk, RiskId, RiskLevel, TriggerReason,
    Vulnerability,
};

use super::TestStores;

/// Insert a fresh risk and return its ID.
pub fn insert_risk(stores: &TestStores, title: &str, probability: u8, impact: u8) -> RiskId {
    let risk = Risk::new(title, probability, impact);
    let id = risk.id;
    stores.risks.insert(risk);
    id
}

/// A critical, internet-facing asset with two exploited, unpatched
/// CVSS 9.8 findings, linked to `risk_id`.
pub fn link_exposed_asset(stores: &TestStores, risk_id: RiskId) -> Asset {
    let asset = Asset::new(
        "public-api-gateway",
        AssetCriticality::Critical,
        ExposureLevel::InternetFacing,
    );
    for _ in 0..2 {
        stores.telemetry.add_vulnerability(
            Vulnerability::new(asset.id, 9.8)
                .publicly_exploited()
                .unpatched(),
        );
    }
    stores.telemetry.link_asset(risk_id, asset.clone());
    asset
}

/// A fully effective, fully covered, mature control tested the day before `now`.
pub fn strong_control(now: DateTime<Utc>) -> Control {
    Control {
        id: ControlId::new(),
        name: "web-application-firewall".to_string(),
        effectiveness: 1.0,
        coverage_percentage: 100.0,
        maturity_level: 5.0,
        last_tested: Some(now - Duration::days(1)),
    }
}

/// An explicit context factor in effect around `now`.
pub fn context_factor(risk_id: RiskId, multiplier: f64, now: DateTime<Utc>) -> ContextFactor {
    ContextFactor {
        id: ContextFactorId::new(),
        risk_id,
        factor_type: "regulatory_review".to_string(),
        impact_multiplier: multiplier,
        valid_from: now - Duration::days(3),
        valid_until: Some(now + Duration::days(3)),
        active: true,
    }
}

/// A past calculation of `risk_id` scored `score`, `age_hours` before `now`.
pub fn past_calculation(
    risk_id: RiskId,
    score: f64,
    now: DateTime<Utc>,
    age_hours: i64,
) -> CalculationHistoryRecord {
    CalculationHistoryRecord {
        id: HistoryRecordId::new(),
        risk_id,
        previous_score: 0.0,
        new_score: score,
        delta: 0.0,
        level: RiskLevel::Medium,
        confidence: 0.6,
        trigger: TriggerReason::Scheduled,
        components: serde_json::Value::Null,
        calculated_at: now - Duration::hours(age_hours),
    }
}
