//! Per-risk calculation.
//!
//! [`CalculationOrchestrator`] drives one risk through
//! `PENDING → CALCULATING → COMPLETE | FAILED`: load the risk and its
//! telemetry, run the calculators, aggregate, classify, derive the trend
//! and persist.
//!
//! Persistence is all-or-nothing. The risk's score state is written first;
//! if the history append that follows fails, the state loaded at the start
//! is written back and the calculation is reported as failed.
//!
//! Calculations of the same risk are serialized through a per-risk async
//! mutex, so a manual recalculation racing the scheduler cannot interleave
//! its writes with another run.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use crate::aggregator::{aggregate, names, ComponentBreakdown, ComponentSet};
use crate::calculators::{
    asset_criticality, context_multiplier, control_effectiveness, incident_history_score,
    service_criticality, threat_intelligence_score, vulnerability_score, OrganizationSignals,
};
use crate::classifier::classify;
use crate::config::{EngineConfig, ScoringConfig};
use crate::error::{EngineError, Result};
use crate::ids::{HistoryRecordId, RiskId};
use crate::store::{
    CalculationHistoryStore, ContextFactorStore, ControlStore, RiskStore, ScoringConfigStore,
    TelemetryStore,
};
use crate::trend::{analyze_trend, TREND_WINDOW};
use crate::types::{
    CalculationHistoryRecord, CalculationState, Incident, Risk, RiskLevel, RiskScoreState,
    RiskTrend, TriggerReason, Vulnerability,
};

/// Valid range of the register's qualitative probability and impact.
const QUALITATIVE_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

/// Look-back for organization incidents feeding the context heuristics.
const ORG_INCIDENT_LOOKBACK_DAYS: i64 = 7;

/// Look-back for organization threat signals feeding the context heuristics.
const ORG_THREAT_LOOKBACK_HOURS: i64 = 24;

/// The stores the engine reads from and writes to.
#[derive(Clone)]
pub struct EngineStores {
    pub risks: Arc<dyn RiskStore>,
    pub telemetry: Arc<dyn TelemetryStore>,
    pub controls: Arc<dyn ControlStore>,
    pub context: Arc<dyn ContextFactorStore>,
    pub config: Arc<dyn ScoringConfigStore>,
    pub history: Arc<dyn CalculationHistoryStore>,
}

/// Result of a completed calculation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationOutcome {
    pub risk_id: RiskId,
    pub state: CalculationState,
    pub score: f64,
    pub level: RiskLevel,
    pub trend: RiskTrend,
    pub confidence: f64,
    pub components: ComponentBreakdown,
    pub trigger: TriggerReason,
    pub last_calculated: DateTime<Utc>,
    pub next_calculation: DateTime<Utc>,
}

/// Runs single-risk calculations against the configured stores.
pub struct CalculationOrchestrator {
    stores: EngineStores,
    config: EngineConfig,
    locks: DashMap<RiskId, Arc<Mutex<()>>>,
}

impl CalculationOrchestrator {
    /// Create a new orchestrator.
    pub fn new(stores: EngineStores, config: EngineConfig) -> Self {
        Self {
            stores,
            config,
            locks: DashMap::new(),
        }
    }

    /// The stores this orchestrator uses.
    #[must_use]
    pub fn stores(&self) -> &EngineStores {
        &self.stores
    }

    /// The runtime configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Recalculate one risk now.
    pub async fn calculate(
        &self,
        risk_id: RiskId,
        trigger: TriggerReason,
    ) -> Result<CalculationOutcome> {
        self.calculate_at(risk_id, trigger, Utc::now()).await
    }

    /// Recalculate one risk as of `now`.
    ///
    /// `now` drives time decay, context heuristics and the written
    /// timestamps, so identical inputs and `now` give identical results.
    #[instrument(skip(self), fields(risk_id = %risk_id, trigger = %trigger))]
    pub async fn calculate_at(
        &self,
        risk_id: RiskId,
        trigger: TriggerReason,
        now: DateTime<Utc>,
    ) -> Result<CalculationOutcome> {
        // Unknown ids never get a lock entry.
        if self.stores.risks.get_risk(risk_id).await?.is_none() {
            warn!(state = %CalculationState::Failed, "Risk not found");
            return Err(EngineError::InvalidEntity { risk_id });
        }

        debug!(state = %CalculationState::Pending, "Waiting for risk lock");
        let lock = self
            .locks
            .entry(risk_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        debug!(state = %CalculationState::Calculating, "Calculation started");
        match self.run(risk_id, trigger, now).await {
            Ok(outcome) => {
                info!(
                    state = %outcome.state,
                    score = outcome.score,
                    level = %outcome.level,
                    trend = %outcome.trend,
                    confidence = outcome.confidence,
                    "Risk calculation complete"
                );
                Ok(outcome)
            }
            Err(e) => {
                warn!(state = %CalculationState::Failed, error = %e, "Risk calculation failed");
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        risk_id: RiskId,
        trigger: TriggerReason,
        now: DateTime<Utc>,
    ) -> Result<CalculationOutcome> {
        let risk = self
            .stores
            .risks
            .get_risk(risk_id)
            .await?
            .ok_or(EngineError::InvalidEntity { risk_id })?;
        validate_risk(&risk)?;

        let scoring = self.load_scoring_config().await;
        let components = self.gather_components(&risk, now).await;

        let aggregated = aggregate(risk.probability, risk.impact, &components, &scoring.weights);
        let level = classify(aggregated.score, &scoring.thresholds, scoring.risk_appetite);
        let trend = self.prior_trend(&risk).await;
        debug!(
            score = aggregated.score,
            level = %level,
            context_multiplier = components.context.value,
            "Score aggregated"
        );

        let next_calculation = self.next_calculation_after(now)?;
        let state = RiskScoreState {
            dynamic_score: Some(aggregated.score),
            dynamic_level: Some(level),
            dynamic_trend: Some(trend),
            confidence_score: Some(aggregated.confidence),
            last_calculated: Some(now),
            next_calculation: Some(next_calculation),
        };

        let previous_score = risk.dynamic_score.unwrap_or(0.0);
        let record = CalculationHistoryRecord {
            id: HistoryRecordId::new(),
            risk_id,
            previous_score,
            new_score: aggregated.score,
            delta: aggregated.score - previous_score,
            level,
            confidence: aggregated.confidence,
            trigger,
            components: serde_json::to_value(&aggregated.breakdown)?,
            calculated_at: now,
        };

        self.persist(&risk, &state, record).await?;

        Ok(CalculationOutcome {
            risk_id,
            state: CalculationState::Complete,
            score: aggregated.score,
            level,
            trend,
            confidence: aggregated.confidence,
            components: aggregated.breakdown,
            trigger,
            last_calculated: now,
            next_calculation,
        })
    }

    /// Active configuration, or the built-in defaults when none is usable.
    async fn load_scoring_config(&self) -> ScoringConfig {
        let fallback = |reason: String| {
            let err = EngineError::Configuration { reason };
            warn!(error = %err, "Using built-in scoring defaults");
            ScoringConfig::builtin_default()
        };

        match self.stores.config.get_active().await {
            Ok(Some(config)) => match config.validate() {
                Ok(()) => config,
                Err(e) => fallback(format!("active configuration {} is invalid: {e}", config.id)),
            },
            Ok(None) => fallback("no active scoring configuration".to_string()),
            Err(e) => fallback(format!("failed to load scoring configuration: {e}")),
        }
    }

    /// Fetch telemetry and run every calculator.
    ///
    /// A failed fetch degrades only the component it feeds: the component
    /// contributes zero and is listed as unavailable.
    async fn gather_components(&self, risk: &Risk, now: DateTime<Utc>) -> ComponentSet {
        let mut set = ComponentSet::default();
        let telemetry = &self.stores.telemetry;

        match telemetry.assets_for_risk(risk.id).await {
            Ok(assets) => {
                set.asset_criticality = asset_criticality(&assets);

                let mut vulnerabilities: Vec<Vulnerability> = Vec::new();
                let mut incidents: Vec<Incident> = Vec::new();
                let mut vulnerabilities_ok = true;
                let mut incidents_ok = true;

                for asset in &assets {
                    match telemetry.vulnerabilities_for_asset(asset.id).await {
                        Ok(found) => vulnerabilities.extend(found),
                        Err(e) => {
                            vulnerabilities_ok = false;
                            unavailable(names::VULNERABILITY, &e);
                        }
                    }
                    match telemetry.incidents_for_asset(asset.id).await {
                        Ok(found) => incidents.extend(found),
                        Err(e) => {
                            incidents_ok = false;
                            unavailable(names::INCIDENT_HISTORY, &e);
                        }
                    }
                }

                if vulnerabilities_ok {
                    set.vulnerability = vulnerability_score(&vulnerabilities);
                } else {
                    set.unavailable.push(names::VULNERABILITY);
                }
                if incidents_ok {
                    set.incident_history = incident_history_score(&incidents, now);
                } else {
                    set.unavailable.push(names::INCIDENT_HISTORY);
                }
            }
            Err(e) => {
                unavailable(names::ASSET_CRITICALITY, &e);
                // Vulnerabilities and incidents are reached through assets.
                set.unavailable.extend([
                    names::ASSET_CRITICALITY,
                    names::VULNERABILITY,
                    names::INCIDENT_HISTORY,
                ]);
            }
        }

        match telemetry.services_for_risk(risk.id).await {
            Ok(services) => set.service_criticality = service_criticality(&services),
            Err(e) => {
                unavailable(names::SERVICE_CRITICALITY, &e);
                set.unavailable.push(names::SERVICE_CRITICALITY);
            }
        }

        match telemetry.threat_intel_for_risk(risk.id).await {
            Ok(signals) => set.threat_intelligence = threat_intelligence_score(&signals),
            Err(e) => {
                unavailable(names::THREAT_INTELLIGENCE, &e);
                set.unavailable.push(names::THREAT_INTELLIGENCE);
            }
        }

        match self.stores.controls.controls_for_risk(risk.id).await {
            Ok(controls) => set.control_effectiveness = control_effectiveness(&controls, now),
            Err(e) => {
                unavailable(names::CONTROL_EFFECTIVENESS, &e);
                set.unavailable.push(names::CONTROL_EFFECTIVENESS);
            }
        }

        let mut context_ok = true;
        let factors = match self.stores.context.context_factors_for_risk(risk.id).await {
            Ok(factors) => factors,
            Err(e) => {
                context_ok = false;
                unavailable(names::CONTEXT, &e);
                Vec::new()
            }
        };
        let mut org = OrganizationSignals::default();
        match telemetry
            .incidents_since(now - Duration::days(ORG_INCIDENT_LOOKBACK_DAYS))
            .await
        {
            Ok(incidents) => org.recent_incidents = incidents,
            Err(e) => {
                context_ok = false;
                unavailable(names::CONTEXT, &e);
            }
        }
        match telemetry
            .threat_signals_since(now - Duration::hours(ORG_THREAT_LOOKBACK_HOURS))
            .await
        {
            Ok(signals) => org.recent_threats = signals,
            Err(e) => {
                context_ok = false;
                unavailable(names::CONTEXT, &e);
            }
        }
        if !context_ok {
            set.unavailable.push(names::CONTEXT);
        }
        set.context = context_multiplier(&factors, &org, now);

        set
    }

    /// Trend over the history recorded before this calculation.
    async fn prior_trend(&self, risk: &Risk) -> RiskTrend {
        match self.stores.history.recent(risk.id, TREND_WINDOW).await {
            Ok(records) => analyze_trend(&records),
            Err(e) => {
                let previous = risk.dynamic_trend.unwrap_or_default();
                warn!(error = %e, trend = %previous, "History unavailable, keeping previous trend");
                previous
            }
        }
    }

    /// Write the new state, then the audit record; undo the state on failure.
    async fn persist(
        &self,
        risk: &Risk,
        state: &RiskScoreState,
        record: CalculationHistoryRecord,
    ) -> Result<()> {
        self.stores
            .risks
            .update_score_state(risk.id, state)
            .await
            .map_err(|e| as_persistence("update_score_state", e))?;

        if let Err(e) = self.stores.history.append(record).await {
            let snapshot = risk.score_state();
            if let Err(rollback) = self.stores.risks.update_score_state(risk.id, &snapshot).await {
                error!(
                    error = %rollback,
                    append_error = %e,
                    "Failed to restore risk state after history append failure"
                );
            } else {
                debug!("Risk state restored after history append failure");
            }
            return Err(as_persistence("append_history", e));
        }

        Ok(())
    }

    fn next_calculation_after(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let interval = self.config.recalculation_interval;
        Duration::from_std(interval)
            .ok()
            .and_then(|gap| now.checked_add_signed(gap))
            .ok_or_else(|| {
                EngineError::invalid_config(
                    "recalculation_interval",
                    format!("{}s after {now} is out of range", interval.as_secs()),
                )
            })
    }
}

fn validate_risk(risk: &Risk) -> Result<()> {
    if !QUALITATIVE_RANGE.contains(&risk.probability) {
        return Err(EngineError::InvalidRisk {
            risk_id: risk.id,
            reason: format!("probability must be 1-5, got {}", risk.probability),
        });
    }
    if !QUALITATIVE_RANGE.contains(&risk.impact) {
        return Err(EngineError::InvalidRisk {
            risk_id: risk.id,
            reason: format!("impact must be 1-5, got {}", risk.impact),
        });
    }
    Ok(())
}

fn unavailable(component: &'static str, cause: &EngineError) {
    let err = EngineError::data_unavailable(component, cause);
    warn!(component, error = %err, "Component data unavailable, contributing zero");
}

/// Store failures on the write path surface as persistence errors.
fn as_persistence(operation: &'static str, e: EngineError) -> EngineError {
    match e {
        EngineError::Persistence { .. } | EngineError::InvalidEntity { .. } => e,
        other => EngineError::persistence(operation, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::AssetId;
    use crate::store::{
        InMemoryCalculationHistoryStore, InMemoryContextFactorStore, InMemoryControlStore,
        InMemoryRiskStore, InMemoryScoringConfigStore, InMemoryTelemetryStore,
    };
    use crate::types::{Asset, AssetCriticality, ExposureLevel};
    use chrono::TimeZone;

    fn quiet_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 14, 3, 0, 0).unwrap()
    }

    fn orchestrator(
        risks: Arc<InMemoryRiskStore>,
        telemetry: Arc<InMemoryTelemetryStore>,
        history: Arc<InMemoryCalculationHistoryStore>,
    ) -> CalculationOrchestrator {
        orchestrator_with_config(risks, telemetry, history, EngineConfig::default())
    }

    fn orchestrator_with_config(
        risks: Arc<InMemoryRiskStore>,
        telemetry: Arc<InMemoryTelemetryStore>,
        history: Arc<InMemoryCalculationHistoryStore>,
        config: EngineConfig,
    ) -> CalculationOrchestrator {
        CalculationOrchestrator::new(
            EngineStores {
                risks,
                telemetry,
                controls: Arc::new(InMemoryControlStore::new()),
                context: Arc::new(InMemoryContextFactorStore::new()),
                config: Arc::new(InMemoryScoringConfigStore::new()),
                history,
            },
            config,
        )
    }

    #[test]
    fn test_validate_risk_range() {
        assert!(validate_risk(&Risk::new("ok", 1, 5)).is_ok());
        let err = validate_risk(&Risk::new("zero", 0, 3)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidRisk { .. }));
        assert!(err.to_string().contains("probability"));
        assert!(validate_risk(&Risk::new("six", 3, 6)).is_err());
    }

    #[test]
    fn test_as_persistence_keeps_entity_errors() {
        let id = RiskId::new();
        let e = as_persistence("update_score_state", EngineError::InvalidEntity { risk_id: id });
        assert!(matches!(e, EngineError::InvalidEntity { .. }));

        let e = as_persistence("append_history", EngineError::invalid_config("x", "y"));
        assert!(matches!(e, EngineError::Persistence { operation: "append_history", .. }));
    }

    #[tokio::test]
    async fn test_unknown_risk() {
        let orch = orchestrator(
            Arc::new(InMemoryRiskStore::new()),
            Arc::new(InMemoryTelemetryStore::new()),
            Arc::new(InMemoryCalculationHistoryStore::new()),
        );
        let err = orch
            .calculate_at(RiskId::new(), TriggerReason::Manual, quiet_time())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidEntity { .. }));
    }

    #[tokio::test]
    async fn test_unknown_risks_leave_no_lock_entries() {
        let risks = Arc::new(InMemoryRiskStore::new());
        let known = Risk::new("Known", 2, 2);
        let known_id = known.id;
        risks.insert(known);
        let orch = orchestrator(
            risks,
            Arc::new(InMemoryTelemetryStore::new()),
            Arc::new(InMemoryCalculationHistoryStore::new()),
        );

        for _ in 0..1000 {
            let result = orch
                .calculate_at(RiskId::new(), TriggerReason::Manual, quiet_time())
                .await;
            assert!(matches!(result, Err(EngineError::InvalidEntity { .. })));
        }
        assert!(orch.locks.is_empty());

        orch.calculate_at(known_id, TriggerReason::Manual, quiet_time())
            .await
            .unwrap();
        assert_eq!(orch.locks.len(), 1);
        assert!(orch.locks.contains_key(&known_id));
    }

    #[tokio::test]
    async fn test_unrepresentable_next_calculation_fails_cleanly() {
        let risks = Arc::new(InMemoryRiskStore::new());
        let history = Arc::new(InMemoryCalculationHistoryStore::new());
        let risk = Risk::new("Vendor lock-in", 3, 2);
        let id = risk.id;
        risks.insert(risk.clone());

        let config = EngineConfig {
            recalculation_interval: std::time::Duration::from_secs(10_000_000_000_000),
            ..EngineConfig::default()
        };
        let orch = orchestrator_with_config(
            risks.clone(),
            Arc::new(InMemoryTelemetryStore::new()),
            history.clone(),
            config,
        );

        let err = orch
            .calculate_at(id, TriggerReason::Manual, quiet_time())
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::InvalidConfig { ref field, .. } if field == "recalculation_interval"));
        assert_eq!(history.count(), 0);
        assert_eq!(risks.get_risk(id).await.unwrap(), Some(risk));
    }

    #[tokio::test]
    async fn test_calculation_writes_state_and_history() {
        let risks = Arc::new(InMemoryRiskStore::new());
        let telemetry = Arc::new(InMemoryTelemetryStore::new());
        let history = Arc::new(InMemoryCalculationHistoryStore::new());

        let risk = Risk::new("Core banking outage", 4, 4);
        let id = risk.id;
        risks.insert(risk);
        let asset = Asset::new("core-db", AssetCriticality::High, ExposureLevel::Internal);
        let asset_id: AssetId = asset.id;
        telemetry.link_asset(id, asset);
        telemetry.add_vulnerability(Vulnerability::new(asset_id, 6.0));

        let orch = orchestrator(risks.clone(), telemetry, history.clone());
        let now = quiet_time();
        let outcome = orch.calculate_at(id, TriggerReason::Manual, now).await.unwrap();

        assert_eq!(outcome.state, CalculationState::Complete);
        assert!(outcome.state.is_terminal());
        assert_eq!(outcome.trend, RiskTrend::Stable);
        assert_eq!(outcome.last_calculated, now);
        assert_eq!(outcome.next_calculation, now + Duration::hours(1));

        let stored = risks.get_risk(id).await.unwrap().unwrap();
        assert_eq!(stored.dynamic_score, Some(outcome.score));
        assert_eq!(stored.dynamic_level, Some(outcome.level));
        assert_eq!(stored.confidence_score, Some(outcome.confidence));

        let records = history.get_all();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].previous_score, 0.0);
        assert_eq!(records[0].new_score, outcome.score);
        assert_eq!(records[0].trigger, TriggerReason::Manual);
    }

    #[tokio::test]
    async fn test_invalid_risk_leaves_no_trace() {
        let risks = Arc::new(InMemoryRiskStore::new());
        let history = Arc::new(InMemoryCalculationHistoryStore::new());
        let risk = Risk::new("Broken", 9, 1);
        let id = risk.id;
        risks.insert(risk.clone());

        let orch = orchestrator(risks.clone(), Arc::new(InMemoryTelemetryStore::new()), history.clone());
        let err = orch
            .calculate_at(id, TriggerReason::Scheduled, quiet_time())
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::InvalidRisk { .. }));
        assert_eq!(history.count(), 0);
        assert_eq!(risks.get_risk(id).await.unwrap(), Some(risk));
    }
}
