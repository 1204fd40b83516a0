//! Service facade.
//!
//! [`RiskScoringService`] is the surface an HTTP layer binds to:
//!
//! | Operation | Route |
//! |-----------|-------|
//! | [`calculate_risk`](RiskScoringService::calculate_risk) | `POST /calculate/:riskId` |
//! | [`calculate_all`](RiskScoringService::calculate_all) | `POST /calculate-all` |
//! | [`update_weights`](RiskScoringService::update_weights) | `POST /update-weights` |
//! | [`history`](RiskScoringService::history) | `GET /history/:riskId` |

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use crate::config::{EngineConfig, ScoringConfig, ScoringWeights};
use crate::error::{EngineError, Result};
use crate::ids::RiskId;
use crate::orchestrator::{CalculationOrchestrator, CalculationOutcome, EngineStores};
use crate::scheduler::{BatchScheduler, BatchSelection, BatchSummary};
use crate::types::{CalculationHistoryRecord, TriggerReason};

/// Risk scoring operations exposed to callers.
pub struct RiskScoringService {
    orchestrator: Arc<CalculationOrchestrator>,
    scheduler: Arc<BatchScheduler>,
}

impl RiskScoringService {
    /// Create a new service over the given stores.
    pub fn new(stores: EngineStores, config: EngineConfig) -> Self {
        let orchestrator = Arc::new(CalculationOrchestrator::new(stores, config));
        let scheduler = Arc::new(BatchScheduler::new(Arc::clone(&orchestrator)));
        Self {
            orchestrator,
            scheduler,
        }
    }

    /// The orchestrator, for calculations at an explicit point in time.
    #[must_use]
    pub fn orchestrator(&self) -> Arc<CalculationOrchestrator> {
        Arc::clone(&self.orchestrator)
    }

    /// The scheduler, for running the background polling loop.
    #[must_use]
    pub fn scheduler(&self) -> Arc<BatchScheduler> {
        Arc::clone(&self.scheduler)
    }

    /// Recalculate one risk on request. Every error is returned to the caller.
    pub async fn calculate_risk(&self, risk_id: RiskId) -> Result<CalculationOutcome> {
        self.orchestrator
            .calculate(risk_id, TriggerReason::Manual)
            .await
    }

    /// Run one sweep over the stale risks.
    pub async fn calculate_all(&self) -> Result<BatchSummary> {
        self.scheduler.run_once().await
    }

    /// Validate and replace the active weights, then recalculate every risk.
    ///
    /// Invalid weights are rejected before anything is written.
    #[instrument(skip(self, weights))]
    pub async fn update_weights(
        &self,
        weights: ScoringWeights,
    ) -> Result<(ScoringConfig, BatchSummary)> {
        weights.validate()?;

        let config = self
            .orchestrator
            .stores()
            .config
            .update_weights(weights)
            .await
            .map_err(|e| match e {
                EngineError::Persistence { .. } => e,
                other => EngineError::persistence("update_weights", other),
            })?;
        info!(config_id = %config.id, "Scoring weights updated");

        let summary = self
            .scheduler
            .run_batch(BatchSelection::All, TriggerReason::ConfigChange, Utc::now())
            .await?;

        Ok((config, summary))
    }

    /// Weights received as JSON, e.g. straight from a request body.
    pub async fn update_weights_json(
        &self,
        weights: serde_json::Value,
    ) -> Result<(ScoringConfig, BatchSummary)> {
        let weights = ScoringWeights::from_json(weights)?;
        self.update_weights(weights).await
    }

    /// Newest-first calculation history of a risk.
    pub async fn history(
        &self,
        risk_id: RiskId,
        limit: usize,
    ) -> Result<Vec<CalculationHistoryRecord>> {
        let stores = self.orchestrator.stores();
        if stores.risks.get_risk(risk_id).await?.is_none() {
            return Err(EngineError::InvalidEntity { risk_id });
        }
        stores.history.recent(risk_id, limit).await
    }
}
