//! Risk register storage trait and in-memory implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{EngineError, Result};
use crate::ids::RiskId;
use crate::types::{Risk, RiskScoreState};

/// Trait for reading register entries and writing their engine-owned fields.
#[async_trait]
pub trait RiskStore: Send + Sync {
    /// Get a risk by ID.
    async fn get_risk(&self, id: RiskId) -> Result<Option<Risk>>;

    /// IDs of risks due for recalculation at `now`.
    ///
    /// A risk is due when `next_calculation` is unset or not after `now`.
    /// Never-scheduled risks come first, then oldest due time first.
    async fn list_stale(&self, now: DateTime<Utc>) -> Result<Vec<RiskId>>;

    /// IDs of every risk in the register.
    async fn list_all(&self) -> Result<Vec<RiskId>>;

    /// Replace the engine-owned fields of a risk as one unit.
    async fn update_score_state(&self, id: RiskId, state: &RiskScoreState) -> Result<()>;
}

/// In-memory implementation of `RiskStore`.
#[derive(Debug, Default)]
pub struct InMemoryRiskStore {
    risks: RwLock<HashMap<RiskId, Risk>>,
}

impl InMemoryRiskStore {
    /// Create a new empty register.
    #[must_use]
    pub fn new() -> Self {
        Self {
            risks: RwLock::new(HashMap::new()),
        }
    }

    /// Insert or replace a risk.
    pub fn insert(&self, risk: Risk) {
        self.risks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(risk.id, risk);
    }

    /// Get all risks (for testing).
    pub fn get_all(&self) -> Vec<Risk> {
        self.risks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect()
    }

    /// Number of risks in the register.
    pub fn count(&self) -> usize {
        self.risks.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl RiskStore for InMemoryRiskStore {
    async fn get_risk(&self, id: RiskId) -> Result<Option<Risk>> {
        Ok(self
            .risks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .cloned())
    }

    async fn list_stale(&self, now: DateTime<Utc>) -> Result<Vec<RiskId>> {
        let risks = self.risks.read().unwrap_or_else(|e| e.into_inner());
        let mut stale: Vec<(Option<DateTime<Utc>>, RiskId)> = risks
            .values()
            .filter(|r| r.is_stale(now))
            .map(|r| (r.next_calculation, r.id))
            .collect();
        // None sorts before Some
        stale.sort();
        Ok(stale.into_iter().map(|(_, id)| id).collect())
    }

    async fn list_all(&self) -> Result<Vec<RiskId>> {
        let mut ids: Vec<RiskId> = self
            .risks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .copied()
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn update_score_state(&self, id: RiskId, state: &RiskScoreState) -> Result<()> {
        let mut risks = self.risks.write().unwrap_or_else(|e| e.into_inner());
        let risk = risks
            .get_mut(&id)
            .ok_or(EngineError::InvalidEntity { risk_id: id })?;
        risk.apply_score_state(state);
        Ok(())
    }
}
