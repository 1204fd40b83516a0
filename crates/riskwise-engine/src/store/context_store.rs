//! Context factor storage trait and in-memory implementation.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::Result;
use crate::ids::RiskId;
use crate::types::ContextFactor;

/// Trait for reading explicit context factors.
#[async_trait]
pub trait ContextFactorStore: Send + Sync {
    /// Context factors recorded against a risk, in effect or not.
    async fn context_factors_for_risk(&self, risk_id: RiskId) -> Result<Vec<ContextFactor>>;
}

/// In-memory implementation of `ContextFactorStore`.
#[derive(Debug, Default)]
pub struct InMemoryContextFactorStore {
    factors: RwLock<HashMap<RiskId, Vec<ContextFactor>>>,
}

impl InMemoryContextFactorStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            factors: RwLock::new(HashMap::new()),
        }
    }

    /// Record a factor; it is keyed by its own `risk_id`.
    pub fn add(&self, factor: ContextFactor) {
        self.factors
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(factor.risk_id)
            .or_default()
            .push(factor);
    }
}

#[async_trait]
impl ContextFactorStore for InMemoryContextFactorStore {
    async fn context_factors_for_risk(&self, risk_id: RiskId) -> Result<Vec<ContextFactor>> {
        Ok(self
            .factors
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&risk_id)
            .cloned()
            .unwrap_or_default())
    }
}
