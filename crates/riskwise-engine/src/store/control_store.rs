//! Control storage trait and in-memory implementation.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::Result;
use crate::ids::RiskId;
use crate::types::Control;

/// Trait for reading the controls that mitigate a risk.
#[async_trait]
pub trait ControlStore: Send + Sync {
    /// Controls linked to a risk.
    async fn controls_for_risk(&self, risk_id: RiskId) -> Result<Vec<Control>>;
}

/// In-memory implementation of `ControlStore`.
#[derive(Debug, Default)]
pub struct InMemoryControlStore {
    controls: RwLock<HashMap<RiskId, Vec<Control>>>,
}

impl InMemoryControlStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            controls: RwLock::new(HashMap::new()),
        }
    }

    /// Link a control to a risk.
    pub fn link(&self, risk_id: RiskId, control: Control) {
        self.controls
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(risk_id)
            .or_default()
            .push(control);
    }
}

#[async_trait]
impl ControlStore for InMemoryControlStore {
    async fn controls_for_risk(&self, risk_id: RiskId) -> Result<Vec<Control>> {
        Ok(self
            .controls
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&risk_id)
            .cloned()
            .unwrap_or_default())
    }
}
