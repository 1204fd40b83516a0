//! Scoring configuration storage trait and in-memory implementation.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::RwLock;

use crate::config::{ScoringConfig, ScoringWeights};
use crate::error::Result;
use crate::ids::ScoringConfigId;

/// Trait for reading and replacing the active scoring configuration.
#[async_trait]
pub trait ScoringConfigStore: Send + Sync {
    /// Get the active configuration.
    ///
    /// Returns `None` if no configuration is active; callers fall back to
    /// [`ScoringConfig::builtin_default`].
    async fn get_active(&self) -> Result<Option<ScoringConfig>>;

    /// Make `config` the active configuration.
    async fn set_active(&self, config: ScoringConfig) -> Result<()>;

    /// Replace the weights of the active configuration and return it.
    ///
    /// When no configuration is active, one is created from the built-in
    /// defaults with the given weights.
    async fn update_weights(&self, weights: ScoringWeights) -> Result<ScoringConfig>;
}

/// In-memory implementation of `ScoringConfigStore`.
#[derive(Debug, Default)]
pub struct InMemoryScoringConfigStore {
    active: RwLock<Option<ScoringConfig>>,
}

impl InMemoryScoringConfigStore {
    /// Create a store with no active configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            active: RwLock::new(None),
        }
    }

    /// Create a store with `config` active.
    #[must_use]
    pub fn with_config(config: ScoringConfig) -> Self {
        Self {
            active: RwLock::new(Some(config)),
        }
    }
}

#[async_trait]
impl ScoringConfigStore for InMemoryScoringConfigStore {
    async fn get_active(&self) -> Result<Option<ScoringConfig>> {
        Ok(self
            .active
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .filter(|c| c.active))
    }

    async fn set_active(&self, config: ScoringConfig) -> Result<()> {
        *self.active.write().unwrap_or_else(|e| e.into_inner()) = Some(config);
        Ok(())
    }

    async fn update_weights(&self, weights: ScoringWeights) -> Result<ScoringConfig> {
        let mut active = self.active.write().unwrap_or_else(|e| e.into_inner());

        let mut config = match active.take() {
            Some(existing) if existing.active => existing,
            _ => ScoringConfig {
                id: ScoringConfigId::new(),
                name: "default".to_string(),
                ..ScoringConfig::builtin_default()
            },
        };
        config.weights = weights;
        config.updated_at = Utc::now();

        *active = Some(config.clone());
        Ok(config)
    }
}
