//! Error types for the risk scoring engine.

use thiserror::Error;

use crate::ids::RiskId;

/// Errors that can occur while calculating or persisting risk scores.
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    /// No usable active scoring configuration. Calculations fall back to the
    /// built-in defaults; this variant is only surfaced for logging.
    #[error("Scoring configuration unavailable: {reason}")]
    Configuration { reason: String },

    /// A scoring configuration value failed validation.
    #[error("Invalid scoring configuration field {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    // Data errors (component-scoped, calculation continues)
    /// A signal source for one component is empty or unreachable.
    #[error("Data unavailable for component {component}: {cause}")]
    DataUnavailable {
        component: &'static str,
        cause: String,
    },

    // Entity errors (surfaced to the caller)
    /// The requested risk does not exist.
    #[error("Risk not found: {risk_id}")]
    InvalidEntity { risk_id: RiskId },

    /// The risk exists but its register fields cannot be scored.
    #[error("Risk {risk_id} cannot be scored: {reason}")]
    InvalidRisk { risk_id: RiskId, reason: String },

    // Persistence errors (calculation fails, nothing written)
    /// A write or read against the storage layer failed.
    #[error("Persistence failure during {operation}: {cause}")]
    Persistence {
        operation: &'static str,
        cause: String,
    },

    /// The component breakdown could not be serialized for the audit trail.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// Build a persistence error for a storage operation.
    pub fn persistence(operation: &'static str, cause: impl ToString) -> Self {
        Self::Persistence {
            operation,
            cause: cause.to_string(),
        }
    }

    /// Build a data-unavailable error for a component fetch.
    pub fn data_unavailable(component: &'static str, cause: impl ToString) -> Self {
        Self::DataUnavailable {
            component,
            cause: cause.to_string(),
        }
    }

    /// Build a configuration validation error.
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if a retry on the next scheduled run may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Persistence { .. } | Self::DataUnavailable { .. }
        )
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let risk_id = RiskId::new();
        let err = EngineError::InvalidEntity { risk_id };
        assert_eq!(err.to_string(), format!("Risk not found: {risk_id}"));

        let err = EngineError::persistence("append_history", "disk full");
        assert_eq!(
            err.to_string(),
            "Persistence failure during append_history: disk full"
        );
    }

    #[test]
    fn test_is_transient() {
        assert!(EngineError::persistence("update_risk", "timeout").is_transient());
        assert!(EngineError::data_unavailable("vulnerability", "offline").is_transient());
        assert!(!EngineError::InvalidEntity {
            risk_id: RiskId::new()
        }
        .is_transient());
        assert!(!EngineError::invalid_config("weights.vulnerability", "NaN").is_transient());
    }
}
