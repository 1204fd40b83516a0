//! Strongly typed identifiers for register and telemetry entities.
//!
//! Every entity the engine touches is keyed by a UUID newtype so that an
//! asset id can never be handed to a lookup that expects a risk id.
//!
//! # Example
//!
//! ```
//! use riskwise_engine::ids::{AssetId, RiskId};
//!
//! let risk = RiskId::new();
//! let parsed: RiskId = risk.to_string().parse().unwrap();
//! assert_eq!(risk, parsed);
//!
//! fn requires_asset(id: AssetId) -> String {
//!     id.to_string()
//! }
//! // requires_asset(risk); // does not compile
//! ```

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Error returned when an identifier string is not a valid UUID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The identifier type that failed to parse.
    pub id_type: &'static str,
    /// The underlying UUID parse error message.
    pub message: String,
}

impl Display for ParseIdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to parse {}: {}", self.id_type, self.message)
    }
}

impl std::error::Error for ParseIdError {}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random ID using UUID v4.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            #[must_use]
            pub fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self).map_err(|e| ParseIdError {
                    id_type: stringify!($name),
                    message: e.to_string(),
                })
            }
        }
    };
}

define_id!(
    /// Identifier of a risk register entry.
    RiskId
);

define_id!(
    /// Identifier of an asset (host, device, application instance).
    AssetId
);

define_id!(
    /// Identifier of a business service.
    ServiceId
);

define_id!(
    /// Identifier of a vulnerability finding on an asset.
    VulnerabilityId
);

define_id!(
    /// Identifier of a security incident.
    IncidentId
);

define_id!(
    /// Identifier of a mitigating control.
    ControlId
);

define_id!(
    /// Identifier of a threat intelligence signal.
    ThreatSignalId
);

define_id!(
    /// Identifier of a time-bounded context factor.
    ContextFactorId
);

define_id!(
    /// Identifier of a scoring configuration.
    ScoringConfigId
);

define_id!(
    /// Identifier of a calculation history record.
    HistoryRecordId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_creates_distinct_ids() {
        assert_ne!(RiskId::new(), RiskId::new());
        assert_ne!(RiskId::default(), RiskId::default());
    }

    #[test]
    fn test_uuid_conversions() {
        let uuid = Uuid::new_v4();
        let id = AssetId::from(uuid);
        assert_eq!(id.into_inner(), uuid);
        let back: Uuid = id.into();
        assert_eq!(back, uuid);
        assert_eq!(AssetId::from_uuid(uuid), id);
    }

    #[test]
    fn test_display_returns_uuid_string() {
        let uuid = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        let id = RiskId::from_uuid(uuid);
        assert_eq!(id.to_string(), "550e8400-e29b-41d4-a716-446655440000");
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let uuid = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        let json = serde_json::to_string(&ControlId::from_uuid(uuid)).unwrap();
        assert_eq!(json, "\"550e8400-e29b-41d4-a716-446655440000\"");
    }

    #[test]
    fn test_parse_invalid_uuid_returns_error() {
        let err = "not-a-uuid".parse::<RiskId>().unwrap_err();
        assert_eq!(err.id_type, "RiskId");
        assert!(err.to_string().starts_with("Failed to parse RiskId"));
    }
}
