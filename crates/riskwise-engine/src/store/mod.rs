//! Storage contracts the engine reads from and writes to.
//!
//! Every contract is an `async_trait` so the engine can run against a
//! database, a remote API or the in-memory implementations shipped here,
//! which back the worker's snapshot mode and the test suite.

mod config_store;
mod context_store;
mod control_store;
mod history_store;
mod risk_store;
mod telemetry_store;

pub use config_store::{InMemoryScoringConfigStore, ScoringConfigStore};
pub use context_store::{ContextFactorStore, InMemoryContextFactorStore};
pub use control_store::{ControlStore, InMemoryControlStore};
pub use history_store::{CalculationHistoryStore, InMemoryCalculationHistoryStore};
pub use risk_store::{InMemoryRiskStore, RiskStore};
pub use telemetry_store::{InMemoryTelemetryStore, TelemetryStore};
