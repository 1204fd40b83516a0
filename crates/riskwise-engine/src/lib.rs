//! Dynamic multi-factor risk scoring for GRC risk registers.
//!
//! Each register entry carries a qualitative probability × impact rating.
//! This crate turns that static rating into a continuously refreshed score
//! (0–100), level, trend and confidence by combining it with live security
//! telemetry.
//!
//! # Features
//!
//! - Asset, service, vulnerability, threat-intelligence, incident and
//!   control components, each with evaluated/skipped record counts
//! - Context multiplier from explicit factors and time/organization heuristics
//! - Weighted aggregation with a per-component breakdown
//! - Appetite-scaled level classification and history-based trend detection
//! - All-or-nothing persistence with an append-only calculation history
//! - Stale-risk batch recalculation on a bounded worker pool with a time budget
//!
//! # Services
//!
//! - [`RiskScoringService`] - manual, batch and weight-change recalculation
//! - [`CalculationOrchestrator`] - one risk through `PENDING → CALCULATING → COMPLETE | FAILED`
//! - [`BatchScheduler`] - polling loop over stale risks
//!
//! # Storage
//!
//! The [`store`] module defines the `async_trait` contracts the engine reads
//! from and writes to, with in-memory implementations for each.

pub mod aggregator;
pub mod calculators;
pub mod classifier;
pub mod config;
pub mod error;
pub mod ids;
pub mod orchestrator;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod trend;
pub mod types;

// Re-export commonly used types
pub use aggregator::{AggregatedScore, ComponentBreakdown, ComponentContribution, ComponentSet};
pub use config::{ConfigError, EngineConfig, ScoringConfig, ScoringThresholds, ScoringWeights};
pub use error::{EngineError, Result};
pub use ids::{
    AssetId, ContextFactorId, ControlId, HistoryRecordId, IncidentId, RiskId, ScoringConfigId,
    ServiceId, ThreatSignalId, VulnerabilityId,
};
pub use orchestrator::{CalculationOrchestrator, CalculationOutcome, EngineStores};
pub use scheduler::{BatchFailure, BatchScheduler, BatchSelection, BatchSummary};
pub use service::RiskScoringService;
pub use types::{
    Asset, AssetCriticality, AttackComplexity, CalculationHistoryRecord, CalculationState,
    ContextFactor, Control, ExposureLevel, Incident, IncidentSeverity, IncidentStatus, Risk,
    RiskAppetite, RiskLevel, RiskScoreState, RiskTrend, Service, ThreatIntelSignal,
    TriggerReason, Vulnerability,
};
