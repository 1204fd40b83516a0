//! Common test utilities for riskwise-engine integration tests.
//!
//! All tests run against the in-memory stores. Wrappers in this module
//! inject failures and latency into individual store operations.

#![allow(dead_code)]

pub mod fixtures;

use std::sync::{Arc, Once};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use riskwise_engine::store::{
    CalculationHistoryStore, InMemoryCalculationHistoryStore, InMemoryContextFactorStore,
    InMemoryControlStore, InMemoryRiskStore, InMemoryScoringConfigStore, InMemoryTelemetryStore,
    TelemetryStore,
};
use riskwise_engine::{
    Asset, AssetId, CalculationHistoryRecord, EngineConfig, EngineError, EngineStores, Incident,
    Result, RiskId, RiskScoringService, Service, ThreatIntelSignal, Vulnerability,
};

static INIT: Once = Once::new();

/// Initialize logging for tests (once).
pub fn init_test_logging() {
    INIT.call_once(|| {
        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::fmt()
                .with_test_writer()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .try_init()
                .ok();
        }
    });
}

/// Sunday 2024-07-14 03:00 UTC: no time-based context heuristic applies.
pub fn quiet_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, 14, 3, 0, 0).unwrap()
}

/// Stores all the in-memory stores for test isolation.
#[derive(Clone)]
pub struct TestStores {
    pub risks: Arc<InMemoryRiskStore>,
    pub telemetry: Arc<InMemoryTelemetryStore>,
    pub controls: Arc<InMemoryControlStore>,
    pub context: Arc<InMemoryContextFactorStore>,
    pub config: Arc<InMemoryScoringConfigStore>,
    pub history: Arc<InMemoryCalculationHistoryStore>,
}

impl TestStores {
    /// Create a new set of isolated test stores.
    pub fn new() -> Self {
        Self {
            risks: Arc::new(InMemoryRiskStore::new()),
            telemetry: Arc::new(InMemoryTelemetryStore::new()),
            controls: Arc::new(InMemoryControlStore::new()),
            context: Arc::new(InMemoryContextFactorStore::new()),
            config: Arc::new(InMemoryScoringConfigStore::new()),
            history: Arc::new(InMemoryCalculationHistoryStore::new()),
        }
    }

    /// The engine's view of these stores.
    pub fn engine_stores(&self) -> EngineStores {
        EngineStores {
            risks: self.risks.clone(),
            telemetry: self.telemetry.clone(),
            controls: self.controls.clone(),
            context: self.context.clone(),
            config: self.config.clone(),
            history: self.history.clone(),
        }
    }
}

impl Default for TestStores {
    fn default() -> Self {
        Self::new()
    }
}

/// Service plus the stores behind it.
pub struct TestContext {
    pub stores: TestStores,
    pub service: RiskScoringService,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self::from_stores(TestStores::new(), |s| s, config)
    }

    /// Build a context whose engine view is adjusted by `customize`, e.g. to
    /// swap one store for a failing wrapper.
    pub fn from_stores<F>(stores: TestStores, customize: F, config: EngineConfig) -> Self
    where
        F: FnOnce(EngineStores) -> EngineStores,
    {
        init_test_logging();
        let service = RiskScoringService::new(customize(stores.engine_stores()), config);
        Self { stores, service }
    }
}

// ============================================================================
// Store wrappers
// ============================================================================

/// History store whose appends always fail.
#[derive(Debug, Default)]
pub struct FailingHistoryStore;

#[async_trait]
impl CalculationHistoryStore for FailingHistoryStore {
    async fn append(&self, _record: CalculationHistoryRecord) -> Result<()> {
        Err(EngineError::persistence("append_history", "disk full"))
    }

    async fn recent(&self, _risk_id: RiskId, _limit: usize) -> Result<Vec<CalculationHistoryRecord>> {
        Ok(Vec::new())
    }
}

/// Telemetry store with an unreachable threat feed and optional latency.
pub struct FlakyTelemetryStore {
    pub inner: Arc<InMemoryTelemetryStore>,
    pub threat_feed_down: bool,
    pub latency: Option<StdDuration>,
}

impl FlakyTelemetryStore {
    pub fn threat_feed_down(inner: Arc<InMemoryTelemetryStore>) -> Self {
        Self {
            inner,
            threat_feed_down: true,
            latency: None,
        }
    }

    pub fn slow(inner: Arc<InMemoryTelemetryStore>, latency: StdDuration) -> Self {
        Self {
            inner,
            threat_feed_down: false,
            latency: Some(latency),
        }
    }
}

#[async_trait]
impl TelemetryStore for FlakyTelemetryStore {
    async fn assets_for_risk(&self, risk_id: RiskId) -> Result<Vec<Asset>> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.inner.assets_for_risk(risk_id).await
    }

    async fn services_for_risk(&self, risk_id: RiskId) -> Result<Vec<Service>> {
        self.inner.services_for_risk(risk_id).await
    }

    async fn vulnerabilities_for_asset(&self, asset_id: AssetId) -> Result<Vec<Vulnerability>> {
        self.inner.vulnerabilities_for_asset(asset_id).await
    }

    async fn incidents_for_asset(&self, asset_id: AssetId) -> Result<Vec<Incident>> {
        self.inner.incidents_for_asset(asset_id).await
    }

    async fn threat_intel_for_risk(&self, risk_id: RiskId) -> Result<Vec<ThreatIntelSignal>> {
        if self.threat_feed_down {
            return Err(EngineError::persistence("threat_intel_for_risk", "connection refused"));
        }
        self.inner.threat_intel_for_risk(risk_id).await
    }

    async fn incidents_since(&self, since: DateTime<Utc>) -> Result<Vec<Incident>> {
        self.inner.incidents_since(since).await
    }

    async fn threat_signals_since(&self, since: DateTime<Utc>) -> Result<Vec<ThreatIntelSignal>> {
        self.inner.threat_signals_since(since).await
    }
}
