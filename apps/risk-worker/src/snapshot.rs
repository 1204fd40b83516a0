//! Register snapshot loading.
//!
//! The worker can run against a JSON export of the register and its
//! telemetry, loaded into the engine's in-memory stores.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use riskwise_engine::store::{
    InMemoryCalculationHistoryStore, InMemoryContextFactorStore, InMemoryControlStore,
    InMemoryRiskStore, InMemoryScoringConfigStore, InMemoryTelemetryStore,
};
use riskwise_engine::{
    Asset, ContextFactor, Control, EngineStores, Incident, Risk, RiskId, ScoringConfig, Service,
    ThreatIntelSignal, Vulnerability,
};

/// Errors raised while loading a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Failed to read snapshot {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid snapshot: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A record linked to a risk.
#[derive(Debug, Clone, Deserialize)]
pub struct Linked<T> {
    pub risk_id: RiskId,
    pub record: T,
}

/// JSON export of the register and everything the engine reads.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterSnapshot {
    #[serde(default)]
    pub scoring_config: Option<ScoringConfig>,
    pub risks: Vec<Risk>,
    #[serde(default)]
    pub assets: Vec<Linked<Asset>>,
    #[serde(default)]
    pub services: Vec<Linked<Service>>,
    #[serde(default)]
    pub threat_signals: Vec<Linked<ThreatIntelSignal>>,
    #[serde(default)]
    pub controls: Vec<Linked<Control>>,
    #[serde(default)]
    pub vulnerabilities: Vec<Vulnerability>,
    #[serde(default)]
    pub incidents: Vec<Incident>,
    #[serde(default)]
    pub context_factors: Vec<ContextFactor>,
    /// Threat signals not linked to any risk; they still feed the context heuristics.
    #[serde(default)]
    pub organization_threats: Vec<ThreatIntelSignal>,
}

impl RegisterSnapshot {
    /// Read and parse a snapshot file.
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Parse a snapshot from a JSON string.
    pub fn from_json(raw: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Load the snapshot into fresh in-memory stores.
    pub fn into_stores(self) -> EngineStores {
        let risks = InMemoryRiskStore::new();
        for risk in self.risks {
            risks.insert(risk);
        }

        let telemetry = InMemoryTelemetryStore::new();
        for linked in self.assets {
            telemetry.link_asset(linked.risk_id, linked.record);
        }
        for linked in self.services {
            telemetry.link_service(linked.risk_id, linked.record);
        }
        for linked in self.threat_signals {
            telemetry.link_threat(linked.risk_id, linked.record);
        }
        for signal in self.organization_threats {
            telemetry.add_threat_signal(signal);
        }
        for vulnerability in self.vulnerabilities {
            telemetry.add_vulnerability(vulnerability);
        }
        for incident in self.incidents {
            telemetry.add_incident(incident);
        }

        let controls = InMemoryControlStore::new();
        for linked in self.controls {
            controls.link(linked.risk_id, linked.record);
        }

        let context = InMemoryContextFactorStore::new();
        for factor in self.context_factors {
            context.add(factor);
        }

        let config = match self.scoring_config {
            Some(config) => InMemoryScoringConfigStore::with_config(config),
            None => InMemoryScoringConfigStore::new(),
        };

        EngineStores {
            risks: Arc::new(risks),
            telemetry: Arc::new(telemetry),
            controls: Arc::new(controls),
            context: Arc::new(context),
            config: Arc::new(config),
            history: Arc::new(InMemoryCalculationHistoryStore::new()),
        }
    }
}
