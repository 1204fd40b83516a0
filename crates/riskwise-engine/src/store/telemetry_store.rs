//! Telemetry storage trait and in-memory implementation.
//!
//! Covers the records the component calculators read: linked assets and
//! services, vulnerabilities and incidents per asset, and threat signals.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::Result;
use crate::ids::{AssetId, RiskId};
use crate::types::{Asset, Incident, Service, ThreatIntelSignal, Vulnerability};

/// Trait for reading security telemetry.
#[async_trait]
pub trait TelemetryStore: Send + Sync {
    /// Assets linked to a risk.
    async fn assets_for_risk(&self, risk_id: RiskId) -> Result<Vec<Asset>>;

    /// Business services linked to a risk.
    async fn services_for_risk(&self, risk_id: RiskId) -> Result<Vec<Service>>;

    /// Vulnerability findings on an asset.
    async fn vulnerabilities_for_asset(&self, asset_id: AssetId) -> Result<Vec<Vulnerability>>;

    /// Incidents recorded against an asset.
    async fn incidents_for_asset(&self, asset_id: AssetId) -> Result<Vec<Incident>>;

    /// Threat signals linked to a risk.
    async fn threat_intel_for_risk(&self, risk_id: RiskId) -> Result<Vec<ThreatIntelSignal>>;

    /// Incidents anywhere in the organization created at or after `since`.
    async fn incidents_since(&self, since: DateTime<Utc>) -> Result<Vec<Incident>>;

    /// Threat signals anywhere in the organization observed at or after `since`.
    async fn threat_signals_since(&self, since: DateTime<Utc>) -> Result<Vec<ThreatIntelSignal>>;
}

#[derive(Debug, Default)]
struct Telemetry {
    risk_assets: HashMap<RiskId, Vec<Asset>>,
    risk_services: HashMap<RiskId, Vec<Service>>,
    risk_threats: HashMap<RiskId, Vec<ThreatIntelSignal>>,
    vulnerabilities: HashMap<AssetId, Vec<Vulnerability>>,
    incidents: HashMap<AssetId, Vec<Incident>>,
    // Organization-wide feed, including signals not linked to any risk
    threats: Vec<ThreatIntelSignal>,
}

/// In-memory implementation of `TelemetryStore`.
#[derive(Debug, Default)]
pub struct InMemoryTelemetryStore {
    inner: RwLock<Telemetry>,
}

impl InMemoryTelemetryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Link an asset to a risk.
    pub fn link_asset(&self, risk_id: RiskId, asset: Asset) {
        self.inner
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .risk_assets
            .entry(risk_id)
            .or_default()
            .push(asset);
    }

    /// Link a service to a risk.
    pub fn link_service(&self, risk_id: RiskId, service: Service) {
        self.inner
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .risk_services
            .entry(risk_id)
            .or_default()
            .push(service);
    }

    /// Link a threat signal to a risk. The signal also joins the organization feed.
    pub fn link_threat(&self, risk_id: RiskId, signal: ThreatIntelSignal) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if !inner.threats.iter().any(|t| t.id == signal.id) {
            inner.threats.push(signal.clone());
        }
        inner.risk_threats.entry(risk_id).or_default().push(signal);
    }

    /// Add a signal to the organization feed without linking it to a risk.
    pub fn add_threat_signal(&self, signal: ThreatIntelSignal) {
        self.inner
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .threats
            .push(signal);
    }

    /// Record a vulnerability; it is keyed by its own `asset_id`.
    pub fn add_vulnerability(&self, vulnerability: Vulnerability) {
        self.inner
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .vulnerabilities
            .entry(vulnerability.asset_id)
            .or_default()
            .push(vulnerability);
    }

    /// Record an incident; it is keyed by its own `asset_id`.
    pub fn add_incident(&self, incident: Incident) {
        self.inner
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .incidents
            .entry(incident.asset_id)
            .or_default()
            .push(incident);
    }
}

#[async_trait]
impl TelemetryStore for InMemoryTelemetryStore {
    async fn assets_for_risk(&self, risk_id: RiskId) -> Result<Vec<Asset>> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Ok(inner.risk_assets.get(&risk_id).cloned().unwrap_or_default())
    }

    async fn services_for_risk(&self, risk_id: RiskId) -> Result<Vec<Service>> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Ok(inner.risk_services.get(&risk_id).cloned().unwrap_or_default())
    }

    async fn vulnerabilities_for_asset(&self, asset_id: AssetId) -> Result<Vec<Vulnerability>> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Ok(inner.vulnerabilities.get(&asset_id).cloned().unwrap_or_default())
    }

    async fn incidents_for_asset(&self, asset_id: AssetId) -> Result<Vec<Incident>> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Ok(inner.incidents.get(&asset_id).cloned().unwrap_or_default())
    }

    async fn threat_intel_for_risk(&self, risk_id: RiskId) -> Result<Vec<ThreatIntelSignal>> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Ok(inner.risk_threats.get(&risk_id).cloned().unwrap_or_default())
    }

    async fn incidents_since(&self, since: DateTime<Utc>) -> Result<Vec<Incident>> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Ok(inner
            .incidents
            .values()
            .flatten()
            .filter(|i| i.created_date >= since)
            .cloned()
            .collect())
    }

    async fn threat_signals_since(&self, since: DateTime<Utc>) -> Result<Vec<ThreatIntelSignal>> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Ok(inner
            .threats
            .iter()
            .filter(|t| t.observed_at >= since)
            .cloned()
            .collect())
    }
}
