//! Results export.
//!
//! The worker scores into in-memory stores, so on shutdown it writes the
//! register's score state and the full audit trail to a JSON file.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use riskwise_engine::store::{CalculationHistoryStore, RiskStore};
use riskwise_engine::{CalculationHistoryRecord, EngineError, EngineStores, Risk};

/// Errors raised while exporting results.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write export {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read results from the engine: {0}")]
    Engine(#[from] EngineError),

    #[error("Failed to encode export: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Scored register plus its audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsExport {
    pub exported_at: DateTime<Utc>,
    pub risks: Vec<Risk>,
    /// Newest first within each risk.
    pub history: Vec<CalculationHistoryRecord>,
}

impl ResultsExport {
    /// Read every risk and its history from the stores.
    pub async fn collect(stores: &EngineStores, now: DateTime<Utc>) -> Result<Self, ExportError> {
        let mut risks = Vec::new();
        let mut history = Vec::new();

        for id in stores.risks.list_all().await? {
            // Skip risks removed since listing.
            let Some(risk) = stores.risks.get_risk(id).await? else {
                continue;
            };
            history.extend(stores.history.recent(id, usize::MAX).await?);
            risks.push(risk);
        }

        Ok(Self {
            exported_at: now,
            risks,
            history,
        })
    }

    /// Write the export to `path`, replacing any previous file.
    ///
    /// The JSON goes to a sibling temporary file first and is renamed into
    /// place, so readers never see a partial export.
    pub fn write(&self, path: &Path) -> Result<(), ExportError> {
        let json = serde_json::to_string_pretty(self)?;
        let io_error = |source: std::io::Error| ExportError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        let staging = path.with_extension("json.partial");
        std::fs::write(&staging, json).map_err(io_error)?;
        std::fs::rename(&staging, path).map_err(io_error)?;
        Ok(())
    }
}
