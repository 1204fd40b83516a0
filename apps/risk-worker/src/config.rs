//! Worker configuration.

use std::path::PathBuf;

use riskwise_engine::{ConfigError, EngineConfig};

/// Settings of the worker process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    pub engine: EngineConfig,
    /// JSON snapshot of the register and its telemetry.
    pub snapshot_path: PathBuf,
    /// Where scores and history are written on shutdown, if anywhere.
    pub export_path: Option<PathBuf>,
}

impl WorkerConfig {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `RISK_REGISTER_SNAPSHOT`: path to the register snapshot
    ///
    /// Optional:
    /// - `RISK_RESULTS_EXPORT`: path the scored register is written to on shutdown
    ///
    /// Engine settings are read by [`EngineConfig::from_env`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_reader(|key| std::env::var(key))
    }

    /// Load configuration from a custom variable reader.
    pub fn from_reader<F>(reader: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let snapshot_path = reader("RISK_REGISTER_SNAPSHOT")
            .map_err(|_| ConfigError::MissingVar("RISK_REGISTER_SNAPSHOT".into()))?;
        if snapshot_path.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "RISK_REGISTER_SNAPSHOT".into(),
                "must not be empty".into(),
            ));
        }

        let export_path = reader("RISK_RESULTS_EXPORT")
            .ok()
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            engine: EngineConfig::from_reader(&reader)?,
            snapshot_path: PathBuf::from(snapshot_path.trim()),
            export_path,
        })
    }
}
