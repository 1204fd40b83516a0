//! Risk recalculation worker.
//!
//! Loads the register snapshot, then sweeps stale risks every poll interval
//! until Ctrl-C. The in-flight batch finishes before the process exits, and
//! the results are exported when `RISK_RESULTS_EXPORT` is set.

mod config;
mod export;
mod logging;
mod snapshot;

use tracing::{error, info};

use riskwise_engine::RiskScoringService;

use crate::config::WorkerConfig;
use crate::export::ResultsExport;
use crate::logging::{init_logging, DEFAULT_LOG_FILTER};
use crate::snapshot::RegisterSnapshot;

#[tokio::main]
async fn main() {
    // Load .env if present
    let _ = dotenvy::dotenv();

    init_logging(DEFAULT_LOG_FILTER);

    let config = WorkerConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        std::process::exit(1);
    });

    let snapshot = RegisterSnapshot::load(&config.snapshot_path).unwrap_or_else(|e| {
        eprintln!("Snapshot error: {e}");
        std::process::exit(1);
    });

    info!(
        path = %config.snapshot_path.display(),
        risks = snapshot.risks.len(),
        has_scoring_config = snapshot.scoring_config.is_some(),
        "Register snapshot loaded"
    );

    let stores = snapshot.into_stores();
    let service = RiskScoringService::new(stores.clone(), config.engine);
    let scheduler = service.scheduler();

    let worker = tokio::spawn({
        let scheduler = scheduler.clone();
        async move { scheduler.run().await }
    });

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    scheduler.shutdown();

    if let Err(e) = worker.await {
        error!(error = %e, "Scheduler task failed");
    }

    if let Some(path) = &config.export_path {
        let exported = ResultsExport::collect(&stores, chrono::Utc::now())
            .await
            .and_then(|export| export.write(path).map(|()| export.history.len()));
        match exported {
            Ok(records) => info!(path = %path.display(), records, "Results exported"),
            Err(e) => error!(path = %path.display(), error = %e, "Results export failed"),
        }
    }
    info!("Risk worker stopped");
}
