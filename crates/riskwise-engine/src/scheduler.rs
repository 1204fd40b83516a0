//! Batch recalculation.
//!
//! The scheduler is pull-based: each sweep asks the register for risks whose
//! `next_calculation` has passed and recalculates them on a bounded pool.
//! Nothing is remembered between sweeps, so an interrupted or deferred batch
//! is simply picked up again by the next one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Notify, Semaphore};
use tokio::task::JoinSet;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use crate::error::Result;
use crate::ids::RiskId;
use crate::orchestrator::CalculationOrchestrator;
use crate::types::TriggerReason;

/// Which risks a batch recalculates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchSelection {
    /// Risks whose `next_calculation` is unset or has passed.
    Stale,
    /// Every risk in the register.
    All,
}

/// One risk that failed during a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFailure {
    /// `None` when the calculation task itself panicked.
    pub risk_id: Option<RiskId>,
    pub error: String,
}

/// Outcome of one batch sweep.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub selected: usize,
    pub completed: usize,
    pub failed: usize,
    /// Not started because the time budget ran out or shutdown was requested.
    pub deferred: usize,
    pub elapsed_ms: u64,
    pub failures: Vec<BatchFailure>,
}

/// Runs batches of calculations on a bounded worker pool.
pub struct BatchScheduler {
    orchestrator: Arc<CalculationOrchestrator>,
    shutdown: Arc<AtomicBool>,
    wake: Notify,
}

impl BatchScheduler {
    /// Create a new scheduler.
    pub fn new(orchestrator: Arc<CalculationOrchestrator>) -> Self {
        Self {
            orchestrator,
            shutdown: Arc::new(AtomicBool::new(false)),
            wake: Notify::new(),
        }
    }

    /// Run the polling loop until [`shutdown`](Self::shutdown) is called.
    ///
    /// An in-flight batch stops starting new risks once shutdown is requested
    /// and waits for the running ones before the loop exits.
    #[instrument(skip(self))]
    pub async fn run(&self) {
        let config = self.orchestrator.config();
        info!(
            concurrency = config.batch_concurrency,
            poll_interval_secs = config.poll_interval.as_secs(),
            time_budget_secs = config.batch_time_budget.as_secs(),
            "Starting risk scheduler"
        );

        let mut poll_interval = interval(config.poll_interval);
        poll_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = poll_interval.tick() => {}
                () = self.wake.notified() => {}
            }
            if self.is_shutdown() {
                info!("Scheduler shutdown requested, stopping poll loop");
                break;
            }

            if let Err(e) = self.run_once().await {
                error!(error = %e, "Failed to select risks for recalculation");
            }
        }

        info!("Scheduler stopped");
    }

    /// Request graceful shutdown.
    pub fn shutdown(&self) {
        info!("Shutdown requested");
        self.shutdown.store(true, Ordering::Relaxed);
        self.wake.notify_one();
    }

    /// Check if shutdown was requested.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Recalculate every stale risk now.
    pub async fn run_once(&self) -> Result<BatchSummary> {
        self.run_batch(BatchSelection::Stale, TriggerReason::Scheduled, Utc::now())
            .await
    }

    /// Recalculate the selected risks as of `now`.
    ///
    /// A failing risk is logged and counted; the rest of the batch continues.
    /// Only the selection query itself can fail the batch.
    #[instrument(skip(self), fields(selection = ?selection, trigger = %trigger))]
    pub async fn run_batch(
        &self,
        selection: BatchSelection,
        trigger: TriggerReason,
        now: DateTime<Utc>,
    ) -> Result<BatchSummary> {
        let config = self.orchestrator.config();
        let risks = &self.orchestrator.stores().risks;
        let ids = match selection {
            BatchSelection::Stale => risks.list_stale(now).await?,
            BatchSelection::All => risks.list_all().await?,
        };

        let started = Instant::now();
        // A budget past the clock's range means no deadline.
        let deadline = started.checked_add(config.batch_time_budget);
        let mut summary = BatchSummary {
            selected: ids.len(),
            ..BatchSummary::default()
        };
        if ids.is_empty() {
            debug!("No risks due for recalculation");
            return Ok(summary);
        }

        let semaphore = Arc::new(Semaphore::new(
            config.batch_concurrency.clamp(1, Semaphore::MAX_PERMITS),
        ));
        let mut join_set = JoinSet::new();

        for (index, risk_id) in ids.iter().copied().enumerate() {
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                summary.deferred = ids.len() - index;
                break;
            };
            // The first risk always starts so every sweep makes progress.
            if index > 0 && (deadline.is_some_and(|d| Instant::now() >= d) || self.is_shutdown()) {
                summary.deferred = ids.len() - index;
                warn!(
                    deferred = summary.deferred,
                    budget_secs = config.batch_time_budget.as_secs(),
                    shutdown = self.is_shutdown(),
                    "Batch stopped starting new risks"
                );
                break;
            }

            let orchestrator = Arc::clone(&self.orchestrator);
            join_set.spawn(async move {
                let _permit = permit;
                let result = orchestrator.calculate_at(risk_id, trigger, now).await;
                (risk_id, result)
            });
        }

        while let Some(join_result) = join_set.join_next().await {
            match join_result {
                Ok((_, Ok(_))) => summary.completed += 1,
                Ok((risk_id, Err(e))) => {
                    warn!(risk_id = %risk_id, error = %e, "Risk failed in batch, continuing");
                    summary.failed += 1;
                    summary.failures.push(BatchFailure {
                        risk_id: Some(risk_id),
                        error: e.to_string(),
                    });
                }
                Err(e) => {
                    error!(error = %e, "Calculation task panicked");
                    summary.failed += 1;
                    summary.failures.push(BatchFailure {
                        risk_id: None,
                        error: format!("Internal error: {e}"),
                    });
                }
            }
        }

        summary.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            selected = summary.selected,
            completed = summary.completed,
            failed = summary.failed,
            deferred = summary.deferred,
            elapsed_ms = summary.elapsed_ms,
            "Batch recalculation finished"
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::orchestrator::EngineStores;
    use crate::store::{
        InMemoryCalculationHistoryStore, InMemoryContextFactorStore, InMemoryControlStore,
        InMemoryRiskStore, InMemoryScoringConfigStore, InMemoryTelemetryStore,
    };
    use crate::types::Risk;
    use chrono::Duration;

    fn scheduler(risks: Arc<InMemoryRiskStore>, config: EngineConfig) -> BatchScheduler {
        let stores = EngineStores {
            risks,
            telemetry: Arc::new(InMemoryTelemetryStore::new()),
            controls: Arc::new(InMemoryControlStore::new()),
            context: Arc::new(InMemoryContextFactorStore::new()),
            config: Arc::new(InMemoryScoringConfigStore::new()),
            history: Arc::new(InMemoryCalculationHistoryStore::new()),
        };
        BatchScheduler::new(Arc::new(CalculationOrchestrator::new(stores, config)))
    }

    #[tokio::test]
    async fn test_empty_register() {
        let sched = scheduler(Arc::new(InMemoryRiskStore::new()), EngineConfig::default());
        let summary = sched.run_once().await.unwrap();
        assert_eq!(summary, BatchSummary::default());
    }

    #[tokio::test]
    async fn test_only_stale_risks_selected() {
        let risks = Arc::new(InMemoryRiskStore::new());
        let now = Utc::now();
        let mut fresh = Risk::new("fresh", 2, 2);
        fresh.next_calculation = Some(now + Duration::minutes(30));
        risks.insert(fresh);
        risks.insert(Risk::new("never scored", 2, 2));

        let sched = scheduler(risks.clone(), EngineConfig::default());
        let summary = sched
            .run_batch(BatchSelection::Stale, TriggerReason::Scheduled, now)
            .await
            .unwrap();
        assert_eq!(summary.selected, 1);
        assert_eq!(summary.completed, 1);

        // Second sweep finds nothing: the scored risk was rescheduled.
        let summary = sched
            .run_batch(BatchSelection::Stale, TriggerReason::Scheduled, now)
            .await
            .unwrap();
        assert_eq!(summary.selected, 0);

        let summary = sched
            .run_batch(BatchSelection::All, TriggerReason::ConfigChange, now)
            .await
            .unwrap();
        assert_eq!(summary.selected, 2);
        assert_eq!(summary.completed, 2);
    }

    #[tokio::test]
    async fn test_shutdown_defers_remaining() {
        let risks = Arc::new(InMemoryRiskStore::new());
        for i in 0..3 {
            risks.insert(Risk::new(format!("risk {i}"), 3, 3));
        }
        let config = EngineConfig {
            batch_concurrency: 1,
            ..EngineConfig::default()
        };
        let sched = scheduler(risks, config);
        sched.shutdown();
        assert!(sched.is_shutdown());

        let summary = sched.run_once().await.unwrap();
        assert_eq!(summary.selected, 3);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.deferred, 2);
    }

    #[tokio::test]
    async fn test_unbounded_budget_and_pool_run_every_risk() {
        let risks = Arc::new(InMemoryRiskStore::new());
        for i in 0..5 {
            risks.insert(Risk::new(format!("risk {i}"), 2, 4));
        }
        let config = EngineConfig {
            batch_concurrency: usize::MAX,
            batch_time_budget: std::time::Duration::MAX,
            ..EngineConfig::default()
        };
        let summary = scheduler(risks, config).run_once().await.unwrap();
        assert_eq!(summary.completed, 5);
        assert_eq!(summary.deferred, 0);
        assert!(summary.failures.is_empty());
    }

    #[tokio::test]
    async fn test_run_loop_stops_on_shutdown() {
        let sched = Arc::new(scheduler(
            Arc::new(InMemoryRiskStore::new()),
            EngineConfig::default(),
        ));
        let handle = tokio::spawn({
            let sched = Arc::clone(&sched);
            async move { sched.run().await }
        });
        sched.shutdown();
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
