use super::progress::ProgressAggregator;
use super::queue::WorkQueue;
use super::restart::RestartCoordinator;
use crate::domain::config::{DispatchConfig, RestartBasis};
use crate::domain::outcome::TransferOutcome;
use crate::domain::payment::PaymentRow;
use crate::domain::ports::{SessionStore as _, SharedSessionStore, TransferClient};
use crate::domain::session::DispatchSession;
use crate::error::{DispatchError, Result};
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc::UnboundedSender, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Cadence of periodic session snapshots while a run is active.
pub const SAVE_INTERVAL: Duration = Duration::from_secs(5);

/// Signals emitted by a run toward its caller.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// A batch of completed outcomes, in completion order.
    Progress(Vec<TransferOutcome>),
    /// The processed-count threshold was crossed; the caller is expected to
    /// trigger the maintenance restart.
    RestartNeeded,
    /// The run finished: queue drained or stop honored, no active workers.
    Complete(RunSummary),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Rows processed by this run (not the session lifetime total).
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Rows still queued when the run ended; non-zero only after a drain.
    pub remaining: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running,
    /// Stop requested: no new pops, in-flight submissions finish naturally.
    Draining,
}

/// The bounded-concurrency scheduler.
///
/// A run is driven by a single scheduler task that owns the queue, the live
/// session, and the worker pool; workers only compute a [`TransferOutcome`]
/// and hand it back, so all bookkeeping has one writer.
pub struct DispatchEngine {
    client: Arc<dyn TransferClient>,
    store: SharedSessionStore,
    restart: Arc<RestartCoordinator>,
    config: DispatchConfig,
}

impl DispatchEngine {
    /// Validates the configuration up front; a bad worker count fails here,
    /// not mid-run.
    pub fn new(
        client: Arc<dyn TransferClient>,
        store: SharedSessionStore,
        restart: Arc<RestartCoordinator>,
        config: DispatchConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            client,
            store,
            restart,
            config,
        })
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Starts a run over `rows` and returns immediately.
    ///
    /// Completion is an explicit future (`RunHandle::join`), not a polled
    /// flag; progress and restart signals arrive on `events`.
    pub fn start(
        &self,
        rows: Vec<PaymentRow>,
        session: DispatchSession,
        events: UnboundedSender<EngineEvent>,
    ) -> RunHandle {
        let mut queue = WorkQueue::new();
        queue.enqueue_all(rows);
        // Planning already excluded processed rows; re-filtering here keeps a
        // stale caller from double-paying.
        queue.retain(|r| !session.processed_indices.contains(&r.original_index));

        info!(
            rows = queue.len(),
            workers = self.config.max_concurrent_workers,
            "dispatch run starting"
        );

        let cancel = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(EngineState::Running);
        let scheduler = Scheduler {
            client: self.client.clone(),
            store: self.store.clone(),
            restart: self.restart.clone(),
            config: self.config.clone(),
            queue,
            session,
            events,
            cancel: cancel.clone(),
            state: state_tx,
        };
        let join = tokio::spawn(scheduler.run());

        RunHandle {
            cancel,
            state: state_rx,
            join,
        }
    }
}

/// Control surface for one in-flight run.
pub struct RunHandle {
    cancel: CancellationToken,
    state: watch::Receiver<EngineState>,
    join: JoinHandle<Result<RunSummary>>,
}

impl RunHandle {
    /// Requests a drain: in-flight submissions finish, queued rows stay
    /// unprocessed and resumable.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn state(&self) -> EngineState {
        *self.state.borrow()
    }

    /// Waits for the run to reach `Idle` and returns its summary.
    pub async fn join(self) -> Result<RunSummary> {
        self.join
            .await
            .map_err(|e| DispatchError::Internal(Box::new(e)))?
    }
}

struct Scheduler {
    client: Arc<dyn TransferClient>,
    store: SharedSessionStore,
    restart: Arc<RestartCoordinator>,
    config: DispatchConfig,
    queue: WorkQueue,
    session: DispatchSession,
    events: UnboundedSender<EngineEvent>,
    cancel: CancellationToken,
    state: watch::Sender<EngineState>,
}

impl Scheduler {
    async fn run(mut self) -> Result<RunSummary> {
        let started = Instant::now();
        let mut aggregator = ProgressAggregator::new(self.events.clone());
        let mut workers: JoinSet<TransferOutcome> = JoinSet::new();
        let mut processed = 0usize;
        let mut succeeded = 0usize;
        let mut failed = 0usize;
        let mut draining = false;

        let mut save_tick =
            tokio::time::interval_at(tokio::time::Instant::now() + SAVE_INTERVAL, SAVE_INTERVAL);
        save_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            // Fill worker slots up to the concurrency bound.
            while !draining && workers.len() < self.config.max_concurrent_workers {
                if self.cancel.is_cancelled() {
                    draining = true;
                    self.enter_drain();
                    break;
                }
                let Some(row) = self.queue.take_next() else {
                    break;
                };
                let client = self.client.clone();
                let restart = self.restart.clone();
                let config = self.config.clone();
                workers.spawn(async move {
                    if restart.is_restarting() {
                        return TransferOutcome::rejected_restarting(&row);
                    }
                    client.submit(&row, &config).await
                });

                // Throttle between successive pops, not between completions.
                if !self.config.inter_dispatch_delay.is_zero() && !self.queue.is_empty() {
                    tokio::time::sleep(self.config.inter_dispatch_delay).await;
                }
            }

            if workers.is_empty() && (self.queue.is_empty() || draining) {
                break;
            }

            tokio::select! {
                Some(joined) = workers.join_next() => {
                    let outcome = joined.map_err(|e| DispatchError::Internal(Box::new(e)))?;
                    processed += 1;
                    if outcome.succeeded {
                        succeeded += 1;
                    } else {
                        failed += 1;
                    }
                    self.session.record(outcome.clone());
                    aggregator.record(outcome);
                    aggregator.flush(false);
                    self.check_restart_threshold(processed);
                }
                _ = save_tick.tick() => {
                    self.snapshot().await;
                }
                _ = self.cancel.cancelled(), if !draining => {
                    draining = true;
                    self.enter_drain();
                }
            }
        }

        aggregator.flush(true);
        self.final_save().await;
        let _ = self.state.send(EngineState::Idle);

        let summary = RunSummary {
            processed,
            succeeded,
            failed,
            remaining: self.queue.len(),
            elapsed: started.elapsed(),
        };
        info!(
            processed = summary.processed,
            succeeded = summary.succeeded,
            failed = summary.failed,
            remaining = summary.remaining,
            "dispatch run finished"
        );
        let _ = self.events.send(EngineEvent::Complete(summary.clone()));
        Ok(summary)
    }

    fn enter_drain(&self) {
        info!("stop requested, draining in-flight submissions");
        let _ = self.state.send(EngineState::Draining);
    }

    /// Fires exactly one restart-needed signal per threshold crossing.
    fn check_restart_threshold(&self, processed_this_run: usize) {
        let every = self.config.restart_every_n_processed;
        if every == 0 {
            return;
        }
        let basis = match self.config.restart_basis {
            RestartBasis::PerRun => processed_this_run,
            RestartBasis::PerSession => self.session.processed(),
        };
        if basis > 0 && basis % every as usize == 0 {
            debug!(processed = basis, "restart threshold crossed");
            let _ = self.events.send(EngineEvent::RestartNeeded);
        }
    }

    async fn snapshot(&mut self) {
        self.session.last_saved_at = Utc::now();
        debug_assert!(self.session.is_consistent());
        if let Err(e) = self.store.save(&self.session).await {
            warn!(error = %e, "periodic session save failed");
        } else {
            debug!(processed = self.session.processed(), "session snapshot saved");
        }
    }

    /// The stop-time save is what resumability hinges on; retry it once and
    /// surface a loud error if it still fails.
    async fn final_save(&mut self) {
        self.session.last_saved_at = Utc::now();
        debug_assert!(self.session.is_consistent());
        if let Err(first) = self.store.save(&self.session).await {
            warn!(error = %first, "final session save failed, retrying");
            if let Err(second) = self.store.save(&self.session).await {
                error!(
                    error = %second,
                    fingerprint = %self.session.fingerprint,
                    "final session save failed twice, this run may not be resumable"
                );
            }
        }
    }
}
