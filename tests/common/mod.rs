use async_trait::async_trait;
use bulkpay::application::restart::RestartCoordinator;
use bulkpay::domain::config::DispatchConfig;
use bulkpay::domain::outcome::TransferOutcome;
use bulkpay::domain::payment::{Amount, PaymentRow};
use bulkpay::domain::ports::{RestartAction, TransferClient};
use bulkpay::domain::session::{DatasetFingerprint, DispatchSession};
use chrono::Utc;
use rust_decimal_macros::dec;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;

pub fn rows(n: usize) -> Vec<PaymentRow> {
    (0..n)
        .map(|i| PaymentRow {
            original_index: i,
            recipient_id_type: "MSISDN".to_string(),
            recipient_id_value: format!("2291234{:04}", i),
            amount: Amount::new(dec!(25.0)).unwrap(),
            currency: "XOF".to_string(),
            payee_name: format!("Payee {}", i),
        })
        .collect()
}

pub fn session(name: &str) -> DispatchSession {
    DispatchSession::new(DatasetFingerprint::new(name, 1000), name)
}

pub fn outcome(index: usize, succeeded: bool) -> TransferOutcome {
    TransferOutcome {
        original_index: index,
        succeeded,
        http_status_code: if succeeded { 200 } else { 0 },
        status_text: if succeeded { "OK" } else { "NETWORK_ERROR" }.to_string(),
        transfer_id: succeeded.then(|| format!("tr-{}", index)),
        current_state: None,
        error_message: (!succeeded).then(|| "connection refused".to_string()),
        duration_millis: 3,
        completed_at: Utc::now(),
        attempt_id: Uuid::new_v4(),
    }
}

/// Stand-in for the downstream endpoint: configurable failures and latency,
/// plus a high-water mark of concurrent in-flight calls.
pub struct StubTransferClient {
    delay: Duration,
    fail_indices: HashSet<usize>,
    active: AtomicUsize,
    max_active: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
}

impl StubTransferClient {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            fail_indices: HashSet::new(),
            active: AtomicUsize::new(0),
            max_active: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(mut self, indices: impl IntoIterator<Item = usize>) -> Self {
        self.fail_indices = indices.into_iter().collect();
        self
    }

    /// Highest number of calls that were ever in flight at once.
    pub fn max_active(&self) -> Arc<AtomicUsize> {
        self.max_active.clone()
    }

    /// Total number of submit calls that reached the stub.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl TransferClient for StubTransferClient {
    async fn submit(&self, row: &PaymentRow, _config: &DispatchConfig) -> TransferOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);
        outcome(
            row.original_index,
            !self.fail_indices.contains(&row.original_index),
        )
    }
}

pub struct NoopRestartAction;

#[async_trait]
impl RestartAction for NoopRestartAction {
    async fn run(&self) -> bool {
        true
    }
}

pub fn coordinator() -> Arc<RestartCoordinator> {
    Arc::new(RestartCoordinator::new(Box::new(NoopRestartAction)))
}

/// A restart action that holds the restarting flag for a while, long enough
/// for a run to race against it.
pub struct SlowRestartAction {
    pub hold: Duration,
}

#[async_trait]
impl RestartAction for SlowRestartAction {
    async fn run(&self) -> bool {
        tokio::time::sleep(self.hold).await;
        true
    }
}
