use super::config::DispatchConfig;
use super::outcome::TransferOutcome;
use super::payment::PaymentRow;
use super::session::{DatasetFingerprint, DispatchSession};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Durable persistence of dispatch sessions, keyed by dataset fingerprint.
///
/// `save` overwrites the stored snapshot (last-write-wins, no merge); the
/// engine serializes its own saves, so no further locking contract exists.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, fingerprint: &DatasetFingerprint) -> Result<Option<DispatchSession>>;
    async fn save(&self, session: &DispatchSession) -> Result<()>;
    async fn delete(&self, fingerprint: &DatasetFingerprint) -> Result<()>;
}

pub type SharedSessionStore = Arc<dyn SessionStore>;

/// Submission of a single transfer to the downstream connector.
///
/// Infallible by signature: transport faults, timeouts, and non-2xx responses
/// are all mapped into a failed [`TransferOutcome`] so that one bad row can
/// never abort a batch.
#[async_trait]
pub trait TransferClient: Send + Sync {
    async fn submit(&self, row: &PaymentRow, config: &DispatchConfig) -> TransferOutcome;
}

/// The maintenance action performed when a restart is requested: restart the
/// downstream connector group and report whether it came back up.
#[async_trait]
pub trait RestartAction: Send + Sync {
    async fn run(&self) -> bool;
}
