use crate::domain::payment::PaymentRow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status text recorded when a submission fails at the transport level.
pub const STATUS_NETWORK_ERROR: &str = "NETWORK_ERROR";
/// Status text recorded when a submission is rejected because a maintenance
/// restart of the downstream connector is in progress. Distinct from
/// [`STATUS_NETWORK_ERROR`] so operators can tell the two apart in the log.
pub const STATUS_SERVICE_RESTARTING: &str = "SERVICE_RESTARTING";

/// The result of one transfer attempt.
///
/// Created exactly once per attempt; retrying a failed row produces a new
/// outcome with a fresh `attempt_id` rather than mutating the old one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferOutcome {
    pub original_index: usize,
    pub succeeded: bool,
    /// HTTP status of the response, or 0 when no response was received.
    pub http_status_code: u16,
    pub status_text: String,
    pub transfer_id: Option<String>,
    pub current_state: Option<String>,
    pub error_message: Option<String>,
    pub duration_millis: u64,
    pub completed_at: DateTime<Utc>,
    /// Idempotency key sent to the downstream service for this attempt.
    pub attempt_id: Uuid,
}

impl TransferOutcome {
    /// Outcome for a submission rejected before any network call because the
    /// downstream connector is being restarted.
    pub fn rejected_restarting(row: &PaymentRow) -> Self {
        Self {
            original_index: row.original_index,
            succeeded: false,
            http_status_code: 0,
            status_text: STATUS_SERVICE_RESTARTING.to_string(),
            transfer_id: None,
            current_state: None,
            error_message: Some("connector restart in progress, submission rejected".to_string()),
            duration_millis: 0,
            completed_at: Utc::now(),
            attempt_id: Uuid::new_v4(),
        }
    }

    pub fn is_restart_rejection(&self) -> bool {
        self.status_text == STATUS_SERVICE_RESTARTING
    }
}
