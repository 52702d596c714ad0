use crate::domain::config::DispatchConfig;
use crate::domain::outcome::{STATUS_NETWORK_ERROR, TransferOutcome};
use crate::domain::payment::{PayerIdentity, PaymentRow};
use crate::domain::ports::{RestartAction, TransferClient};
use crate::error::{DispatchError, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use uuid::Uuid;

/// Transfer submission client for the downstream payment connector.
///
/// Every fault — connection refused, DNS failure, timeout, non-2xx status —
/// is mapped into a failed [`TransferOutcome`]; `submit` never returns an
/// error, so the engine can treat each call as producing a result.
pub struct HttpTransferClient {
    http: reqwest::Client,
}

impl HttpTransferClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DispatchError::Internal(Box::new(e)))?;
        Ok(Self { http })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TransferRequest<'a> {
    from: Payer<'a>,
    to: Payee<'a>,
    amount_type: &'static str,
    currency: &'a str,
    amount: String,
    transaction_type: &'static str,
    note: String,
    home_transaction_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Payer<'a> {
    display_name: &'a str,
    id_type: &'a str,
    id_value: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Payee<'a> {
    id_type: &'a str,
    id_value: &'a str,
}

impl<'a> TransferRequest<'a> {
    fn build(row: &'a PaymentRow, payer: &'a PayerIdentity, attempt_id: Uuid) -> Self {
        Self {
            from: Payer {
                display_name: &payer.display_name,
                id_type: &payer.id_type,
                id_value: &payer.id_value,
            },
            to: Payee {
                id_type: &row.recipient_id_type,
                id_value: &row.recipient_id_value,
            },
            amount_type: "SEND",
            currency: &row.currency,
            amount: row.amount.to_string(),
            transaction_type: "TRANSFER",
            note: format!("Bulk payment - {}", row.payee_name),
            home_transaction_id: attempt_id.to_string(),
        }
    }
}

/// Response body of the transfer endpoint. Every field is diagnostic and
/// optional; state and last-error may appear top-level or nested under
/// `transferState` depending on the connector's mood.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct TransferResponse {
    transfer_id: Option<String>,
    current_state: Option<String>,
    message: Option<String>,
    last_error: Option<LastError>,
    transfer_state: Option<TransferState>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct TransferState {
    current_state: Option<String>,
    last_error: Option<LastError>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct LastError {
    http_status_code: Option<u16>,
}

struct Diagnostics {
    transfer_id: Option<String>,
    current_state: Option<String>,
    message: Option<String>,
    last_error_code: Option<u16>,
}

impl TransferResponse {
    /// Flattens the two possible response shapes; first non-empty wins.
    fn into_diagnostics(self) -> Diagnostics {
        let (nested_state, nested_error) = match self.transfer_state {
            Some(ts) => (ts.current_state, ts.last_error),
            None => (None, None),
        };
        Diagnostics {
            transfer_id: non_empty(self.transfer_id),
            current_state: non_empty(self.current_state).or(non_empty(nested_state)),
            message: non_empty(self.message),
            last_error_code: self
                .last_error
                .and_then(|e| e.http_status_code)
                .or(nested_error.and_then(|e| e.http_status_code)),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

#[async_trait]
impl TransferClient for HttpTransferClient {
    async fn submit(&self, row: &PaymentRow, config: &DispatchConfig) -> TransferOutcome {
        let attempt_id = Uuid::new_v4();
        let body = TransferRequest::build(row, &config.payer, attempt_id);
        let started = Instant::now();

        match self.http.post(&config.endpoint).json(&body).send().await {
            Ok(response) => {
                let status = response.status();
                let diagnostics = response
                    .json::<TransferResponse>()
                    .await
                    .unwrap_or_default()
                    .into_diagnostics();
                let succeeded = status.is_success();

                let error_message = if succeeded {
                    None
                } else {
                    diagnostics.message.clone().or_else(|| {
                        diagnostics
                            .last_error_code
                            .map(|code| format!("downstream reported last error status {}", code))
                    })
                };
                if !succeeded {
                    debug!(
                        index = row.original_index,
                        status = status.as_u16(),
                        "transfer rejected by downstream"
                    );
                }

                TransferOutcome {
                    original_index: row.original_index,
                    succeeded,
                    http_status_code: status.as_u16(),
                    status_text: status.canonical_reason().unwrap_or_default().to_string(),
                    transfer_id: diagnostics.transfer_id,
                    current_state: diagnostics.current_state,
                    error_message,
                    duration_millis: started.elapsed().as_millis() as u64,
                    completed_at: Utc::now(),
                    attempt_id,
                }
            }
            Err(e) => {
                let error_message = if e.is_timeout() {
                    format!(
                        "request timed out after {}s",
                        config.request_timeout.as_secs()
                    )
                } else {
                    e.to_string()
                };
                debug!(index = row.original_index, error = %error_message, "transfer submission failed");

                TransferOutcome {
                    original_index: row.original_index,
                    succeeded: false,
                    http_status_code: 0,
                    status_text: STATUS_NETWORK_ERROR.to_string(),
                    transfer_id: None,
                    current_state: None,
                    error_message: Some(error_message),
                    duration_millis: started.elapsed().as_millis() as u64,
                    completed_at: Utc::now(),
                    attempt_id,
                }
            }
        }
    }
}

/// Restart a connector group takes tens of seconds; allow well beyond that
/// before giving up on the control call.
const RESTART_TIMEOUT: Duration = Duration::from_secs(90);

/// Maintenance action that POSTs to the local control endpoint responsible
/// for restarting the downstream service group.
pub struct HttpRestartAction {
    http: reqwest::Client,
    url: String,
}

impl HttpRestartAction {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(RESTART_TIMEOUT)
            .build()
            .map_err(|e| DispatchError::Internal(Box::new(e)))?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }
}

#[derive(Deserialize)]
struct RestartResponse {
    #[serde(default = "default_true")]
    success: bool,
}

fn default_true() -> bool {
    true
}

#[async_trait]
impl RestartAction for HttpRestartAction {
    async fn run(&self) -> bool {
        match self.http.post(&self.url).send().await {
            Ok(response) if response.status().is_success() => response
                .json::<RestartResponse>()
                .await
                .map(|r| r.success)
                .unwrap_or(true),
            Ok(response) => {
                warn!(status = %response.status(), "restart control endpoint rejected request");
                false
            }
            Err(e) => {
                warn!(error = %e, "restart control request failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::Amount;
    use rust_decimal_macros::dec;

    fn row() -> PaymentRow {
        PaymentRow {
            original_index: 3,
            recipient_id_type: "PERSONAL_ID".to_string(),
            recipient_id_value: "22912345678".to_string(),
            amount: Amount::new(dec!(1250.75)).unwrap(),
            currency: "XOF".to_string(),
            payee_name: "Kofi Annan".to_string(),
        }
    }

    #[test]
    fn test_request_body_wire_format() {
        let config = DispatchConfig::default();
        let attempt_id = Uuid::new_v4();
        let row = row();
        let body = TransferRequest::build(&row, &config.payer, attempt_id);
        let value = serde_json::to_value(&body).unwrap();

        assert_eq!(value["amountType"], "SEND");
        assert_eq!(value["transactionType"], "TRANSFER");
        assert_eq!(value["currency"], "XOF");
        assert_eq!(value["amount"], "1250.75");
        assert_eq!(value["to"]["idType"], "PERSONAL_ID");
        assert_eq!(value["to"]["idValue"], "22912345678");
        assert_eq!(value["from"]["displayName"], "Bulk Disbursement");
        assert_eq!(value["homeTransactionId"], attempt_id.to_string());
    }

    #[test]
    fn test_nested_diagnostics_extracted() {
        let json = r#"{"transferState":{"currentState":"ERROR_OCCURRED","lastError":{"httpStatusCode":504}}}"#;
        let diagnostics = serde_json::from_str::<TransferResponse>(json)
            .unwrap()
            .into_diagnostics();

        assert_eq!(diagnostics.current_state.as_deref(), Some("ERROR_OCCURRED"));
        assert_eq!(diagnostics.last_error_code, Some(504));
        assert!(diagnostics.transfer_id.is_none());
    }

    #[test]
    fn test_top_level_diagnostics_win_over_nested() {
        let json = r#"{"currentState":"COMMITTED","lastError":{"httpStatusCode":500},
                       "transferState":{"currentState":"ABORTED","lastError":{"httpStatusCode":504}}}"#;
        let diagnostics = serde_json::from_str::<TransferResponse>(json)
            .unwrap()
            .into_diagnostics();

        assert_eq!(diagnostics.current_state.as_deref(), Some("COMMITTED"));
        assert_eq!(diagnostics.last_error_code, Some(500));
    }

    #[test]
    fn test_empty_strings_treated_as_absent() {
        let json = r#"{"transferId":"","currentState":"","transferState":{"currentState":"RESERVED"}}"#;
        let diagnostics = serde_json::from_str::<TransferResponse>(json)
            .unwrap()
            .into_diagnostics();

        assert!(diagnostics.transfer_id.is_none());
        assert_eq!(diagnostics.current_state.as_deref(), Some("RESERVED"));
    }
}
