use crate::domain::payment::PayerIdentity;
use crate::error::{DispatchError, Result};
use std::str::FromStr;
use std::time::Duration;

/// What the restart-threshold counter is measured against.
///
/// The source tool counted rows processed since the current dispatch was
/// (re)started, so a resumed short tail never triggered an immediate restart.
/// That behavior is `PerRun`. `PerSession` counts the session's lifetime
/// total instead, amortizing restarts across resumed runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestartBasis {
    #[default]
    PerRun,
    PerSession,
}

impl FromStr for RestartBasis {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "per-run" => Ok(Self::PerRun),
            "per-session" => Ok(Self::PerSession),
            other => Err(format!(
                "unknown restart basis '{}', expected 'per-run' or 'per-session'",
                other
            )),
        }
    }
}

/// Parameters for one dispatch run. Supplied per run and never persisted as
/// part of session identity.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Upper bound on concurrent in-flight transfer submissions.
    pub max_concurrent_workers: usize,
    /// Pause between successive queue pops, throttling burst rate.
    pub inter_dispatch_delay: Duration,
    /// Emit a restart-needed signal every N processed rows; 0 disables.
    pub restart_every_n_processed: u32,
    pub restart_basis: RestartBasis,
    pub payer: PayerIdentity,
    /// Transfer submission endpoint of the downstream connector.
    pub endpoint: String,
    pub request_timeout: Duration,
}

impl DispatchConfig {
    /// Fails fast at run start rather than mid-run.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_workers == 0 {
            return Err(DispatchError::Config(
                "max_concurrent_workers must be at least 1".to_string(),
            ));
        }
        if self.endpoint.is_empty() {
            return Err(DispatchError::Config("endpoint must not be empty".to_string()));
        }
        Ok(())
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_workers: 10,
            inter_dispatch_delay: Duration::from_millis(50),
            restart_every_n_processed: 200,
            restart_basis: RestartBasis::default(),
            payer: PayerIdentity {
                id_type: "MSISDN".to_string(),
                id_value: "123456789".to_string(),
                display_name: "Bulk Disbursement".to_string(),
            },
            endpoint: "http://localhost:3001/transfers".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}
