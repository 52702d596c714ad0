pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
pub mod logging;

pub use application::engine::{
    DispatchEngine, EngineEvent, EngineState, RunHandle, RunSummary,
};
pub use application::plan::{RunPlan, extract_failed, plan_run, select_rows};
pub use application::restart::RestartCoordinator;
pub use domain::config::{DispatchConfig, RestartBasis};
pub use domain::outcome::TransferOutcome;
pub use domain::payment::{Amount, PayerIdentity, PaymentRow};
pub use domain::ports::{RestartAction, SessionStore, SharedSessionStore, TransferClient};
pub use domain::session::{DatasetFingerprint, DispatchSession};
pub use error::{DispatchError, Result};
