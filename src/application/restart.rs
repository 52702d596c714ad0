use crate::domain::ports::RestartAction;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

/// Gates maintenance restarts of the downstream connector.
///
/// At most one restart is in flight at a time; while it runs, the engine's
/// submit path consults [`RestartCoordinator::is_restarting`] and rejects new
/// submissions without touching the network.
pub struct RestartCoordinator {
    action: Box<dyn RestartAction>,
    restarting: AtomicBool,
}

impl RestartCoordinator {
    pub fn new(action: Box<dyn RestartAction>) -> Self {
        Self {
            action,
            restarting: AtomicBool::new(false),
        }
    }

    pub fn is_restarting(&self) -> bool {
        self.restarting.load(Ordering::Acquire)
    }

    /// Performs the maintenance restart, blocking until it finishes.
    ///
    /// Returns `false` immediately if another restart is already pending;
    /// otherwise returns whether the action reported success.
    pub async fn request_restart(&self) -> bool {
        if self
            .restarting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        info!("restarting downstream connector");
        let ok = self.action.run().await;
        self.restarting.store(false, Ordering::Release);
        if ok {
            info!("downstream connector restart finished");
        } else {
            warn!("downstream connector restart reported failure");
        }
        ok
    }
}
