use crate::domain::ports::SessionStore;
use crate::domain::session::{DatasetFingerprint, DispatchSession};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory session store.
///
/// Uses `Arc<RwLock<HashMap>>` for shared concurrent access. Sessions do not
/// survive the process; suitable for tests and dry runs where resumability
/// is not needed.
#[derive(Default, Clone)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, DispatchSession>>>,
}

impl InMemorySessionStore {
    /// Creates a new, empty in-memory session store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, fingerprint: &DatasetFingerprint) -> Result<Option<DispatchSession>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(fingerprint.as_str()).cloned())
    }

    async fn save(&self, session: &DispatchSession) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.fingerprint.as_str().to_string(), session.clone());
        Ok(())
    }

    async fn delete(&self, fingerprint: &DatasetFingerprint) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(fingerprint.as_str());
        Ok(())
    }
}
