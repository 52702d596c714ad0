use crate::domain::ports::SessionStore;
use crate::domain::session::{DatasetFingerprint, DispatchSession};
use crate::error::{DispatchError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;

/// Column Family for storing dispatch sessions.
pub const CF_SESSIONS: &str = "sessions";

/// A persistent session store implementation using RocksDB.
///
/// Sessions are stored as JSON values keyed by dataset fingerprint, so an
/// interrupted run can be resumed by a later process.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDbSessionStore {
    db: Arc<DB>,
}

impl RocksDbSessionStore {
    /// Opens or creates a RocksDB instance at the specified path, ensuring
    /// the `sessions` column family exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_sessions = ColumnFamilyDescriptor::new(CF_SESSIONS, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_sessions])?;

        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self) -> Result<&rocksdb::ColumnFamily> {
        self.db.cf_handle(CF_SESSIONS).ok_or_else(|| {
            DispatchError::Internal(Box::new(std::io::Error::other(
                "sessions column family not found",
            )))
        })
    }
}

#[async_trait]
impl SessionStore for RocksDbSessionStore {
    async fn load(&self, fingerprint: &DatasetFingerprint) -> Result<Option<DispatchSession>> {
        let cf = self.cf()?;
        let result = self.db.get_cf(cf, fingerprint.as_str().as_bytes())?;

        if let Some(bytes) = result {
            let session = serde_json::from_slice(&bytes).map_err(|e| {
                DispatchError::Internal(Box::new(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("Deserialization error: {}", e),
                )))
            })?;
            Ok(Some(session))
        } else {
            Ok(None)
        }
    }

    async fn save(&self, session: &DispatchSession) -> Result<()> {
        let cf = self.cf()?;
        let value = serde_json::to_vec(session).map_err(|e| {
            DispatchError::Internal(Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Serialization error: {}", e),
            )))
        })?;

        self.db
            .put_cf(cf, session.fingerprint.as_str().as_bytes(), value)?;

        Ok(())
    }

    async fn delete(&self, fingerprint: &DatasetFingerprint) -> Result<()> {
        let cf = self.cf()?;
        self.db.delete_cf(cf, fingerprint.as_str().as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_rocksdb_open_cf() {
        let dir = tempdir().unwrap();
        let store = RocksDbSessionStore::open(dir.path()).expect("Failed to open RocksDB");

        assert!(store.db.cf_handle(CF_SESSIONS).is_some());
    }

    #[tokio::test]
    async fn test_rocksdb_session_round_trip() {
        let dir = tempdir().unwrap();
        let store = RocksDbSessionStore::open(dir.path()).unwrap();

        let fingerprint = DatasetFingerprint::new("payments.csv", 2048);
        let session = DispatchSession::new(fingerprint.clone(), "payments.csv");

        store.save(&session).await.unwrap();
        let loaded = store.load(&fingerprint).await.unwrap().unwrap();
        assert_eq!(loaded, session);

        store.delete(&fingerprint).await.unwrap();
        assert!(store.load(&fingerprint).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rocksdb_missing_session_is_not_found() {
        let dir = tempdir().unwrap();
        let store = RocksDbSessionStore::open(dir.path()).unwrap();

        let fingerprint = DatasetFingerprint::new("never-seen.csv", 1);
        assert!(store.load(&fingerprint).await.unwrap().is_none());
    }
}
