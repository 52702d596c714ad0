use crate::domain::outcome::TransferOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Stable identifier for a dataset, derived from its source name and byte
/// size. Used as the persistence key for resumable sessions: re-ingesting the
/// same file yields the same fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetFingerprint(String);

impl DatasetFingerprint {
    pub fn new(source_name: &str, size_bytes: u64) -> Self {
        Self(format!("{}_{}", source_name, size_bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DatasetFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The resumable unit of work: everything a later run needs to skip
/// already-processed rows.
///
/// Invariants, maintained by [`DispatchSession::record`]:
/// `processed_indices` is exactly the set of `original_index` values present
/// in `outcomes`, and `success_count + failure_count == outcomes.len()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchSession {
    pub fingerprint: DatasetFingerprint,
    pub source_name: String,
    pub outcomes: Vec<TransferOutcome>,
    pub processed_indices: BTreeSet<usize>,
    pub success_count: usize,
    pub failure_count: usize,
    pub last_saved_at: DateTime<Utc>,
}

impl DispatchSession {
    pub fn new(fingerprint: DatasetFingerprint, source_name: impl Into<String>) -> Self {
        Self {
            fingerprint,
            source_name: source_name.into(),
            outcomes: Vec::new(),
            processed_indices: BTreeSet::new(),
            success_count: 0,
            failure_count: 0,
            last_saved_at: Utc::now(),
        }
    }

    /// Records one completed attempt, in completion order.
    ///
    /// A duplicate `original_index` is a scheduling bug: rows reach the queue
    /// at most once per run, and retry-failed removes the old outcome first.
    pub fn record(&mut self, outcome: TransferOutcome) {
        let inserted = self.processed_indices.insert(outcome.original_index);
        debug_assert!(
            inserted,
            "original_index {} recorded twice",
            outcome.original_index
        );
        if outcome.succeeded {
            self.success_count += 1;
        } else {
            self.failure_count += 1;
        }
        self.outcomes.push(outcome);
    }

    /// Number of rows this session has an outcome for.
    pub fn processed(&self) -> usize {
        self.processed_indices.len()
    }

    pub fn is_consistent(&self) -> bool {
        self.success_count + self.failure_count == self.outcomes.len()
            && self.processed_indices.len() == self.outcomes.len()
            && self
                .outcomes
                .iter()
                .all(|o| self.processed_indices.contains(&o.original_index))
    }
}
