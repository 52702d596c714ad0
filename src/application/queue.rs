use crate::domain::payment::PaymentRow;
use std::collections::VecDeque;

/// Ordered collection of pending payment rows.
///
/// Owned and mutated only by the engine's scheduler loop; an empty queue is a
/// normal terminal state, not a failure. Not internally synchronized.
#[derive(Debug, Default)]
pub struct WorkQueue {
    rows: VecDeque<PaymentRow>,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends rows preserving their relative order.
    pub fn enqueue_all(&mut self, rows: impl IntoIterator<Item = PaymentRow>) {
        self.rows.extend(rows);
    }

    /// Removes and returns the head row.
    pub fn take_next(&mut self) -> Option<PaymentRow> {
        self.rows.pop_front()
    }

    /// Keeps only rows matching the predicate. Used to drop already-processed
    /// rows before a run starts.
    pub fn retain(&mut self, predicate: impl FnMut(&PaymentRow) -> bool) {
        self.rows.retain(predicate);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
