use super::engine::EngineEvent;
use crate::domain::outcome::TransferOutcome;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;

/// Default minimum spacing between progress emissions, bounding the consumer
/// to roughly ten updates per second regardless of completion rate.
pub const FLUSH_INTERVAL: Duration = Duration::from_millis(100);

/// Buffers completed outcomes and emits them as discrete batches, decoupling
/// per-item completion speed from consumer update frequency.
pub struct ProgressAggregator {
    events: UnboundedSender<EngineEvent>,
    buffer: Vec<TransferOutcome>,
    min_interval: Duration,
    last_emit: Instant,
}

impl ProgressAggregator {
    pub fn new(events: UnboundedSender<EngineEvent>) -> Self {
        Self::with_interval(events, FLUSH_INTERVAL)
    }

    pub fn with_interval(events: UnboundedSender<EngineEvent>, min_interval: Duration) -> Self {
        Self {
            events,
            buffer: Vec::new(),
            min_interval,
            last_emit: Instant::now(),
        }
    }

    pub fn record(&mut self, outcome: TransferOutcome) {
        self.buffer.push(outcome);
    }

    /// Emits the buffered batch if forced, or if the cadence interval elapsed
    /// and there is something to send.
    ///
    /// A forced flush always emits — the engine forces one at run termination
    /// so no outcome is dropped at shutdown.
    pub fn flush(&mut self, force: bool) {
        let due = self.last_emit.elapsed() >= self.min_interval && !self.buffer.is_empty();
        if force || due {
            let batch = std::mem::take(&mut self.buffer);
            let _ = self.events.send(EngineEvent::Progress(batch));
            self.last_emit = Instant::now();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    fn outcome(index: usize) -> TransferOutcome {
        TransferOutcome {
            original_index: index,
            succeeded: true,
            http_status_code: 200,
            status_text: "OK".to_string(),
            transfer_id: None,
            current_state: None,
            error_message: None,
            duration_millis: 1,
            completed_at: Utc::now(),
            attempt_id: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn test_unforced_flush_respects_cadence() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut aggregator = ProgressAggregator::with_interval(tx, Duration::from_secs(3600));

        aggregator.record(outcome(0));
        aggregator.flush(false);
        assert!(rx.try_recv().is_err());

        aggregator.flush(true);
        let EngineEvent::Progress(batch) = rx.try_recv().unwrap() else {
            panic!("expected a progress batch");
        };
        assert_eq!(batch.len(), 1);
    }

    #[tokio::test]
    async fn test_elapsed_cadence_emits_batch() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut aggregator = ProgressAggregator::with_interval(tx, Duration::ZERO);

        aggregator.record(outcome(0));
        aggregator.record(outcome(1));
        aggregator.flush(false);

        let EngineEvent::Progress(batch) = rx.try_recv().unwrap() else {
            panic!("expected a progress batch");
        };
        assert_eq!(batch.len(), 2);
    }

    #[tokio::test]
    async fn test_unforced_flush_skips_empty_buffer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut aggregator = ProgressAggregator::with_interval(tx, Duration::ZERO);

        aggregator.flush(false);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_forced_flush_always_emits() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut aggregator = ProgressAggregator::with_interval(tx, Duration::from_secs(3600));

        aggregator.flush(true);
        assert!(matches!(rx.try_recv(), Ok(EngineEvent::Progress(batch)) if batch.is_empty()));
    }
}
