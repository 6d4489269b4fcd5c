//! The batched persistence worker (§4.5 "Batched writer").
//!
//! One [`PersistenceQueue`] per symbol: a bounded channel plus a
//! background task that drains up to `persistence_batch_size` records or
//! waits `persistence_batch_interval_ms`, whichever comes first, then
//! writes the batch in one durable transaction via [`Journal::append_batch`].

use super::event::PersistedEvent;
use super::journal::Journal;
use crate::config::EngineConfig;
use crate::metrics::EngineMetrics;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tracing::{error, warn};

/// After this many consecutive durable-write failures, the engine's
/// health-degraded flag is raised (§7 "on repeated failure the engine
/// surfaces a health-degraded flag").
const HEALTH_DEGRADE_AFTER_FAILURES: u64 = 5;

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// The producer handle held by the symbol engine. Enqueueing never blocks
/// the critical section: it has already been released by the time
/// anything here runs (§5 "explicitly outside the critical section:
/// ... persistence I/O").
pub struct PersistenceQueue {
    tx: mpsc::Sender<PersistedEvent>,
    metrics: Arc<EngineMetrics>,
}

impl PersistenceQueue {
    /// Spawn the queue and its draining worker, returning the producer
    /// handle. `journal` is shared with recovery; `on_trade` lets the
    /// caller also feed persisted trade events into the market-data
    /// pipeline's trade history without a second channel.
    pub fn spawn(
        config: Arc<EngineConfig>,
        metrics: Arc<EngineMetrics>,
        journal: Arc<dyn Journal>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(config.persistence_queue_capacity);
        let worker_metrics = Arc::clone(&metrics);
        tokio::spawn(run_worker(rx, journal, config, worker_metrics));
        PersistenceQueue { tx, metrics }
    }

    /// Enqueue one record. On a full queue, the in-memory order/trade
    /// state remains authoritative (§4.5 "Back-pressure"): we record a
    /// persistence-lag sample and hand the record to a detached task that
    /// waits for room, so the durable log still eventually catches up
    /// rather than silently losing the record.
    pub fn enqueue(&self, event: PersistedEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                self.metrics.record_persistence_lag();
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let _ = tx.send(event).await;
                });
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!("persistence queue closed; worker task must have panicked");
            }
        }
    }
}

async fn run_worker(
    mut rx: mpsc::Receiver<PersistedEvent>,
    journal: Arc<dyn Journal>,
    config: Arc<EngineConfig>,
    metrics: Arc<EngineMetrics>,
) {
    let sequence = AtomicU64::new(journal.last_sequence().map(|s| s + 1).unwrap_or(0));
    let mut batch = Vec::with_capacity(config.persistence_batch_size);

    loop {
        batch.clear();
        let deadline = tokio::time::sleep(config.persistence_batch_interval());
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                biased;
                maybe_event = rx.recv() => {
                    match maybe_event {
                        Some(event) => batch.push(event),
                        None => {
                            flush(&journal, &metrics, &sequence, &mut batch);
                            return;
                        }
                    }
                    if batch.len() >= config.persistence_batch_size {
                        break;
                    }
                }
                _ = &mut deadline => break,
            }
        }

        flush(&journal, &metrics, &sequence, &mut batch);
    }
}

fn flush(
    journal: &Arc<dyn Journal>,
    metrics: &Arc<EngineMetrics>,
    sequence: &AtomicU64,
    batch: &mut Vec<PersistedEvent>,
) {
    if batch.is_empty() {
        return;
    }
    let entries: Vec<(u64, u64, PersistedEvent)> = batch
        .drain(..)
        .map(|event| (sequence.fetch_add(1, Ordering::Relaxed), now_ns(), event))
        .collect();

    if let Err(e) = journal.append_batch(&entries) {
        warn!(error = %e, count = entries.len(), "persistence batch write failed");
        metrics.record_persistence_failure(HEALTH_DEGRADE_AFTER_FAILURES);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Decimal;
    use crate::order::{Order, OrderType, Side};
    use crate::persistence::memory_journal::MemoryJournal;
    use std::time::Duration;

    fn sample() -> PersistedEvent {
        PersistedEvent::OrderAdmitted(Order::new(
            "BTC-USDT".into(),
            Side::Buy,
            OrderType::Limit,
            Some(Decimal::parse("100").unwrap()),
            Decimal::parse("1").unwrap(),
            1,
            None,
        ))
    }

    #[tokio::test]
    async fn enqueued_records_are_flushed_to_the_journal() {
        let journal: Arc<dyn Journal> = Arc::new(MemoryJournal::new());
        let mut config = EngineConfig::default();
        config.persistence_batch_interval_ms = 5;
        let queue = PersistenceQueue::spawn(
            Arc::new(config),
            Arc::new(EngineMetrics::default()),
            Arc::clone(&journal),
        );

        queue.enqueue(sample());
        queue.enqueue(sample());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(journal.last_sequence(), Some(1));
    }
}
