//! In-process engine metrics, exposed via the read-only query surface's
//! `get_metrics()` (§6) and optionally mirrored to the `metrics` crate
//! behind the `metrics` feature.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Atomic counters for one symbol engine. Cheap to read from another task
/// without taking the symbol lock (§7: "a counter is exposed via metrics").
#[derive(Debug, Default)]
pub struct EngineMetrics {
    orders_admitted: AtomicU64,
    orders_rejected: AtomicU64,
    orders_cancelled: AtomicU64,
    trades_emitted: AtomicU64,
    ingress_rejected_backpressure: AtomicU64,
    persistence_lag: AtomicU64,
    persistence_failures: AtomicU64,
    health_degraded: AtomicBool,
}

/// A point-in-time read of [`EngineMetrics`], returned by `get_metrics()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub orders_admitted: u64,
    pub orders_rejected: u64,
    pub orders_cancelled: u64,
    pub trades_emitted: u64,
    pub ingress_rejected_backpressure: u64,
    pub persistence_lag: u64,
    pub persistence_failures: u64,
    pub health_degraded: bool,
}

impl EngineMetrics {
    pub fn record_admitted(&self) {
        self.orders_admitted.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        metrics::counter!("exchange_orders_admitted_total").increment(1);
    }

    pub fn record_rejected(&self) {
        self.orders_rejected.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        metrics::counter!("exchange_orders_rejected_total").increment(1);
    }

    pub fn record_cancelled(&self) {
        self.orders_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_trades(&self, count: u64) {
        self.trades_emitted.fetch_add(count, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        metrics::counter!("exchange_trades_emitted_total").increment(count);
    }

    /// Ingress queue was full; the order was still REJECTED, not silently
    /// dropped (§5 "Bounded queues").
    pub fn record_backpressure(&self) {
        self.ingress_rejected_backpressure
            .fetch_add(1, Ordering::Relaxed);
    }

    /// The persistence queue was full when a record was submitted; the
    /// in-memory effect remains authoritative (§4.5 "Back-pressure").
    pub fn record_persistence_lag(&self) {
        self.persistence_lag.fetch_add(1, Ordering::Relaxed);
    }

    /// A durable write failed. Does not affect order acceptance; repeated
    /// failures flip the health-degraded flag (§7).
    pub fn record_persistence_failure(&self, degraded_after: u64) {
        let failures = self.persistence_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= degraded_after {
            self.health_degraded.store(true, Ordering::Relaxed);
        }
    }

    pub fn clear_health_degraded(&self) {
        self.health_degraded.store(false, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            orders_admitted: self.orders_admitted.load(Ordering::Relaxed),
            orders_rejected: self.orders_rejected.load(Ordering::Relaxed),
            orders_cancelled: self.orders_cancelled.load(Ordering::Relaxed),
            trades_emitted: self.trades_emitted.load(Ordering::Relaxed),
            ingress_rejected_backpressure: self
                .ingress_rejected_backpressure
                .load(Ordering::Relaxed),
            persistence_lag: self.persistence_lag.load(Ordering::Relaxed),
            persistence_failures: self.persistence_failures.load(Ordering::Relaxed),
            health_degraded: self.health_degraded.load(Ordering::Relaxed),
        }
    }
}
