//! Engine configuration (§6 "Configuration").
//!
//! One [`EngineConfig`] is shared (read-only, behind an `Arc`) by every
//! per-symbol engine spawned by the router. There is no hot-reload: a
//! config change means restarting the process.

use crate::decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// Static, process-wide engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Tradable symbols; one engine is spawned per entry.
    pub symbols: BTreeSet<String>,

    /// Validation upper bound on order quantity. `None` disables the check.
    pub max_order_quantity: Option<Decimal>,

    /// Validation upper bound on order price. `None` disables the check.
    pub max_order_price: Option<Decimal>,

    /// Maker fee rate, as a decimal multiplier of notional.
    pub maker_fee_rate: Decimal,

    /// Taker fee rate, as a decimal multiplier of notional.
    pub taker_fee_rate: Decimal,

    /// Market-data broadcast batching interval.
    pub broadcast_window_ms: u64,

    /// Max records drained per persistence batch.
    pub persistence_batch_size: usize,

    /// Max time a persistence batch waits before flushing, even if it
    /// hasn't reached `persistence_batch_size`.
    pub persistence_batch_interval_ms: u64,

    /// Per-symbol in-memory trade ring size; the durable log remains the
    /// authoritative history beyond this cap.
    pub trade_history_cap: usize,

    /// Default depth for `get_orderbook` queries and market-data broadcasts
    /// when the caller does not specify one.
    pub depth_levels_default: usize,

    /// Bound on the ingress queue per symbol; beyond this, `submit_order`
    /// returns a back-pressure rejection.
    pub ingress_queue_capacity: usize,

    /// Bound on the persistence queue per symbol.
    pub persistence_queue_capacity: usize,
}

impl EngineConfig {
    pub fn broadcast_window(&self) -> Duration {
        Duration::from_millis(self.broadcast_window_ms)
    }

    pub fn persistence_batch_interval(&self) -> Duration {
        Duration::from_millis(self.persistence_batch_interval_ms)
    }
}

impl Default for EngineConfig {
    /// Defaults follow the ranges called out in §4.5/§5: 100-500 record
    /// batches flushed every 20-50 ms, a 5 ms broadcast window, and
    /// 10 000-entry bounded queues.
    fn default() -> Self {
        EngineConfig {
            symbols: BTreeSet::new(),
            max_order_quantity: None,
            max_order_price: None,
            maker_fee_rate: Decimal::ZERO,
            taker_fee_rate: Decimal::ZERO,
            broadcast_window_ms: 5,
            persistence_batch_size: 200,
            persistence_batch_interval_ms: 30,
            trade_history_cap: 10_000,
            depth_levels_default: 10,
            ingress_queue_capacity: 10_000,
            persistence_queue_capacity: 10_000,
        }
    }
}
