//! Per-symbol engine: the exclusive critical section around one
//! [`OrderBook`], plus everything that happens immediately before and after
//! it (§5 "Data flow per symbol").

use crate::config::EngineConfig;
use crate::decimal::Decimal;
use crate::engine::matching::match_order;
use crate::engine::validation::validate_order_request;
use crate::error::EngineError;
use crate::fees::FeeSchedule;
use crate::ingress::{CancelRequest, CancelResponse, OrderRequest, OrderResponse, TradeFill};
use crate::metrics::EngineMetrics;
use crate::order::{Order, OrderId};
use crate::orderbook::OrderBook;
use crate::persistence::{PersistedEvent, PersistenceQueue};
use crate::trade::{Trade, TradeListener};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::error;

/// Owns one symbol's book and the lock that serializes every mutation to
/// it. The lock is a plain [`std::sync::Mutex`] and is never held across an
/// `.await` point — matching and validation are both synchronous, and
/// persistence/broadcast happen only after it is released (§5).
pub struct SymbolEngine {
    pub symbol: String,
    book: OrderBook,
    critical_section: Mutex<()>,
    /// Next admission sequence number to hand out. Only ever read and
    /// incremented while `critical_section` is held (§5: sequence
    /// assignment is part of the serialized admission, not a step that
    /// can race ahead of it).
    sequence: AtomicU64,
    config: Arc<EngineConfig>,
    fees: FeeSchedule,
    metrics: Arc<EngineMetrics>,
    persistence: PersistenceQueue,
    /// Count of order requests currently being admitted for this symbol
    /// (queued on the critical section or inside matching). Bounded by
    /// `config.ingress_queue_capacity`; exceeding it rejects with
    /// back-pressure rather than growing unbounded (§5 "Bounded queues").
    in_flight: AtomicUsize,
    /// Set once a fatal internal-invariant violation (crossed book) is
    /// observed for this symbol. Once set, every subsequent `submit_order`
    /// is rejected without touching the book; the durable log up to this
    /// point is unaffected (§7 "Internal invariant violation").
    halted: AtomicBool,
    /// Capped ring of recently emitted trades, independent of the durable
    /// log (§4.6 "recent trade history").
    trade_history: Mutex<VecDeque<Trade>>,
    trade_listeners: Mutex<Vec<TradeListener>>,
}

impl SymbolEngine {
    pub fn new(
        symbol: impl Into<String>,
        config: Arc<EngineConfig>,
        metrics: Arc<EngineMetrics>,
        journal: Arc<dyn crate::persistence::Journal>,
    ) -> Self {
        let symbol = symbol.into();
        let fees = FeeSchedule::new(config.maker_fee_rate, config.taker_fee_rate);
        let persistence = PersistenceQueue::spawn(Arc::clone(&config), Arc::clone(&metrics), journal);
        SymbolEngine {
            book: OrderBook::new(symbol.clone()),
            symbol,
            critical_section: Mutex::new(()),
            sequence: AtomicU64::new(0),
            config,
            fees,
            metrics,
            persistence,
            in_flight: AtomicUsize::new(0),
            halted: AtomicBool::new(false),
            trade_history: Mutex::new(VecDeque::new()),
            trade_listeners: Mutex::new(Vec::new()),
        }
    }

    /// Rebuild a symbol engine around an already-recovered book (§4.5
    /// "Recovery protocol" step 3: resume admission numbering from
    /// `next_sequence`).
    pub fn from_recovered(
        book: OrderBook,
        next_sequence: u64,
        config: Arc<EngineConfig>,
        metrics: Arc<EngineMetrics>,
        journal: Arc<dyn crate::persistence::Journal>,
    ) -> Self {
        let fees = FeeSchedule::new(config.maker_fee_rate, config.taker_fee_rate);
        let persistence = PersistenceQueue::spawn(Arc::clone(&config), Arc::clone(&metrics), journal);
        SymbolEngine {
            symbol: book.symbol.clone(),
            book,
            critical_section: Mutex::new(()),
            sequence: AtomicU64::new(next_sequence),
            config,
            fees,
            metrics,
            persistence,
            in_flight: AtomicUsize::new(0),
            halted: AtomicBool::new(false),
            trade_history: Mutex::new(VecDeque::new()),
            trade_listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn add_trade_listener(&self, listener: TradeListener) {
        self.trade_listeners
            .lock()
            .expect("trade listener mutex poisoned")
            .push(listener);
    }

    pub fn bbo(&self) -> crate::orderbook::Bbo {
        self.book.bbo()
    }

    pub fn depth(&self, n: usize) -> crate::orderbook::DepthView {
        self.book.depth(n.max(1))
    }

    pub fn take_dirty(&self) -> bool {
        self.book.take_dirty()
    }

    pub fn metrics(&self) -> crate::metrics::MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn recent_trades(&self) -> Vec<Trade> {
        self.trade_history
            .lock()
            .expect("trade history mutex poisoned")
            .iter()
            .cloned()
            .collect()
    }

    /// Validate, match, persist, and respond to one order request
    /// (§5 step-by-step, §7 rejection taxonomy). Synchronous: validation and
    /// matching never block on I/O, and persistence is handed off to the
    /// background writer without waiting for it to land.
    pub fn submit_order(&self, req: OrderRequest) -> OrderResponse {
        if self.halted.load(Ordering::Acquire) {
            let bbo = self.book.bbo();
            return rejected(EngineError::CrossedBook {
                symbol: req.symbol,
                best_bid: bbo.best_bid.unwrap_or(Decimal::ZERO),
                best_ask: bbo.best_ask.unwrap_or(Decimal::ZERO),
            });
        }

        let Some(_permit) = self.acquire_ingress_permit() else {
            self.metrics.record_backpressure();
            return rejected(EngineError::IngressBackPressure {
                symbol: req.symbol,
            });
        };

        if let Err(e) = validate_order_request(&req, &self.config) {
            self.metrics.record_rejected();
            return rejected(e);
        }

        let (order_id, final_order, trades) = {
            // The sequence number establishes time priority (§3, §5) and
            // must be assigned under the same lock that serializes
            // matching: handing out sequence numbers outside the lock
            // would let two racing callers swap the order in which their
            // admissions are matched relative to the order their sequence
            // numbers imply, breaking the totally-ordered-by-sequence
            // guarantee (§5 "Ordering guarantees").
            let _guard = self
                .critical_section
                .lock()
                .expect("symbol critical section poisoned");
            let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
            let taker = Order::new(
                req.symbol,
                req.side,
                req.order_type,
                req.price,
                req.quantity,
                seq,
                req.user_id,
            );
            let order_id = taker.order_id;
            let (final_order, trades) = match_order(&self.book, taker, &self.fees, seq);
            if self.book.is_crossed() {
                self.halt_for_crossed_book();
            }
            (order_id, final_order, trades)
        };

        self.metrics.record_admitted();
        if !trades.is_empty() {
            self.metrics.record_trades(trades.len() as u64);
        }

        self.persistence
            .enqueue(PersistedEvent::OrderAdmitted(final_order.clone()));
        for trade in &trades {
            self.persistence
                .enqueue(PersistedEvent::Trade(trade.clone()));
        }
        self.record_and_broadcast(&trades);

        OrderResponse {
            success: true,
            order_id: Some(order_id),
            client_order_id: req.client_order_id,
            status: final_order.status.to_string(),
            filled_quantity: final_order.filled_quantity,
            remaining_quantity: final_order.remaining(),
            trades: trades
                .iter()
                .map(|t| TradeFill {
                    trade_id: t.trade_id.to_string(),
                    price: t.price,
                    quantity: t.quantity,
                    fee: if t.taker_order_id == order_id {
                        t.taker_fee
                    } else {
                        t.maker_fee
                    },
                })
                .collect(),
            reason: None,
        }
    }

    pub fn cancel_order(&self, req: CancelRequest) -> CancelResponse {
        let cancelled = {
            let _guard = self
                .critical_section
                .lock()
                .expect("symbol critical section poisoned");
            self.book.cancel(req.order_id)
        };

        match cancelled {
            Some(order) => {
                self.metrics.record_cancelled();
                self.persistence
                    .enqueue(PersistedEvent::OrderCancelled(order));
                CancelResponse {
                    success: true,
                    order_id: req.order_id,
                    reason: None,
                }
            }
            None => CancelResponse {
                success: false,
                order_id: req.order_id,
                reason: Some(EngineError::OrderNotFound {
                    order_id: req.order_id.to_string(),
                }
                .to_string()),
            },
        }
    }

    pub fn get_order(&self, order_id: OrderId) -> Option<Order> {
        self.book.get(order_id)
    }

    /// Whether this symbol has been halted after a fatal invariant
    /// violation (§7 "Internal invariant violation").
    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::Acquire)
    }

    /// Trip the halt latch and emit a critical diagnostic. Idempotent:
    /// a symbol that is already halted logs nothing further. Matching
    /// itself is not rolled back — the trade that produced the crossed
    /// state has already executed and been persisted — but every
    /// subsequent `submit_order` for this symbol is rejected from here on
    /// (§7: "the engine halts ingress for the affected symbol").
    fn halt_for_crossed_book(&self) {
        if self.halted.swap(true, Ordering::AcqRel) {
            return;
        }
        let bbo = self.book.bbo();
        error!(
            symbol = %self.symbol,
            best_bid = ?bbo.best_bid,
            best_ask = ?bbo.best_ask,
            "fatal invariant violation: book crossed; halting ingress for symbol"
        );
    }

    /// Reserve one slot of the bounded ingress queue for this symbol,
    /// returning `None` if it is already at `config.ingress_queue_capacity`
    /// (§5 "Bounded queues", §7 "Back-pressure"). The returned guard
    /// releases the slot on drop, including on early return or panic.
    fn acquire_ingress_permit(&self) -> Option<IngressPermit<'_>> {
        let capacity = self.config.ingress_queue_capacity;
        loop {
            let current = self.in_flight.load(Ordering::Acquire);
            if current >= capacity {
                return None;
            }
            if self
                .in_flight
                .compare_exchange_weak(current, current + 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return Some(IngressPermit { counter: &self.in_flight });
            }
        }
    }

    fn record_and_broadcast(&self, trades: &[Trade]) {
        if trades.is_empty() {
            return;
        }
        let mut history = self
            .trade_history
            .lock()
            .expect("trade history mutex poisoned");
        let listeners = self
            .trade_listeners
            .lock()
            .expect("trade listener mutex poisoned");
        for trade in trades {
            history.push_back(trade.clone());
            while history.len() > self.config.trade_history_cap {
                history.pop_front();
            }
            for listener in listeners.iter() {
                listener(trade);
            }
        }
    }
}

/// RAII guard releasing one ingress-queue slot on drop (§5 "Bounded
/// queues"). Holding one for the duration of `submit_order` means the
/// in-flight count reflects requests that are validating, matching, or
/// waiting on the critical section — not just ones resting in a channel.
struct IngressPermit<'a> {
    counter: &'a AtomicUsize,
}

impl Drop for IngressPermit<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::AcqRel);
    }
}

fn rejected(err: EngineError) -> OrderResponse {
    OrderResponse {
        success: false,
        order_id: None,
        client_order_id: None,
        status: "rejected".into(),
        filled_quantity: Decimal::ZERO,
        remaining_quantity: Decimal::ZERO,
        trades: Vec::new(),
        reason: Some(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{OrderType, Side};
    use crate::persistence::MemoryJournal;

    fn engine() -> SymbolEngine {
        let mut config = EngineConfig::default();
        config.symbols.insert("BTC-USDT".into());
        SymbolEngine::new(
            "BTC-USDT",
            Arc::new(config),
            Arc::new(EngineMetrics::default()),
            Arc::new(MemoryJournal::new()),
        )
    }

    fn request(side: Side, order_type: OrderType, price: Option<&str>, qty: &str) -> OrderRequest {
        OrderRequest {
            symbol: "BTC-USDT".into(),
            side,
            order_type,
            price: price.map(|p| Decimal::parse(p).unwrap()),
            quantity: Decimal::parse(qty).unwrap(),
            client_order_id: Some("c1".into()),
            user_id: None,
        }
    }

    #[tokio::test]
    async fn resting_limit_then_matching_taker_produces_a_trade() {
        let engine = engine();
        let maker = engine.submit_order(request(Side::Sell, OrderType::Limit, Some("100"), "1.0"));
        assert!(maker.success);
        assert_eq!(maker.status, "pending");

        let taker = engine.submit_order(request(Side::Buy, OrderType::Limit, Some("100"), "1.0"));
        assert!(taker.success);
        assert_eq!(taker.status, "filled");
        assert_eq!(taker.trades.len(), 1);
        assert_eq!(engine.recent_trades().len(), 1);
    }

    #[tokio::test]
    async fn invalid_request_is_rejected_without_touching_the_book() {
        let engine = engine();
        let resp = engine.submit_order(request(Side::Buy, OrderType::Limit, None, "1.0"));
        assert!(!resp.success);
        assert!(resp.reason.is_some());
        assert_eq!(engine.bbo().best_bid, None);
    }

    #[tokio::test]
    async fn cancel_round_trip() {
        let engine = engine();
        let resp = engine.submit_order(request(Side::Buy, OrderType::Limit, Some("99"), "1.0"));
        let order_id = resp.order_id.unwrap();
        let cancelled = engine.cancel_order(CancelRequest {
            symbol: "BTC-USDT".into(),
            order_id,
        });
        assert!(cancelled.success);
        assert!(engine.get_order(order_id).is_none());
    }

    #[tokio::test]
    async fn cancelling_unknown_order_fails() {
        let engine = engine();
        let resp = engine.cancel_order(CancelRequest {
            symbol: "BTC-USDT".into(),
            order_id: OrderId::new(),
        });
        assert!(!resp.success);
    }

    #[tokio::test]
    async fn ingress_permit_is_released_after_submit_so_capacity_is_reusable() {
        let mut config = EngineConfig::default();
        config.symbols.insert("BTC-USDT".into());
        config.ingress_queue_capacity = 1;
        let engine = SymbolEngine::new(
            "BTC-USDT",
            Arc::new(config),
            Arc::new(EngineMetrics::default()),
            Arc::new(MemoryJournal::new()),
        );

        // Capacity of 1 is not exhausted by sequential, non-overlapping
        // calls: each submit_order releases its permit before returning.
        for _ in 0..5 {
            let resp = engine.submit_order(request(Side::Buy, OrderType::Limit, Some("100"), "1.0"));
            assert!(resp.success);
        }
        assert_eq!(engine.metrics().ingress_rejected_backpressure, 0);
    }

    #[tokio::test]
    async fn held_permit_blocks_further_admission_until_released() {
        let mut config = EngineConfig::default();
        config.symbols.insert("BTC-USDT".into());
        config.ingress_queue_capacity = 1;
        let engine = SymbolEngine::new(
            "BTC-USDT",
            Arc::new(config),
            Arc::new(EngineMetrics::default()),
            Arc::new(MemoryJournal::new()),
        );

        let held = engine.acquire_ingress_permit().unwrap();
        let resp = engine.submit_order(request(Side::Buy, OrderType::Limit, Some("100"), "1.0"));
        assert!(!resp.success);
        assert_eq!(resp.reason.as_deref(), Some("ingress queue full for symbol BTC-USDT; retry"));
        assert_eq!(engine.metrics().ingress_rejected_backpressure, 1);
        drop(held);

        let resp = engine.submit_order(request(Side::Buy, OrderType::Limit, Some("100"), "1.0"));
        assert!(resp.success);
    }

    #[tokio::test]
    async fn halted_symbol_rejects_every_subsequent_submission() {
        let engine = engine();
        assert!(!engine.is_halted());

        engine.halt_for_crossed_book();
        assert!(engine.is_halted());

        let resp = engine.submit_order(request(Side::Buy, OrderType::Limit, Some("100"), "1.0"));
        assert!(!resp.success);
        assert!(matches!(resp.reason, Some(ref r) if r.contains("crossed book")));
        assert!(engine.bbo().best_bid.is_none());
    }

    #[tokio::test]
    async fn halt_is_idempotent_and_does_not_panic_on_repeated_trips() {
        let engine = engine();
        engine.halt_for_crossed_book();
        engine.halt_for_crossed_book();
        assert!(engine.is_halted());
    }

    /// Many threads race `submit_order` for the same symbol at once
    /// (§2/§5: the concurrent-load scenario the critical section exists
    /// for). Sequence assignment happens under the same lock as matching,
    /// so the FIFO position an order lands in must match the ascending
    /// order of the sequence number it was assigned — if sequence numbers
    /// were handed out before the lock was acquired, a thread could win
    /// the lock out of order relative to its sequence number and this
    /// would fail intermittently (§5 "Ordering guarantees": "the order of
    /// admitted orders is totally ordered by their sequence number and
    /// matches the order of trade emission").
    #[tokio::test]
    async fn concurrent_submissions_preserve_sequence_order_in_fifo() {
        let engine = Arc::new(engine());
        let handles: Vec<_> = (0..32)
            .map(|_| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || {
                    let resp =
                        engine.submit_order(request(Side::Sell, OrderType::Limit, Some("100"), "1.0"));
                    assert!(resp.success);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let resting = engine.book.resting_orders();
        assert_eq!(resting.len(), 32);

        let timestamps: Vec<u64> = resting.iter().map(|o| o.timestamp).collect();
        let mut sorted = timestamps.clone();
        sorted.sort_unstable();
        assert_eq!(
            timestamps, sorted,
            "FIFO order at a price level must match ascending admission sequence"
        );

        let mut seen = std::collections::HashSet::new();
        for ts in &timestamps {
            assert!(
                seen.insert(*ts),
                "two orders must never be admitted with the same sequence number"
            );
        }
    }
}
