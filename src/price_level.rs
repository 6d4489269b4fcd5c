//! A single price level: all resting orders at one price on one side
//! (§3 PriceLevel, §4.1 OrderBookSide operations).

use crate::decimal::Decimal;
use crate::order::{Order, OrderId};
use std::collections::VecDeque;
use std::sync::Mutex;

/// All resting orders at a single price, in FIFO admission order.
///
/// Guarded by a single `Mutex` rather than a lock-free queue: every
/// mutation to a level happens from the one engine task that owns the
/// symbol's critical section (§5 "Runtime model"), so the lock is never
/// contended by a second writer. It still exists so that read-only
/// queries (depth, BBO) issued from another task can observe a consistent
/// snapshot without racing the writer.
pub struct PriceLevel {
    pub price: Decimal,
    orders: Mutex<VecDeque<Order>>,
}

impl PriceLevel {
    pub fn new(price: Decimal) -> Self {
        PriceLevel {
            price,
            orders: Mutex::new(VecDeque::new()),
        }
    }

    /// Insert at the back of the FIFO (§4.1 `add`).
    pub fn push(&self, order: Order) {
        self.orders.lock().expect("price level mutex poisoned").push_back(order);
    }

    /// Sum of `remaining()` over all live orders (§3 Invariant). Recomputed
    /// on demand rather than cached, since the level is always small enough
    /// for this to be cheap and a cached counter is one more place for the
    /// level-sum invariant to drift.
    pub fn total_quantity(&self) -> Decimal {
        self.orders
            .lock()
            .expect("price level mutex poisoned")
            .iter()
            .fold(Decimal::ZERO, |acc, o| {
                acc.checked_add(o.remaining()).unwrap_or(acc)
            })
    }

    pub fn is_empty(&self) -> bool {
        self.orders.lock().expect("price level mutex poisoned").is_empty()
    }

    pub fn len(&self) -> usize {
        self.orders.lock().expect("price level mutex poisoned").len()
    }

    /// Iterate resting orders at this level in FIFO order, skipping any
    /// already-terminal entries (§4.1 `orders_at_best`).
    pub fn snapshot_orders(&self) -> Vec<Order> {
        self.orders
            .lock()
            .expect("price level mutex poisoned")
            .iter()
            .filter(|o| !o.is_terminal())
            .cloned()
            .collect()
    }

    /// Apply a fill against the resting order at the front of the FIFO,
    /// clamped to at most `max_qty` (the maker is never filled beyond its
    /// own remaining quantity, even if the taker wants more). Removes the
    /// maker if it becomes fully filled. Returns the maker's post-fill
    /// snapshot and the quantity actually filled.
    pub fn fill_front(&self, max_qty: Decimal) -> Option<(Order, Decimal)> {
        let mut guard = self.orders.lock().expect("price level mutex poisoned");
        let front = guard.front_mut()?;
        let fill_qty = max_qty.min(front.remaining());
        front.apply_fill(fill_qty);
        let filled = front.clone();
        if filled.remaining().is_zero() {
            guard.pop_front();
        }
        Some((filled, fill_qty))
    }

    /// Remove a specific order by id (explicit cancel, §4.2 `cancel`).
    /// Returns the removed order, if present.
    pub fn remove(&self, order_id: OrderId) -> Option<Order> {
        let mut guard = self.orders.lock().expect("price level mutex poisoned");
        let pos = guard.iter().position(|o| o.order_id == order_id)?;
        guard.remove(pos)
    }
}
