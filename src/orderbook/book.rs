//! The two-sided order book for a single symbol (§4.2 OrderBook).

use crate::decimal::Decimal;
use crate::order::{Order, OrderId, Side};
use crate::orderbook::side::OrderBookSide;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Best bid + best ask + spread, or whatever subset of those is available
/// (§4.2 `bbo`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bbo {
    pub best_bid: Option<Decimal>,
    pub best_ask: Option<Decimal>,
}

impl Bbo {
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid, self.best_ask) {
            (Some(bid), Some(ask)) => ask.checked_sub(bid),
            _ => None,
        }
    }
}

/// Aggregated L2 view, best-first on each side (§4.2 `depth`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DepthView {
    pub bids: Vec<(Decimal, Decimal)>,
    pub asks: Vec<(Decimal, Decimal)>,
}

/// Bid side + ask side + an `orders` index covering every resting order
/// for one symbol (§3 OrderBook). `best_bid < best_ask` whenever both
/// exist is enforced by the matching algorithm, which always consumes a
/// crossing price before an order is allowed to rest (§3).
pub struct OrderBook {
    pub symbol: String,
    bids: OrderBookSide,
    asks: OrderBookSide,
    /// order_id -> resting Order, covering every order currently on the
    /// book (either side). Populated only while an order rests; terminal
    /// orders are removed and live only in the event log/trade history.
    orders: DashMap<OrderId, Order>,
    /// Set whenever the book mutates; sampled (and cleared) by the
    /// market-data publisher outside the lock (§4.6 "Trigger").
    dirty: AtomicBool,
}

impl OrderBook {
    pub fn new(symbol: impl Into<String>) -> Self {
        OrderBook {
            symbol: symbol.into(),
            bids: OrderBookSide::new(Side::Buy),
            asks: OrderBookSide::new(Side::Sell),
            orders: DashMap::new(),
            dirty: AtomicBool::new(false),
        }
    }

    pub fn side(&self, side: Side) -> &OrderBookSide {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    pub fn opposite_side(&self, side: Side) -> &OrderBookSide {
        self.side(side.opposite())
    }

    /// Insert a LIMIT order with `remaining() > 0` into the book
    /// (§4.2 `add_resting`). Rejects a duplicate id; the caller is expected
    /// to have already checked uniqueness during validation, this is the
    /// final guard.
    pub fn add_resting(&self, order: Order) -> Result<(), OrderId> {
        if self.orders.contains_key(&order.order_id) {
            return Err(order.order_id);
        }
        let side = order.side;
        self.orders.insert(order.order_id, order.clone());
        self.side(side).add(order);
        self.mark_dirty();
        Ok(())
    }

    /// Idempotent cancel: locates the order via the index, removes it from
    /// its side, marks it CANCELLED. Returns `false` if unknown or already
    /// terminal (§4.2 `cancel`).
    pub fn cancel(&self, order_id: OrderId) -> Option<Order> {
        let (_, mut order) = self.orders.remove(&order_id)?;
        if order.is_terminal() {
            // Shouldn't happen: terminal orders are removed from `orders`
            // as soon as they reach that state. Defensive no-op.
            return None;
        }
        self.side(order.side).remove(order_id);
        order.cancel_remainder();
        self.mark_dirty();
        Some(order)
    }

    /// Record that the matching walk consumed up to `max_qty` from the
    /// resting order at the head of `price` on `side`, keeping the
    /// `orders` index in sync with the price level. Returns the maker's
    /// post-fill state and the quantity actually filled (clamped to the
    /// maker's own remaining quantity), and removes it from the index if
    /// filled.
    pub fn apply_maker_fill(
        &self,
        side: Side,
        price: Decimal,
        max_qty: Decimal,
    ) -> Option<(Order, Decimal)> {
        let (filled, fill_qty) = self.side(side).fill_best(price, max_qty)?;
        if filled.remaining().is_zero() {
            self.orders.remove(&filled.order_id);
        } else {
            self.orders.insert(filled.order_id, filled.clone());
        }
        self.mark_dirty();
        Some((filled, fill_qty))
    }

    pub fn get(&self, order_id: OrderId) -> Option<Order> {
        self.orders.get(&order_id).map(|e| e.value().clone())
    }

    pub fn contains(&self, order_id: OrderId) -> bool {
        self.orders.contains_key(&order_id)
    }

    pub fn bbo(&self) -> Bbo {
        Bbo {
            best_bid: self.bids.peek_best().map(|(p, _)| p),
            best_ask: self.asks.peek_best().map(|(p, _)| p),
        }
    }

    pub fn depth(&self, n: usize) -> DepthView {
        DepthView {
            bids: self.bids.depth(n),
            asks: self.asks.depth(n),
        }
    }

    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    /// Sample and clear the dirty flag. Called by the market-data publisher
    /// outside the symbol lock (§4.6).
    pub fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }

    /// All resting orders, best-first per side, FIFO within a level. Used
    /// by snapshot-taking (§4.5).
    pub fn resting_orders(&self) -> Vec<Order> {
        let mut out = self.bids.snapshot_orders();
        out.extend(self.asks.snapshot_orders());
        out
    }

    /// Whether the book is internally crossed: both sides populated and
    /// `best_bid >= best_ask`. Should never be observed outside the
    /// matching critical section (§3, §8 "Non-crossed book").
    pub fn is_crossed(&self) -> bool {
        let bbo = self.bbo();
        match (bbo.best_bid, bbo.best_ask) {
            (Some(bid), Some(ask)) => bid >= ask,
            _ => false,
        }
    }
}
