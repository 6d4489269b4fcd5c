//! One side (bids or asks) of a symbol's order book (§4.1 OrderBookSide).
//!
//! Prices are kept in a [`crossbeam_skiplist::SkipMap`], an ordered,
//! concurrent structure keyed directly by [`Decimal`] rather than a scaled
//! `u128`, since no fixed-point re-encoding is needed to get a total order
//! out of the decimal type. A level is present in the map if and only if
//! it is non-empty; there is no lazy deletion to account for (§4.1
//! invariant (c)).

use crate::decimal::Decimal;
use crate::order::{Order, OrderId, Side};
use crate::price_level::PriceLevel;
use dashmap::DashMap;
use crossbeam_skiplist::SkipMap;
use std::sync::Arc;

/// All resting liquidity on one side of one symbol's book.
pub struct OrderBookSide {
    side: Side,
    levels: SkipMap<Decimal, Arc<PriceLevel>>,
    /// order_id -> price, so cancel/reduce don't need to scan every level
    /// (§4.1: "O(log n) worst case" via this index).
    index: DashMap<OrderId, Decimal>,
}

impl OrderBookSide {
    pub fn new(side: Side) -> Self {
        OrderBookSide {
            side,
            levels: SkipMap::new(),
            index: DashMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Insert a resting order into the FIFO queue of its price level,
    /// creating the level if it doesn't exist yet (§4.1 `add`).
    pub fn add(&self, order: Order) {
        let price = order
            .price
            .expect("resting orders always carry a price");
        let order_id = order.order_id;
        let level = self
            .levels
            .get_or_insert_with(price, || Arc::new(PriceLevel::new(price)))
            .value()
            .clone();
        level.push(order);
        self.index.insert(order_id, price);
    }

    /// The best (most aggressive) price and its aggregate quantity:
    /// maximum for bids, minimum for asks (§4.1 `peek_best`).
    pub fn peek_best(&self) -> Option<(Decimal, Decimal)> {
        let entry = self.best_entry()?;
        Some((*entry.key(), entry.value().total_quantity()))
    }

    fn best_entry(
        &self,
    ) -> Option<crossbeam_skiplist::map::Entry<'_, Decimal, Arc<PriceLevel>>> {
        match self.side {
            Side::Buy => self.levels.back(),
            Side::Sell => self.levels.front(),
        }
    }

    /// The price level at the best price, if the side is non-empty.
    pub fn best_level(&self) -> Option<Arc<PriceLevel>> {
        self.best_entry().map(|e| e.value().clone())
    }

    /// Apply a fill of at most `max_qty` to the resting order at the head
    /// of the FIFO at `price` (clamped to the maker's own remaining
    /// quantity), evicting the order (and, if now empty, the level itself)
    /// when fully filled. Returns the maker's post-fill state and the
    /// quantity actually filled.
    pub fn fill_best(&self, price: Decimal, max_qty: Decimal) -> Option<(Order, Decimal)> {
        let entry = self.levels.get(&price)?;
        let level = entry.value().clone();
        let (filled, fill_qty) = level.fill_front(max_qty)?;
        if filled.remaining().is_zero() {
            self.index.remove(&filled.order_id);
        }
        if level.is_empty() {
            entry.remove();
        }
        Some((filled, fill_qty))
    }

    /// Remove a resting order by id, destroying its level if it becomes
    /// empty (§4.1 `pop_fully_matched`, §4.2 `cancel`). Returns the removed
    /// order if it was present.
    pub fn remove(&self, order_id: OrderId) -> Option<Order> {
        let (_, price) = self.index.remove(&order_id)?;
        let entry = self.levels.get(&price)?;
        let level = entry.value().clone();
        let removed = level.remove(order_id);
        if level.is_empty() {
            entry.remove();
        }
        removed
    }

    pub fn contains(&self, order_id: OrderId) -> bool {
        self.index.contains_key(&order_id)
    }

    /// Top `n` (price, total_quantity) pairs, best-first (§4.1 `depth`).
    pub fn depth(&self, n: usize) -> Vec<(Decimal, Decimal)> {
        let iter: Box<dyn Iterator<Item = _>> = match self.side {
            Side::Buy => Box::new(self.levels.iter().rev()),
            Side::Sell => Box::new(self.levels.iter()),
        };
        iter.take(n)
            .map(|e| (*e.key(), e.value().total_quantity()))
            .collect()
    }

    /// Walk every populated level best-first, applying `f` to each until it
    /// returns `false` or the side is exhausted. Used by the FOK
    /// feasibility pre-check (§4.4) to sum depth without mutating.
    pub fn for_each_level_while<F: FnMut(Decimal, Decimal) -> bool>(&self, mut f: F) {
        let iter: Box<dyn Iterator<Item = _>> = match self.side {
            Side::Buy => Box::new(self.levels.iter().rev()),
            Side::Sell => Box::new(self.levels.iter()),
        };
        for entry in iter {
            if !f(*entry.key(), entry.value().total_quantity()) {
                break;
            }
        }
    }

    /// Snapshot every live resting order across all levels, best-first,
    /// FIFO within a level. Used by snapshot-taking (§4.5).
    pub fn snapshot_orders(&self) -> Vec<Order> {
        let iter: Box<dyn Iterator<Item = _>> = match self.side {
            Side::Buy => Box::new(self.levels.iter().rev()),
            Side::Sell => Box::new(self.levels.iter()),
        };
        iter.flat_map(|e| e.value().snapshot_orders()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderType;

    fn order(side: Side, price: &str, qty: &str, ts: u64) -> Order {
        Order::new(
            "BTC-USDT".into(),
            side,
            OrderType::Limit,
            Some(Decimal::parse(price).unwrap()),
            Decimal::parse(qty).unwrap(),
            ts,
            None,
        )
    }

    #[test]
    fn bids_peek_best_is_maximum_price() {
        let side = OrderBookSide::new(Side::Buy);
        side.add(order(Side::Buy, "100", "1", 1));
        side.add(order(Side::Buy, "105", "1", 2));
        side.add(order(Side::Buy, "99", "1", 3));
        let (price, _) = side.peek_best().unwrap();
        assert_eq!(price, Decimal::parse("105").unwrap());
    }

    #[test]
    fn asks_peek_best_is_minimum_price() {
        let side = OrderBookSide::new(Side::Sell);
        side.add(order(Side::Sell, "100", "1", 1));
        side.add(order(Side::Sell, "95", "1", 2));
        let (price, _) = side.peek_best().unwrap();
        assert_eq!(price, Decimal::parse("95").unwrap());
    }

    #[test]
    fn empty_level_is_evicted_after_full_fill() {
        let side = OrderBookSide::new(Side::Sell);
        side.add(order(Side::Sell, "100", "1", 1));
        let price = Decimal::parse("100").unwrap();
        side.fill_best(price, Decimal::parse("1").unwrap()).unwrap();
        assert!(side.is_empty());
        assert!(side.peek_best().is_none());
    }

    #[test]
    fn remove_evicts_level_when_last_order_cancelled() {
        let side = OrderBookSide::new(Side::Buy);
        let o = order(Side::Buy, "100", "1", 1);
        let id = o.order_id;
        side.add(o);
        let removed = side.remove(id).unwrap();
        assert_eq!(removed.order_id, id);
        assert!(side.is_empty());
    }

    #[test]
    fn depth_is_best_first_and_limited() {
        let side = OrderBookSide::new(Side::Buy);
        side.add(order(Side::Buy, "100", "1", 1));
        side.add(order(Side::Buy, "101", "1", 2));
        side.add(order(Side::Buy, "102", "1", 3));
        let d = side.depth(2);
        assert_eq!(d.len(), 2);
        assert_eq!(d[0].0, Decimal::parse("102").unwrap());
        assert_eq!(d[1].0, Decimal::parse("101").unwrap());
    }
}
