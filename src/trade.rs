//! Trade records (§3 Trade, §6 egress "trade broadcast").

use crate::decimal::Decimal;
use crate::order::{OrderId, Side};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// A unique, stable trade identifier assigned on emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TradeId(Uuid);

impl TradeId {
    pub fn new() -> Self {
        TradeId(Uuid::new_v4())
    }
}

impl Default for TradeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TradeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single (taker, maker) intersection emitted by the matching algorithm.
/// Immutable once emitted (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: TradeId,
    pub symbol: String,
    /// The maker's (resting) order price — the no-trade-through guarantee
    /// (§4.4 "Trade pricing").
    pub price: Decimal,
    pub quantity: Decimal,
    /// Side of the incoming (taker) order.
    pub aggressor_side: Side,
    pub maker_order_id: OrderId,
    pub taker_order_id: OrderId,
    pub maker_fee: Decimal,
    pub taker_fee: Decimal,
    pub timestamp: u64,
}

/// A listener invoked once per emitted trade, used to wire up persistence
/// and market-data broadcast without either depending on the matching
/// engine directly.
pub type TradeListener = Arc<dyn Fn(&Trade) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    fn trade() -> Trade {
        Trade {
            trade_id: TradeId::new(),
            symbol: "BTC-USDT".into(),
            price: Decimal::parse("50000").unwrap(),
            quantity: Decimal::parse("1.0").unwrap(),
            aggressor_side: Side::Buy,
            maker_order_id: OrderId::new(),
            taker_order_id: OrderId::new(),
            maker_fee: Decimal::ZERO,
            taker_fee: Decimal::ZERO,
            timestamp: 1,
        }
    }

    #[test]
    fn trade_ids_are_unique() {
        let a = trade();
        let b = trade();
        assert_ne!(a.trade_id, b.trade_id);
    }

    #[test]
    fn trade_roundtrips_through_json() {
        let t = trade();
        let json = serde_json::to_string(&t).unwrap();
        let back: Trade = serde_json::from_str(&json).unwrap();
        assert_eq!(back.price, t.price);
        assert_eq!(back.quantity, t.quantity);
    }
}
