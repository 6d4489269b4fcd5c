//! Property-based checks of the matching engine's universal invariants
//! (§3, §8): mass conservation, a never-crossed resting book, and the
//! no-trade-through guarantee, across randomly generated order sequences.

use exchange_core::decimal::Decimal;
use exchange_core::engine::matching::match_order;
use exchange_core::fees::FeeSchedule;
use exchange_core::order::{Order, OrderType, Side};
use exchange_core::orderbook::OrderBook;
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct Intent {
    side: Side,
    order_type: OrderType,
    price_ticks: u32,
    qty_ticks: u32,
}

fn intent_strategy() -> impl Strategy<Value = Intent> {
    (
        prop_oneof![Just(Side::Buy), Just(Side::Sell)],
        prop_oneof![
            Just(OrderType::Limit),
            Just(OrderType::Limit),
            Just(OrderType::Market),
            Just(OrderType::Ioc),
            Just(OrderType::Fok),
        ],
        1u32..20,
        1u32..10,
    )
        .prop_map(|(side, order_type, price_ticks, qty_ticks)| Intent {
            side,
            order_type,
            price_ticks,
            qty_ticks,
        })
}

fn to_order(intent: &Intent, ts: u64) -> Order {
    let price = Decimal::parse(&format!("{}", 100 + intent.price_ticks)).unwrap();
    let qty = Decimal::parse(&format!("{}", intent.qty_ticks)).unwrap();
    let price = match intent.order_type {
        OrderType::Market => None,
        _ => Some(price),
    };
    Order::new("BTC-USDT".into(), intent.side, intent.order_type, price, qty, ts, None)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// The book is never crossed after any sequence of admitted orders:
    /// every crossing price is consumed by matching before anything is
    /// allowed to rest (§3, §8 "Non-crossed book").
    #[test]
    fn book_is_never_crossed(intents in prop::collection::vec(intent_strategy(), 1..30)) {
        let book = OrderBook::new("BTC-USDT");
        let fees = FeeSchedule::zero();
        for (i, intent) in intents.iter().enumerate() {
            let order = to_order(intent, i as u64);
            let (_, _trades) = match_order(&book, order, &fees, i as u64);
            prop_assert!(!book.is_crossed());
        }
    }

    /// Every trade prices at or better than the taker's limit and never
    /// worse than the maker's resting price it executed against — the
    /// no-trade-through guarantee holds for every trade in every sequence
    /// (§4.4 "Trade pricing").
    #[test]
    fn every_trade_respects_the_takers_limit(intents in prop::collection::vec(intent_strategy(), 1..30)) {
        let book = OrderBook::new("BTC-USDT");
        let fees = FeeSchedule::zero();
        for (i, intent) in intents.iter().enumerate() {
            let order = to_order(intent, i as u64);
            let limit = order.price;
            let side = order.side;
            let (_, trades) = match_order(&book, order, &fees, i as u64);
            for trade in &trades {
                if let Some(limit_price) = limit {
                    match side {
                        Side::Buy => prop_assert!(trade.price <= limit_price),
                        Side::Sell => prop_assert!(trade.price >= limit_price),
                    }
                }
            }
        }
    }

    /// Mass conservation: the sum of a taker's fills never exceeds its
    /// original quantity, and every trade's quantity is strictly positive
    /// (§3 Invariant: `remaining = quantity - filled_quantity >= 0`).
    #[test]
    fn taker_never_fills_more_than_its_own_quantity(intents in prop::collection::vec(intent_strategy(), 1..30)) {
        let book = OrderBook::new("BTC-USDT");
        let fees = FeeSchedule::zero();
        for (i, intent) in intents.iter().enumerate() {
            let order = to_order(intent, i as u64);
            let original_qty = order.quantity;
            let (taker, trades) = match_order(&book, order, &fees, i as u64);
            prop_assert!(taker.filled_quantity <= original_qty);
            for trade in &trades {
                prop_assert!(trade.quantity.is_positive());
            }
        }
    }

    /// IOC and FOK never leave a resting order behind, regardless of
    /// whether they filled, partially filled, or filled nothing (§3 Non-goals,
    /// §4.4).
    #[test]
    fn ioc_and_fok_never_rest(intents in prop::collection::vec(intent_strategy(), 1..30)) {
        let book = OrderBook::new("BTC-USDT");
        let fees = FeeSchedule::zero();
        for (i, intent) in intents.iter().enumerate() {
            let order = to_order(intent, i as u64);
            let never_rests = order.order_type.never_rests();
            let id = order.order_id;
            let (_, _trades) = match_order(&book, order, &fees, i as u64);
            if never_rests {
                prop_assert!(!book.contains(id));
            }
        }
    }
}
