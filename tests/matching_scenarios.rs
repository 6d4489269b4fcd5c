//! End-to-end scenarios driven through `Router`/`SymbolEngine` rather than
//! the matching internals directly, exercising validation, persistence
//! enqueueing, and trade-history bookkeeping together with the matching
//! logic they wrap.

use exchange_core::prelude::*;
use std::sync::Arc;

fn router(symbol: &str) -> Router {
    // Several tests run concurrently in this binary, so `try_init` rather
    // than `init`: the first call wins, the rest are no-ops instead of panics.
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();

    let mut config = EngineConfig::default();
    config.symbols.insert(symbol.to_string());
    Router::new(
        Arc::new(config),
        Arc::new(EngineMetrics::default()),
        |_symbol| Arc::new(MemoryJournal::new()),
    )
}

fn order(symbol: &str, side: Side, order_type: OrderType, price: Option<&str>, qty: &str) -> OrderRequest {
    OrderRequest {
        symbol: symbol.to_string(),
        side,
        order_type,
        price: price.map(|p| Decimal::parse(p).unwrap()),
        quantity: Decimal::parse(qty).unwrap(),
        client_order_id: None,
        user_id: None,
    }
}

#[tokio::test]
async fn simple_limit_match_fills_both_sides_at_the_makers_price() {
    let router = router("BTC-USDT");
    let maker = router.submit_order(order("BTC-USDT", Side::Sell, OrderType::Limit, Some("100"), "1.0"));
    assert!(maker.success);
    assert_eq!(maker.status, "pending");

    let taker = router.submit_order(order("BTC-USDT", Side::Buy, OrderType::Limit, Some("101"), "1.0"));
    assert!(taker.success);
    assert_eq!(taker.status, "filled");
    assert_eq!(taker.trades.len(), 1);
    assert_eq!(taker.trades[0].price, Decimal::parse("100").unwrap());
}

#[tokio::test]
async fn walks_levels_best_first_then_time_priority_within_a_level() {
    let router = router("BTC-USDT");
    router.submit_order(order("BTC-USDT", Side::Sell, OrderType::Limit, Some("101"), "1.0"));
    let first_at_100 = router.submit_order(order("BTC-USDT", Side::Sell, OrderType::Limit, Some("100"), "1.0"));
    let second_at_100 = router.submit_order(order("BTC-USDT", Side::Sell, OrderType::Limit, Some("100"), "1.0"));

    let taker = router.submit_order(order("BTC-USDT", Side::Buy, OrderType::Limit, Some("101"), "2.0"));
    assert!(taker.success);
    assert_eq!(taker.trades.len(), 2);
    // Best price (100) fills first, in FIFO order within that level.
    assert_eq!(taker.trades[0].price, Decimal::parse("100").unwrap());
    assert_eq!(taker.trades[1].price, Decimal::parse("100").unwrap());

    let remaining_101 = router
        .engine("BTC-USDT")
        .unwrap()
        .bbo();
    assert_eq!(remaining_101.best_ask, Some(Decimal::parse("101").unwrap()));

    let _ = (first_at_100, second_at_100);
}

#[tokio::test]
async fn never_trades_through_a_better_resting_price() {
    let router = router("BTC-USDT");
    router.submit_order(order("BTC-USDT", Side::Sell, OrderType::Limit, Some("100"), "0.5"));
    router.submit_order(order("BTC-USDT", Side::Sell, OrderType::Limit, Some("105"), "1.0"));

    let taker = router.submit_order(order("BTC-USDT", Side::Buy, OrderType::Limit, Some("105"), "1.5"));
    assert_eq!(taker.trades.len(), 2);
    // Every fill prices at the resting maker's level, never worse than 105,
    // and the cheaper level trades first.
    for trade in &taker.trades {
        assert!(trade.price <= Decimal::parse("105").unwrap());
    }
    assert_eq!(taker.trades[0].price, Decimal::parse("100").unwrap());
}

#[tokio::test]
async fn fok_with_insufficient_liquidity_produces_no_trades_and_does_not_rest() {
    let router = router("BTC-USDT");
    router.submit_order(order("BTC-USDT", Side::Sell, OrderType::Limit, Some("100"), "0.5"));

    let taker = router.submit_order(order("BTC-USDT", Side::Buy, OrderType::Fok, Some("100"), "1.0"));
    assert!(taker.success);
    assert_eq!(taker.status, "cancelled");
    assert!(taker.trades.is_empty());

    // The untouched resting maker is still there, unaffected by the
    // rejected FOK.
    let bbo = router.engine("BTC-USDT").unwrap().bbo();
    assert_eq!(bbo.best_ask, Some(Decimal::parse("100").unwrap()));
}

#[tokio::test]
async fn fok_with_sufficient_liquidity_fills_completely() {
    let router = router("BTC-USDT");
    router.submit_order(order("BTC-USDT", Side::Sell, OrderType::Limit, Some("100"), "1.0"));

    let taker = router.submit_order(order("BTC-USDT", Side::Buy, OrderType::Fok, Some("100"), "1.0"));
    assert!(taker.success);
    assert_eq!(taker.status, "filled");
    assert_eq!(taker.trades.len(), 1);
}

#[tokio::test]
async fn ioc_fills_what_it_can_and_cancels_the_remainder_instead_of_resting() {
    let router = router("BTC-USDT");
    router.submit_order(order("BTC-USDT", Side::Sell, OrderType::Limit, Some("100"), "0.4"));

    let taker = router.submit_order(order("BTC-USDT", Side::Buy, OrderType::Ioc, Some("100"), "1.0"));
    assert!(taker.success);
    assert_eq!(taker.status, "partially_filled");
    assert_eq!(taker.trades.len(), 1);
    assert_eq!(taker.remaining_quantity, Decimal::parse("0.6").unwrap());

    // The unfilled remainder never rests: the book is now empty.
    let bbo = router.engine("BTC-USDT").unwrap().bbo();
    assert_eq!(bbo.best_bid, None);
    assert_eq!(bbo.best_ask, None);
}

#[tokio::test]
async fn ioc_with_zero_liquidity_cancels_without_ever_resting() {
    let router = router("BTC-USDT");
    let taker = router.submit_order(order("BTC-USDT", Side::Buy, OrderType::Ioc, Some("100"), "1.0"));
    assert!(taker.success);
    assert_eq!(taker.status, "cancelled");
    assert!(taker.trades.is_empty());
    assert_eq!(router.engine("BTC-USDT").unwrap().bbo().best_bid, None);
}

#[tokio::test]
async fn market_order_sweeps_the_book_and_never_rests_unfilled() {
    let router = router("BTC-USDT");
    router.submit_order(order("BTC-USDT", Side::Sell, OrderType::Limit, Some("100"), "0.3"));
    router.submit_order(order("BTC-USDT", Side::Sell, OrderType::Limit, Some("101"), "0.3"));

    let taker = router.submit_order(order("BTC-USDT", Side::Buy, OrderType::Market, None, "1.0"));
    assert!(taker.success);
    assert_eq!(taker.trades.len(), 2);
    assert_eq!(taker.status, "partially_filled");
    assert_eq!(router.engine("BTC-USDT").unwrap().bbo().best_ask, None);
}

#[tokio::test]
async fn cancel_removes_a_resting_order_and_it_no_longer_matches() {
    let router = router("BTC-USDT");
    let resp = router.submit_order(order("BTC-USDT", Side::Sell, OrderType::Limit, Some("100"), "1.0"));
    let order_id = resp.order_id.unwrap();

    let cancel = router.cancel_order(CancelRequest {
        symbol: "BTC-USDT".into(),
        order_id,
    });
    assert!(cancel.success);

    let taker = router.submit_order(order("BTC-USDT", Side::Buy, OrderType::Limit, Some("100"), "1.0"));
    assert!(taker.trades.is_empty());
    assert_eq!(taker.status, "pending");
}

#[tokio::test]
async fn unknown_symbol_is_rejected_rather_than_panicking() {
    let router = router("BTC-USDT");
    let resp = router.submit_order(order("ETH-USDT", Side::Buy, OrderType::Market, None, "1.0"));
    assert!(!resp.success);
    assert!(resp.reason.is_some());
}

#[tokio::test]
async fn limit_order_without_a_price_is_rejected() {
    let router = router("BTC-USDT");
    let resp = router.submit_order(order("BTC-USDT", Side::Buy, OrderType::Limit, None, "1.0"));
    assert!(!resp.success);
}

#[tokio::test]
async fn non_positive_quantity_is_rejected() {
    let router = router("BTC-USDT");
    let resp = router.submit_order(order("BTC-USDT", Side::Buy, OrderType::Limit, Some("100"), "0"));
    assert!(!resp.success);
}
