//! Price-time priority matching (§4.4).
//!
//! One function, [`walk`], implements the shared best-first, FIFO-head-first
//! sweep used by every order type. MARKET, LIMIT, and the price-bearing
//! variant of IOC differ only in whether a price predicate bounds the walk;
//! FOK additionally runs a feasibility pre-check ([`is_feasible`]) before
//! calling it. The residual action (rest on the book vs. cancel-unfilled)
//! is the caller's decision, made in [`match_order`].

use crate::decimal::Decimal;
use crate::fees::FeeSchedule;
use crate::order::{Order, OrderType, Side};
use crate::orderbook::OrderBook;
use crate::trade::Trade;

/// Whether a resting price at `maker_price` is marketable against an
/// incoming `side` order bounded by `limit` (`None` = no bound, i.e. a
/// market sweep).
fn crosses(side: Side, limit: Option<Decimal>, maker_price: Decimal) -> bool {
    match limit {
        None => true,
        Some(p) => match side {
            Side::Buy => maker_price <= p,
            Side::Sell => maker_price >= p,
        },
    }
}

/// Walk the opposite side best-first, filling `taker` against resting FIFO
/// queues until `taker` is exhausted, the opposite side is empty, or (when
/// `limit` is `Some`) the best remaining price no longer crosses. Every
/// trade prices at the maker's resting price — the no-trade-through
/// guarantee (§4.4 "Trade pricing"). Mutates `taker`'s fill state in place
/// via [`Order::apply_fill`] and returns the trades emitted, in the order
/// they occurred.
pub fn walk(
    book: &OrderBook,
    taker: &mut Order,
    limit: Option<Decimal>,
    fees: &FeeSchedule,
    timestamp: u64,
) -> Vec<Trade> {
    let mut trades = Vec::new();
    let opposite = book.opposite_side(taker.side);

    loop {
        if taker.remaining().is_zero() {
            break;
        }
        let Some((best_price, _)) = opposite.peek_best() else {
            break;
        };
        if !crosses(taker.side, limit, best_price) {
            break;
        }

        // Drain the FIFO at `best_price` head-first until the taker is
        // filled or the level is exhausted (in which case the next
        // iteration of the outer loop picks up the next best price).
        loop {
            if taker.remaining().is_zero() {
                break;
            }
            let Some((maker, fill_qty)) =
                book.apply_maker_fill(taker.side.opposite(), best_price, taker.remaining())
            else {
                break;
            };
            taker.apply_fill(fill_qty);

            let (maker_order_id, taker_order_id) = (maker.order_id, taker.order_id);
            let maker_fee = fees.calculate_fee(fill_qty, best_price, true);
            let taker_fee = fees.calculate_fee(fill_qty, best_price, false);
            trades.push(Trade {
                trade_id: crate::trade::TradeId::new(),
                symbol: taker.symbol.clone(),
                price: best_price,
                quantity: fill_qty,
                aggressor_side: taker.side,
                maker_order_id,
                taker_order_id,
                maker_fee,
                taker_fee,
                timestamp,
            });
        }
    }

    trades
}

/// The FOK feasibility pre-check (§4.4 "Feasibility check"): sums
/// aggregate level quantity on the opposite side, best-first, stopping at
/// the first level that no longer crosses `limit`. Feasible iff the
/// running sum reaches `quantity` at or before that bound. Read-only: does
/// not touch the book.
pub fn is_feasible(book: &OrderBook, side: Side, quantity: Decimal, limit: Option<Decimal>) -> bool {
    let opposite = book.opposite_side(side);
    let mut sum = Decimal::ZERO;
    let mut reached = false;
    opposite.for_each_level_while(|price, level_qty| {
        if !crosses(side, limit, price) {
            return false;
        }
        sum = sum.checked_add(level_qty).unwrap_or(sum);
        if sum >= quantity {
            reached = true;
            return false;
        }
        true
    });
    reached
}

/// Execute the full per-type matching algorithm for one admitted order
/// (§4.4). Returns the taker's final state; trades are returned
/// separately. Residual quantity after the walk either rests on the book
/// (LIMIT) or is cancelled (MARKET / IOC / FOK never rest, §3).
///
/// `FOK` is the only branch with two phases: the feasibility check runs
/// first, under the same critical section as the walk, so no partial FOK
/// state is ever observable (§4.4 "Both phases occur atomically").
pub fn match_order(
    book: &OrderBook,
    mut taker: Order,
    fees: &FeeSchedule,
    timestamp: u64,
) -> (Order, Vec<Trade>) {
    match taker.order_type {
        OrderType::Market => {
            let trades = walk(book, &mut taker, None, fees, timestamp);
            if taker.remaining().is_positive() {
                taker.cancel_remainder();
            }
            (taker, trades)
        }
        OrderType::Limit => {
            let limit = taker.price;
            let trades = walk(book, &mut taker, limit, fees, timestamp);
            if taker.remaining().is_positive() {
                let resting = taker.clone();
                // `add_resting` cannot fail here: `order_id` is freshly
                // minted at admission and cannot already be on the book.
                let _ = book.add_resting(resting);
            }
            (taker, trades)
        }
        OrderType::Ioc => {
            let limit = taker.price;
            let trades = walk(book, &mut taker, limit, fees, timestamp);
            if taker.remaining().is_positive() {
                taker.cancel_remainder();
            }
            (taker, trades)
        }
        OrderType::Fok => {
            let limit = taker.price;
            if !is_feasible(book, taker.side, taker.remaining(), limit) {
                taker.status = crate::order::OrderStatus::Cancelled;
                return (taker, Vec::new());
            }
            let trades = walk(book, &mut taker, limit, fees, timestamp);
            debug_assert!(
                taker.remaining().is_zero(),
                "FOK feasibility check guarantees a complete fill"
            );
            (taker, trades)
        }
    }
}
