//! The order book: price levels, ordered best-price access, and the
//! two-sided container that sits underneath one symbol's engine
//! (§3 DATA MODEL, §4.1-4.2).

pub mod book;
pub mod side;

pub use book::{Bbo, DepthView, OrderBook};
pub use side::OrderBookSide;
