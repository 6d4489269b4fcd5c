//! Engine-level error taxonomy.
//!
//! [`EngineError`] covers the book/matching layer: every variant here maps
//! to a `REJECTED` response or a `success=false` cancel response, never to
//! a process-level fault. Persistence-layer failures live in
//! [`crate::persistence::JournalError`] and are handled separately (most
//! never reach a client at all; see §7 of the design).

use crate::decimal::Decimal;
use crate::order::Side;
use std::fmt;

/// Errors produced while validating or matching an order.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum EngineError {
    /// The order references a symbol this engine does not own.
    UnknownSymbol { symbol: String },

    /// Quantity was zero, negative, or exceeded `max_order_quantity`.
    InvalidQuantity { quantity: Decimal, max: Option<Decimal> },

    /// A LIMIT order was missing a price, or its price was not positive.
    MissingPrice,

    /// Price exceeded the configured `max_order_price`.
    PriceOutOfRange { price: Decimal, max: Decimal },

    /// The order type could not be recognized from the ingress message.
    UnrecognizedOrderType { raw: String },

    /// An order_id that is already present in the book was submitted again.
    DuplicateOrderId { order_id: String },

    /// A cancel referenced an order_id the book does not know about.
    OrderNotFound { order_id: String },

    /// A cancel referenced an order that has already reached a terminal
    /// status (FILLED, CANCELLED, or REJECTED).
    OrderAlreadyTerminal { order_id: String },

    /// The ingress queue for this symbol was full.
    IngressBackPressure { symbol: String },

    /// A price level's recorded total did not match the sum of its live
    /// orders' remaining quantities. Fatal: the caller should halt ingress
    /// for the affected symbol.
    LevelTotalMismatch {
        symbol: String,
        side: Side,
        price: Decimal,
        expected: Decimal,
        actual: Decimal,
    },

    /// The book observed `best_bid >= best_ask` outside of the matching
    /// critical section. Fatal.
    CrossedBook {
        symbol: String,
        best_bid: Decimal,
        best_ask: Decimal,
    },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::UnknownSymbol { symbol } => {
                write!(f, "unknown symbol: {symbol}")
            }
            EngineError::InvalidQuantity { quantity, max } => match max {
                Some(max) => write!(
                    f,
                    "invalid quantity {quantity}: must be positive and at most {max}"
                ),
                None => write!(f, "invalid quantity {quantity}: must be positive"),
            },
            EngineError::MissingPrice => {
                write!(f, "limit order requires a positive price")
            }
            EngineError::PriceOutOfRange { price, max } => {
                write!(f, "price {price} exceeds configured maximum {max}")
            }
            EngineError::UnrecognizedOrderType { raw } => {
                write!(f, "unrecognized order type: {raw}")
            }
            EngineError::DuplicateOrderId { order_id } => {
                write!(f, "duplicate order_id: {order_id}")
            }
            EngineError::OrderNotFound { order_id } => {
                write!(f, "order not found: {order_id}")
            }
            EngineError::OrderAlreadyTerminal { order_id } => {
                write!(f, "order already terminal: {order_id}")
            }
            EngineError::IngressBackPressure { symbol } => {
                write!(f, "ingress queue full for symbol {symbol}; retry")
            }
            EngineError::LevelTotalMismatch {
                symbol,
                side,
                price,
                expected,
                actual,
            } => write!(
                f,
                "level total mismatch on {symbol} {side:?} @ {price}: expected {expected}, got {actual}"
            ),
            EngineError::CrossedBook {
                symbol,
                best_bid,
                best_ask,
            } => write!(
                f,
                "crossed book observed on {symbol}: best_bid {best_bid} >= best_ask {best_ask}"
            ),
        }
    }
}

impl std::error::Error for EngineError {}

impl EngineError {
    /// Whether this error represents a fatal internal-invariant violation
    /// (§7: "Internal invariant violation") rather than an ordinary
    /// rejection of a client request.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::LevelTotalMismatch { .. } | EngineError::CrossedBook { .. }
        )
    }
}
