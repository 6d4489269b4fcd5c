//! # exchange-core
//!
//! The core of a limit-order matching engine for a multi-symbol spot
//! exchange: a price-time-priority order book, MARKET/LIMIT/IOC/FOK
//! matching with a strict no-trade-through guarantee, an event-sourced
//! persistence and crash-recovery model, and a batched market-data
//! broadcast pipeline.
//!
//! This crate is transport-neutral (see [`ingress`]): it has no opinion on
//! how orders arrive or how egress records leave the process. Wiring it to
//! a socket, an HTTP handler, or a message bus is the caller's job.
//!
//! ## Layout
//!
//! - [`decimal`] — the exact fixed-precision numeric type used for every
//!   price, quantity, and fee.
//! - [`order`] / [`trade`] / [`price_level`] — the data model (§3).
//! - [`orderbook`] — the two-sided, per-symbol order book (§4.1-4.2).
//! - [`engine`] — validation, matching, and the per-symbol critical
//!   section, plus the router that dispatches ingress to the right symbol
//!   (§4.3-4.4, §5).
//! - [`persistence`] — the append-only event log, snapshots, and the
//!   recovery protocol that replays them back into a live book (§4.5).
//! - [`market_data`] — the dirty-flag publisher and broadcast aggregator
//!   that turn book mutations into batched subscriber fan-out (§4.6).
//! - [`ingress`] — the transport-neutral wire schema (§6).
//! - [`config`], [`error`], [`fees`], [`metrics`] — the ambient stack:
//!   configuration, the error taxonomy, fee computation, and exposed
//!   engine metrics.
//!
//! Start with [`prelude`] for the common set of types.

pub mod config;
pub mod decimal;
pub mod engine;
pub mod error;
pub mod fees;
pub mod ingress;
pub mod market_data;
pub mod metrics;
pub mod order;
pub mod orderbook;
pub mod persistence;
pub mod prelude;
pub mod price_level;
pub mod trade;

pub use config::EngineConfig;
pub use decimal::{Decimal, DecimalError};
pub use engine::{Router, SymbolEngine};
pub use error::EngineError;
pub use fees::FeeSchedule;
pub use metrics::{EngineMetrics, MetricsSnapshot};
pub use order::{Order, OrderId, OrderStatus, OrderType, Side};
pub use orderbook::{Bbo, DepthView, OrderBook, OrderBookSide};
#[cfg(feature = "journal")]
pub use persistence::FileJournal;
pub use persistence::{
    Journal, JournalEntry, JournalError, MemoryJournal, PersistedEvent, RecoveredEngine, Snapshot,
    recover,
};
pub use trade::{Trade, TradeId, TradeListener};
