//! Convenient single import for the types most callers need.
//!
//! ```rust
//! use exchange_core::prelude::*;
//! ```

// Core data model
pub use crate::decimal::{Decimal, DecimalError};
pub use crate::order::{Order, OrderId, OrderStatus, OrderType, Side};
pub use crate::trade::{Trade, TradeId, TradeListener};

// Order book
pub use crate::orderbook::{Bbo, DepthView, OrderBook, OrderBookSide};

// Engine: validation, matching, routing
pub use crate::engine::{Router, SymbolEngine};
pub use crate::error::EngineError;

// Configuration and fees
pub use crate::config::EngineConfig;
pub use crate::fees::FeeSchedule;

// Metrics
pub use crate::metrics::{EngineMetrics, MetricsSnapshot};

// Transport-neutral wire schema
pub use crate::ingress::{
    CancelRequest, CancelResponse, EgressMessage, IngressMessage, MarketDataBroadcast,
    OrderRequest, OrderResponse, SubscribeRequest, TradeBroadcast, TradeFill,
};

// Market data publication and broadcast
pub use crate::market_data::{BroadcastAggregator, MarketDataPublisher, SubscriberId};
#[cfg(feature = "nats")]
pub use crate::market_data::NatsEgressPublisher;

// Persistence and recovery
#[cfg(feature = "journal")]
pub use crate::persistence::FileJournal;
pub use crate::persistence::{
    Journal, JournalEntry, JournalError, MemoryJournal, PersistedEvent, RecoveredEngine, Snapshot,
    recover,
};
