//! Market-data publication and broadcast fan-out (§4.6).

pub mod broadcast;
#[cfg(feature = "nats")]
pub mod nats_egress;
pub mod publisher;

pub use broadcast::{BroadcastAggregator, SubscriberId};
#[cfg(feature = "nats")]
pub use nats_egress::NatsEgressPublisher;
pub use publisher::MarketDataPublisher;

use crate::engine::SymbolEngine;
use crate::ingress::TradeBroadcast;
use std::sync::Arc;

/// Register a listener on `engine` that forwards every emitted trade to
/// `aggregator` as a [`TradeBroadcast`] (§4.6 "On each trade: emit a trade
/// record"). Trades are queued individually, one per (taker, maker)
/// intersection, never folded into an aggregate (§4.6 resolved Open
/// Question).
pub fn wire_trade_broadcast(engine: &SymbolEngine, aggregator: Arc<BroadcastAggregator>) {
    let symbol = engine.symbol.clone();
    engine.add_trade_listener(Arc::new(move |trade| {
        aggregator.queue_trade(
            &symbol,
            TradeBroadcast {
                symbol: trade.symbol.clone(),
                trade_id: trade.trade_id.to_string(),
                price: trade.price,
                quantity: trade.quantity,
                aggressor_side: trade.aggressor_side,
                maker_order_id: trade.maker_order_id,
                taker_order_id: trade.taker_order_id,
                timestamp: trade.timestamp,
            },
        );
    }));
}
