//! The market-data publisher (§4.6 "Trigger", "Content", "Dirty-flag
//! granularity"): samples each symbol's dirty flag outside the critical
//! section and queues a market-data record with the aggregator when the
//! book has moved.

use crate::engine::Router;
use crate::ingress::{Bbo as WireBbo, DepthView as WireDepth, MarketDataBroadcast};
use crate::market_data::broadcast::BroadcastAggregator;
use crate::orderbook::{Bbo, DepthView};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn to_wire_bbo(bbo: Bbo) -> WireBbo {
    WireBbo {
        best_bid: bbo.best_bid,
        best_ask: bbo.best_ask,
        spread: bbo.spread(),
    }
}

fn to_wire_depth(depth: DepthView) -> WireDepth {
    WireDepth {
        bids: depth.bids,
        asks: depth.asks,
    }
}

/// Samples every symbol's dirty flag on a fixed tick. A dirty sample always
/// queues a fresh market-data record regardless of whether the change was
/// to the touch or only to depth behind it — bounding staleness of a
/// depth-only change to one broadcast window without needing a second,
/// BBO-triggered publish path (§4.6 resolved Open Question; see DESIGN.md).
pub struct MarketDataPublisher {
    router: Arc<Router>,
    aggregator: Arc<BroadcastAggregator>,
    depth_levels: usize,
}

impl MarketDataPublisher {
    pub fn new(router: Arc<Router>, aggregator: Arc<BroadcastAggregator>, depth_levels: usize) -> Arc<Self> {
        Arc::new(MarketDataPublisher {
            router,
            aggregator,
            depth_levels,
        })
    }

    pub fn spawn(self: &Arc<Self>, tick: Duration) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(tick);
            loop {
                ticker.tick().await;
                this.sample_all();
            }
        });
    }

    pub fn sample_all(&self) {
        let symbols: Vec<String> = self.router.symbols().map(str::to_string).collect();
        for symbol in symbols {
            self.sample_one(&symbol);
        }
    }

    fn sample_one(&self, symbol: &str) {
        let Some(engine) = self.router.engine(symbol) else {
            return;
        };
        if !engine.take_dirty() {
            return;
        }
        let broadcast = MarketDataBroadcast {
            symbol: symbol.to_string(),
            timestamp: now_ms(),
            bbo: to_wire_bbo(engine.bbo()),
            depth: to_wire_depth(engine.depth(self.depth_levels)),
        };
        self.aggregator.queue_market_data(symbol, broadcast);
    }

    /// Build the immediate snapshot sent to a new subscriber on
    /// `SUBSCRIBE` (§4.6 "Subscription model"), independent of the dirty
    /// flag.
    pub fn snapshot(&self, symbol: &str) -> Option<MarketDataBroadcast> {
        let engine = self.router.engine(symbol)?;
        Some(MarketDataBroadcast {
            symbol: symbol.to_string(),
            timestamp: now_ms(),
            bbo: to_wire_bbo(engine.bbo()),
            depth: to_wire_depth(engine.depth(self.depth_levels)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::ingress::OrderRequest;
    use crate::metrics::EngineMetrics;
    use crate::order::{OrderType, Side};
    use crate::persistence::MemoryJournal;

    fn router() -> Arc<Router> {
        let mut config = EngineConfig::default();
        config.symbols.insert("BTC-USDT".into());
        Arc::new(Router::new(
            Arc::new(config),
            Arc::new(EngineMetrics::default()),
            |_| Arc::new(MemoryJournal::new()),
        ))
    }

    #[tokio::test]
    async fn dirty_book_queues_a_market_data_record() {
        let router = router();
        router.submit_order(OrderRequest {
            symbol: "BTC-USDT".into(),
            side: Side::Buy,
            order_type: OrderType::Limit,
            price: Some(crate::decimal::Decimal::parse("100").unwrap()),
            quantity: crate::decimal::Decimal::parse("1").unwrap(),
            client_order_id: None,
            user_id: None,
        });

        let aggregator = BroadcastAggregator::new();
        let publisher = MarketDataPublisher::new(Arc::clone(&router), Arc::clone(&aggregator), 10);
        publisher.sample_all();

        let (tx, mut rx) = tokio::sync::mpsc::channel(8);
        aggregator.subscribe(
            crate::ingress::SubscribeRequest {
                symbols: vec!["BTC-USDT".into()],
                trades: false,
                market_data: true,
            },
            tx,
            |_| None,
        );
        aggregator.flush();
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn clean_book_queues_nothing_on_the_next_sample() {
        let router = router();
        let aggregator = BroadcastAggregator::new();
        let publisher = MarketDataPublisher::new(router, Arc::clone(&aggregator), 10);
        // First sample on an untouched book finds nothing dirty.
        publisher.sample_all();

        let (tx, mut rx) = tokio::sync::mpsc::channel(8);
        aggregator.subscribe(
            crate::ingress::SubscribeRequest {
                symbols: vec!["BTC-USDT".into()],
                trades: false,
                market_data: true,
            },
            tx,
            |_| None,
        );
        aggregator.flush();
        assert!(rx.try_recv().is_err());
    }
}
