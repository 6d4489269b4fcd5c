//! The broadcast aggregator (§4.6 "Broadcast batching", "Subscription
//! model"): coalesces trade and market-data records per symbol and fans
//! them out to subscribers once per window, isolating one slow or closed
//! subscriber from the rest.

use crate::ingress::{EgressMessage, MarketDataBroadcast, SubscribeRequest, TradeBroadcast};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub type SubscriberId = u64;

struct Subscriber {
    symbols: HashSet<String>,
    trades: bool,
    market_data: bool,
    tx: mpsc::Sender<Vec<EgressMessage>>,
}

/// Per-symbol pending records plus the registered subscriber set. One
/// instance serves every symbol; fan-out isolation is per-subscriber, not
/// per-symbol, since a subscriber can follow several symbols at once.
pub struct BroadcastAggregator {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<SubscriberId, Subscriber>>,
    pending: Mutex<HashMap<String, Vec<EgressMessage>>>,
}

impl BroadcastAggregator {
    pub fn new() -> Arc<Self> {
        Arc::new(BroadcastAggregator {
            next_id: AtomicU64::new(0),
            subscribers: Mutex::new(HashMap::new()),
            pending: Mutex::new(HashMap::new()),
        })
    }

    /// Spawn the periodic flush loop at the configured broadcast window.
    pub fn spawn_flush_loop(self: &Arc<Self>, window: Duration) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(window);
            loop {
                ticker.tick().await;
                this.flush();
            }
        });
    }

    /// Register a subscriber and, if it asked for market-data, send it
    /// `snapshot`'s current BBO/depth for each symbol immediately
    /// (§4.6 "On subscribe, the current BBO/depth snapshot is sent
    /// immediately").
    pub fn subscribe(
        &self,
        req: SubscribeRequest,
        tx: mpsc::Sender<Vec<EgressMessage>>,
        snapshot: impl Fn(&str) -> Option<MarketDataBroadcast>,
    ) -> SubscriberId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if req.market_data {
            let initial: Vec<EgressMessage> = req
                .symbols
                .iter()
                .filter_map(|s| snapshot(s))
                .map(EgressMessage::MarketData)
                .collect();
            if !initial.is_empty() {
                let _ = tx.try_send(initial);
            }
        }
        self.subscribers.lock().expect("subscriber mutex poisoned").insert(
            id,
            Subscriber {
                symbols: req.symbols.into_iter().collect(),
                trades: req.trades,
                market_data: req.market_data,
                tx,
            },
        );
        id
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        self.subscribers
            .lock()
            .expect("subscriber mutex poisoned")
            .remove(&id);
    }

    pub fn queue_trade(&self, symbol: &str, trade: TradeBroadcast) {
        self.pending
            .lock()
            .expect("pending mutex poisoned")
            .entry(symbol.to_string())
            .or_default()
            .push(EgressMessage::Trade(trade));
    }

    pub fn queue_market_data(&self, symbol: &str, data: MarketDataBroadcast) {
        self.pending
            .lock()
            .expect("pending mutex poisoned")
            .entry(symbol.to_string())
            .or_default()
            .push(EgressMessage::MarketData(data));
    }

    /// Drain every symbol's pending records and fan them out. A subscriber
    /// whose channel is full or closed is dropped rather than allowed to
    /// stall the others (§4.6 "each send is independent and its failure is
    /// isolated"; §7 "subscriber is dropped and its connection closed").
    pub fn flush(&self) {
        let batches = {
            let mut pending = self.pending.lock().expect("pending mutex poisoned");
            std::mem::take(&mut *pending)
        };
        if batches.is_empty() {
            return;
        }
        let mut subs = self.subscribers.lock().expect("subscriber mutex poisoned");
        for (symbol, messages) in batches {
            subs.retain(|_, sub| {
                if !sub.symbols.contains(&symbol) {
                    return true;
                }
                let relevant: Vec<EgressMessage> = messages
                    .iter()
                    .filter(|m| match m {
                        EgressMessage::Trade(_) => sub.trades,
                        EgressMessage::MarketData(_) => sub.market_data,
                        EgressMessage::OrderResponse(_) => false,
                    })
                    .cloned()
                    .collect();
                if relevant.is_empty() {
                    return true;
                }
                sub.tx.try_send(relevant).is_ok()
            });
        }
    }

    #[cfg(test)]
    fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap().len()
    }
}
