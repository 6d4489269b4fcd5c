//! Dispatch of ingress messages to the owning symbol's engine (§5
//! "Sharding", §7 "unknown symbol").

use crate::config::EngineConfig;
use crate::engine::core::SymbolEngine;
use crate::ingress::{CancelRequest, CancelResponse, OrderRequest, OrderResponse};
use crate::metrics::EngineMetrics;
use crate::persistence::Journal;
use std::collections::HashMap;
use std::sync::Arc;

/// Owns one [`SymbolEngine`] per configured symbol and routes requests to
/// the right one. There is no cross-symbol lock: each symbol's critical
/// section is fully independent (§5 "Per-symbol exclusivity").
pub struct Router {
    engines: HashMap<String, Arc<SymbolEngine>>,
}

impl Router {
    /// Build a router with a fresh (empty) book per configured symbol,
    /// each backed by its own journal produced by `journal_for`.
    pub fn new(
        config: Arc<EngineConfig>,
        metrics: Arc<EngineMetrics>,
        mut journal_for: impl FnMut(&str) -> Arc<dyn Journal>,
    ) -> Self {
        let mut engines = HashMap::new();
        for symbol in &config.symbols {
            let journal = journal_for(symbol);
            engines.insert(
                symbol.clone(),
                Arc::new(SymbolEngine::new(
                    symbol.clone(),
                    Arc::clone(&config),
                    Arc::clone(&metrics),
                    journal,
                )),
            );
        }
        Router { engines }
    }

    /// Register an already-built engine directly, e.g. one produced via
    /// [`SymbolEngine::from_recovered`] during startup recovery.
    pub fn insert(&mut self, symbol: impl Into<String>, engine: Arc<SymbolEngine>) {
        self.engines.insert(symbol.into(), engine);
    }

    pub fn engine(&self, symbol: &str) -> Option<&Arc<SymbolEngine>> {
        self.engines.get(symbol)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.engines.keys().map(String::as_str)
    }

    pub fn submit_order(&self, req: OrderRequest) -> OrderResponse {
        match self.engines.get(&req.symbol) {
            Some(engine) => engine.submit_order(req),
            None => OrderResponse {
                success: false,
                order_id: None,
                client_order_id: req.client_order_id,
                status: "rejected".into(),
                filled_quantity: crate::decimal::Decimal::ZERO,
                remaining_quantity: crate::decimal::Decimal::ZERO,
                trades: Vec::new(),
                reason: Some(format!("unknown symbol: {}", req.symbol)),
            },
        }
    }

    pub fn cancel_order(&self, req: CancelRequest) -> CancelResponse {
        match self.engines.get(&req.symbol) {
            Some(engine) => engine.cancel_order(req),
            None => CancelResponse {
                success: false,
                order_id: req.order_id,
                reason: Some(format!("unknown symbol: {}", req.symbol)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{OrderType, Side};
    use crate::persistence::MemoryJournal;

    fn router() -> Router {
        let mut config = EngineConfig::default();
        config.symbols.insert("BTC-USDT".into());
        Router::new(
            Arc::new(config),
            Arc::new(EngineMetrics::default()),
            |_symbol| Arc::new(MemoryJournal::new()),
        )
    }

    #[tokio::test]
    async fn routes_to_the_matching_symbol_engine() {
        let router = router();
        let resp = router.submit_order(OrderRequest {
            symbol: "BTC-USDT".into(),
            side: Side::Buy,
            order_type: OrderType::Limit,
            price: Some(crate::decimal::Decimal::parse("100").unwrap()),
            quantity: crate::decimal::Decimal::parse("1").unwrap(),
            client_order_id: None,
            user_id: None,
        });
        assert!(resp.success);
    }

    #[tokio::test]
    async fn unknown_symbol_is_rejected_without_a_panic() {
        let router = router();
        let resp = router.submit_order(OrderRequest {
            symbol: "ETH-USDT".into(),
            side: Side::Buy,
            order_type: OrderType::Market,
            price: None,
            quantity: crate::decimal::Decimal::parse("1").unwrap(),
            client_order_id: None,
            user_id: None,
        });
        assert!(!resp.success);
    }
}
