//! Transport-neutral wire schema (§6 "External interfaces").
//!
//! This module only defines the message shapes. Binding them to an actual
//! transport (a socket, an HTTP handler) is out of scope (§1): callers
//! deserialize an [`IngressMessage`] from whatever bytes arrived and hand
//! it to the [`crate::engine::Router`]; the router's response and any
//! broadcast records serialize back out as [`EgressMessage`].

use crate::decimal::Decimal;
use crate::order::{OrderId, OrderType, Side};
use serde::{Deserialize, Serialize};

/// An inbound request, tagged by `"type"` per the canonical JSON schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IngressMessage {
    Order(OrderRequest),
    Cancel(CancelRequest),
    Subscribe(SubscribeRequest),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    /// Required for limit; optional for ioc; ignored for market/fok-market.
    #[serde(default)]
    pub price: Option<Decimal>,
    pub quantity: Decimal,
    /// Echoed back in the response; not interpreted by the engine.
    #[serde(default)]
    pub client_order_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelRequest {
    pub symbol: String,
    pub order_id: OrderId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeRequest {
    pub symbols: Vec<String>,
    #[serde(default)]
    pub trades: bool,
    #[serde(default)]
    pub market_data: bool,
}

/// An outbound record, tagged by `"type"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EgressMessage {
    OrderResponse(OrderResponse),
    Trade(TradeBroadcast),
    MarketData(MarketDataBroadcast),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
    pub success: bool,
    pub order_id: Option<OrderId>,
    /// Echo of `client_order_id`, when one was supplied.
    #[serde(default)]
    pub client_order_id: Option<String>,
    pub status: String,
    pub filled_quantity: Decimal,
    pub remaining_quantity: Decimal,
    pub trades: Vec<TradeFill>,
    /// Populated only on rejection; human-readable, not matched on.
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeFill {
    pub trade_id: String,
    pub price: Decimal,
    pub quantity: Decimal,
    pub fee: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelResponse {
    pub success: bool,
    pub order_id: OrderId,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeBroadcast {
    pub symbol: String,
    pub trade_id: String,
    pub price: Decimal,
    pub quantity: Decimal,
    pub aggressor_side: Side,
    pub maker_order_id: OrderId,
    pub taker_order_id: OrderId,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bbo {
    pub best_bid: Option<Decimal>,
    pub best_ask: Option<Decimal>,
    pub spread: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepthView {
    /// Descending by price.
    pub bids: Vec<(Decimal, Decimal)>,
    /// Ascending by price.
    pub asks: Vec<(Decimal, Decimal)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketDataBroadcast {
    pub symbol: String,
    pub timestamp: u64,
    pub bbo: Bbo,
    pub depth: DepthView,
}
