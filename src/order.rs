//! Order identity and lifecycle state (§3 DATA MODEL).

use crate::decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Which side of the book an order rests on or matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    #[serde(rename(serialize = "buy"))]
    #[serde(alias = "buy", alias = "Buy", alias = "BUY")]
    Buy,
    #[serde(rename(serialize = "sell"))]
    #[serde(alias = "sell", alias = "Sell", alias = "SELL")]
    Sell,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            other => Err(format!("invalid side: {other}")),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// The four order types this engine understands (§1 Non-goals: no
/// stop/iceberg/GTT variants).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    #[serde(rename(serialize = "market"))]
    #[serde(alias = "market", alias = "Market", alias = "MARKET")]
    Market,
    #[serde(rename(serialize = "limit"))]
    #[serde(alias = "limit", alias = "Limit", alias = "LIMIT")]
    Limit,
    #[serde(rename(serialize = "ioc"))]
    #[serde(alias = "ioc", alias = "Ioc", alias = "IOC")]
    Ioc,
    #[serde(rename(serialize = "fok"))]
    #[serde(alias = "fok", alias = "Fok", alias = "FOK")]
    Fok,
}

impl FromStr for OrderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "market" => Ok(OrderType::Market),
            "limit" => Ok(OrderType::Limit),
            "ioc" => Ok(OrderType::Ioc),
            "fok" => Ok(OrderType::Fok),
            other => Err(format!("invalid order_type: {other}")),
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Market => write!(f, "market"),
            OrderType::Limit => write!(f, "limit"),
            OrderType::Ioc => write!(f, "ioc"),
            OrderType::Fok => write!(f, "fok"),
        }
    }
}

impl OrderType {
    /// IOC and FOK never rest on the book regardless of outcome.
    pub fn never_rests(self) -> bool {
        matches!(self, OrderType::Market | OrderType::Ioc | OrderType::Fok)
    }
}

/// Order lifecycle status (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    /// Terminal orders are never re-matched (§3 Lifecycle).
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::PartiallyFilled => "partially_filled",
            OrderStatus::Filled => "filled",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Rejected => "rejected",
        };
        write!(f, "{s}")
    }
}

/// A unique, stable order identifier assigned on admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrderId(Uuid);

impl OrderId {
    pub fn new() -> Self {
        OrderId(Uuid::new_v4())
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OrderId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(OrderId(Uuid::parse_str(s)?))
    }
}

impl Serialize for OrderId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for OrderId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        OrderId::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// An admitted order: immutable identity, mutable fill state (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    /// Required for LIMIT; optional for IOC; `None` for MARKET/FOK-market.
    pub price: Option<Decimal>,
    pub quantity: Decimal,
    pub filled_quantity: Decimal,
    pub status: OrderStatus,
    /// Monotonic admission sequence number; establishes time priority.
    pub timestamp: u64,
    pub user_id: Option<String>,
}

impl Order {
    pub fn new(
        symbol: String,
        side: Side,
        order_type: OrderType,
        price: Option<Decimal>,
        quantity: Decimal,
        timestamp: u64,
        user_id: Option<String>,
    ) -> Self {
        Order {
            order_id: OrderId::new(),
            symbol,
            side,
            order_type,
            price,
            quantity,
            filled_quantity: Decimal::ZERO,
            status: OrderStatus::Pending,
            timestamp,
            user_id,
        }
    }

    /// `remaining = quantity - filled_quantity`, always `>= 0` (§3 Invariant).
    pub fn remaining(&self) -> Decimal {
        self.quantity.saturating_sub(self.filled_quantity)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Apply a fill of `qty` against this order, updating `filled_quantity`
    /// and `status`. `qty` must be `<= remaining()`.
    pub fn apply_fill(&mut self, qty: Decimal) {
        self.filled_quantity = self
            .filled_quantity
            .checked_add(qty)
            .unwrap_or(self.quantity);
        if self.remaining().is_zero() {
            self.status = OrderStatus::Filled;
        } else {
            self.status = OrderStatus::PartiallyFilled;
        }
    }

    /// Mark the order cancelled (explicit cancel, or IOC/FOK/MARKET
    /// residual per §4.4). `PartiallyFilled` orders that are cancelled for
    /// their remainder stay reported as `PartiallyFilled` if they ever
    /// traded, matching the concrete scenarios in §8 (e.g. scenario 5: an
    /// IOC with a partial fill ends `PARTIALLY_FILLED`, not `CANCELLED`).
    pub fn cancel_remainder(&mut self) {
        if self.filled_quantity.is_zero() {
            self.status = OrderStatus::Cancelled;
        } else {
            self.status = OrderStatus::PartiallyFilled;
        }
    }

    pub fn reject(&mut self) {
        self.status = OrderStatus::Rejected;
    }
}
