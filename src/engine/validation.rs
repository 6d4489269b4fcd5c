//! Pre-lock order validation (§4.3). Runs before the symbol lock is
//! acquired; on any failure the order never touches book state and is
//! never persisted (§7 "Validation failure").

use crate::config::EngineConfig;
use crate::decimal::Decimal;
use crate::error::EngineError;
use crate::ingress::OrderRequest;
use crate::order::OrderType;

pub fn validate_order_request(req: &OrderRequest, config: &EngineConfig) -> Result<(), EngineError> {
    if !config.symbols.contains(&req.symbol) {
        return Err(EngineError::UnknownSymbol {
            symbol: req.symbol.clone(),
        });
    }

    if !req.quantity.is_positive() {
        return Err(EngineError::InvalidQuantity {
            quantity: req.quantity,
            max: config.max_order_quantity,
        });
    }
    if let Some(max) = config.max_order_quantity {
        if req.quantity > max {
            return Err(EngineError::InvalidQuantity {
                quantity: req.quantity,
                max: Some(max),
            });
        }
    }

    match req.order_type {
        OrderType::Limit => match req.price {
            Some(p) if p.is_positive() => {}
            _ => return Err(EngineError::MissingPrice),
        },
        // MARKET with a price present is accepted; the price is ignored
        // (§4.3). IOC/FOK may or may not carry a price.
        OrderType::Market | OrderType::Ioc | OrderType::Fok => {}
    }

    if let (Some(price), Some(max)) = (req.price, config.max_order_price) {
        if price > max {
            return Err(EngineError::PriceOutOfRange { price, max });
        }
    }

    Ok(())
}
