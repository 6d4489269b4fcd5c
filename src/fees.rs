//! Maker/taker fee computation (§4.4 "Fees", §3 Trade).

use crate::decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A maker/taker fee schedule expressed as decimal multipliers of notional
/// (`quantity * price`), matching the `maker_fee_rate` / `taker_fee_rate`
/// configuration options of §6.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub maker_fee_rate: Decimal,
    pub taker_fee_rate: Decimal,
}

impl FeeSchedule {
    pub fn new(maker_fee_rate: Decimal, taker_fee_rate: Decimal) -> Self {
        FeeSchedule {
            maker_fee_rate,
            taker_fee_rate,
        }
    }

    /// The default schedule: zero fees both ways. Valid per §9.
    pub fn zero() -> Self {
        FeeSchedule {
            maker_fee_rate: Decimal::ZERO,
            taker_fee_rate: Decimal::ZERO,
        }
    }

    /// `fee = quantity * price * rate`, in the same exact decimal type as
    /// price/quantity. Overflow of the underlying decimal is impossible in
    /// practice at realistic notional sizes, but we still route through
    /// `checked_mul` and fall back to zero rather than ever panicking the
    /// matching path over a fee computation.
    pub fn calculate_fee(&self, quantity: Decimal, price: Decimal, is_maker: bool) -> Decimal {
        let rate = if is_maker {
            self.maker_fee_rate
        } else {
            self.taker_fee_rate
        };
        quantity
            .checked_mul(price)
            .and_then(|notional| notional.checked_mul(rate))
            .unwrap_or(Decimal::ZERO)
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self::zero()
    }
}
