//! The exact, fixed-precision numeric type used for every price, quantity,
//! and fee in the engine. Binary floating-point never appears on this path.

use rust_decimal::Decimal as RustDecimal;
use std::fmt;

/// A non-negative, exact base-10 decimal.
///
/// Wraps [`rust_decimal::Decimal`] (a 96-bit mantissa plus scale, the same
/// representation shape called for by a fixed-point integer scaled by a
/// power of ten) and forbids the one state the engine must never represent:
/// a negative price or quantity. Comparison, addition, and subtraction are
/// exact; there is no rounding step hiding anywhere on the hot path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Decimal(RustDecimal);

/// The error returned when a value cannot be accepted as a [`Decimal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecimalError {
    /// The value was negative.
    Negative,
    /// The value could not be parsed as a decimal at all.
    Invalid,
}

impl fmt::Display for DecimalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecimalError::Negative => write!(f, "decimal value must not be negative"),
            DecimalError::Invalid => write!(f, "value is not a valid decimal"),
        }
    }
}

impl std::error::Error for DecimalError {}

impl Decimal {
    /// The additive identity. Always a valid `Decimal`.
    pub const ZERO: Decimal = Decimal(RustDecimal::ZERO);

    /// Construct from an already non-negative `rust_decimal::Decimal`.
    ///
    /// # Errors
    /// Returns [`DecimalError::Negative`] if `value` is negative.
    pub fn new(value: RustDecimal) -> Result<Self, DecimalError> {
        if value.is_sign_negative() && !value.is_zero() {
            Err(DecimalError::Negative)
        } else {
            Ok(Decimal(value))
        }
    }

    /// Parse a decimal string (as used on the wire, per §6: all numeric
    /// fields are serialized as strings to preserve exact precision).
    pub fn parse(s: &str) -> Result<Self, DecimalError> {
        let value: RustDecimal = s.parse().map_err(|_| DecimalError::Invalid)?;
        Self::new(value)
    }

    /// The underlying signed decimal, for arithmetic that needs it.
    pub fn inner(self) -> RustDecimal {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(self) -> bool {
        !self.0.is_zero() && self.0.is_sign_positive()
    }

    /// Saturating subtraction: returns `ZERO` instead of going negative.
    /// Used when reducing a resting order's remaining quantity, where a
    /// caller has already checked `delta <= self` but we do not want a
    /// rounding artifact to panic the matching path.
    pub fn saturating_sub(self, rhs: Decimal) -> Decimal {
        let result = self.0 - rhs.0;
        if result.is_sign_negative() {
            Decimal::ZERO
        } else {
            Decimal(result)
        }
    }

    pub fn checked_add(self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_add(rhs.0).map(Decimal)
    }

    pub fn checked_sub(self, rhs: Decimal) -> Option<Decimal> {
        let result = self.0.checked_sub(rhs.0)?;
        Decimal::new(result).ok()
    }

    pub fn checked_mul(self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_mul(rhs.0).map(Decimal)
    }

    pub fn min(self, rhs: Decimal) -> Decimal {
        if self.0 <= rhs.0 { self } else { rhs }
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Decimal {
    type Err = DecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl serde::Serialize for Decimal {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Decimal {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Decimal::parse(&s).map_err(serde::de::Error::custom)
    }
}
