// 💰 Money - Fixed-point currency amount
// Two fractional digits, non-negative, immutable

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::PaymentError;

/// Number of fractional digits carried by every [`Money`] value.
pub const MONEY_SCALE: u32 = 2;

// ============================================================================
// MONEY VALUE
// ============================================================================

/// A non-negative currency amount with exactly two fractional digits.
///
/// External input (JSON numbers, strings) is rounded half-up to two decimals
/// once, at construction. Everything downstream works with exact values, so
/// arithmetic never re-rounds. Operations return new values; a `Money` is
/// never mutated in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Build a `Money` from a raw decimal, quantizing to two fractional
    /// digits (round-half-up) and rejecting negative results.
    pub fn new(value: Decimal) -> Result<Money, PaymentError> {
        let quantized =
            value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
        if quantized < Decimal::ZERO {
            return Err(PaymentError::InvalidAmount(format!(
                "amount must not be negative, got {}",
                value
            )));
        }
        Ok(Money(quantized))
    }

    /// Exact constructor from a whole number of cents. Cannot fail, so it is
    /// the one to use for configuration constants.
    pub fn from_cents(cents: u64) -> Money {
        Money(Decimal::new(cents as i64, MONEY_SCALE))
    }

    /// Parse a decimal string ("12.50", "100") into a `Money`.
    pub fn parse(raw: &str) -> Result<Money, PaymentError> {
        let value: Decimal = raw
            .trim()
            .parse()
            .map_err(|_| PaymentError::InvalidAmount(format!("'{}' is not a number", raw)))?;
        Money::new(value)
    }

    /// Convert a raw JSON amount (number or numeric string) into a `Money`.
    ///
    /// This is the boundary conversion: anything else, including `null`,
    /// booleans, and non-numeric strings, is an [`PaymentError::InvalidAmount`].
    pub fn from_json(value: &Value) -> Result<Money, PaymentError> {
        match value {
            Value::Number(number) => Money::parse(&number.to_string()),
            Value::String(raw) => Money::parse(raw),
            other => Err(PaymentError::InvalidAmount(format!(
                "amount must be a number or numeric string, got {}",
                other
            ))),
        }
    }

    /// Underlying decimal value.
    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Sum of two amounts. Both operands carry at most two fractional
    /// digits, so the result is exact.
    pub fn plus(&self, other: Money) -> Money {
        Money(self.0 + other.0)
    }

    /// Difference, or `None` when the result would go negative. A `Money`
    /// never holds a value below zero.
    pub fn minus(&self, other: Money) -> Option<Money> {
        if other.0 > self.0 {
            None
        } else {
            Some(Money(self.0 - other.0))
        }
    }

    /// Multiply by an integer count. Exact: no rounding can occur.
    pub fn times(&self, count: u32) -> Money {
        Money(self.0 * Decimal::from(count))
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Money, D::Error> {
        let value = <Decimal as Deserialize>::deserialize(deserializer)?;
        Money::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// TESTS
// ============================================================================
