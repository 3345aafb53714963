//! Type-safe price representation using decimal arithmetic.
//!
//! The upstream catalog stored prices inconsistently - sometimes as a JSON
//! string, sometimes as a number. [`Price::parse_lenient`] accepts both and
//! normalizes to a fixed-point decimal so downstream math never touches
//! floats.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when parsing a [`Price`].
#[derive(Debug, Clone, Error)]
pub enum PriceError {
    /// The input could not be parsed as a decimal number.
    #[error("not a valid price: {0}")]
    Invalid(String),
    /// The input parsed but is negative.
    #[error("price cannot be negative: {0}")]
    Negative(Decimal),
}

/// A book price in the store currency, held as a fixed-point decimal.
///
/// Always normalized to two decimal places. Construct via [`Price::from_cents`]
/// or [`Price::parse_lenient`]; arithmetic stays in [`Decimal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// A zero price.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from an integer number of cents.
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    /// Parse a price from a JSON value that may be a string or a number.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Invalid`] if the value is neither a decimal
    /// string nor a number, and [`PriceError::Negative`] for values below
    /// zero.
    pub fn parse_lenient(value: &serde_json::Value) -> Result<Self, PriceError> {
        let amount = match value {
            serde_json::Value::String(s) => s
                .trim()
                .parse::<Decimal>()
                .map_err(|_| PriceError::Invalid(s.clone()))?,
            serde_json::Value::Number(n) => n
                .to_string()
                .parse::<Decimal>()
                .map_err(|_| PriceError::Invalid(n.to_string()))?,
            other => return Err(PriceError::Invalid(other.to_string())),
        };

        if amount.is_sign_negative() {
            return Err(PriceError::Negative(amount));
        }

        Ok(Self(amount.round_dp(2)))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Line total for `quantity` copies.
    #[must_use]
    pub fn line_total(&self, quantity: u32) -> Self {
        Self((self.0 * Decimal::from(quantity)).round_dp(2))
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl std::ops::Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl std::iter::Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, std::ops::Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_cents() {
        let price = Price::from_cents(1999);
        assert_eq!(price.to_string(), "19.99");
    }

    #[test]
    fn test_parse_lenient_string_and_number() {
        let from_string = Price::parse_lenient(&json!("12.50")).expect("string price");
        let from_number = Price::parse_lenient(&json!(12.5)).expect("number price");
        assert_eq!(from_string, from_number);
        assert_eq!(from_string.to_string(), "12.50");

        let from_int = Price::parse_lenient(&json!(7)).expect("integer price");
        assert_eq!(from_int, Price::from_cents(700));
    }

    #[test]
    fn test_parse_lenient_rejects_garbage() {
        assert!(Price::parse_lenient(&json!("twelve")).is_err());
        assert!(Price::parse_lenient(&json!(null)).is_err());
        assert!(Price::parse_lenient(&json!({"amount": 1})).is_err());
    }

    #[test]
    fn test_parse_lenient_rejects_negative() {
        let err = Price::parse_lenient(&json!("-3.00")).expect_err("negative price");
        assert!(matches!(err, PriceError::Negative(_)));
    }

    #[test]
    fn test_line_total() {
        let price = Price::from_cents(999);
        assert_eq!(price.line_total(3), Price::from_cents(2997));
        assert_eq!(price.line_total(0), Price::ZERO);
    }

    #[test]
    fn test_sum() {
        let total: Price = [Price::from_cents(100), Price::from_cents(250)]
            .into_iter()
            .sum();
        assert_eq!(total, Price::from_cents(350));
    }
}
