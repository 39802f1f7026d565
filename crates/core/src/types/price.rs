//! Type-safe price representation using decimal arithmetic.
//!
//! Group orders are priced in the GOM's local currency, so the currency is an
//! ISO 4217 code chosen per order rather than a fixed enum.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when building a [`Price`] or [`Currency`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// Amount is zero or negative.
    #[error("price must be greater than zero")]
    NotPositive,
    /// Amount has more than two decimal places.
    #[error("price cannot have more than {max} decimal places")]
    TooPrecise {
        /// Maximum allowed scale.
        max: u32,
    },
    /// Amount could not be parsed.
    #[error("invalid price: {0}")]
    Invalid(String),
    /// Currency code is not three ASCII letters.
    #[error("invalid currency code: {0}")]
    InvalidCurrency(String),
}

/// ISO 4217 currency code (three uppercase ASCII letters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Parse a currency code, normalising to uppercase.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::InvalidCurrency` unless the input is exactly three
    /// ASCII letters.
    pub fn parse(s: &str) -> Result<Self, PriceError> {
        let code = s.trim();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(PriceError::InvalidCurrency(s.to_owned()));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    /// The currency code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Currency {
    type Error = PriceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

/// A unit price with currency information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency: Currency,
}

impl Price {
    /// Maximum number of decimal places accepted for a listing price.
    pub const MAX_SCALE: u32 = 2;

    /// Create a validated price.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is not positive or has more than two
    /// decimal places.
    pub fn new(amount: Decimal, currency: Currency) -> Result<Self, PriceError> {
        if amount <= Decimal::ZERO {
            return Err(PriceError::NotPositive);
        }
        if amount.normalize().scale() > Self::MAX_SCALE {
            return Err(PriceError::TooPrecise {
                max: Self::MAX_SCALE,
            });
        }
        Ok(Self { amount, currency })
    }

    /// Parse a price from form input.
    ///
    /// # Errors
    ///
    /// Returns an error if either the amount or the currency is invalid.
    pub fn parse(amount: &str, currency: &str) -> Result<Self, PriceError> {
        let amount = amount
            .trim()
            .parse::<Decimal>()
            .map_err(|e| PriceError::Invalid(e.to_string()))?;
        Self::new(amount, Currency::parse(currency)?)
    }

    /// Total for `quantity` units.
    #[must_use]
    pub fn total(&self, quantity: u32) -> Decimal {
        self.amount * Decimal::from(quantity)
    }

    /// Format an amount in this price's currency, e.g. `12.50 PHP`.
    #[must_use]
    pub fn format_amount(&self, amount: Decimal) -> String {
        format!("{:.2} {}", amount, self.currency)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} {}", self.amount, self.currency)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_normalises() {
        assert_eq!(Currency::parse("php").unwrap().as_str(), "PHP");
        assert!(Currency::parse("PH").is_err());
        assert!(Currency::parse("P1P").is_err());
    }

    #[test]
    fn test_price_validation() {
        assert!(Price::parse("25.00", "USD").is_ok());
        assert_eq!(Price::parse("0", "USD"), Err(PriceError::NotPositive));
        assert_eq!(Price::parse("-3", "USD"), Err(PriceError::NotPositive));
        assert_eq!(
            Price::parse("1.999", "USD"),
            Err(PriceError::TooPrecise { max: 2 })
        );
        assert!(matches!(
            Price::parse("abc", "USD"),
            Err(PriceError::Invalid(_))
        ));
    }

    #[test]
    fn test_total_and_display() {
        let price = Price::parse("12.5", "php").unwrap();
        assert_eq!(price.total(3), Decimal::new(375, 1));
        assert_eq!(price.to_string(), "12.50 PHP");
        assert_eq!(price.format_amount(price.total(2)), "25.00 PHP");
    }
}
