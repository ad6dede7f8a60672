use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Currencies whose smallest unit is the whole unit.
const ZERO_DECIMAL: &[&str] = &[
    "bif", "clp", "djf", "gnf", "jpy", "kmf", "krw", "mga", "pyg", "rwf", "ugx", "vnd", "vuv",
    "xaf", "xof", "xpf",
];

const THREE_DECIMAL: &[&str] = &["bhd", "jod", "kwd", "omr", "tnd"];

/// A lowercase ISO 4217 currency code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Currency(String);

impl Currency {
    pub fn new(code: &str) -> Self {
        Self(code.trim().to_ascii_lowercase())
    }

    pub fn usd() -> Self {
        Self::new("usd")
    }

    pub fn code(&self) -> &str {
        &self.0
    }

    /// Number of decimal places between the minor and the display unit.
    pub fn exponent(&self) -> u32 {
        let code = self.0.as_str();
        if ZERO_DECIMAL.contains(&code) {
            0
        } else if THREE_DECIMAL.contains(&code) {
            3
        } else {
            2
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_ascii_uppercase())
    }
}

/// An amount in the payment provider's minor units (cents for USD).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MinorUnits(pub i64);

/// A monetary value in display units.
///
/// Wraps `rust_decimal::Decimal` so conversions from minor units stay exact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount: Decimal,
    pub currency: Currency,
}

impl Money {
    /// Converts a minor-unit amount into display units for `currency`.
    ///
    /// Returns `None` for negative amounts.
    pub fn from_minor_units(minor: MinorUnits, currency: Currency) -> Option<Self> {
        if minor.0 < 0 {
            return None;
        }
        let amount = Decimal::new(minor.0, currency.exponent());
        Some(Self { amount, currency })
    }

    /// Converts back to minor units; exact for any value produced by `from_minor_units`.
    pub fn to_minor_units(&self) -> Option<MinorUnits> {
        let scaled = self.amount * Decimal::from(10_i64.pow(self.currency.exponent()));
        if scaled.fract() != Decimal::ZERO {
            return None;
        }
        scaled.to_i64().map(MinorUnits)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_cents_to_dollars_is_exact() {
        let money = Money::from_minor_units(MinorUnits(4999), Currency::usd()).unwrap();
        assert_eq!(money.amount, dec!(49.99));
        assert_eq!(money.amount.to_string(), "49.99");
    }

    #[test]
    fn test_repeated_conversions_do_not_drift() {
        let mut minor = MinorUnits(4999);
        for _ in 0..1_000 {
            let money = Money::from_minor_units(minor, Currency::usd()).unwrap();
            assert_eq!(money.amount, dec!(49.99));
            minor = money.to_minor_units().unwrap();
        }
        assert_eq!(minor, MinorUnits(4999));
    }

    #[test]
    fn test_whole_amount_keeps_two_places() {
        let money = Money::from_minor_units(MinorUnits(15000), Currency::usd()).unwrap();
        assert_eq!(money.amount.to_string(), "150.00");
    }

    #[test]
    fn test_zero_decimal_currency() {
        let money = Money::from_minor_units(MinorUnits(5000), Currency::new("JPY")).unwrap();
        assert_eq!(money.amount, dec!(5000));
        assert_eq!(money.to_string(), "5000 JPY");
    }

    #[test]
    fn test_three_decimal_currency() {
        let money = Money::from_minor_units(MinorUnits(12345), Currency::new("kwd")).unwrap();
        assert_eq!(money.amount, dec!(12.345));
    }

    #[test]
    fn test_negative_amount_rejected() {
        assert!(Money::from_minor_units(MinorUnits(-1), Currency::usd()).is_none());
    }
}
