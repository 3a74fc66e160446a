//! Type-safe money representation using decimal arithmetic.
//!
//! Amounts are held as exact [`Decimal`] values in the currency's standard
//! unit (rupees, not paise). Rounding only happens when formatting for
//! display, so multi-night totals never accumulate floating point drift.

use core::fmt;
use core::ops::{Add, Mul};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// An amount of money with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's standard unit.
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Money {
    /// Create a new amount.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// An amount in Indian rupees, the currency every room is priced in.
    #[must_use]
    pub const fn inr(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::INR)
    }

    /// The amount rounded half away from zero to two decimal places.
    #[must_use]
    pub fn rounded(&self) -> Decimal {
        self.amount
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }

    /// Format for display with digit grouping, e.g. `₹83,385.12`.
    #[must_use]
    pub fn display(&self) -> String {
        let rounded = format!("{:.2}", self.rounded());
        let (sign, digits) = rounded
            .strip_prefix('-')
            .map_or(("", rounded.as_str()), |rest| ("-", rest));
        let (whole, fraction) = digits.split_once('.').unwrap_or((digits, "00"));

        let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
        for (i, ch) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }

        format!("{sign}{}{grouped}.{fraction}", self.currency_code.symbol())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl Add for Money {
    type Output = Self;

    /// Adds two amounts. Both sides are expected to share a currency; the
    /// left-hand currency is kept.
    fn add(self, rhs: Self) -> Self::Output {
        debug_assert_eq!(self.currency_code, rhs.currency_code);
        Self::new(self.amount + rhs.amount, self.currency_code)
    }
}

impl Mul<Decimal> for Money {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self::Output {
        Self::new(self.amount * rhs, self.currency_code)
    }
}

/// ISO 4217 currency codes accepted by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    INR,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::INR => "₹",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_groups_thousands() {
        assert_eq!(Money::inr(Decimal::new(8_338_512, 2)).display(), "₹83,385.12");
        assert_eq!(Money::inr(Decimal::from(207_417)).display(), "₹207,417.00");
        assert_eq!(Money::inr(Decimal::from(999)).display(), "₹999.00");
        assert_eq!(Money::inr(Decimal::from(1_000_000)).display(), "₹1,000,000.00");
    }

    #[test]
    fn test_display_rounds_half_away_from_zero() {
        assert_eq!(Money::inr(Decimal::new(12_345, 3)).display(), "₹12.35");
        assert_eq!(Money::inr(Decimal::new(-12_345, 3)).display(), "-₹12.35");
    }

    #[test]
    fn test_arithmetic_is_exact() {
        let rate = Money::inr(Decimal::new(1, 1));
        let total = (0..10).fold(Money::inr(Decimal::ZERO), |acc, _| acc + rate);
        assert_eq!(total.amount, Decimal::ONE);
        assert_eq!((rate * Decimal::from(3)).amount, Decimal::new(3, 1));
    }

    #[test]
    fn test_currency_code_on_the_wire() {
        let json = serde_json::to_value(Money::inr(Decimal::new(24_817, 0))).unwrap();
        assert_eq!(json["currency_code"], "INR");
        assert_eq!(json["amount"], "24817");
    }
}
