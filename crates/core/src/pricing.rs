//! Night counting and stay quotes.
//!
//! A quote is derived from a nightly rate and two calendar dates:
//!
//! ```text
//! nights   = whole days from check-in to check-out (0 when check-out <= check-in)
//! subtotal = nightly rate * nights
//! tax      = subtotal * 12%
//! total    = subtotal + tax
//! ```
//!
//! A quote with zero nights is an incomplete selection, not a bookable stay.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::Money;

/// Tax applied on top of the room subtotal (12%).
pub const TAX_RATE: Decimal = Decimal::from_parts(12, 0, 0, false, 2);

/// Number of nights between two calendar dates.
///
/// Calendar dates carry no time of day, so the day difference is already a
/// whole number and needs no rounding. Returns 0 when `check_out` is on or
/// before `check_in`.
#[must_use]
pub fn nights_between(check_in: NaiveDate, check_out: NaiveDate) -> u32 {
    let days = (check_out - check_in).num_days();
    u32::try_from(days.max(0)).unwrap_or(u32::MAX)
}

/// Errors for a date range that cannot be booked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StayError {
    /// Check-out is on or before check-in.
    #[error("check-out must be after check-in")]
    CheckOutNotAfterCheckIn,
    /// Check-in lies before the current date.
    #[error("check-in cannot be in the past")]
    CheckInInPast,
}

/// A validated stay of at least one night.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StayDates {
    check_in: NaiveDate,
    check_out: NaiveDate,
}

impl StayDates {
    /// Validate a check-in/check-out pair.
    ///
    /// # Errors
    ///
    /// Returns [`StayError::CheckOutNotAfterCheckIn`] when the stay would be
    /// zero nights or negative.
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Result<Self, StayError> {
        if check_out <= check_in {
            return Err(StayError::CheckOutNotAfterCheckIn);
        }
        Ok(Self {
            check_in,
            check_out,
        })
    }

    /// Validate a pair and additionally require check-in on or after `today`.
    ///
    /// # Errors
    ///
    /// Returns [`StayError::CheckInInPast`] for past check-ins, otherwise the
    /// errors of [`StayDates::new`].
    pub fn starting_from(
        today: NaiveDate,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<Self, StayError> {
        if check_in < today {
            return Err(StayError::CheckInInPast);
        }
        Self::new(check_in, check_out)
    }

    #[must_use]
    pub const fn check_in(&self) -> NaiveDate {
        self.check_in
    }

    #[must_use]
    pub const fn check_out(&self) -> NaiveDate {
        self.check_out
    }

    /// Nights in the stay; always at least 1.
    #[must_use]
    pub fn nights(&self) -> u32 {
        nights_between(self.check_in, self.check_out)
    }
}

/// Price breakdown for a stay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub nightly_rate: Money,
    pub nights: u32,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
}

impl Quote {
    /// Compute a quote for any pair of dates.
    ///
    /// Zero-night selections produce a zero quote; check
    /// [`Quote::is_bookable`] before proceeding to a booking.
    #[must_use]
    pub fn compute(nightly_rate: Money, check_in: NaiveDate, check_out: NaiveDate) -> Self {
        Self::for_nights(nightly_rate, nights_between(check_in, check_out))
    }

    /// Compute a quote for a validated stay.
    #[must_use]
    pub fn for_stay(nightly_rate: Money, stay: &StayDates) -> Self {
        Self::for_nights(nightly_rate, stay.nights())
    }

    fn for_nights(nightly_rate: Money, nights: u32) -> Self {
        let subtotal = nightly_rate * Decimal::from(nights);
        let tax = subtotal * TAX_RATE;
        Self {
            nightly_rate,
            nights,
            subtotal,
            tax,
            total: subtotal + tax,
        }
    }

    /// Whether the selection covers at least one night.
    #[must_use]
    pub const fn is_bookable(&self) -> bool {
        self.nights > 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_tax_rate_is_twelve_percent() {
        assert_eq!(TAX_RATE, Decimal::new(12, 2));
    }

    #[test]
    fn test_nights_between_forward() {
        assert_eq!(nights_between(date("2025-03-01"), date("2025-03-04")), 3);
        assert_eq!(nights_between(date("2024-02-28"), date("2024-03-01")), 2);
        assert_eq!(nights_between(date("2025-12-31"), date("2026-01-01")), 1);
    }

    #[test]
    fn test_nights_between_floors_at_zero() {
        assert_eq!(nights_between(date("2025-03-04"), date("2025-03-04")), 0);
        assert_eq!(nights_between(date("2025-03-04"), date("2025-03-01")), 0);
    }

    #[test]
    fn test_reference_scenario() {
        let quote = Quote::compute(
            Money::inr(Decimal::from(24_817)),
            date("2025-03-01"),
            date("2025-03-04"),
        );
        assert_eq!(quote.nights, 3);
        assert_eq!(quote.subtotal.amount, Decimal::from(74_451));
        assert_eq!(quote.tax.amount, Decimal::new(893_412, 2));
        assert_eq!(quote.total.amount, Decimal::new(8_338_512, 2));
        assert_eq!(quote.total.display(), "₹83,385.12");
    }

    #[test]
    fn test_total_is_subtotal_plus_tax_for_many_inputs() {
        let prices = [0_i64, 1, 23_987, 41_417, 207_417];
        for price in prices {
            for nights in 0..30_u32 {
                let rate = Money::inr(Decimal::from(price));
                let check_in = date("2025-01-01");
                let check_out = check_in + chrono::Days::new(u64::from(nights));
                let quote = Quote::compute(rate, check_in, check_out);

                let subtotal = Decimal::from(price) * Decimal::from(nights);
                assert_eq!(quote.nights, nights);
                assert_eq!(quote.subtotal.amount, subtotal);
                assert_eq!(quote.total.amount, subtotal + subtotal * Decimal::new(12, 2));
            }
        }
    }

    #[test]
    fn test_zero_nights_not_bookable() {
        let quote = Quote::compute(
            Money::inr(Decimal::from(24_817)),
            date("2025-03-04"),
            date("2025-03-01"),
        );
        assert!(!quote.is_bookable());
        assert_eq!(quote.total.amount, Decimal::ZERO);
    }

    #[test]
    fn test_stay_dates_rejects_non_forward_ranges() {
        assert_eq!(
            StayDates::new(date("2025-03-01"), date("2025-03-01")),
            Err(StayError::CheckOutNotAfterCheckIn)
        );
        let stay = StayDates::new(date("2025-03-01"), date("2025-03-02")).unwrap();
        assert_eq!(stay.nights(), 1);
    }

    #[test]
    fn test_stay_dates_rejects_past_check_in() {
        assert_eq!(
            StayDates::starting_from(date("2025-03-02"), date("2025-03-01"), date("2025-03-05")),
            Err(StayError::CheckInInPast)
        );
        assert!(
            StayDates::starting_from(date("2025-03-01"), date("2025-03-01"), date("2025-03-05"))
                .is_ok()
        );
    }
}
