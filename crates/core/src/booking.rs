//! Booking records and booking requests.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::pricing::{Quote, StayDates};
use crate::room::Room;
use crate::types::{BookingId, BookingStatus, Money, RoomCategory, RoomId, UserId};

/// Errors for an out-of-range guest count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GuestCountError {
    #[error("at least one guest is required")]
    Zero,
    #[error("at most {max} guests can be booked at once")]
    TooMany { max: u8 },
}

/// Number of guests on a booking, between 1 and [`GuestCount::MAX`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct GuestCount(u8);

impl GuestCount {
    /// Largest party the booking form accepts.
    pub const MAX: u8 = 6;

    /// Validate a guest count.
    ///
    /// # Errors
    ///
    /// Returns [`GuestCountError`] when the count is 0 or above [`GuestCount::MAX`].
    pub const fn new(count: u8) -> Result<Self, GuestCountError> {
        match count {
            0 => Err(GuestCountError::Zero),
            n if n > Self::MAX => Err(GuestCountError::TooMany { max: Self::MAX }),
            n => Ok(Self(n)),
        }
    }

    #[must_use]
    pub const fn get(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for GuestCount {
    type Error = GuestCountError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<GuestCount> for u8 {
    fn from(count: GuestCount) -> Self {
        count.0
    }
}

/// Room fields joined onto a booking when listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRoomSummary {
    pub name: String,
    #[serde(rename = "type")]
    pub category: RoomCategory,
    pub price: Decimal,
}

/// A stored booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub user_id: UserId,
    pub room_id: RoomId,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: u32,
    pub total_price: Decimal,
    pub status: BookingStatus,
    #[serde(default)]
    pub special_requests: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Present when the booking was fetched together with its room.
    #[serde(default, rename = "rooms", skip_serializing_if = "Option::is_none")]
    pub room: Option<BookingRoomSummary>,
}

/// Everything needed to create a booking, with the total already computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRequest {
    pub room_id: RoomId,
    pub stay: StayDates,
    pub guests: GuestCount,
    pub total_price: Money,
    pub special_requests: Option<String>,
}

impl BookingRequest {
    /// Build a request for `room`, pricing the stay from the room's rate.
    ///
    /// Blank special requests are dropped.
    #[must_use]
    pub fn for_room(
        room: &Room,
        stay: StayDates,
        guests: GuestCount,
        special_requests: Option<&str>,
    ) -> Self {
        let quote = Quote::for_stay(room.nightly_rate(), &stay);
        Self {
            room_id: room.id,
            stay,
            guests,
            total_price: quote.total,
            special_requests: special_requests
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::room::fallback_rooms;

    #[test]
    fn test_guest_count_bounds() {
        assert_eq!(GuestCount::new(0), Err(GuestCountError::Zero));
        assert_eq!(GuestCount::new(1).unwrap().get(), 1);
        assert_eq!(GuestCount::new(6).unwrap().get(), 6);
        assert_eq!(GuestCount::new(7), Err(GuestCountError::TooMany { max: 6 }));
    }

    #[test]
    fn test_guest_count_deserialize_validates() {
        assert!(serde_json::from_str::<GuestCount>("3").is_ok());
        assert!(serde_json::from_str::<GuestCount>("0").is_err());
        assert!(serde_json::from_str::<GuestCount>("9").is_err());
    }

    #[test]
    fn test_request_prices_from_room() {
        let room = fallback_rooms().into_iter().next().unwrap();
        let stay = StayDates::new(
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 4).unwrap(),
        )
        .unwrap();

        let request = BookingRequest::for_room(&room, stay, GuestCount::new(2).unwrap(), Some("  "));
        assert_eq!(request.room_id, room.id);
        assert_eq!(request.total_price.amount, Decimal::new(8_338_512, 2));
        assert_eq!(request.special_requests, None);
    }

    #[test]
    fn test_deserialize_joined_row() {
        let json = r#"{
            "id": "9b2d4c1e-0c4f-4a7e-8f3a-2d1b5e6f7a80",
            "user_id": "1f3e5d7c-9b1a-4c2e-8d6f-0a2b4c6d8e0f",
            "room_id": "5f0c2b8e-3f7a-4c55-9b8f-0e6f2b1d9a10",
            "check_in": "2025-03-01",
            "check_out": "2025-03-04",
            "guests": 2,
            "total_price": 83385.12,
            "status": "pending",
            "special_requests": "Late check-in",
            "created_at": "2025-02-20T10:15:00.123456+00:00",
            "rooms": { "name": "Deluxe King Room", "type": "deluxe", "price": 24817 }
        }"#;
        let booking: Booking = serde_json::from_str(json).unwrap();
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.total_price, Decimal::new(8_338_512, 2));
        assert_eq!(booking.room.unwrap().category, RoomCategory::Deluxe);
    }
}
