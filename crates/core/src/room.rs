//! Room records and catalog filtering.
//!
//! Rooms are owned by the platform's `rooms` table; the site only reads them.
//! [`fallback_rooms`] is the built-in catalog served when the remote list
//! cannot be fetched.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{Money, RoomCategory, RoomId};

/// A bookable room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    #[serde(rename = "type")]
    pub category: RoomCategory,
    /// Nightly rate in rupees.
    pub price: Decimal,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Short feature labels; order carries no meaning.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub features: Vec<String>,
    /// Maximum number of guests.
    pub capacity: u32,
    /// Floor area in square metres.
    pub size: u32,
    pub available: bool,
}

impl Room {
    /// Nightly rate as money.
    #[must_use]
    pub const fn nightly_rate(&self) -> Money {
        Money::inr(self.price)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Catalog filter used by the rooms page and the booking form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomFilter {
    /// Restrict to one tier; `None` means all tiers.
    #[serde(default)]
    pub category: Option<RoomCategory>,
    /// Hide rooms that are fully booked.
    #[serde(default)]
    pub available_only: bool,
}

impl RoomFilter {
    /// Every room.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            category: None,
            available_only: false,
        }
    }

    /// Only rooms that can currently be booked.
    #[must_use]
    pub const fn available() -> Self {
        Self {
            category: None,
            available_only: true,
        }
    }

    /// Rooms of a single tier.
    #[must_use]
    pub const fn category(category: RoomCategory) -> Self {
        Self {
            category: Some(category),
            available_only: false,
        }
    }

    /// Whether a room passes this filter.
    #[must_use]
    pub fn matches(&self, room: &Room) -> bool {
        if self.category.is_some_and(|category| room.category != category) {
            return false;
        }
        !self.available_only || room.available
    }

    /// Filter rooms and order them by nightly price, cheapest first.
    #[must_use]
    pub fn apply(&self, rooms: &[Room]) -> Vec<Room> {
        let mut selected: Vec<Room> = rooms.iter().filter(|r| self.matches(r)).cloned().collect();
        selected.sort_by(|a, b| a.price.cmp(&b.price));
        selected
    }
}

/// Availability summary for one tier, shown on the admin dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryAvailability {
    pub category: RoomCategory,
    pub available: usize,
    pub total: usize,
}

impl CategoryAvailability {
    /// Summarize every tier, entry tier first. Tiers with no rooms report 0 of 0.
    #[must_use]
    pub fn summarize(rooms: &[Room]) -> Vec<Self> {
        RoomCategory::ALL
            .iter()
            .map(|&category| {
                let in_tier = rooms.iter().filter(|r| r.category == category);
                let (total, available) = in_tier.fold((0, 0), |(total, available), room| {
                    (total + 1, available + usize::from(room.available))
                });
                Self {
                    category,
                    available,
                    total,
                }
            })
            .collect()
    }
}

#[allow(clippy::too_many_arguments)]
fn room(
    id: u128,
    name: &str,
    category: RoomCategory,
    price: i64,
    description: &str,
    features: &[&str],
    capacity: u32,
    size: u32,
    available: bool,
) -> Room {
    Room {
        id: RoomId::new(Uuid::from_u128(id)),
        name: name.to_owned(),
        category,
        price: Decimal::from(price),
        image_url: None,
        description: Some(description.to_owned()),
        features: features.iter().map(|&f| f.to_owned()).collect(),
        capacity,
        size,
        available,
    }
}

/// The built-in room catalog.
///
/// Ids are fixed so that links to fallback rooms stay stable across restarts.
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn fallback_rooms() -> Vec<Room> {
    vec![
        room(
            0x0d7e_1a00_0000_4000_8000_0000_0000_0001,
            "Deluxe King Room",
            RoomCategory::Deluxe,
            24_817,
            "Experience refined comfort in our elegantly appointed Deluxe King Room, featuring stunning city views and premium amenities.",
            &["King-size bed", "City view", "Rain shower", "Smart TV", "Mini bar", "Coffee machine"],
            2,
            35,
            true,
        ),
        room(
            0x0d7e_1a00_0000_4000_8000_0000_0000_0002,
            "Deluxe Twin Room",
            RoomCategory::Deluxe,
            23_987,
            "Perfect for friends or colleagues, our Deluxe Twin Room offers two comfortable beds with all the luxury amenities you expect.",
            &["Two queen beds", "City view", "Rain shower", "Smart TV", "Mini bar", "Work desk"],
            2,
            38,
            true,
        ),
        room(
            0x0d7e_1a00_0000_4000_8000_0000_0000_0003,
            "Executive Suite",
            RoomCategory::Executive,
            41_417,
            "Indulge in spacious luxury with our Executive Suite, featuring a separate living area and panoramic views.",
            &["King-size bed", "Living room", "Panoramic view", "Jacuzzi tub", "Butler service", "Premium bar"],
            3,
            65,
            true,
        ),
        room(
            0x0d7e_1a00_0000_4000_8000_0000_0000_0004,
            "Executive Corner Suite",
            RoomCategory::Executive,
            45_567,
            "Our corner suites offer dual-aspect views and additional space for the discerning traveler.",
            &["King-size bed", "Dual views", "Dining area", "Spa bathroom", "Lounge access", "Smart home"],
            3,
            75,
            false,
        ),
        room(
            0x0d7e_1a00_0000_4000_8000_0000_0000_0005,
            "Presidential Suite",
            RoomCategory::Presidential,
            107_817,
            "The pinnacle of luxury living. Our Presidential Suite offers unparalleled elegance with private terrace and dedicated butler.",
            &["Master bedroom", "Private terrace", "Grand piano", "Personal chef", "Limousine service", "Helipad access"],
            4,
            150,
            true,
        ),
        room(
            0x0d7e_1a00_0000_4000_8000_0000_0000_0006,
            "Royal Penthouse",
            RoomCategory::Presidential,
            207_417,
            "Experience royalty in our exclusive penthouse spanning the entire top floor with 360-degree city views.",
            &["3 bedrooms", "Private pool", "Home cinema", "Wine cellar", "Personal staff", "Private elevator"],
            6,
            350,
            true,
        ),
    ]
}
