//! Status and category enums.
//!
//! Serialized names match the values stored in the platform tables
//! (`bookings.status`, `rooms.type`, `user_roles.role`).

use serde::{Deserialize, Serialize};

/// Booking lifecycle status.
///
/// Guests only ever move a booking to [`BookingStatus::Cancelled`]; the other
/// transitions are made by the hotel outside this system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    /// Value as stored by the platform.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Room tier.
///
/// Ordered from entry level to top tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomCategory {
    /// Entry tier.
    Deluxe,
    /// Mid tier.
    Executive,
    /// Top tier.
    Presidential,
}

impl RoomCategory {
    /// All categories, entry tier first.
    pub const ALL: [Self; 3] = [Self::Deluxe, Self::Executive, Self::Presidential];

    /// Value as stored by the platform.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Deluxe => "deluxe",
            Self::Executive => "executive",
            Self::Presidential => "presidential",
        }
    }
}

impl std::fmt::Display for RoomCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RoomCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deluxe" => Ok(Self::Deluxe),
            "executive" => Ok(Self::Executive),
            "presidential" => Ok(Self::Presidential),
            _ => Err(format!("invalid room category: {s}")),
        }
    }
}

/// Role label held in the role-membership table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppRole {
    /// May open the admin dashboard.
    Admin,
    /// Regular guest account.
    User,
}

impl AppRole {
    /// Value as stored by the platform.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }
}

impl std::fmt::Display for AppRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AppRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}
