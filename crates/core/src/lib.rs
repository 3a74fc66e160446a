//! Haven Core - Shared domain types.
//!
//! This crate provides the types and pure calculations used across all Haven
//! components:
//! - `site` - Public hotel site and admin dashboard (JSON over HTTP)
//! - `cli` - Privileged admin tooling (role promotion, admin setup)
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no platform
//! client, no HTTP. Everything here can be unit tested without a runtime.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, emails, money and status enums
//! - [`pricing`] - Night counting and stay quotes (subtotal, tax, total)
//! - [`room`] - Room records, catalog filters and the fallback catalog
//! - [`booking`] - Booking records and booking requests

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod booking;
pub mod pricing;
pub mod room;
pub mod types;

pub use booking::{Booking, BookingRequest, BookingRoomSummary, GuestCount, GuestCountError};
pub use pricing::{Quote, StayDates, StayError, TAX_RATE, nights_between};
pub use room::{CategoryAvailability, Room, RoomFilter, fallback_rooms};
pub use types::*;
