//! Business logic services for the hotel site.
//!
//! # Services
//!
//! - `auth` - Per-request identity and session context, auth events
//! - `rooms` - Cached room catalog with built-in fallback
//! - `bookings` - Booking drafts, listing, creation and cancellation
//! - `access` - Admin role gate
//! - `provision` - Privileged account provisioning (CLI only)

pub mod access;
pub mod auth;
pub mod bookings;
pub mod provision;
pub mod rooms;
