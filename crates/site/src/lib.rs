//! Haven site library.
//!
//! The public hotel site and admin dashboard, served as JSON over HTTP. Kept
//! as a library so the router can be driven in tests against the in-process
//! platform backend and so the CLI can reuse the platform client.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod platform;
pub mod routes;
pub mod services;
pub mod state;
