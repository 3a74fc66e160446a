//! Types stored in or derived from the visitor's site session.

pub mod session;

pub use session::keys as session_keys;
