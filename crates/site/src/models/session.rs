//! Session keys.
//!
//! The platform session itself ([`crate::platform::AuthSession`]) is the only
//! authentication state kept in the site session.

/// Session keys for authentication data.
pub mod keys {
    /// Key for the platform session of the signed-in visitor.
    pub const AUTH_SESSION: &str = "auth_session";
}
