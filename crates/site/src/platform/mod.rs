//! Backend platform access.
//!
//! The platform owns identity, storage and access policy. Each concern the
//! site relies on is a trait here, so services depend on the seam rather than
//! on HTTP:
//!
//! - [`IdentityProvider`] - password sign-in/sign-up, sign-out, session lookup
//! - [`RoomSource`] - the `rooms` table
//! - [`BookingStore`] - the `bookings` table, scoped by the caller's token
//! - [`RolePolicy`] - role membership (`user_roles`)
//! - [`ProfileStore`] - display profiles (`profiles`)
//! - [`UserDirectory`] - privileged user management, admin tooling only
//!
//! [`PlatformClient`] implements the public traits over the platform's HTTP
//! APIs with the anonymous key. [`ServiceClient`] implements
//! [`UserDirectory`] with the service-role key. With the `memory` feature,
//! `memory::MemoryPlatform` implements everything in process.

mod admin;
mod auth;
mod client;
#[cfg(any(test, feature = "memory"))]
pub mod memory;
mod rest;

pub use admin::ServiceClient;
pub use client::PlatformClient;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use haven_core::{AppRole, Booking, BookingId, BookingRequest, Email, Room, RoomFilter, RoomId, UserId};

use crate::services::auth::AuthError;

/// Errors that can occur when talking to the platform.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// HTTP request failed (connection, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The platform answered with a non-success status.
    #[error("platform returned {status}: {message}")]
    Api {
        status: u16,
        /// Machine-readable error code, when the platform sent one.
        code: Option<String>,
        message: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Endpoint URL could not be built.
    #[error("invalid platform URL: {0}")]
    Url(#[from] url::ParseError),
}

impl PlatformError {
    /// Whether the platform rejected a write because the record already exists.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        match self {
            Self::Api {
                status,
                code,
                message,
            } => {
                *status == 409
                    || matches!(
                        code.as_deref(),
                        Some("email_exists" | "user_already_exists" | "23505")
                    )
                    || message.to_lowercase().contains("already")
            }
            _ => false,
        }
    }
}

// =============================================================================
// Identity Types
// =============================================================================

/// A platform user as seen by the site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
}

/// A session issued by the identity service.
///
/// Stored in the site's own session; the tokens are only ever sent back to
/// the platform. Implements `Debug` manually to redact the tokens.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    /// Bearer token for platform requests made on the user's behalf.
    pub access_token: String,
    /// Token used to obtain a fresh access token.
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    /// Unix timestamp when the token was obtained.
    pub obtained_at: i64,
    pub user: Identity,
}

impl AuthSession {
    /// Check if the access token is expired (with 60s buffer).
    #[must_use]
    pub fn is_expired(&self) -> bool {
        let now = Utc::now().timestamp();
        now >= self.obtained_at + self.expires_in - 60
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .field("obtained_at", &self.obtained_at)
            .field("user", &self.user)
            .finish()
    }
}

/// Input for creating an account.
#[derive(Debug, Clone)]
pub struct SignUpRequest {
    pub email: Email,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Result of a successful sign-up.
#[derive(Debug, Clone)]
pub enum SignUpOutcome {
    /// The account is active and signed in.
    SignedIn(AuthSession),
    /// The platform sent a confirmation email; no session yet.
    ConfirmationRequired(Identity),
}

/// Display profile for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

// =============================================================================
// Seams
// =============================================================================

/// Password authentication and session lookup.
///
/// Failures are classified into [`AuthError`] kinds by the implementation.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchange email and password for a session.
    async fn sign_in(&self, email: &Email, password: &str) -> Result<AuthSession, AuthError>;

    /// Create an account with profile metadata.
    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpOutcome, AuthError>;

    /// Revoke the session behind `access_token`.
    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;

    /// Resolve the user behind `access_token`.
    async fn user(&self, access_token: &str) -> Result<Identity, AuthError>;

    /// Exchange a refresh token for a new session.
    async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, AuthError>;

    /// Check that the platform is reachable.
    async fn ping(&self) -> Result<(), PlatformError>;
}

/// Read access to the room catalog.
#[async_trait]
pub trait RoomSource: Send + Sync {
    /// Rooms matching `filter`, cheapest first.
    async fn list_rooms(&self, filter: RoomFilter) -> Result<Vec<Room>, PlatformError>;

    /// A single room, or `None` when the id is unknown.
    async fn room(&self, id: RoomId) -> Result<Option<Room>, PlatformError>;
}

/// Booking records. Every call carries the caller's access token; which rows
/// it may see or change is decided by the platform's policies.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Bookings owned by `user_id`, newest first, joined with their room.
    async fn list_for_user(
        &self,
        access_token: &str,
        user_id: UserId,
    ) -> Result<Vec<Booking>, PlatformError>;

    /// Insert a booking owned by `user_id` and return the stored row.
    async fn insert(
        &self,
        access_token: &str,
        user_id: UserId,
        request: &BookingRequest,
    ) -> Result<Booking, PlatformError>;

    /// Set the status of booking `id` to cancelled and return its owner.
    ///
    /// `None` when no row the caller may change has that id.
    async fn cancel(
        &self,
        access_token: &str,
        id: BookingId,
    ) -> Result<Option<UserId>, PlatformError>;

    /// Number of bookings visible to the caller.
    async fn count_visible(&self, access_token: &str) -> Result<usize, PlatformError>;
}

/// Role membership checks.
#[async_trait]
pub trait RolePolicy: Send + Sync {
    /// Whether `user_id` holds `role`.
    async fn has_role(
        &self,
        access_token: &str,
        user_id: UserId,
        role: AppRole,
    ) -> Result<bool, PlatformError>;
}

/// Display profiles.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Profile for `user_id`, or `None` if the user never saved one.
    async fn profile(
        &self,
        access_token: &str,
        user_id: UserId,
    ) -> Result<Option<Profile>, PlatformError>;
}

/// Privileged user management. Requires the service-role key and is never
/// reachable from the public site.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Find a user by email (exact, case-insensitive).
    async fn find_user_by_email(&self, email: &Email) -> Result<Option<Identity>, PlatformError>;

    /// Create a user whose email is already confirmed.
    async fn create_user(&self, email: &Email, password: &str) -> Result<Identity, PlatformError>;

    /// Replace a user's password.
    async fn update_password(&self, user_id: UserId, password: &str) -> Result<(), PlatformError>;

    /// Grant `role` to `user_id`; granting twice is a no-op.
    async fn upsert_role(&self, user_id: UserId, role: AppRole) -> Result<(), PlatformError>;

    /// Create or replace the profile keyed by `profile.user_id`.
    async fn upsert_profile(&self, profile: &Profile) -> Result<(), PlatformError>;
}
