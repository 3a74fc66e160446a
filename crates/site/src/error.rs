//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers return `Result<T, AppError>`;
//! the response body is `{"error": "<message>"}` with a message that is safe
//! to show to visitors.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::platform::PlatformError;
use crate::services::auth::AuthError;
use crate::services::bookings::BookingError;
use crate::services::rooms::CatalogError;

/// Application-level error type for the site.
#[derive(Debug, Error)]
pub enum AppError {
    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Booking operation failed.
    #[error("Booking error: {0}")]
    Booking(#[from] BookingError),

    /// Room catalog lookup failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Platform request failed.
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    /// Signed in without the required role.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Too many requests from one client.
    #[error("Rate limited, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::NotAuthenticated => {
                    StatusCode::UNAUTHORIZED
                }
                AuthError::EmailNotConfirmed => StatusCode::FORBIDDEN,
                AuthError::AlreadyRegistered => StatusCode::CONFLICT,
                AuthError::WeakPassword(_)
                | AuthError::InvalidEmail(_)
                | AuthError::PasswordMismatch
                | AuthError::MissingField(_) => StatusCode::BAD_REQUEST,
                AuthError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
                AuthError::Platform(_) => StatusCode::BAD_GATEWAY,
            },
            Self::Booking(err) => match err {
                BookingError::NotAuthenticated => StatusCode::UNAUTHORIZED,
                BookingError::Guests(_) | BookingError::Stay(_) => StatusCode::BAD_REQUEST,
                BookingError::RoomNotFound(_) => StatusCode::NOT_FOUND,
                BookingError::RoomUnavailable(_) => StatusCode::CONFLICT,
                BookingError::Platform(_) => StatusCode::BAD_GATEWAY,
            },
            Self::Catalog(CatalogError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Catalog(CatalogError::Platform(_)) | Self::Platform(_) => StatusCode::BAD_GATEWAY,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to visitors.
    fn public_message(&self) -> String {
        match self {
            Self::Auth(err) => err.user_message(),
            Self::Booking(err) => match err {
                BookingError::NotAuthenticated => "Please sign in to book a room".to_string(),
                BookingError::Guests(e) => capitalize(&e.to_string()),
                BookingError::Stay(e) => capitalize(&e.to_string()),
                BookingError::RoomNotFound(_) => "Room not found".to_string(),
                BookingError::RoomUnavailable(_) => {
                    "This room is not available for booking".to_string()
                }
                BookingError::Platform(_) => "External service error".to_string(),
            },
            Self::Catalog(CatalogError::NotFound(_)) => "Room not found".to_string(),
            Self::Catalog(CatalogError::Platform(_)) | Self::Platform(_) => {
                "External service error".to_string()
            }
            Self::Internal(_) => "Internal server error".to_string(),
            Self::Forbidden(msg) | Self::BadRequest(msg) => msg.clone(),
            Self::RateLimited { .. } => "Too many requests, please try again later".to_string(),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let mut response = (status, Json(json!({ "error": self.public_message() }))).into_response();
        if let Self::RateLimited { retry_after_secs } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        response
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on sign-out to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for visitor actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("booking", "Booking created", Some(&[("booking_id", "8f1c...")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
