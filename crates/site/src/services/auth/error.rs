//! Authentication error types.

use thiserror::Error;

use crate::platform::PlatformError;

/// Errors that can occur during authentication operations.
///
/// Identity-service failures are classified into these kinds by
/// [`AuthError::from_platform`]; anything unrecognised stays a
/// [`AuthError::Platform`].
#[derive(Debug, Error)]
pub enum AuthError {
    /// Wrong email or password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The account exists but its email has not been confirmed yet.
    #[error("email not confirmed")]
    EmailNotConfirmed,

    /// Sign-up for an email that already has an account.
    #[error("user already registered")]
    AlreadyRegistered,

    /// Password rejected by policy.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Email rejected locally or by the identity service.
    #[error("invalid email: {0}")]
    InvalidEmail(String),

    /// Password and confirmation differ.
    #[error("passwords do not match")]
    PasswordMismatch,

    /// A required form field was empty.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// No signed-in identity, or the stored session is no longer valid.
    #[error("not authenticated")]
    NotAuthenticated,

    /// Reading or writing the site session failed.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Any other identity-service failure.
    #[error("identity service error: {0}")]
    Platform(PlatformError),
}

impl From<haven_core::EmailError> for AuthError {
    fn from(err: haven_core::EmailError) -> Self {
        Self::InvalidEmail(err.to_string())
    }
}

impl AuthError {
    /// Classify an identity-service failure.
    ///
    /// Prefers the machine-readable error code and falls back to the message
    /// text for older deployments that only send a description.
    #[must_use]
    pub fn from_platform(err: PlatformError) -> Self {
        let PlatformError::Api {
            status,
            code,
            message,
        } = &err
        else {
            return Self::Platform(err);
        };

        match code.as_deref() {
            Some("invalid_credentials") => return Self::InvalidCredentials,
            Some("email_not_confirmed") => return Self::EmailNotConfirmed,
            Some("user_already_exists" | "email_exists") => return Self::AlreadyRegistered,
            Some("weak_password") => return Self::WeakPassword(message.clone()),
            Some("email_address_invalid") => return Self::InvalidEmail(message.clone()),
            Some("bad_jwt" | "session_not_found" | "refresh_token_not_found") => {
                return Self::NotAuthenticated;
            }
            _ => {}
        }

        let lower = message.to_lowercase();
        if lower.contains("invalid login credentials") {
            Self::InvalidCredentials
        } else if lower.contains("email not confirmed") {
            Self::EmailNotConfirmed
        } else if lower.contains("already registered") || lower.contains("already exists") {
            Self::AlreadyRegistered
        } else if lower.contains("password should") || lower.contains("password is too") {
            Self::WeakPassword(message.clone())
        } else if lower.contains("email") && lower.contains("invalid") {
            Self::InvalidEmail(message.clone())
        } else if *status == 401 || lower.contains("invalid refresh token") {
            Self::NotAuthenticated
        } else {
            Self::Platform(err)
        }
    }

    /// Message safe to show to the person signing in.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidCredentials => "Invalid email or password".to_string(),
            Self::EmailNotConfirmed => {
                "Please check your email and confirm your account before signing in".to_string()
            }
            Self::AlreadyRegistered => "An account with this email already exists".to_string(),
            Self::WeakPassword(msg) => msg.clone(),
            Self::InvalidEmail(_) => "Please enter a valid email address".to_string(),
            Self::PasswordMismatch => "Passwords do not match".to_string(),
            Self::MissingField(_) => "Please fill in all fields".to_string(),
            Self::NotAuthenticated => "Please sign in to continue".to_string(),
            Self::Session(_) | Self::Platform(_) => {
                "Authentication service unavailable, please try again".to_string()
            }
        }
    }
}
