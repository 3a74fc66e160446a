//! Identity and session context.
//!
//! A [`SessionContext`] is built per request from the visitor's site session
//! and the identity provider. It resolves the stored platform session
//! (refreshing it when the access token is about to expire) and exposes
//! sign-in, sign-up and sign-out. Every session change is published on
//! [`AuthEvents`].

mod error;
mod events;

pub use error::AuthError;
pub use events::{AuthEvent, AuthEvents};

use std::sync::Arc;

use serde::Deserialize;
use tower_sessions::Session;

use haven_core::Email;

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::models::session_keys;
use crate::platform::{AuthSession, Identity, IdentityProvider, SignUpOutcome, SignUpRequest};

/// Minimum password length accepted at sign-up.
const MIN_PASSWORD_LENGTH: usize = 6;

/// Where the context is in resolving the visitor's session.
#[derive(Debug, Clone)]
enum SessionState {
    /// The stored session has not been checked yet.
    Resolving,
    SignedOut,
    SignedIn(AuthSession),
}

/// Sign-up form as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignUpForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl SignUpForm {
    /// Check the form and build the request sent to the identity service.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingField` if any field is blank,
    /// `AuthError::WeakPassword` if the password is shorter than six
    /// characters, `AuthError::PasswordMismatch` if the confirmation differs
    /// and `AuthError::InvalidEmail` if the email is malformed.
    pub fn validate(&self) -> Result<SignUpRequest, AuthError> {
        let fields = [
            ("email", self.email.trim()),
            ("password", self.password.as_str()),
            ("confirm_password", self.confirm_password.as_str()),
            ("first_name", self.first_name.trim()),
            ("last_name", self.last_name.trim()),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, value)| value.is_empty()) {
            return Err(AuthError::MissingField(*name));
        }

        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::WeakPassword(format!(
                "Password must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }
        if self.password != self.confirm_password {
            return Err(AuthError::PasswordMismatch);
        }

        Ok(SignUpRequest {
            email: Email::parse(&self.email)?,
            password: self.password.clone(),
            first_name: self.first_name.trim().to_owned(),
            last_name: self.last_name.trim().to_owned(),
        })
    }
}

/// The visitor's identity for the duration of one request.
pub struct SessionContext {
    session: Session,
    provider: Arc<dyn IdentityProvider>,
    events: AuthEvents,
    state: SessionState,
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl SessionContext {
    /// Create an unresolved context.
    #[must_use]
    pub fn new(session: Session, provider: Arc<dyn IdentityProvider>, events: AuthEvents) -> Self {
        Self {
            session,
            provider,
            events,
            state: SessionState::Resolving,
        }
    }

    /// Load the stored platform session, refreshing it if it has expired.
    ///
    /// An unexpired access token is checked with the identity service, so a
    /// session revoked on the platform ends here too. A session the identity
    /// service no longer accepts is cleared. If the service cannot be reached
    /// the visitor is treated as signed out for this request but the stored
    /// session is kept.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Session` if the site session cannot be read or
    /// written.
    pub async fn resolve(&mut self) -> Result<(), AuthError> {
        let stored: Option<AuthSession> = self.session.get(session_keys::AUTH_SESSION).await?;
        let Some(auth) = stored else {
            self.state = SessionState::SignedOut;
            return Ok(());
        };

        let checked = if auth.is_expired() {
            self.provider.refresh(&auth.refresh_token).await.map(|fresh| (fresh, true))
        } else {
            self.provider
                .user(&auth.access_token)
                .await
                .map(|user| (AuthSession { user, ..auth.clone() }, false))
        };

        self.state = match checked {
            Ok((fresh, refreshed)) => {
                if refreshed {
                    self.session.insert(session_keys::AUTH_SESSION, &fresh).await?;
                    self.events.publish(AuthEvent::TokenRefreshed {
                        user_id: fresh.user.id,
                    });
                }
                SessionState::SignedIn(fresh)
            }
            Err(AuthError::NotAuthenticated) => {
                tracing::info!(user_id = %auth.user.id, "Stored session no longer valid");
                self.session
                    .remove::<AuthSession>(session_keys::AUTH_SESSION)
                    .await?;
                self.events.publish(AuthEvent::SignedOut {
                    user_id: Some(auth.user.id),
                });
                SessionState::SignedOut
            }
            Err(e) => {
                tracing::warn!(error = %e, user_id = %auth.user.id, "Session check failed");
                SessionState::SignedOut
            }
        };
        Ok(())
    }

    /// `true` until [`resolve`](Self::resolve) has completed.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self.state, SessionState::Resolving)
    }

    /// The signed-in identity, if any.
    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        match &self.state {
            SessionState::SignedIn(auth) => Some(&auth.user),
            _ => None,
        }
    }

    /// Access token for platform calls made on the visitor's behalf.
    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        match &self.state {
            SessionState::SignedIn(auth) => Some(auth.access_token.as_str()),
            _ => None,
        }
    }

    /// Sign in with email and password.
    ///
    /// The site session id is rotated before the platform session is stored.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingField` for blank input, otherwise whatever
    /// kind the identity service reported.
    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<Identity, AuthError> {
        if email.trim().is_empty() {
            return Err(AuthError::MissingField("email"));
        }
        if password.is_empty() {
            return Err(AuthError::MissingField("password"));
        }
        let email = Email::parse(email)?;

        let auth = self.provider.sign_in(&email, password).await?;
        self.store(auth).await
    }

    /// Create an account.
    ///
    /// When the identity service activates the account immediately the visitor
    /// is signed in; otherwise they must confirm their email first.
    ///
    /// # Errors
    ///
    /// Returns the validation failures of [`SignUpForm::validate`], otherwise
    /// whatever kind the identity service reported.
    pub async fn sign_up(&mut self, form: &SignUpForm) -> Result<SignUpStatus, AuthError> {
        let request = form.validate()?;

        match self.provider.sign_up(&request).await? {
            SignUpOutcome::SignedIn(auth) => Ok(SignUpStatus::SignedIn(self.store(auth).await?)),
            SignUpOutcome::ConfirmationRequired(identity) => {
                tracing::info!(user_id = %identity.id, "Sign-up awaiting email confirmation");
                Ok(SignUpStatus::ConfirmationRequired(identity))
            }
        }
    }

    /// Sign out and forget the platform session.
    ///
    /// A failed revocation at the identity service is logged; the local
    /// session is cleared regardless.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Session` if the site session cannot be written.
    pub async fn sign_out(&mut self) -> Result<(), AuthError> {
        let previous = std::mem::replace(&mut self.state, SessionState::SignedOut);
        let user_id = match previous {
            SessionState::SignedIn(auth) => {
                if let Err(e) = self.provider.sign_out(&auth.access_token).await {
                    tracing::warn!(error = %e, user_id = %auth.user.id, "Token revocation failed");
                }
                Some(auth.user.id)
            }
            SessionState::Resolving | SessionState::SignedOut => None,
        };

        self.session
            .remove::<AuthSession>(session_keys::AUTH_SESSION)
            .await?;
        self.events.publish(AuthEvent::SignedOut { user_id });
        clear_sentry_user();

        if let Some(user_id) = user_id {
            tracing::info!(%user_id, "User signed out");
        }
        Ok(())
    }

    async fn store(&mut self, auth: AuthSession) -> Result<Identity, AuthError> {
        self.session.cycle_id().await?;
        self.session.insert(session_keys::AUTH_SESSION, &auth).await?;

        let identity = auth.user.clone();
        set_sentry_user(&identity.id, identity.email.as_deref());
        self.events.publish(AuthEvent::SignedIn {
            user_id: identity.id,
        });
        tracing::info!(user_id = %identity.id, "User signed in");

        self.state = SessionState::SignedIn(auth);
        Ok(identity)
    }
}

/// Result of [`SessionContext::sign_up`].
#[derive(Debug, Clone)]
pub enum SignUpStatus {
    SignedIn(Identity),
    ConfirmationRequired(Identity),
}
