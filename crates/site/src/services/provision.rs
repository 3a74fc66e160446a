//! Privileged account provisioning for the admin CLI.
//!
//! Runs against a [`UserDirectory`] holding the service-role key. Nothing in
//! the public site constructs a [`Provisioner`].

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use haven_core::{AppRole, Email, EmailError, UserId};

use crate::platform::{PlatformError, Profile, UserDirectory};

/// Minimum password length for accounts created by the CLI.
const MIN_PASSWORD_LENGTH: usize = 6;

/// Provisioning errors.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("no user with email {0}")]
    UserNotFound(String),

    #[error("password must be at least 6 characters")]
    WeakPassword,

    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// Result of granting the admin role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromotionOutcome {
    pub user_id: UserId,
    pub email: String,
    pub role: AppRole,
}

/// Input for creating (or reusing) an admin account.
#[derive(Debug, Clone)]
pub struct AdminSetup {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Result of [`Provisioner::setup`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetupOutcome {
    pub user_id: UserId,
    pub email: String,
    /// `false` when an account with the email already existed.
    pub created: bool,
    /// `false` when the profile write failed; the role was still granted.
    pub profile_saved: bool,
}

/// Creates admin accounts and grants roles.
#[derive(Clone)]
pub struct Provisioner {
    directory: Arc<dyn UserDirectory>,
}

impl Provisioner {
    #[must_use]
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self { directory }
    }

    /// Grant the admin role to an existing user.
    ///
    /// Granting twice is harmless.
    ///
    /// # Errors
    ///
    /// Returns `ProvisionError::UserNotFound` when no user has the email and
    /// `ProvisionError::Platform` on any platform failure.
    #[instrument(skip(self))]
    pub async fn promote(&self, email: &str) -> Result<PromotionOutcome, ProvisionError> {
        let email = Email::parse(email)?;
        let user = self
            .directory
            .find_user_by_email(&email)
            .await?
            .ok_or_else(|| ProvisionError::UserNotFound(email.to_string()))?;

        self.directory.upsert_role(user.id, AppRole::Admin).await?;
        info!(user_id = %user.id, "Admin role granted");

        Ok(PromotionOutcome {
            user_id: user.id,
            email: user.email.unwrap_or_else(|| email.into_inner()),
            role: AppRole::Admin,
        })
    }

    /// Create a confirmed admin account, or reuse the account with that email,
    /// then save its profile and grant the admin role.
    ///
    /// A failed profile write is logged and reported in the outcome; the role
    /// is granted regardless.
    ///
    /// # Errors
    ///
    /// Returns `ProvisionError::WeakPassword` for short passwords and
    /// `ProvisionError::Platform` if the user or role write fails.
    #[instrument(skip(self, setup), fields(email = %setup.email))]
    pub async fn setup(&self, setup: &AdminSetup) -> Result<SetupOutcome, ProvisionError> {
        let email = Email::parse(&setup.email)?;
        if setup.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ProvisionError::WeakPassword);
        }

        let (user, created) = match self.directory.find_user_by_email(&email).await? {
            Some(existing) => {
                info!(user_id = %existing.id, "Reusing existing account");
                (existing, false)
            }
            None => {
                let user = self.directory.create_user(&email, &setup.password).await?;
                info!(user_id = %user.id, "Account created");
                (user, true)
            }
        };

        let profile = Profile {
            user_id: user.id,
            email: Some(email.as_str().to_owned()),
            first_name: Some(setup.first_name.trim().to_owned()),
            last_name: Some(setup.last_name.trim().to_owned()),
        };
        let profile_saved = match self.directory.upsert_profile(&profile).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, user_id = %user.id, "Profile write failed");
                false
            }
        };

        self.directory.upsert_role(user.id, AppRole::Admin).await?;
        info!(user_id = %user.id, "Admin role granted");

        Ok(SetupOutcome {
            user_id: user.id,
            email: email.into_inner(),
            created,
            profile_saved,
        })
    }

    /// Replace the password of an existing user.
    ///
    /// # Errors
    ///
    /// Returns `ProvisionError::UserNotFound` when no user has the email,
    /// `ProvisionError::WeakPassword` for short passwords and
    /// `ProvisionError::Platform` on any platform failure.
    #[instrument(skip(self, password))]
    pub async fn reset_password(&self, email: &str, password: &str) -> Result<UserId, ProvisionError> {
        let email = Email::parse(email)?;
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ProvisionError::WeakPassword);
        }

        let user = self
            .directory
            .find_user_by_email(&email)
            .await?
            .ok_or_else(|| ProvisionError::UserNotFound(email.to_string()))?;
        self.directory.update_password(user.id, password).await?;
        info!(user_id = %user.id, "Password reset");
        Ok(user.id)
    }
}
