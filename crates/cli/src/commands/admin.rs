//! Admin account commands.
//!
//! # Usage
//!
//! ```bash
//! haven-cli admin promote -e manager@haven.com
//! haven-cli admin setup -e manager@haven.com -p 'long-password'
//! haven-cli admin reset-password -e manager@haven.com -p 'new-password'
//! ```
//!
//! # Environment Variables
//!
//! - `PLATFORM_URL`, `PLATFORM_ANON_KEY` - Platform connection
//! - `PLATFORM_SERVICE_ROLE_KEY` - Service-role key

use std::sync::Arc;

use haven_site::config::{ConfigError, PlatformConfig, ServiceRoleConfig};
use haven_site::platform::{PlatformError, ServiceClient};
use haven_site::services::provision::{
    AdminSetup, PromotionOutcome, ProvisionError, Provisioner, SetupOutcome,
};
use thiserror::Error;

use haven_core::UserId;

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Platform client could not be built.
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    /// The provisioning call failed.
    #[error(transparent)]
    Provision(#[from] ProvisionError),
}

/// Build a provisioner holding the service-role key.
///
/// # Errors
///
/// Returns `AdminError::Config` if the platform settings or the service-role
/// key are missing or invalid.
pub fn provisioner() -> Result<Provisioner, AdminError> {
    dotenvy::dotenv().ok();

    let platform = PlatformConfig::from_env()?;
    let service = ServiceRoleConfig::from_env()?;
    let client = ServiceClient::new(&platform, &service)?;

    tracing::info!(url = %platform.url, "Connected to platform with service-role key");
    Ok(Provisioner::new(Arc::new(client)))
}

/// Grant the admin role to an existing account.
///
/// # Errors
///
/// Returns `AdminError::Provision` if the account does not exist or the role
/// cannot be written.
pub async fn promote(
    provisioner: &Provisioner,
    email: &str,
) -> Result<PromotionOutcome, AdminError> {
    tracing::info!("Promoting {} to admin...", email);
    let outcome = provisioner.promote(email).await?;

    tracing::info!(
        "Admin role granted! ID: {}, Email: {}, Role: {}",
        outcome.user_id,
        outcome.email,
        outcome.role.as_str()
    );
    Ok(outcome)
}

/// Create or reuse an admin account.
///
/// # Errors
///
/// Returns `AdminError::Provision` if the account or role cannot be written.
pub async fn setup(provisioner: &Provisioner, setup: &AdminSetup) -> Result<SetupOutcome, AdminError> {
    tracing::info!("Setting up admin account: {}", setup.email);
    let outcome = provisioner.setup(setup).await?;

    if outcome.created {
        tracing::info!("Account created with confirmed email");
    } else {
        tracing::warn!("Account already existed; its password was left unchanged");
    }
    if !outcome.profile_saved {
        tracing::warn!("Profile could not be saved; the dashboard will show default names");
    }
    tracing::info!(
        "Admin ready! ID: {}, Email: {}, Sign in at /admin/login",
        outcome.user_id,
        outcome.email
    );
    Ok(outcome)
}

/// Replace an account's password.
///
/// # Errors
///
/// Returns `AdminError::Provision` if the account does not exist, the
/// password is too short, or the update fails.
pub async fn reset_password(
    provisioner: &Provisioner,
    email: &str,
    password: &str,
) -> Result<UserId, AdminError> {
    tracing::info!("Resetting password for {}...", email);
    let user_id = provisioner.reset_password(email, password).await?;
    tracing::info!("Password updated for user {}", user_id);
    Ok(user_id)
}
