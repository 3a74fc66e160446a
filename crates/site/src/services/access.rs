//! Admin access gate.
//!
//! Access to the dashboard requires an `admin` row in the role table for the
//! signed-in identity. A signed-in visitor without one is signed out, so the
//! admin login page starts from a clean session.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};

use haven_core::{AppRole, UserId};

use crate::platform::{Profile, ProfileStore, RolePolicy};
use crate::services::auth::{AuthError, SessionContext};

const DEFAULT_FIRST_NAME: &str = "Admin";
const DEFAULT_LAST_NAME: &str = "User";

/// Outcome of an admin access check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminAccess {
    /// The session has not been resolved yet.
    Unknown,
    Denied(DenyReason),
    Granted(AdminProfile),
}

/// Why access was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// Nobody is signed in. The session is left alone.
    NoSession,
    /// Signed in without the admin role. The session was signed out.
    NotAdmin,
    /// The role lookup failed. The session was signed out.
    LookupFailed,
}

/// Display details for the signed-in admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminProfile {
    pub user_id: UserId,
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
}

impl AdminProfile {
    fn from_profile(user_id: UserId, email: Option<String>, profile: Option<Profile>) -> Self {
        let non_blank = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        let (first_name, last_name, stored_email) = match profile {
            Some(p) => (non_blank(p.first_name), non_blank(p.last_name), p.email),
            None => (None, None, None),
        };

        Self {
            user_id,
            email: email.or(stored_email),
            first_name: first_name.unwrap_or_else(|| DEFAULT_FIRST_NAME.to_owned()),
            last_name: last_name.unwrap_or_else(|| DEFAULT_LAST_NAME.to_owned()),
        }
    }
}

/// Decides whether the current visitor may use the admin dashboard.
#[derive(Clone)]
pub struct RoleGate {
    roles: Arc<dyn RolePolicy>,
    profiles: Arc<dyn ProfileStore>,
}

impl RoleGate {
    #[must_use]
    pub fn new(roles: Arc<dyn RolePolicy>, profiles: Arc<dyn ProfileStore>) -> Self {
        Self { roles, profiles }
    }

    /// Check the visitor's admin access.
    ///
    /// Signs the visitor out when they are signed in but the admin role is
    /// missing or cannot be looked up.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Session` if signing out fails to update the site
    /// session.
    #[instrument(skip_all)]
    pub async fn check(&self, ctx: &mut SessionContext) -> Result<AdminAccess, AuthError> {
        if ctx.is_loading() {
            return Ok(AdminAccess::Unknown);
        }
        let (Some(identity), Some(token)) = (ctx.identity().cloned(), ctx.access_token()) else {
            return Ok(AdminAccess::Denied(DenyReason::NoSession));
        };

        let reason = match self.roles.has_role(token, identity.id, AppRole::Admin).await {
            Ok(true) => {
                let profile = match self.profiles.profile(token, identity.id).await {
                    Ok(profile) => profile,
                    Err(e) => {
                        warn!(error = %e, user_id = %identity.id, "Admin profile lookup failed");
                        None
                    }
                };
                return Ok(AdminAccess::Granted(AdminProfile::from_profile(
                    identity.id,
                    identity.email,
                    profile,
                )));
            }
            Ok(false) => {
                info!(user_id = %identity.id, "Admin access denied");
                DenyReason::NotAdmin
            }
            Err(e) => {
                warn!(error = %e, user_id = %identity.id, "Role lookup failed");
                DenyReason::LookupFailed
            }
        };

        ctx.sign_out().await?;
        Ok(AdminAccess::Denied(reason))
    }

    /// Whether the signed-in visitor holds the admin role.
    ///
    /// Unlike [`check`](Self::check) this never signs anyone out. Lookup
    /// failures count as `false`.
    pub async fn is_admin(&self, ctx: &SessionContext) -> bool {
        let (Some(identity), Some(token)) = (ctx.identity(), ctx.access_token()) else {
            return false;
        };
        match self.roles.has_role(token, identity.id, AppRole::Admin).await {
            Ok(is_admin) => is_admin,
            Err(e) => {
                warn!(error = %e, user_id = %identity.id, "Role lookup failed");
                false
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use haven_core::Email;
    use tower_sessions::{MemoryStore, Session};

    use super::*;
    use crate::platform::memory::MemoryPlatform;
    use crate::services::auth::AuthEvents;

    struct Harness {
        platform: Arc<MemoryPlatform>,
        gate: RoleGate,
        session: Session,
    }

    impl Harness {
        fn new() -> Self {
            let platform = Arc::new(MemoryPlatform::new());
            Self {
                gate: RoleGate::new(platform.clone(), platform.clone()),
                platform,
                session: Session::new(None, Arc::new(MemoryStore::default()), None),
            }
        }

        fn context(&self) -> SessionContext {
            SessionContext::new(self.session.clone(), self.platform.clone(), AuthEvents::new())
        }

        async fn signed_in(&self) -> (SessionContext, UserId) {
            let user = self
                .platform
                .add_user(&Email::parse("staff@haven.test").unwrap(), "hunter22")
                .await;
            let mut ctx = self.context();
            ctx.sign_in("staff@haven.test", "hunter22").await.unwrap();
            (ctx, user.id)
        }
    }

    #[tokio::test]
    async fn test_unresolved_session_is_unknown() {
        let harness = Harness::new();
        let mut ctx = harness.context();
        assert_eq!(harness.gate.check(&mut ctx).await.unwrap(), AdminAccess::Unknown);
    }

    #[tokio::test]
    async fn test_no_session_is_denied_without_sign_out() {
        let harness = Harness::new();
        let mut ctx = harness.context();
        ctx.resolve().await.unwrap();
        assert_eq!(
            harness.gate.check(&mut ctx).await.unwrap(),
            AdminAccess::Denied(DenyReason::NoSession)
        );
    }

    #[tokio::test]
    async fn test_missing_role_signs_out() {
        let harness = Harness::new();
        let (mut ctx, _) = harness.signed_in().await;

        assert_eq!(
            harness.gate.check(&mut ctx).await.unwrap(),
            AdminAccess::Denied(DenyReason::NotAdmin)
        );
        assert!(ctx.identity().is_none());
        assert_eq!(harness.platform.active_sessions().await, 0);

        let mut next = harness.context();
        next.resolve().await.unwrap();
        assert!(next.identity().is_none());
    }

    #[tokio::test]
    async fn test_admin_is_granted_with_default_names() {
        let harness = Harness::new();
        let (mut ctx, user_id) = harness.signed_in().await;
        harness.platform.grant_role(user_id, AppRole::Admin).await;

        let AdminAccess::Granted(profile) = harness.gate.check(&mut ctx).await.unwrap() else {
            panic!("expected access");
        };
        assert_eq!(profile.first_name, "Admin");
        assert_eq!(profile.last_name, "User");
        assert_eq!(profile.email.as_deref(), Some("staff@haven.test"));
        assert!(ctx.identity().is_some());
    }

    #[tokio::test]
    async fn test_is_admin_keeps_session() {
        let harness = Harness::new();
        let (ctx, user_id) = harness.signed_in().await;

        assert!(!harness.gate.is_admin(&ctx).await);
        assert!(ctx.identity().is_some());
        assert_eq!(harness.platform.active_sessions().await, 1);

        harness.platform.grant_role(user_id, AppRole::Admin).await;
        assert!(harness.gate.is_admin(&ctx).await);
    }

    #[test]
    fn test_profile_names_override_defaults() {
        let user_id = UserId::random();
        let profile = AdminProfile::from_profile(
            user_id,
            None,
            Some(Profile {
                user_id,
                email: Some("staff@haven.test".to_owned()),
                first_name: Some("Meera".to_owned()),
                last_name: Some(" ".to_owned()),
            }),
        );
        assert_eq!(profile.first_name, "Meera");
        assert_eq!(profile.last_name, "User");
        assert_eq!(profile.email.as_deref(), Some("staff@haven.test"));
    }
}
