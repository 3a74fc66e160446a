//! Privileged platform access for admin tooling.
//!
//! [`ServiceClient`] authenticates with the service-role key, which bypasses
//! row-level policies. It is constructed only by the CLI.

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use haven_core::{AppRole, Email, UserId};

use super::auth::UserResponse;
use super::{Identity, PlatformClient, PlatformError, Profile, UserDirectory};
use crate::config::{PlatformConfig, ServiceRoleConfig};

/// Users fetched per page when scanning the user list.
const USERS_PER_PAGE: usize = 1000;

/// Platform client holding the service-role key.
#[derive(Clone, Debug)]
pub struct ServiceClient {
    client: PlatformClient,
}

#[derive(Debug, Deserialize)]
struct UserPage {
    users: Vec<UserResponse>,
}

#[derive(Debug, Serialize)]
struct RoleRow {
    user_id: UserId,
    role: AppRole,
}

impl ServiceClient {
    /// Create a privileged client.
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Http` if the HTTP client cannot be built.
    pub fn new(platform: &PlatformConfig, service: &ServiceRoleConfig) -> Result<Self, PlatformError> {
        Ok(Self {
            client: PlatformClient::with_key(platform, service.service_role_key.clone())?,
        })
    }

    /// Insert `body` into `table`, merging with the row that conflicts on
    /// `on_conflict`.
    async fn upsert<T: Serialize + Sync>(
        &self,
        table: &str,
        on_conflict: &str,
        body: &T,
    ) -> Result<(), PlatformError> {
        let mut url = self.client.endpoint(&format!("rest/v1/{table}"))?;
        url.query_pairs_mut().append_pair("on_conflict", on_conflict);

        self.client
            .send_empty(
                self.client
                    .request(Method::POST, url, None)
                    .header("Prefer", "resolution=merge-duplicates,return=minimal")
                    .json(body),
            )
            .await
    }
}

#[async_trait]
impl UserDirectory for ServiceClient {
    #[instrument(skip(self), fields(email = %email))]
    async fn find_user_by_email(&self, email: &Email) -> Result<Option<Identity>, PlatformError> {
        let mut page = 1_usize;
        loop {
            let mut url = self.client.endpoint("auth/v1/admin/users")?;
            url.query_pairs_mut()
                .append_pair("page", &page.to_string())
                .append_pair("per_page", &USERS_PER_PAGE.to_string());

            let batch: UserPage = self
                .client
                .send(self.client.request(Method::GET, url, None))
                .await?;
            let exhausted = batch.users.len() < USERS_PER_PAGE;

            let found = batch.users.into_iter().map(Identity::from).find(|user| {
                user.email
                    .as_deref()
                    .is_some_and(|e| e.eq_ignore_ascii_case(email.as_str()))
            });
            if found.is_some() || exhausted {
                return Ok(found);
            }
            page += 1;
        }
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn create_user(&self, email: &Email, password: &str) -> Result<Identity, PlatformError> {
        let url = self.client.endpoint("auth/v1/admin/users")?;
        let body = json!({
            "email": email.as_str(),
            "password": password,
            "email_confirm": true,
        });
        let user: UserResponse = self
            .client
            .send(self.client.request(Method::POST, url, None).json(&body))
            .await?;
        Ok(user.into())
    }

    #[instrument(skip(self, password))]
    async fn update_password(&self, user_id: UserId, password: &str) -> Result<(), PlatformError> {
        let url = self
            .client
            .endpoint(&format!("auth/v1/admin/users/{user_id}"))?;
        self.client
            .send_empty(
                self.client
                    .request(Method::PUT, url, None)
                    .json(&json!({ "password": password })),
            )
            .await
    }

    #[instrument(skip(self))]
    async fn upsert_role(&self, user_id: UserId, role: AppRole) -> Result<(), PlatformError> {
        self.upsert("user_roles", "user_id,role", &RoleRow { user_id, role })
            .await
    }

    #[instrument(skip(self, profile), fields(user_id = %profile.user_id))]
    async fn upsert_profile(&self, profile: &Profile) -> Result<(), PlatformError> {
        self.upsert("profiles", "user_id", profile).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_user_page_parses() {
        let json = r#"{
            "users": [
                { "id": "1f3e5d7c-9b1a-4c2e-8d6f-0a2b4c6d8e0f", "email": "admin@haven.com", "role": "authenticated" },
                { "id": "9b2d4c1e-0c4f-4a7e-8f3a-2d1b5e6f7a80", "phone": "+15550100" }
            ],
            "aud": "authenticated"
        }"#;
        let page: UserPage = serde_json::from_str(json).unwrap();
        let identities: Vec<Identity> = page.users.into_iter().map(Identity::from).collect();
        assert_eq!(identities.len(), 2);
        assert_eq!(identities[0].email.as_deref(), Some("admin@haven.com"));
        assert_eq!(identities[1].email, None);
    }

    #[test]
    fn test_role_row_shape() {
        let row = RoleRow {
            user_id: "1f3e5d7c-9b1a-4c2e-8d6f-0a2b4c6d8e0f".parse().unwrap(),
            role: AppRole::Admin,
        };
        assert_eq!(
            serde_json::to_value(&row).unwrap(),
            json!({ "user_id": "1f3e5d7c-9b1a-4c2e-8d6f-0a2b4c6d8e0f", "role": "admin" })
        );
    }
}
