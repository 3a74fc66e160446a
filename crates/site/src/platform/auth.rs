//! Identity service (`auth/v1`) adapter.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use haven_core::{Email, UserId};

use super::{AuthSession, Identity, IdentityProvider, PlatformClient, PlatformError, SignUpOutcome, SignUpRequest};
use crate::services::auth::AuthError;

/// User object returned by the identity service.
#[derive(Debug, Deserialize)]
pub(super) struct UserResponse {
    id: UserId,
    #[serde(default)]
    email: Option<String>,
    /// Linked sign-in identities. An empty list on sign-up means the email is
    /// already taken and the service is hiding that fact.
    #[serde(default)]
    identities: Option<Vec<serde_json::Value>>,
}

impl From<UserResponse> for Identity {
    fn from(user: UserResponse) -> Self {
        Self {
            id: user.id,
            email: user.email,
        }
    }
}

/// Token grant response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    user: UserResponse,
}

impl From<TokenResponse> for AuthSession {
    fn from(token: TokenResponse) -> Self {
        Self {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_in: token.expires_in,
            obtained_at: Utc::now().timestamp(),
            user: token.user.into(),
        }
    }
}

/// Sign-up response: a full session when confirmation is off, otherwise
/// just the (unconfirmed) user, either nested or at the top level.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    Nested { user: UserResponse },
    User(UserResponse),
}

impl PlatformClient {
    async fn grant(&self, grant_type: &str, body: serde_json::Value) -> Result<AuthSession, PlatformError> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);
        let token: TokenResponse = self.send(self.request(Method::POST, url, None).json(&body)).await?;
        Ok(token.into())
    }
}

#[async_trait]
impl IdentityProvider for PlatformClient {
    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_in(&self, email: &Email, password: &str) -> Result<AuthSession, AuthError> {
        self.grant("password", json!({ "email": email.as_str(), "password": password }))
            .await
            .map_err(AuthError::from_platform)
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpOutcome, AuthError> {
        let url = self.endpoint("auth/v1/signup").map_err(AuthError::Platform)?;
        let body = json!({
            "email": request.email.as_str(),
            "password": request.password,
            "data": {
                "first_name": request.first_name,
                "last_name": request.last_name,
            },
        });

        let response: SignUpResponse = self
            .send(self.request(Method::POST, url, None).json(&body))
            .await
            .map_err(AuthError::from_platform)?;

        let user = match response {
            SignUpResponse::Session(token) => return Ok(SignUpOutcome::SignedIn(token.into())),
            SignUpResponse::Nested { user } | SignUpResponse::User(user) => user,
        };

        if user.identities.as_ref().is_some_and(Vec::is_empty) {
            return Err(AuthError::AlreadyRegistered);
        }
        Ok(SignUpOutcome::ConfirmationRequired(user.into()))
    }

    #[instrument(skip_all)]
    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let url = self.endpoint("auth/v1/logout").map_err(AuthError::Platform)?;
        self.send_empty(self.request(Method::POST, url, Some(access_token)))
            .await
            .map_err(AuthError::from_platform)
    }

    #[instrument(skip_all)]
    async fn user(&self, access_token: &str) -> Result<Identity, AuthError> {
        let url = self.endpoint("auth/v1/user").map_err(AuthError::Platform)?;
        let user: UserResponse = self
            .send(self.request(Method::GET, url, Some(access_token)))
            .await
            .map_err(AuthError::from_platform)?;
        Ok(user.into())
    }

    #[instrument(skip_all)]
    async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, AuthError> {
        self.grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
            .map_err(|err| match AuthError::from_platform(err) {
                AuthError::InvalidCredentials => AuthError::NotAuthenticated,
                other => other,
            })
    }

    async fn ping(&self) -> Result<(), PlatformError> {
        let url = self.endpoint("auth/v1/health")?;
        self.send_empty(self.request(Method::GET, url, None)).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_up_response_with_session() {
        let json = r#"{
            "access_token": "at", "refresh_token": "rt", "expires_in": 3600,
            "token_type": "bearer",
            "user": { "id": "1f3e5d7c-9b1a-4c2e-8d6f-0a2b4c6d8e0f", "email": "guest@haven.test" }
        }"#;
        assert!(matches!(
            serde_json::from_str::<SignUpResponse>(json).unwrap(),
            SignUpResponse::Session(_)
        ));
    }

    #[test]
    fn test_sign_up_response_pending_confirmation() {
        let json = r#"{
            "id": "1f3e5d7c-9b1a-4c2e-8d6f-0a2b4c6d8e0f",
            "email": "guest@haven.test",
            "identities": [{ "provider": "email" }],
            "confirmation_sent_at": "2025-02-20T10:15:00Z"
        }"#;
        let SignUpResponse::User(user) = serde_json::from_str::<SignUpResponse>(json).unwrap() else {
            panic!("expected bare user");
        };
        assert_eq!(user.email.as_deref(), Some("guest@haven.test"));
        assert_eq!(user.identities.unwrap().len(), 1);
    }

    #[test]
    fn test_token_response_into_session() {
        let json = r#"{
            "access_token": "at", "refresh_token": "rt", "expires_in": 3600,
            "user": { "id": "1f3e5d7c-9b1a-4c2e-8d6f-0a2b4c6d8e0f", "email": "guest@haven.test" }
        }"#;
        let session: AuthSession = serde_json::from_str::<TokenResponse>(json).unwrap().into();
        assert_eq!(session.access_token, "at");
        assert!(!session.is_expired());
        assert_eq!(session.user.email.as_deref(), Some("guest@haven.test"));
    }
}
