//! HTTP client for the platform APIs.
//!
//! Uses `reqwest` 0.13 with a client-level timeout. Query strings are built
//! with `url` rather than reqwest's optional `query` feature.
//! No retries: a failed call surfaces immediately.

use std::sync::Arc;

use reqwest::{Method, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::PlatformConfig;
use crate::platform::PlatformError;

/// Client for the platform's auth and data APIs.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct PlatformClient {
    inner: Arc<PlatformClientInner>,
}

struct PlatformClientInner {
    http: reqwest::Client,
    base_url: Url,
    api_key: SecretString,
}

impl std::fmt::Debug for PlatformClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Error body shapes returned by the auth and data APIs.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error_code: Option<String>,
    code: Option<serde_json::Value>,
    error: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
}

impl ErrorBody {
    fn code(&self) -> Option<String> {
        self.error_code
            .clone()
            .or_else(|| match &self.code {
                Some(serde_json::Value::String(code)) => Some(code.clone()),
                _ => None,
            })
            .or_else(|| self.error.clone())
    }

    fn message(&self) -> Option<String> {
        self.msg
            .clone()
            .or_else(|| self.message.clone())
            .or_else(|| self.error_description.clone())
            .or_else(|| self.error.clone())
    }
}

impl PlatformClient {
    /// Create a client that authenticates with the public anonymous key.
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Http` if the HTTP client cannot be built.
    pub fn new(config: &PlatformConfig) -> Result<Self, PlatformError> {
        Self::with_key(config, SecretString::from(config.anon_key.clone()))
    }

    /// Create a client that authenticates with `api_key`.
    pub(crate) fn with_key(
        config: &PlatformConfig,
        api_key: SecretString,
    ) -> Result<Self, PlatformError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(PlatformClientInner {
                http,
                base_url: config.url.clone(),
                api_key,
            }),
        })
    }

    /// Resolve a path relative to the project URL.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, PlatformError> {
        Ok(self.inner.base_url.join(path)?)
    }

    /// Start a request carrying the API key. Requests made on a user's behalf
    /// pass their access token as `bearer`; otherwise the API key is used.
    pub(crate) fn request(&self, method: Method, url: Url, bearer: Option<&str>) -> RequestBuilder {
        let key = self.inner.api_key.expose_secret();
        self.inner
            .http
            .request(method, url)
            .header("apikey", key)
            .bearer_auth(bearer.unwrap_or(key))
    }

    /// Send a request and decode the JSON response.
    pub(crate) async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, PlatformError> {
        let body = self.send_raw(request).await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse platform response"
            );
            PlatformError::Parse(e)
        })
    }

    /// Send a request and ignore the response body.
    pub(crate) async fn send_empty(&self, request: RequestBuilder) -> Result<(), PlatformError> {
        self.send_raw(request).await.map(|_| ())
    }

    async fn send_raw(&self, request: RequestBuilder) -> Result<String, PlatformError> {
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            return Ok(text);
        }

        let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
        let message = body
            .message()
            .unwrap_or_else(|| text.chars().take(200).collect());

        if status.is_server_error() {
            tracing::error!(status = %status, body = %text.chars().take(500).collect::<String>(), "Platform returned server error");
        } else {
            tracing::debug!(status = %status, code = ?body.code(), "Platform rejected request");
        }

        Err(PlatformError::Api {
            status: status.as_u16(),
            code: body.code(),
            message,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn client() -> PlatformClient {
        PlatformClient::new(&PlatformConfig {
            url: Url::parse("https://abc.platform.test/").unwrap(),
            anon_key: "anon-key".to_owned(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn test_error_body_auth_shape() {
        let body: ErrorBody = serde_json::from_str(
            r#"{"code":400,"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#,
        )
        .unwrap();
        assert_eq!(body.code().as_deref(), Some("invalid_credentials"));
        assert_eq!(body.message().as_deref(), Some("Invalid login credentials"));
    }

    #[test]
    fn test_error_body_legacy_oauth_shape() {
        let body: ErrorBody = serde_json::from_str(
            r#"{"error":"invalid_grant","error_description":"Email not confirmed"}"#,
        )
        .unwrap();
        assert_eq!(body.code().as_deref(), Some("invalid_grant"));
        assert_eq!(body.message().as_deref(), Some("Email not confirmed"));
    }

    #[test]
    fn test_error_body_rest_shape() {
        let body: ErrorBody = serde_json::from_str(
            r#"{"code":"23505","details":null,"hint":null,"message":"duplicate key value"}"#,
        )
        .unwrap();
        assert_eq!(body.code().as_deref(), Some("23505"));
        assert_eq!(body.message().as_deref(), Some("duplicate key value"));
    }

    #[test]
    fn test_endpoint_join() {
        let url = client().endpoint("rest/v1/rooms").unwrap();
        assert_eq!(url.as_str(), "https://abc.platform.test/rest/v1/rooms");
    }

    #[test]
    fn test_request_headers() {
        let client = client();
        let url = client.endpoint("auth/v1/user").unwrap();
        let request = client
            .request(Method::GET, url, Some("user-token"))
            .build()
            .unwrap();
        assert_eq!(request.headers().get("apikey").unwrap(), "anon-key");
        assert_eq!(
            request.headers().get("authorization").unwrap(),
            "Bearer user-token"
        );
    }

    #[test]
    fn test_debug_redacts_key() {
        let debug_output = format!("{:?}", client());
        assert!(!debug_output.contains("anon-key"));
    }
}
