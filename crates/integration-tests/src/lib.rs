//! Integration tests for Haven.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p haven-integration-tests
//! ```
//!
//! The full site router runs in process against
//! [`MemoryPlatform`], which applies the same ownership and role rules as
//! the hosted platform. Requests go through `tower::ServiceExt::oneshot`;
//! the session cookie is carried between requests by [`TestApp`].
//!
//! # Test Categories
//!
//! - `rooms` - Catalog, fallback and health endpoints
//! - `booking_flow` - Quotes, creating and cancelling bookings
//! - `auth` - Sign-up, sign-in and sign-out
//! - `admin_gate` - Admin login and dashboard access
//! - `rate_limit` - Throttling of the credential endpoints

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use chrono::{Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use tower::ServiceExt;
use url::Url;

use haven_core::{AppRole, Email, UserId};
use haven_site::config::{PlatformConfig, RateLimitConfig, SiteConfig};
use haven_site::platform::memory::MemoryPlatform;
use haven_site::routes;
use haven_site::state::{AppState, Backend};

/// Password used for every account created by the helpers.
pub const PASSWORD: &str = "hunter22";

/// A response with its body parsed as JSON (`Null` when empty or not JSON).
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub json: Value,
}

impl TestResponse {
    /// The `Location` header of a redirect.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }

    /// The `error` message of an error body.
    #[must_use]
    pub fn error(&self) -> &str {
        self.json["error"].as_str().unwrap_or_default()
    }
}

/// The site router plus one visitor's cookie jar.
pub struct TestApp {
    pub platform: Arc<MemoryPlatform>,
    router: Router,
    cookie: Mutex<Option<String>>,
}

impl TestApp {
    /// A site backed by the built-in room catalog.
    pub fn new() -> Self {
        Self::with_platform(MemoryPlatform::new())
    }

    /// A site backed by `platform`.
    pub fn with_platform(platform: MemoryPlatform) -> Self {
        Self::with_config(platform, test_config())
    }

    /// A site backed by `platform` running with `config`.
    pub fn with_config(platform: MemoryPlatform, config: SiteConfig) -> Self {
        let platform = Arc::new(platform);
        let state = AppState::new(config, Backend::from_platform(platform.clone()));
        Self {
            platform,
            router: routes::router(state),
            cookie: Mutex::new(None),
        }
    }

    /// A second visitor on the same site, with an empty cookie jar.
    #[must_use]
    pub fn new_visitor(&self) -> Self {
        Self {
            platform: self.platform.clone(),
            router: self.router.clone(),
            cookie: Mutex::new(None),
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> TestResponse {
        self.send(Method::POST, uri, Some(body)).await
    }

    pub async fn post_empty(&self, uri: &str) -> TestResponse {
        self.send(Method::POST, uri, None).await
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = self.cookie.lock().unwrap().clone() {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();

        if let Some(set_cookie) = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
        {
            let pair = set_cookie.split(';').next().unwrap_or_default().to_owned();
            *self.cookie.lock().unwrap() = Some(pair);
        }

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            json,
        }
    }

    /// Create an account with [`PASSWORD`] directly on the platform.
    pub async fn create_user(&self, email: &str) -> UserId {
        self.platform
            .add_user(&Email::parse(email).unwrap(), PASSWORD)
            .await
            .id
    }

    /// Create an account holding the admin role.
    pub async fn create_admin(&self, email: &str) -> UserId {
        let user_id = self.create_user(email).await;
        self.platform.grant_role(user_id, AppRole::Admin).await;
        user_id
    }

    /// Sign in through the site as `email`.
    pub async fn sign_in(&self, email: &str) -> TestResponse {
        self.post(
            "/auth/sign-in",
            serde_json::json!({ "email": email, "password": PASSWORD }),
        )
        .await
    }

    /// The id of the room called `name`, looked up through the catalog.
    pub async fn room_id(&self, name: &str) -> String {
        let rooms = self.get("/rooms").await;
        rooms.json["rooms"]
            .as_array()
            .unwrap()
            .iter()
            .find(|room| room["name"] == name)
            .and_then(|room| room["id"].as_str())
            .unwrap()
            .to_owned()
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Site configuration for tests: plain HTTP and a generous rate limit.
#[must_use]
pub fn test_config() -> SiteConfig {
    SiteConfig {
        host: [127, 0, 0, 1].into(),
        port: 3000,
        base_url: "http://localhost:3000".to_owned(),
        platform: PlatformConfig {
            url: Url::parse("http://platform.invalid/").unwrap(),
            anon_key: "test-anon-key".to_owned(),
            timeout: Duration::from_secs(1),
        },
        auth_rate_limit: RateLimitConfig {
            per_second: 1,
            burst_size: 1_000,
        },
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// `days` days from today.
#[must_use]
pub fn days_from_now(days: u64) -> NaiveDate {
    Utc::now()
        .date_naive()
        .checked_add_days(Days::new(days))
        .unwrap()
}

/// Read a decimal that may be serialized as a string or a number.
#[must_use]
pub fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).unwrap(),
        other => Decimal::from_str(&other.to_string()).unwrap(),
    }
}
