//! Integration tests for throttling of the credential endpoints.

#![allow(clippy::unwrap_used)]

use axum::http::{StatusCode, header};
use haven_integration_tests::{PASSWORD, TestApp, test_config};
use haven_site::config::RateLimitConfig;
use haven_site::platform::memory::MemoryPlatform;
use serde_json::json;

fn throttled_app() -> TestApp {
    let mut config = test_config();
    config.auth_rate_limit = RateLimitConfig {
        per_second: 60,
        burst_size: 1,
    };
    TestApp::with_config(MemoryPlatform::new(), config)
}

#[tokio::test]
async fn test_second_sign_in_is_throttled() {
    let app = throttled_app();
    app.create_user("guest@haven.test").await;

    let first = app.sign_in("guest@haven.test").await;
    assert_eq!(first.status, StatusCode::OK);

    let second = app.sign_in("guest@haven.test").await;
    assert_eq!(second.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(second.error(), "Too many requests, please try again later");
    let retry_after: u64 = second.headers[header::RETRY_AFTER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after > 0);
}

#[tokio::test]
async fn test_credential_endpoints_share_one_bucket() {
    let app = throttled_app();
    app.create_admin("manager@haven.test").await;
    assert_eq!(app.sign_in("manager@haven.test").await.status, StatusCode::OK);

    let sign_up = app
        .post(
            "/auth/sign-up",
            json!({
                "email": "asha@haven.test",
                "password": PASSWORD,
                "confirm_password": PASSWORD,
                "first_name": "Asha",
                "last_name": "Rao",
            }),
        )
        .await;
    assert_eq!(sign_up.status, StatusCode::TOO_MANY_REQUESTS);

    let admin_login = app
        .post(
            "/admin/login",
            json!({ "email": "manager@haven.test", "password": PASSWORD }),
        )
        .await;
    assert_eq!(admin_login.status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_other_routes_are_not_throttled() {
    let app = throttled_app();
    app.create_user("guest@haven.test").await;
    app.sign_in("guest@haven.test").await;
    assert_eq!(
        app.sign_in("guest@haven.test").await.status,
        StatusCode::TOO_MANY_REQUESTS
    );

    for _ in 0..3 {
        assert_eq!(app.get("/rooms").await.status, StatusCode::OK);
        let session = app.get("/auth/session").await;
        assert_eq!(session.status, StatusCode::OK);
        assert_eq!(session.json["user"]["email"], "guest@haven.test");
    }
    assert_eq!(app.post_empty("/auth/sign-out").await.status, StatusCode::NO_CONTENT);
}
