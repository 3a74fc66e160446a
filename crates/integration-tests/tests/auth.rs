//! Integration tests for sign-up, sign-in and sign-out.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::StatusCode;
use haven_integration_tests::{PASSWORD, TestApp};
use haven_site::platform::memory::MemoryPlatform;
use serde_json::{Value, json};

fn sign_up_form(email: &str) -> Value {
    json!({
        "email": email,
        "password": PASSWORD,
        "confirm_password": PASSWORD,
        "first_name": "Asha",
        "last_name": "Rao",
    })
}

#[tokio::test]
async fn test_sign_up_signs_in() {
    let app = TestApp::new();

    let response = app.post("/auth/sign-up", sign_up_form("Asha@Haven.test")).await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.json["status"], "signed_in");
    assert_eq!(response.json["user"]["email"], "asha@haven.test");

    let session = app.get("/auth/session").await;
    assert_eq!(session.json["user"]["email"], "asha@haven.test");
}

#[tokio::test]
async fn test_sign_up_awaiting_confirmation() {
    let app = TestApp::with_platform(MemoryPlatform::new().requiring_email_confirmation());

    let response = app.post("/auth/sign-up", sign_up_form("asha@haven.test")).await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.json["status"], "confirmation_required");

    let session = app.get("/auth/session").await;
    assert!(session.json["user"].is_null());

    let sign_in = app.sign_in("asha@haven.test").await;
    assert_eq!(sign_in.status, StatusCode::FORBIDDEN);
    assert_eq!(
        sign_in.error(),
        "Please check your email and confirm your account before signing in"
    );
}

#[tokio::test]
async fn test_sign_up_validation() {
    let app = TestApp::new();
    app.create_user("taken@haven.test").await;

    let mut mismatch = sign_up_form("asha@haven.test");
    mismatch["confirm_password"] = json!("hunter23");
    let mut short = sign_up_form("asha@haven.test");
    short["password"] = json!("abc");
    short["confirm_password"] = json!("abc");
    let mut blank = sign_up_form("asha@haven.test");
    blank["last_name"] = json!("   ");

    let cases = [
        (mismatch, StatusCode::BAD_REQUEST, "Passwords do not match"),
        (short, StatusCode::BAD_REQUEST, "Password must be at least 6 characters"),
        (blank, StatusCode::BAD_REQUEST, "Please fill in all fields"),
        (
            sign_up_form("asha at haven.test"),
            StatusCode::BAD_REQUEST,
            "Please enter a valid email address",
        ),
        (
            sign_up_form("taken@haven.test"),
            StatusCode::CONFLICT,
            "An account with this email already exists",
        ),
    ];

    for (form, status, message) in cases {
        let response = app.post("/auth/sign-up", form).await;
        assert_eq!(response.status, status, "{message}");
        assert_eq!(response.error(), message);
    }
}

#[tokio::test]
async fn test_sign_in_failures() {
    let app = TestApp::new();
    app.create_user("guest@haven.test").await;

    let wrong = app
        .post(
            "/auth/sign-in",
            json!({ "email": "guest@haven.test", "password": "wrong-password" }),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.error(), "Invalid email or password");

    let blank = app.post("/auth/sign-in", json!({ "email": "guest@haven.test" })).await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);
    assert_eq!(blank.error(), "Please fill in all fields");

    let session = app.get("/auth/session").await;
    assert!(session.json["user"].is_null());
}

#[tokio::test]
async fn test_sign_in_redirect_stays_local() {
    let app = TestApp::new();
    app.create_user("guest@haven.test").await;

    let local = app
        .post(
            "/auth/sign-in",
            json!({ "email": "guest@haven.test", "password": PASSWORD, "redirect": "/bookings" }),
        )
        .await;
    assert_eq!(local.status, StatusCode::OK);
    assert_eq!(local.json["redirect"], "/bookings");

    let foreign = app
        .post(
            "/auth/sign-in",
            json!({ "email": "guest@haven.test", "password": PASSWORD, "redirect": "https://evil.test/" }),
        )
        .await;
    assert_eq!(foreign.json["redirect"], "/");
}

#[tokio::test]
async fn test_sign_out_clears_session() {
    let app = TestApp::new();
    app.create_user("guest@haven.test").await;
    app.sign_in("guest@haven.test").await;
    assert_eq!(app.platform.active_sessions().await, 1);

    let response = app.post_empty("/auth/sign-out").await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    assert_eq!(app.platform.active_sessions().await, 0);

    let session = app.get("/auth/session").await;
    assert!(session.json["user"].is_null());
    assert_eq!(app.get("/bookings").await.json, json!([]));
}

#[tokio::test]
async fn test_expired_token_is_refreshed() {
    // Tokens count as expired a minute early, so these are stale at once.
    let app = TestApp::with_platform(MemoryPlatform::new().with_token_lifetime(30));
    let user_id = app.create_user("guest@haven.test").await;
    app.sign_in("guest@haven.test").await;

    let session = app.get("/auth/session").await;
    assert_eq!(session.json["user"]["id"], user_id.to_string());
}

#[tokio::test]
async fn test_sessions_are_per_visitor() {
    let app = TestApp::new();
    app.create_user("guest@haven.test").await;
    app.sign_in("guest@haven.test").await;

    let stranger = app.new_visitor();
    let session = stranger.get("/auth/session").await;
    assert!(session.json["user"].is_null());
}

#[tokio::test]
async fn test_session_revoked_on_platform_signs_out() {
    let app = TestApp::new();
    let user_id = app.create_user("guest@haven.test").await;
    app.sign_in("guest@haven.test").await;
    assert_eq!(app.get("/auth/session").await.json["user"]["email"], "guest@haven.test");

    app.platform.revoke_sessions(user_id).await;

    let session = app.get("/auth/session").await;
    assert!(session.json["user"].is_null());
    assert_eq!(app.platform.active_sessions().await, 0);
}
