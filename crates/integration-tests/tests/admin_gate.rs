//! Integration tests for admin login and dashboard access.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::StatusCode;
use haven_core::AppRole;
use haven_integration_tests::{PASSWORD, TestApp, days_from_now};
use serde_json::json;

async fn admin_login(app: &TestApp, email: &str) -> haven_integration_tests::TestResponse {
    app.post(
        "/admin/login",
        json!({ "email": email, "password": PASSWORD }),
    )
    .await
}

#[tokio::test]
async fn test_dashboard_redirects_visitors_to_login() {
    let app = TestApp::new();

    let response = app.get("/admin").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/admin/login"));

    let login = app.get("/admin/login").await;
    assert_eq!(login.status, StatusCode::OK);
    assert_eq!(login.json["title"], "Haven Admin");
}

#[tokio::test]
async fn test_non_admin_login_is_refused_and_signed_out() {
    let app = TestApp::new();
    app.create_user("guest@haven.test").await;

    let response = admin_login(&app, "guest@haven.test").await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.error(), "You do not have admin access");

    assert_eq!(app.platform.active_sessions().await, 0);
    let session = app.get("/auth/session").await;
    assert!(session.json["user"].is_null());
}

#[tokio::test]
async fn test_wrong_password_on_admin_login() {
    let app = TestApp::new();
    app.create_admin("manager@haven.test").await;

    let response = app
        .post(
            "/admin/login",
            json!({ "email": "manager@haven.test", "password": "not-it" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.error(), "Invalid email or password");
}

#[tokio::test]
async fn test_admin_login_and_dashboard() {
    let app = TestApp::new();
    app.create_admin("manager@haven.test").await;

    let login = admin_login(&app, "manager@haven.test").await;
    assert_eq!(login.status, StatusCode::OK);
    assert_eq!(login.json["redirect"], "/admin");
    assert_eq!(login.json["admin"]["first_name"], "Admin");
    assert_eq!(login.json["admin"]["last_name"], "User");
    assert_eq!(login.json["admin"]["email"], "manager@haven.test");

    let dashboard = app.get("/admin").await;
    assert_eq!(dashboard.status, StatusCode::OK);
    assert_eq!(dashboard.json["total_rooms"], 6);
    assert_eq!(dashboard.json["available_rooms"], 5);
    assert_eq!(dashboard.json["total_bookings"], 0);
    assert_eq!(
        dashboard.json["room_overview"],
        json!([
            { "category": "deluxe", "available": 2, "total": 2 },
            { "category": "executive", "available": 1, "total": 2 },
            { "category": "presidential", "available": 2, "total": 2 },
        ])
    );
}

#[tokio::test]
async fn test_admin_login_page_sends_admins_to_dashboard() {
    let app = TestApp::new();
    app.create_admin("manager@haven.test").await;
    admin_login(&app, "manager@haven.test").await;

    let response = app.get("/admin/login").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/admin"));
}

#[tokio::test]
async fn test_admin_login_page_keeps_guest_signed_in() {
    let app = TestApp::new();
    app.create_user("guest@haven.test").await;
    app.sign_in("guest@haven.test").await;

    let response = app.get("/admin/login").await;
    assert_eq!(response.status, StatusCode::OK);

    let session = app.get("/auth/session").await;
    assert_eq!(session.json["user"]["email"], "guest@haven.test");
}

#[tokio::test]
async fn test_guest_visiting_dashboard_is_signed_out() {
    let app = TestApp::new();
    app.create_user("guest@haven.test").await;
    app.sign_in("guest@haven.test").await;

    let response = app.get("/admin").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/admin/login"));

    let session = app.get("/auth/session").await;
    assert!(session.json["user"].is_null());
}

#[tokio::test]
async fn test_promoted_user_gains_access() {
    let app = TestApp::new();
    let user_id = app.create_user("staff@haven.test").await;

    let refused = admin_login(&app, "staff@haven.test").await;
    assert_eq!(refused.status, StatusCode::FORBIDDEN);

    app.platform.grant_role(user_id, AppRole::Admin).await;
    let granted = admin_login(&app, "staff@haven.test").await;
    assert_eq!(granted.status, StatusCode::OK);
}

#[tokio::test]
async fn test_dashboard_counts_every_booking() {
    let app = TestApp::new();
    app.create_user("guest@haven.test").await;
    app.sign_in("guest@haven.test").await;
    let room_id = app.room_id("Deluxe Twin Room").await;
    let booked = app
        .post(
            "/bookings",
            json!({
                "room_id": room_id,
                "check_in": days_from_now(3).to_string(),
                "check_out": days_from_now(5).to_string(),
                "guests": 2,
            }),
        )
        .await;
    assert_eq!(booked.status, StatusCode::CREATED);

    let admin = app.new_visitor();
    admin.create_admin("manager@haven.test").await;
    admin_login(&admin, "manager@haven.test").await;

    let dashboard = admin.get("/admin").await;
    assert_eq!(dashboard.json["total_bookings"], 1);

    let logout = admin.post_empty("/admin/logout").await;
    assert_eq!(logout.status, StatusCode::NO_CONTENT);
    assert_eq!(admin.get("/admin").await.status, StatusCode::SEE_OTHER);
}
