//! Integration tests for the room catalog and health endpoints.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::StatusCode;
use haven_integration_tests::{TestApp, decimal};
use rust_decimal::Decimal;

fn names(json: &serde_json::Value) -> Vec<String> {
    json.as_array()
        .unwrap()
        .iter()
        .map(|room| room["name"].as_str().unwrap().to_owned())
        .collect()
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new();

    let live = app.get("/health").await;
    assert_eq!(live.status, StatusCode::OK);

    let ready = app.get("/health/ready").await;
    assert_eq!(ready.status, StatusCode::OK);
}

#[tokio::test]
async fn test_home_features_three_cheapest_rooms() {
    let app = TestApp::new();
    let home = app.get("/").await;

    assert_eq!(home.status, StatusCode::OK);
    assert_eq!(
        names(&home.json["featured_rooms"]),
        ["Deluxe Twin Room", "Deluxe King Room", "Executive Suite"]
    );
    assert!(home.json["user"].is_null());
    assert_eq!(home.json["categories"][0]["href"], "/rooms?type=deluxe");
}

#[tokio::test]
async fn test_catalog_is_ordered_by_price() {
    let app = TestApp::new();
    let page = app.get("/rooms").await;

    assert_eq!(page.status, StatusCode::OK);
    let prices: Vec<Decimal> = page.json["rooms"]
        .as_array()
        .unwrap()
        .iter()
        .map(|room| decimal(&room["price"]))
        .collect();
    assert_eq!(prices.len(), 6);
    assert!(prices.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[tokio::test]
async fn test_catalog_filters() {
    let app = TestApp::new();

    let executive = app.get("/rooms?type=executive").await;
    assert_eq!(
        names(&executive.json["rooms"]),
        ["Executive Suite", "Executive Corner Suite"]
    );

    let bookable = app.get("/rooms?type=executive&available=true").await;
    assert_eq!(names(&bookable.json["rooms"]), ["Executive Suite"]);

    let all = app.get("/rooms?type=all&available=true").await;
    assert_eq!(all.json["rooms"].as_array().unwrap().len(), 5);

    let unknown = app.get("/rooms?type=penthouse").await;
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);
    assert_eq!(unknown.error(), "Unknown room type: penthouse");
}

#[tokio::test]
async fn test_room_detail() {
    let app = TestApp::new();
    let id = app.room_id("Presidential Suite").await;

    let room = app.get(&format!("/rooms/{id}")).await;
    assert_eq!(room.status, StatusCode::OK);
    assert_eq!(room.json["type"], "presidential");
    assert_eq!(decimal(&room.json["price"]), Decimal::from(107_817));

    let missing = app
        .get("/rooms/00000000-0000-4000-8000-00000000ffff")
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.error(), "Room not found");
}

#[tokio::test]
async fn test_catalog_falls_back_when_platform_is_down() {
    let app = TestApp::new();
    app.platform.set_rooms_offline(true).await;

    let page = app.get("/rooms?type=presidential").await;
    assert_eq!(page.status, StatusCode::OK);
    assert_eq!(
        names(&page.json["rooms"]),
        ["Presidential Suite", "Royal Penthouse"]
    );

    let home = app.get("/").await;
    assert_eq!(home.json["featured_rooms"].as_array().unwrap().len(), 3);
}
