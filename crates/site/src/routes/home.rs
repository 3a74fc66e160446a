//! Home page route handler.

use axum::{Json, extract::State};
use serde::Serialize;
use tracing::instrument;

use haven_core::{Room, RoomCategory};

use crate::middleware::CurrentSession;
use crate::platform::Identity;
use crate::state::AppState;

/// Landing page data.
#[derive(Debug, Serialize)]
pub struct HomePage {
    pub featured_rooms: Vec<Room>,
    pub categories: Vec<CategoryLink>,
    pub user: Option<Identity>,
}

/// A room tier with its catalog link.
#[derive(Debug, Serialize)]
pub struct CategoryLink {
    pub category: RoomCategory,
    pub href: String,
}

/// Display the home page.
#[instrument(skip(state, ctx))]
pub async fn home(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
) -> Json<HomePage> {
    let featured_rooms = state.catalog().featured().await;
    let categories = RoomCategory::ALL
        .iter()
        .map(|&category| CategoryLink {
            category,
            href: format!("/rooms?type={category}"),
        })
        .collect();

    Json(HomePage {
        featured_rooms,
        categories,
        user: ctx.identity().cloned(),
    })
}
