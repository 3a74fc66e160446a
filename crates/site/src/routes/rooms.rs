//! Room catalog route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use haven_core::{Room, RoomCategory, RoomFilter, RoomId};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Query parameters for the rooms page.
#[derive(Debug, Default, Deserialize)]
pub struct RoomsQuery {
    /// Tier name, or `all`.
    #[serde(rename = "type")]
    pub category: Option<String>,
    #[serde(default)]
    pub available: bool,
}

impl RoomsQuery {
    fn filter(&self) -> Result<RoomFilter> {
        let category = match self.category.as_deref().map(str::trim) {
            None | Some("" | "all") => None,
            Some(name) => Some(
                name.parse::<RoomCategory>()
                    .map_err(|_| AppError::BadRequest(format!("Unknown room type: {name}")))?,
            ),
        };
        Ok(RoomFilter {
            category,
            available_only: self.available,
        })
    }
}

/// Rooms page data.
#[derive(Debug, Serialize)]
pub struct RoomsPage {
    pub filter: RoomFilter,
    pub rooms: Vec<Room>,
}

/// List rooms, optionally restricted to one tier.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<RoomsQuery>,
) -> Result<Json<RoomsPage>> {
    let filter = query.filter()?;
    let rooms = state.catalog().list(filter).await;
    Ok(Json(RoomsPage { filter, rooms }))
}

/// Show a single room.
#[instrument(skip(state), fields(room_id = %id))]
pub async fn show(State(state): State<AppState>, Path(id): Path<RoomId>) -> Result<Json<Room>> {
    Ok(Json(state.catalog().room(id).await?))
}
