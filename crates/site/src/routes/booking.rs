//! Booking route handlers.
//!
//! Quotes are public. Listing, creating and cancelling bookings need a
//! signed-in visitor; the total is always computed here from the room's
//! current rate.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use haven_core::{Booking, BookingId, Quote, Room, RoomId};

use crate::error::Result;
use crate::middleware::CurrentSession;
use crate::services::bookings::{BookingDraft, BookingError};
use crate::state::AppState;

/// Query parameters for a price quote.
#[derive(Debug, Deserialize)]
pub struct QuoteQuery {
    pub room_id: RoomId,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

/// Price breakdown for the booking form.
#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    pub room: Room,
    #[serde(flatten)]
    pub quote: Quote,
    /// `false` when the dates cover no nights or the room is fully booked.
    pub bookable: bool,
}

/// Price a stay without booking it.
#[instrument(skip(state), fields(room_id = %query.room_id))]
pub async fn quote(
    State(state): State<AppState>,
    Query(query): Query<QuoteQuery>,
) -> Result<Json<QuoteResponse>> {
    let room = state.catalog().room(query.room_id).await?;
    let quote = Quote::compute(room.nightly_rate(), query.check_in, query.check_out);
    let bookable = quote.is_bookable() && room.available;

    Ok(Json(QuoteResponse {
        room,
        quote,
        bookable,
    }))
}

/// The visitor's bookings, newest first.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
) -> Result<Json<Vec<Booking>>> {
    Ok(Json(state.bookings().list(&ctx).await?))
}

/// Create a booking.
#[instrument(skip_all, fields(room_id = %draft.room_id))]
pub async fn create(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Json(draft): Json<BookingDraft>,
) -> Result<impl IntoResponse> {
    if ctx.identity().is_none() {
        return Err(BookingError::NotAuthenticated.into());
    }

    let today = Utc::now().date_naive();
    let request = draft.prepare(state.catalog(), today).await?;
    let booking = state.bookings().create(&ctx, &request).await?;

    Ok((StatusCode::CREATED, Json(booking)))
}

/// Cancel one of the visitor's bookings.
#[instrument(skip(state, ctx), fields(booking_id = %id))]
pub async fn cancel(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Path(id): Path<BookingId>,
) -> Result<StatusCode> {
    state.bookings().cancel(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
