//! HTTP route handlers for the site.
//!
//! Every page is served as JSON; the frontend renders it.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                          - Home page (featured rooms)
//! GET  /health                    - Liveness
//! GET  /health/ready              - Readiness (platform reachable)
//!
//! # Rooms
//! GET  /rooms?type=&available=    - Room catalog
//! GET  /rooms/{id}                - Room detail
//!
//! # Booking
//! GET  /booking/quote             - Price a stay (room_id, check_in, check_out)
//! GET  /bookings                  - The visitor's bookings
//! POST /bookings                  - Create a booking
//! POST /bookings/{id}/cancel      - Cancel a booking
//!
//! # Auth (rate limited)
//! POST /auth/sign-in              - Sign in
//! POST /auth/sign-up              - Create an account
//! POST /auth/sign-out             - Sign out
//! GET  /auth/session              - Current identity
//!
//! # Admin
//! GET  /admin/login               - Login page, redirects admins to /admin
//! POST /admin/login               - Admin sign-in (rate limited)
//! GET  /admin                     - Dashboard, redirects others to /admin/login
//! POST /admin/logout              - Sign out
//! ```

pub mod admin;
pub mod auth;
pub mod booking;
pub mod health;
pub mod home;
pub mod rooms;

use std::time::Duration;

use axum::{
    Router,
    http::{Request, Response},
    middleware::from_fn,
    routing::{get, post},
};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::{
    RateLimiterLayer, auth_rate_limiter, create_session_layer, request_id_middleware,
};
use crate::state::AppState;

/// Create the auth routes router.
fn auth_routes(limiter: &RateLimiterLayer) -> Router<AppState> {
    Router::new()
        .route("/sign-in", post(auth::sign_in).layer(limiter.clone()))
        .route("/sign-up", post(auth::sign_up).layer(limiter.clone()))
        .route("/sign-out", post(auth::sign_out))
        .route("/session", get(auth::session))
}

/// Create the admin routes router.
fn admin_routes(limiter: &RateLimiterLayer) -> Router<AppState> {
    Router::new()
        .route("/admin", get(admin::dashboard))
        .route(
            "/admin/login",
            get(admin::login_page).post(admin::login).layer(limiter.clone()),
        )
        .route("/admin/logout", post(admin::logout))
}

/// Build the full application router.
///
/// Sentry layers are not included; the binary adds them outermost.
pub fn router(state: AppState) -> Router {
    let limiter = auth_rate_limiter(&state.config().auth_rate_limit);
    let session_layer = create_session_layer(state.config());

    Router::new()
        .route("/", get(home::home))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/rooms", get(rooms::index))
        .route("/rooms/{id}", get(rooms::show))
        .route("/booking/quote", get(booking::quote))
        .route("/bookings", get(booking::index).post(booking::create))
        .route("/bookings/{id}/cancel", post(booking::cancel))
        .nest("/auth", auth_routes(&limiter))
        .merge(admin_routes(&limiter))
        .layer(session_layer)
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(|response: &Response<_>, latency: Duration, span: &Span| {
                    span.record("status", response.status().as_u16());
                    span.record(
                        "latency_ms",
                        u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                    );
                    DefaultOnResponse::default().on_response(response, latency, span);
                }),
        )
        .with_state(state)
}
