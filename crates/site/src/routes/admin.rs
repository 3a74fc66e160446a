//! Admin dashboard route handlers.
//!
//! Every handler goes through the [`RoleGate`](crate::services::access::RoleGate).
//! Visitors who are signed in without the admin role are signed out and sent
//! back to the admin login page.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use haven_core::CategoryAvailability;

use crate::error::{AppError, Result};
use crate::middleware::CurrentSession;
use crate::services::access::{AdminAccess, AdminProfile};
use crate::state::AppState;

const DASHBOARD: &str = "/admin";
const LOGIN: &str = "/admin/login";

/// Admin login request body.
#[derive(Debug, Deserialize)]
pub struct AdminLoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Login page data for visitors who are not yet admins.
#[derive(Debug, Serialize)]
pub struct LoginPage {
    pub title: &'static str,
}

/// Result of a successful admin login.
#[derive(Debug, Serialize)]
pub struct AdminSignedIn {
    pub admin: AdminProfile,
    pub redirect: &'static str,
}

/// Dashboard data.
#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub admin: AdminProfile,
    pub room_overview: Vec<CategoryAvailability>,
    pub total_rooms: usize,
    pub available_rooms: usize,
    pub total_bookings: usize,
}

/// Show the admin login page, or go straight to the dashboard for admins.
#[instrument(skip_all)]
pub async fn login_page(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
) -> Response {
    if state.gate().is_admin(&ctx).await {
        return Redirect::to(DASHBOARD).into_response();
    }
    Json(LoginPage {
        title: "Haven Admin",
    })
    .into_response()
}

/// Sign in and require the admin role.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    CurrentSession(mut ctx): CurrentSession,
    Json(form): Json<AdminLoginForm>,
) -> Result<Json<AdminSignedIn>> {
    ctx.sign_in(&form.email, &form.password).await?;

    match state.gate().check(&mut ctx).await? {
        AdminAccess::Granted(admin) => {
            info!(user_id = %admin.user_id, "Admin signed in");
            Ok(Json(AdminSignedIn {
                admin,
                redirect: DASHBOARD,
            }))
        }
        AdminAccess::Denied(_) | AdminAccess::Unknown => {
            Err(AppError::Forbidden("You do not have admin access".to_string()))
        }
    }
}

/// Show the dashboard.
#[instrument(skip_all)]
pub async fn dashboard(
    State(state): State<AppState>,
    CurrentSession(mut ctx): CurrentSession,
) -> Result<Response> {
    let admin = match state.gate().check(&mut ctx).await? {
        AdminAccess::Granted(admin) => admin,
        AdminAccess::Denied(_) | AdminAccess::Unknown => {
            return Ok(Redirect::to(LOGIN).into_response());
        }
    };

    let rooms = state.catalog().all().await;
    let total_bookings = state.bookings().count_visible(&ctx).await?;

    Ok(Json(Dashboard {
        admin,
        room_overview: CategoryAvailability::summarize(&rooms),
        total_rooms: rooms.len(),
        available_rooms: rooms.iter().filter(|r| r.available).count(),
        total_bookings,
    })
    .into_response())
}

/// Sign out of the dashboard.
#[instrument(skip_all)]
pub async fn logout(CurrentSession(mut ctx): CurrentSession) -> Result<StatusCode> {
    ctx.sign_out().await?;
    Ok(StatusCode::NO_CONTENT)
}
