//! Authentication route handlers.
//!
//! Email and password sign-in, sign-up and sign-out against the identity
//! service. The platform session is kept in the site session.

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::Result;
use crate::middleware::CurrentSession;
use crate::platform::Identity;
use crate::services::auth::{SignUpForm, SignUpStatus};

/// Sign-in request body.
#[derive(Debug, Deserialize)]
pub struct SignInForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    /// Where to send the visitor afterwards. Only local paths are honoured.
    #[serde(default)]
    pub redirect: Option<String>,
}

/// Result of a successful sign-in.
#[derive(Debug, Serialize)]
pub struct SignedIn {
    pub user: Identity,
    pub redirect: String,
}

/// Result of a successful sign-up.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SignedUp {
    SignedIn { user: Identity },
    ConfirmationRequired { user: Identity },
}

/// Current session as seen by the page shell.
#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub user: Option<Identity>,
}

/// Keep `redirect` only if it points back into this site.
fn local_redirect(redirect: Option<&str>) -> String {
    match redirect.map(str::trim) {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_owned()
        }
        _ => "/".to_owned(),
    }
}

/// Sign in with email and password.
#[instrument(skip_all)]
pub async fn sign_in(
    CurrentSession(mut ctx): CurrentSession,
    Json(form): Json<SignInForm>,
) -> Result<Json<SignedIn>> {
    let user = ctx.sign_in(&form.email, &form.password).await?;
    Ok(Json(SignedIn {
        user,
        redirect: local_redirect(form.redirect.as_deref()),
    }))
}

/// Create an account.
#[instrument(skip_all)]
pub async fn sign_up(
    CurrentSession(mut ctx): CurrentSession,
    Json(form): Json<SignUpForm>,
) -> Result<impl IntoResponse> {
    let body = match ctx.sign_up(&form).await? {
        SignUpStatus::SignedIn(user) => SignedUp::SignedIn { user },
        SignUpStatus::ConfirmationRequired(user) => SignedUp::ConfirmationRequired { user },
    };
    Ok((StatusCode::CREATED, Json(body)))
}

/// Sign out.
#[instrument(skip_all)]
pub async fn sign_out(CurrentSession(mut ctx): CurrentSession) -> Result<StatusCode> {
    ctx.sign_out().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Who is signed in.
pub async fn session(CurrentSession(ctx): CurrentSession) -> Json<SessionInfo> {
    Json(SessionInfo {
        user: ctx.identity().cloned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_redirects_are_kept() {
        assert_eq!(local_redirect(Some("/bookings")), "/bookings");
        assert_eq!(local_redirect(Some("/rooms?type=deluxe")), "/rooms?type=deluxe");
    }

    #[test]
    fn test_foreign_redirects_fall_back_to_home() {
        assert_eq!(local_redirect(None), "/");
        assert_eq!(local_redirect(Some("")), "/");
        assert_eq!(local_redirect(Some("https://evil.test/")), "/");
        assert_eq!(local_redirect(Some("//evil.test")), "/");
        assert_eq!(local_redirect(Some("/\\evil.test")), "/");
    }
}
