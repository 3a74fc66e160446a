//! Session extractor.
//!
//! [`CurrentSession`] builds and resolves the visitor's [`SessionContext`]
//! before the handler runs, so handlers never see an unresolved session.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;
use tracing::Span;

use crate::error::AppError;
use crate::services::auth::SessionContext;
use crate::state::AppState;

/// The resolved session context for this request.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(CurrentSession(ctx): CurrentSession) -> impl IntoResponse {
///     match ctx.identity() {
///         Some(user) => format!("Hello, {}!", user.id),
///         None => "Hello, guest!".to_string(),
///     }
/// }
/// ```
pub struct CurrentSession(pub SessionContext);

impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Set by SessionManagerLayer
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer not installed".to_string()))?;

        let mut ctx = state.session_context(session);
        ctx.resolve().await?;

        if let Some(identity) = ctx.identity() {
            Span::current().record("user_id", tracing::field::display(identity.id));
        }
        Ok(Self(ctx))
    }
}
