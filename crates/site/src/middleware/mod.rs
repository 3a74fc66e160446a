//! HTTP middleware stack for the site.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span with `request_id` and `user_id` fields)
//! 3. Request ID (reuse or generate `x-request-id`)
//! 4. Session layer (tower-sessions, in-memory store)
//! 5. Rate limiting on auth routes (governor)
//!
//! [`CurrentSession`] then resolves the visitor's session per handler.

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod session;

pub use auth::CurrentSession;
pub use rate_limit::{RateLimiterLayer, auth_rate_limiter};
pub use request_id::request_id_middleware;
pub use session::create_session_layer;
