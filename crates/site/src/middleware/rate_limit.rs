//! Rate limiting middleware using governor and `tower_governor`.
//!
//! Sign-in, sign-up and admin login share one limiter keyed by client IP.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

use crate::config::RateLimitConfig;
use crate::error::AppError;

/// Key extractor for the real client IP behind Cloudflare or Fly.io.
///
/// Checks `CF-Connecting-IP`, the first hop of `X-Forwarded-For`,
/// `X-Real-IP` and `Fly-Client-IP`, then the peer address. Requests with no
/// usable address share a single bucket rather than being rejected.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let headers = req.headers();
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

        let ip = header("cf-connecting-ip")
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
            .or_else(|| {
                header("x-forwarded-for")
                    .and_then(|s| s.split(',').next())
                    .and_then(|s| s.trim().parse::<IpAddr>().ok())
            })
            .or_else(|| header("x-real-ip").and_then(|s| s.trim().parse::<IpAddr>().ok()))
            .or_else(|| header("fly-client-ip").and_then(|s| s.trim().parse::<IpAddr>().ok()))
            .or_else(|| {
                req.extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip())
            });

        Ok(ip.unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED)))
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Render a limiter rejection in the site's JSON error shape.
fn rejection(err: GovernorError) -> Response {
    match err {
        GovernorError::TooManyRequests { wait_time, .. } => AppError::RateLimited {
            retry_after_secs: wait_time,
        }
        .into_response(),
        other => AppError::Internal(other.to_string()).into_response(),
    }
}

/// Create the limiter for authentication endpoints.
///
/// With the default settings one request is replenished every 6 seconds with
/// a burst of 5 (about 10 per minute per IP). Rejections answer 429 with a
/// `Retry-After` header.
///
/// # Panics
///
/// Panics if `config` holds a zero interval or burst size. `SiteConfig`
/// rejects both when loading.
#[must_use]
pub fn auth_rate_limiter(config: &RateLimitConfig) -> RateLimiterLayer {
    let governor = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(config.per_second)
        .burst_size(config.burst_size)
        .finish()
        .expect("rate limiter config with non-zero interval and burst is valid");
    GovernorLayer::new(Arc::new(governor)).error_handler(rejection)
}
