//! Site configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `HAVEN_BASE_URL` - Public URL for the site
//! - `PLATFORM_URL` - Base URL of the backend platform project
//! - `PLATFORM_ANON_KEY` - Public (anonymous) platform API key
//!
//! ## Optional
//! - `HAVEN_HOST` - Bind address (default: 127.0.0.1)
//! - `HAVEN_PORT` - Listen port (default: 3000)
//! - `PLATFORM_TIMEOUT_SECS` - Per-request timeout for platform calls (default: 10)
//! - `HAVEN_AUTH_RATE_PER_SECOND` - Seconds per replenished auth request (default: 6)
//! - `HAVEN_AUTH_RATE_BURST` - Auth request burst per client IP (default: 5)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate, 0.0 to 1.0 (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate, 0.0 to 1.0 (default: 0.0)
//!
//! ## Admin tooling only
//! - `PLATFORM_SERVICE_ROLE_KEY` - Privileged platform key. Loaded through
//!   [`ServiceRoleConfig`] by the CLI; the site binary never reads it.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Site application configuration.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the site
    pub base_url: String,
    /// Backend platform configuration
    pub platform: PlatformConfig,
    /// Rate limit for sign-in and sign-up endpoints
    pub auth_rate_limit: RateLimitConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. "production")
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions sent to Sentry
    pub sentry_traces_sample_rate: f32,
}

/// Backend platform connection settings.
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    /// Project base URL; auth lives under `auth/v1`, tables under `rest/v1`
    pub url: Url,
    /// Public anonymous key, sent as `apikey` on every request
    pub anon_key: String,
    /// Client-level timeout applied to every platform call
    pub timeout: Duration,
}

/// Token-bucket settings for a rate-limited route group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Seconds to replenish one request
    pub per_second: u64,
    /// Requests allowed in a burst
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_second: 6,
            burst_size: 5,
        }
    }
}

/// Privileged platform credentials for out-of-band admin tooling.
///
/// Implements `Debug` manually to redact the key.
#[derive(Clone)]
pub struct ServiceRoleConfig {
    /// Service-role key; bypasses row-level policies
    pub service_role_key: SecretString,
}

impl std::fmt::Debug for ServiceRoleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRoleConfig")
            .field("service_role_key", &"[REDACTED]")
            .finish()
    }
}

impl SiteConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env("HAVEN_HOST", "127.0.0.1")?;
        let port = parse_env("HAVEN_PORT", "3000")?;
        let base_url = get_required_env("HAVEN_BASE_URL")?;
        let platform = PlatformConfig::from_env()?;

        let auth_rate_limit = RateLimitConfig {
            per_second: parse_env("HAVEN_AUTH_RATE_PER_SECOND", "6")?,
            burst_size: parse_env("HAVEN_AUTH_RATE_BURST", "5")?,
        };
        if auth_rate_limit.per_second == 0 || auth_rate_limit.burst_size == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "HAVEN_AUTH_RATE_BURST".to_string(),
                "rate limit values must be positive".to_string(),
            ));
        }

        Ok(Self {
            host,
            port,
            base_url,
            platform,
            auth_rate_limit,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_rate("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_rate("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl PlatformConfig {
    /// Load platform settings from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `PLATFORM_URL` or `PLATFORM_ANON_KEY` is
    /// missing, or the URL or timeout cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw_url = get_required_env("PLATFORM_URL")?;
        let url = parse_platform_url(&raw_url)?;
        let anon_key = get_required_env("PLATFORM_ANON_KEY")?;
        let timeout_secs: u64 = parse_env("PLATFORM_TIMEOUT_SECS", "10")?;

        Ok(Self {
            url,
            anon_key,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

impl ServiceRoleConfig {
    /// Load the service-role key.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the key is missing, looks like a placeholder,
    /// or has too little entropy to be a real key.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            service_role_key: get_validated_secret("PLATFORM_SERVICE_ROLE_KEY")?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a sample rate between 0.0 and 1.0.
fn parse_rate(key: &str, default: &str) -> Result<f32, ConfigError> {
    let rate: f32 = parse_env(key, default)?;
    if !(0.0..=1.0).contains(&rate) {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("must be between 0.0 and 1.0 (got {rate})"),
        ));
    }
    Ok(rate)
}

/// Parse the platform URL and make sure relative joins keep its path.
fn parse_platform_url(raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidEnvVar("PLATFORM_URL".to_string(), e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            "PLATFORM_URL".to_string(),
            "must be an absolute http(s) URL".to_string(),
        ));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Copy the key from the platform dashboard."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_single_char() {
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_high() {
        let entropy = shannon_entropy("eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.c2VydmljZQ");
        assert!(entropy > 3.3);
    }

    #[test]
    fn test_service_key_placeholder_rejected() {
        let result = validate_secret_strength("your-service-role-key", "PLATFORM_SERVICE_ROLE_KEY");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_service_key_low_entropy_rejected() {
        let result = validate_secret_strength("abababababababababab", "PLATFORM_SERVICE_ROLE_KEY");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_service_key_realistic_accepted() {
        let key = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.eyJyb2xlIjoic2VydmljZV9yb2xlIn0.k3Qz";
        assert!(validate_secret_strength(key, "PLATFORM_SERVICE_ROLE_KEY").is_ok());
    }

    #[test]
    fn test_platform_url_gets_trailing_slash() {
        let url = parse_platform_url("https://abc.platform.test").unwrap();
        assert_eq!(url.as_str(), "https://abc.platform.test/");
        assert_eq!(
            url.join("auth/v1/token").unwrap().as_str(),
            "https://abc.platform.test/auth/v1/token"
        );

        let nested = parse_platform_url("http://localhost:54321/project").unwrap();
        assert_eq!(
            nested.join("rest/v1/rooms").unwrap().as_str(),
            "http://localhost:54321/project/rest/v1/rooms"
        );
    }

    #[test]
    fn test_platform_url_rejects_garbage() {
        assert!(parse_platform_url("not a url").is_err());
        assert!(parse_platform_url("mailto:ops@haven.com").is_err());
    }

    #[test]
    fn test_socket_addr_and_secure_cookie() {
        let config = SiteConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "https://haven.example".to_string(),
            platform: PlatformConfig {
                url: parse_platform_url("https://abc.platform.test").unwrap(),
                anon_key: "anon".to_string(),
                timeout: Duration::from_secs(10),
            },
            auth_rate_limit: RateLimitConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
        assert!(config.is_secure());
    }

    #[test]
    fn test_service_role_debug_redacts_key() {
        let config = ServiceRoleConfig {
            service_role_key: SecretString::from("super_secret_service_key"),
        };
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_service_key"));
    }
}
