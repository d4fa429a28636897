//! Application configuration loaded from environment variables.
//!
//! All configuration is loaded from environment variables with sensible defaults
//! for development. In production, configure via environment variables or a `.env` file.
//!
//! # Security Configuration
//!
//! - `JWT_SECRET`: Signing secret for bearer tokens (required, no default)
//! - `CORS_ORIGIN`: Value of `Access-Control-Allow-Origin` (default: `*`)
//! - `TRUSTED_PROXIES`: Comma-separated CIDR ranges or addresses whose forwarding
//!   headers are honoured (default: `10.0.0.1,192.168.1.1`)
//! - `ADMIN_EMAILS`: Comma-separated accounts granted admin permission on
//!   register and login (default: none)
//!
//! # Timing
//!
//! - `REQUEST_TIMEOUT_SECS`: Per-request deadline (default: 25)
//! - `READ_TIMEOUT_SECS`: Time allowed to receive a request body (default: 10)
//! - `TOKEN_TTL_HOURS`: Lifetime of issued tokens (default: 168, one week)

use std::env;
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Proxies trusted when `TRUSTED_PROXIES` is unset.
pub const DEFAULT_TRUSTED_PROXIES: [&str; 2] = ["10.0.0.1", "192.168.1.1"];

/// Application configuration loaded from environment variables.
///
/// # Example
///
/// ```rust,ignore
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.server_addr());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address (default: "0.0.0.0")
    pub host: String,

    /// Server port (default: 3000)
    pub port: u16,

    /// Allowed CORS origin, sent verbatim
    pub cors_origin: String,

    /// HMAC secret for HS256 bearer tokens
    pub jwt_secret: String,

    /// Lifetime of tokens issued on register/login
    pub token_ttl: Duration,

    /// Deadline applied to every request by the deadline enforcer
    pub request_timeout: Duration,

    /// Maximum time to receive a request body
    pub read_timeout: Duration,

    /// Peers allowed to supply client IP forwarding headers.
    /// An empty list trusts nobody.
    pub trusted_proxies: Vec<String>,

    /// Lowercased emails whose accounts hold admin permission
    pub admin_emails: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if a value fails to parse or if
    /// `JWT_SECRET` is missing.
    pub fn from_env() -> AppResult<Self> {
        // Load an .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let config = Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: Self::parse_env("PORT", 3000)?,
            cors_origin: env::var("CORS_ORIGIN").unwrap_or_else(|_| "*".to_string()),
            jwt_secret: env::var("JWT_SECRET").unwrap_or_default(),
            token_ttl: Duration::from_secs(Self::parse_env::<u64>("TOKEN_TTL_HOURS", 168)?.saturating_mul(3600)),
            request_timeout: Duration::from_secs(Self::parse_env("REQUEST_TIMEOUT_SECS", 25)?),
            read_timeout: Duration::from_secs(Self::parse_env("READ_TIMEOUT_SECS", 10)?),
            trusted_proxies: Self::parse_trusted_proxies(),
            admin_emails: env::var("ADMIN_EMAILS")
                .map(|raw| normalize_emails(&raw))
                .unwrap_or_default(),
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values for consistency and correctness.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if validation fails.
    pub fn validate(&self) -> AppResult<()> {
        if self.jwt_secret.trim().is_empty() {
            return Err(AppError::ConfigError(
                "JWT_SECRET must be set to a non-empty value".to_string(),
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(AppError::ConfigError(
                "REQUEST_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }

        if self.read_timeout.is_zero() {
            return Err(AppError::ConfigError(
                "READ_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }

        if self.token_ttl.is_zero() {
            return Err(AppError::ConfigError(
                "TOKEN_TTL_HOURS must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Whether `email` is listed in `ADMIN_EMAILS`, ignoring case.
    pub fn is_admin_email(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        self.admin_emails.iter().any(|admin| *admin == email)
    }

    /// Get the full server address for binding.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Parse an environment variable into the specified type with a default value.
    fn parse_env<T>(name: &str, default: T) -> AppResult<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match env::var(name) {
            Ok(val) => val
                .trim()
                .parse()
                .map_err(|e| AppError::ConfigError(format!("Invalid {name}: {e}"))),
            Err(_) => Ok(default),
        }
    }

    /// Parse trusted proxies from `TRUSTED_PROXIES`.
    ///
    /// Unset falls back to [`DEFAULT_TRUSTED_PROXIES`]; set but empty means
    /// forwarding headers are never honoured.
    fn parse_trusted_proxies() -> Vec<String> {
        match env::var("TRUSTED_PROXIES") {
            Ok(raw) => split_list(&raw),
            Err(_) => DEFAULT_TRUSTED_PROXIES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

fn normalize_emails(raw: &str) -> Vec<String> {
    split_list(raw).iter().map(|e| e.to_lowercase()).collect()
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Default configuration for testing and development.
///
/// Production deployments should use `Config::from_env()` instead.
impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            cors_origin: "*".to_string(),
            jwt_secret: "development-secret-change-me".to_string(),
            token_ttl: Duration::from_secs(7 * 24 * 3600),
            request_timeout: Duration::from_secs(25),
            read_timeout: Duration::from_secs(10),
            trusted_proxies: DEFAULT_TRUSTED_PROXIES.iter().map(|p| p.to_string()).collect(),
            admin_emails: Vec::new(),
        }
    }
}
