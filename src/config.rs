//! Application configuration loaded from environment variables.
//!
//! The backend location **must** be provided:
//! - `BACKEND_BASE_URL`: base URL of the trading backend (e.g. `https://api.example.com`)
//!
//! Optional overrides:
//! - `BACKEND_REQUEST_TIMEOUT_SECS`: per-request HTTP timeout (default 20)
//! - `BACKEND_CA_PEM`: PEM bundle of trusted roots; pins TLS to those roots
//! - `BALANCE_MAX_AGE_SECS`: how long a balance snapshot stays fresh (default 10)
//! - `REFRESH_TIMEOUT_SECS`: upper bound on a single balance refresh (default 30)

use std::path::PathBuf;
use std::time::Duration;

/// Default per-request HTTP timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Default balance snapshot time-to-live.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(10);

/// Default bound on a refresh while it holds a coordination lock.
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(30);

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub cache: CacheConfig,
}

/// Where and how to reach the trading backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub ca_pem: Option<PathBuf>,
}

/// Refresh policy shared by every per-user account cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Snapshots younger than this are served without a backend call.
    pub max_age: Duration,
    /// A fetch running longer than this releases its lock and fails.
    pub refresh_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_age: DEFAULT_MAX_AGE,
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
        }
    }
}

/// Loads the application configuration from environment variables.
///
/// # Errors
///
/// Returns [`AccountsError::Config`](crate::AccountsError::Config) if
/// `BACKEND_BASE_URL` is missing or any duration variable is not a whole
/// number of seconds.
pub fn fetch_config() -> crate::Result<AppConfig> {
    let base_url = non_empty_var("BACKEND_BASE_URL")
        .ok_or_else(|| crate::AccountsError::Config("BACKEND_BASE_URL is not set".to_string()))?;

    let request_timeout = secs_var("BACKEND_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT)?;
    let max_age = secs_var("BALANCE_MAX_AGE_SECS", DEFAULT_MAX_AGE)?;
    let refresh_timeout = secs_var("REFRESH_TIMEOUT_SECS", DEFAULT_REFRESH_TIMEOUT)?;
    let ca_pem = non_empty_var("BACKEND_CA_PEM").map(PathBuf::from);

    Ok(AppConfig {
        backend: BackendConfig {
            base_url: base_url.trim_end_matches('/').to_string(),
            request_timeout,
            ca_pem,
        },
        cache: CacheConfig {
            max_age,
            refresh_timeout,
        },
    })
}

/// Returns the value of an environment variable if it exists and is non-empty.
fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

/// Reads a whole-seconds duration, falling back to `default` when unset.
fn secs_var(name: &str, default: Duration) -> crate::Result<Duration> {
    match non_empty_var(name) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| crate::AccountsError::Config(format!("{name}={raw:?}: {e}"))),
        None => Ok(default),
    }
}
