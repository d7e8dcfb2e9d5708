//! Server Configuration Module
//!
//! Configuration is loaded from environment variables with defaults that
//! match a local development setup. Unlike a best-effort parse, a variable
//! that is set but malformed is an error: the server refuses to start.

use std::path::PathBuf;
use std::str::FromStr;

use tiernote_storage::DEFAULT_CACHE_THRESHOLD;

use crate::error::{ApiError, ApiResult};

/// Default key holding the cached collection.
pub const DEFAULT_CACHE_KEY: &str = tiernote_storage::cache::DEFAULT_CACHE_KEY;

// ============================================================================
// ENV HELPERS
// ============================================================================

/// Read `key` through `lookup`, parse it, fall back to `default` when unset.
pub(crate) fn parse_var<T, F>(lookup: &F, key: &str, default: T) -> ApiResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse::<T>().map_err(|e| {
            ApiError::invalid_input(format!("Invalid value for {}: {:?} ({})", key, raw, e))
        }),
        _ => Ok(default),
    }
}

pub(crate) fn string_var<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

pub(crate) fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// HTTP listener, CORS and real-time channel settings.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind host.
    pub bind_host: String,

    /// Bind port.
    pub port: u16,

    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins.
    pub cors_origins: Vec<String>,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    /// Publications buffered per WebSocket subscriber before it lags.
    pub ws_capacity: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 5000,
            cors_origins: Vec::new(), // Empty = allow all
            cors_max_age_secs: 86400,
            ws_capacity: 1000,
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `PORT`: Listen port (default: 5000)
    /// - `TIERNOTE_BIND`: Listen host (default: 0.0.0.0)
    /// - `TIERNOTE_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `TIERNOTE_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    /// - `TIERNOTE_WS_CAPACITY`: Per-subscriber buffer (default: 1000)
    pub fn from_env() -> ApiResult<Self> {
        Self::from_lookup(process_env)
    }

    pub fn from_lookup<F>(lookup: F) -> ApiResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let cors_origins = lookup("TIERNOTE_CORS_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let ws_capacity = parse_var(&lookup, "TIERNOTE_WS_CAPACITY", defaults.ws_capacity)?;
        if ws_capacity == 0 {
            return Err(ApiError::invalid_input(
                "Invalid value for TIERNOTE_WS_CAPACITY: must be at least 1",
            ));
        }

        Ok(Self {
            bind_host: string_var(&lookup, "TIERNOTE_BIND", &defaults.bind_host),
            port: parse_var(&lookup, "PORT", defaults.port)?,
            cors_origins,
            cors_max_age_secs: parse_var(
                &lookup,
                "TIERNOTE_CORS_MAX_AGE_SECS",
                defaults.cors_max_age_secs,
            )?,
            ws_capacity,
        })
    }

    /// `host:port` for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }

    /// Check if a given origin is allowed.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        self.cors_origins.is_empty() || self.cors_origins.iter().any(|allowed| allowed == origin)
    }
}

// ============================================================================
// CACHE TIER CONFIGURATION
// ============================================================================

/// LMDB cache tier and overflow settings.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Directory of the LMDB environment.
    pub path: PathBuf,
    /// Key holding the serialized collection.
    pub key: String,
    /// LMDB map size in megabytes.
    pub map_size_mb: usize,
    /// Cache size above which everything moves to the durable tier.
    pub threshold: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/cache"),
            key: DEFAULT_CACHE_KEY.to_string(),
            map_size_mb: 64,
            threshold: DEFAULT_CACHE_THRESHOLD,
        }
    }
}

impl CacheConfig {
    /// Create CacheConfig from environment variables.
    ///
    /// Environment variables:
    /// - `TIERNOTE_CACHE_PATH` (default: ./data/cache)
    /// - `TIERNOTE_CACHE_KEY` (default: FULLSTACK_TASK_SIDDHARTHA)
    /// - `TIERNOTE_CACHE_MAP_SIZE_MB` (default: 64)
    /// - `TIERNOTE_CACHE_THRESHOLD` (default: 50)
    pub fn from_env() -> ApiResult<Self> {
        Self::from_lookup(process_env)
    }

    pub fn from_lookup<F>(lookup: F) -> ApiResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let map_size_mb = parse_var(&lookup, "TIERNOTE_CACHE_MAP_SIZE_MB", defaults.map_size_mb)?;
        if map_size_mb == 0 {
            return Err(ApiError::invalid_input(
                "Invalid value for TIERNOTE_CACHE_MAP_SIZE_MB: must be at least 1",
            ));
        }

        Ok(Self {
            path: lookup("TIERNOTE_CACHE_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.path),
            key: string_var(&lookup, "TIERNOTE_CACHE_KEY", &defaults.key),
            map_size_mb,
            threshold: parse_var(&lookup, "TIERNOTE_CACHE_THRESHOLD", defaults.threshold)?,
        })
    }
}
