//! # Structured Error Types
//!
//! Errors raised while fetching, persisting and configuring dashboard statistics.
//!
//! Only [`FetchError`] ever reaches the presentation surface. [`CacheReadError`]
//! describes why a persisted entry could not be used and is always recovered by
//! treating the cache as empty. [`RefreshFailure`] pairs a fetch error with the
//! last known snapshot so that the view keeps rendering data while degraded.
//!
//! ## Example
//!
//! ```rust
//! use dioxus_stats_dashboard::errors::FetchError;
//!
//! let error = FetchError::HttpStatus {
//!     status: 500,
//!     message: "Internal Server Error".to_string(),
//! };
//! assert_eq!(error.to_string(), "HTTP 500: Internal Server Error");
//! ```

use std::time::Duration;

use thiserror::Error;

use crate::types::CacheEntry;

/// Failure to obtain a snapshot from the stats endpoint
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Transport-level failure (DNS, connection refused, reset...)
    #[error("Network error: {0}")]
    Network(String),

    /// The endpoint answered with a non-2xx status
    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    /// The 2xx body was not a valid snapshot
    #[error("Data parsing error: {0}")]
    Parse(String),

    /// The configured fetch timeout elapsed
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

impl FetchError {
    /// Short banner text shown while the dashboard runs on cached data
    pub fn banner_message(&self) -> String {
        format!("Unable to reach the statistics service ({self}). Showing last known data.")
    }
}

/// Why a persisted entry could not be loaded. Never surfaced to the user.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CacheReadError {
    /// No entry has been written yet
    #[error("No cached entry in slot '{0}'")]
    Missing(&'static str),

    /// The backing store could not be read
    #[error("Cache store unavailable: {0}")]
    Unavailable(#[from] StoreError),

    /// The stored snapshot or timestamp did not parse
    #[error("Corrupt cache slot '{slot}': {reason}")]
    Corrupt { slot: &'static str, reason: String },
}

/// Failure of the key-value persistence layer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Storage I/O failed: {0}")]
    Io(String),

    #[error("Storage file is not valid JSON: {0}")]
    Format(String),

    #[error("Storage lock poisoned")]
    Poisoned,
}

/// Invalid or unreadable dashboard configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Invalid(String),

    #[error("Failed to read configuration file: {0}")]
    Io(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// A refresh that could not reach the network, with whatever cached data survived
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{error}")]
pub struct RefreshFailure {
    /// What went wrong talking to the endpoint
    pub error: FetchError,
    /// Last persisted entry, regardless of its freshness
    pub fallback: Option<CacheEntry>,
}

/// Convenience type alias for Results with FetchError
pub type FetchResult<T> = Result<T, FetchError>;

impl From<std::io::Error> for StoreError {
    fn from(error: std::io::Error) -> Self {
        StoreError::Io(error.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        StoreError::Format(error.to_string())
    }
}
