//! Error types module
//!
//! All failures surfaced by Hoard are unified under [`AppError`]. Quota and
//! remote-fetch failures carry their own typed enums so callers can branch on
//! them and render the structured details (usage snapshot, status, redirect
//! target) without parsing strings.
//!
//! The `Database` variant wraps `sqlx::Error` only when the `sqlx` feature is on.

use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

use crate::models::UsageSnapshot;
use crate::units::format_bytes;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Expected errors like validation failures and quota rejections
    Debug,
    /// Recoverable issues
    Warn,
    /// Unexpected failures
    Error,
}

/// Metadata for error responses
///
/// Lets an error describe how it should be presented to a caller, whichever
/// surface (HTTP, CLI) ends up rendering it.
pub trait ErrorMetadata {
    /// HTTP-equivalent status code
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "QUOTA_EXCEEDED")
    fn error_code(&self) -> &'static str;

    /// Whether retrying the same request may succeed
    fn is_recoverable(&self) -> bool;

    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden from the caller
    fn is_sensitive(&self) -> bool;

    fn log_level(&self) -> LogLevel;
}

/// Why a quota check refused an upload.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QuotaError {
    #[error("Unknown quota tier: {0}")]
    UnknownTier(String),

    #[error("File size ({}) exceeds limit of {}", format_bytes(*size), format_bytes(*limit))]
    FileTooLarge { size: i64, limit: i64 },

    #[error("Would exceed storage quota ({} remaining)", format_bytes(*remaining))]
    WouldExceedQuota { remaining: i64 },

    #[error("Storage quota exceeded")]
    StorageQuotaExceeded { usage: UsageSnapshot },
}

impl QuotaError {
    /// Usage details to attach to a rejection body, when known.
    pub fn usage(&self) -> Option<&UsageSnapshot> {
        match self {
            QuotaError::StorageQuotaExceeded { usage } => Some(usage),
            _ => None,
        }
    }
}

/// Why fetching a remote URL failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Remote server responded with status {status}")]
    Status {
        status: u16,
        location: Option<String>,
    },

    #[error("Too many redirects (limit {limit}), last status {status}")]
    TooManyRedirects {
        status: u16,
        location: Option<String>,
        limit: usize,
    },

    #[error("Timed out fetching {0}")]
    Timeout(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("URL not allowed: {0}")]
    Blocked(String),
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Quota(#[from] QuotaError),

    #[error(transparent)]
    RemoteFetch(#[from] FetchError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("UUID parsing error: {}", err))
    }
}

/// Static metadata per variant: (status, code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::Database(_) => (
            500,
            "DATABASE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Storage(_) => (
            500,
            "STORAGE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the resource ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::Quota(QuotaError::UnknownTier(_)) => (
            500,
            "QUOTA_TIER_UNKNOWN",
            false,
            Some("Contact support if this error persists"),
            true,
            LogLevel::Error,
        ),
        AppError::Quota(QuotaError::FileTooLarge { .. }) => (
            402,
            "FILE_TOO_LARGE",
            false,
            Some("Upload a smaller file or upgrade your tier"),
            false,
            LogLevel::Debug,
        ),
        AppError::Quota(_) => (
            402,
            "QUOTA_EXCEEDED",
            false,
            Some("Delete some uploads or upgrade your tier"),
            false,
            LogLevel::Debug,
        ),
        AppError::RemoteFetch(FetchError::InvalidUrl(_) | FetchError::Blocked(_)) => (
            400,
            "INVALID_URL",
            false,
            Some("Check the URL and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::RemoteFetch(FetchError::Timeout(_)) => (
            504,
            "REMOTE_FETCH_TIMEOUT",
            true,
            Some("Retry after a short delay"),
            false,
            LogLevel::Warn,
        ),
        AppError::RemoteFetch(_) => (
            502,
            "REMOTE_FETCH_FAILED",
            true,
            Some("Verify the URL is reachable"),
            false,
            LogLevel::Warn,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Full error message including the source chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }

    pub fn is_quota(&self) -> bool {
        matches!(self, AppError::Quota(_))
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::Quota(QuotaError::UnknownTier(_)) => "Internal server error".to_string(),
            AppError::Quota(err) => err.to_string(),
            AppError::RemoteFetch(FetchError::Status { status, .. }) => {
                format!("Failed to fetch URL: remote server responded with {}", status)
            }
            AppError::RemoteFetch(FetchError::TooManyRedirects { .. }) => {
                "Failed to fetch URL: too many redirects".to_string()
            }
            AppError::RemoteFetch(FetchError::Timeout(_)) => {
                "Failed to fetch URL: request timed out".to_string()
            }
            AppError::RemoteFetch(FetchError::Transport(_)) => "Failed to fetch URL".to_string(),
            AppError::RemoteFetch(err) => err.to_string(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
        }
    }
}
