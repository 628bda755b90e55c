//! Error types module
//!
//! Every failure a capture can hit, from a missing token header to an upstream
//! service rejecting a forwarded file, is a variant of `AppError`. Component
//! crates keep their own narrow error enums and convert into this one at the
//! boundary.

use crate::constants::UNKNOWN_ERROR_MESSAGE;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like resource limits
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented.
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "UNKNOWN_TOKEN")
    fn error_code(&self) -> &'static str;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden from clients
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("No token provided")]
    MissingToken,

    /// Covers consumed, expired and forged tokens alike.
    #[error("Upload data does not exist. Cancelling screen capture.")]
    UnknownToken,

    #[error("Multipart part is missing a Content-Disposition header")]
    MissingContentDisposition,

    #[error("Multipart Content-Disposition has no field name")]
    MissingFieldName,

    #[error("Invalid multipart boundary: {0}")]
    BadMultipartBoundary(String),

    #[error("No file provided")]
    NoFileProvided,

    #[error("Invalid upload body: {0}")]
    InvalidBody(String),

    #[error("No remote URL provided")]
    NoRemoteUrl,

    #[error("No remote config provided")]
    NoRemoteConfig,

    #[error("Invalid remote config: {0}")]
    InvalidRemoteConfig(String),

    #[error("Failed to upload file to {url}. Status: {status}. Response: {body}")]
    UpstreamHttpError {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Upstream response is not valid JSON: {0}")]
    UpstreamParseError(String),

    #[error("Failed to reach upstream {url}: {message}")]
    UpstreamTransport { url: String, message: String },

    #[error("Failed to write capture to disk: {0}")]
    DiskWriteError(String),

    #[error("Too many pending uploads (limit {limit})")]
    PendingLimitReached { limit: usize },

    #[error("Participant bridge unavailable: {0}")]
    BridgeUnavailable(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

/// Static metadata for each variant: (http_status, error_code, sensitive, log_level).
/// client_message stays per-variant for dynamic content.
fn app_error_static_metadata(err: &AppError) -> (u16, &'static str, bool, LogLevel) {
    match err {
        AppError::MissingToken => (401, "MISSING_TOKEN", false, LogLevel::Debug),
        AppError::UnknownToken => (401, "UNKNOWN_TOKEN", false, LogLevel::Debug),
        AppError::MissingContentDisposition => {
            (400, "MISSING_CONTENT_DISPOSITION", false, LogLevel::Debug)
        }
        AppError::MissingFieldName => (400, "MISSING_FIELD_NAME", false, LogLevel::Debug),
        AppError::BadMultipartBoundary(_) => {
            (400, "BAD_MULTIPART_BOUNDARY", false, LogLevel::Debug)
        }
        AppError::NoFileProvided => (400, "NO_FILE_PROVIDED", false, LogLevel::Debug),
        AppError::InvalidBody(_) => (400, "INVALID_BODY", false, LogLevel::Debug),
        AppError::NoRemoteUrl => (500, "NO_REMOTE_URL", false, LogLevel::Error),
        AppError::NoRemoteConfig => (500, "NO_REMOTE_CONFIG", false, LogLevel::Error),
        AppError::InvalidRemoteConfig(_) => {
            (500, "INVALID_REMOTE_CONFIG", false, LogLevel::Error)
        }
        AppError::UpstreamHttpError { .. } => (500, "UPSTREAM_HTTP_ERROR", false, LogLevel::Warn),
        AppError::UpstreamParseError(_) => (500, "UPSTREAM_PARSE_ERROR", false, LogLevel::Warn),
        AppError::UpstreamTransport { .. } => (500, "UPSTREAM_TRANSPORT", false, LogLevel::Warn),
        AppError::DiskWriteError(_) => (500, "DISK_WRITE_ERROR", true, LogLevel::Error),
        AppError::PendingLimitReached { .. } => {
            (503, "PENDING_LIMIT_REACHED", false, LogLevel::Warn)
        }
        AppError::BridgeUnavailable(_) => (503, "BRIDGE_UNAVAILABLE", true, LogLevel::Error),
        AppError::InternalWithSource { .. } => (500, "INTERNAL_ERROR", true, LogLevel::Error),
    }
}

impl AppError {
    /// Get detailed error information including error chain
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
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).3
    }

    fn client_message(&self) -> String {
        if self.is_sensitive() {
            return UNKNOWN_ERROR_MESSAGE.to_string();
        }
        self.to_string()
    }
}
