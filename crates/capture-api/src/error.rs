//! HTTP error response conversion
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>`; anything that
//! converts into `AppError` renders as `{status: "error", message, code}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use capture_core::{AppError, ErrorMetadata, LogLevel};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub message: String,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub status: &'static str,
}

impl SuccessResponse {
    pub fn new() -> Self {
        Self { status: "success" }
    }
}

impl Default for SuccessResponse {
    fn default() -> Self {
        Self::new()
    }
}

/// Wrapper type for AppError to implement IntoResponse.
/// Orphan rules forbid implementing the axum trait on the core type directly.
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        })
    }
}

fn log_error(error: &AppError) {
    let code = error.error_code();
    let status_code = error.http_status_code();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, code, status_code, "Upload rejected");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, code, status_code, "Upload failed");
        }
        LogLevel::Error => {
            tracing::error!(
                error = %error.detailed_message(),
                code,
                status_code,
                "Upload failed"
            );
        }
    }
}

fn is_production_env() -> bool {
    std::env::var("ENVIRONMENT")
        .or_else(|_| std::env::var("APP_ENV"))
        .map(|env| env.to_lowercase() == "production" || env.to_lowercase() == "prod")
        .unwrap_or(false)
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        // Details never leave the process in production or for sensitive errors.
        let details = if is_production_env() || app_error.is_sensitive() {
            None
        } else {
            Some(app_error.detailed_message())
        };

        let body = Json(ErrorResponse {
            status: "error",
            message: app_error.client_message(),
            code: app_error.error_code().to_string(),
            details,
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn render(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = HttpAppError(err).into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_missing_token_renders_401() {
        let (status, body) = render(AppError::MissingToken).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "No token provided");
        assert_eq!(body["code"], "MISSING_TOKEN");
    }

    #[tokio::test]
    async fn test_sensitive_error_is_normalized() {
        let (status, body) = render(AppError::from(anyhow::anyhow!("/var/secret"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "An unknown error occurred");
        assert!(body.get("details").is_none());
    }

    #[test]
    fn test_success_response_shape() {
        let json = serde_json::to_value(SuccessResponse::new()).unwrap();
        assert_eq!(json, serde_json::json!({"status": "success"}));
    }
}
