//! Upload ingestion endpoint
//!
//! Each request walks `AwaitingToken -> TokenValidated -> BodyDecoded ->
//! Dispatched`, or stops at the first failing gate. Failures before the token
//! is consumed only reach the uploader. Failures after it reach both the
//! uploader and the capture requester.

use axum::{
    body::Bytes,
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use std::fmt;
use std::sync::Arc;

use capture_core::constants::TOKEN_HEADER;
use capture_core::models::{
    CaptureResult, DispatchFailure, OutboundPayload, PendingUpload, Representation,
};
use capture_core::AppError;
use capture_infra::{token_prefix, RequestId};
use capture_processing::{codec, multipart};

use crate::error::{HttpAppError, SuccessResponse};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionStage {
    AwaitingToken,
    TokenValidated,
    BodyDecoded,
    Dispatched,
}

impl fmt::Display for IngestionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            IngestionStage::AwaitingToken => "awaiting_token",
            IngestionStage::TokenValidated => "token_validated",
            IngestionStage::BodyDecoded => "body_decoded",
            IngestionStage::Dispatched => "dispatched",
        };
        f.write_str(stage)
    }
}

fn enter(stage: IngestionStage) {
    tracing::Span::current().record("stage", tracing::field::display(stage));
}

/// `POST /image`
#[tracing::instrument(
    skip(state, request_id, headers, body),
    fields(
        request_id = tracing::field::Empty,
        body_len = body.len(),
        stage = tracing::field::Empty,
        token_prefix = tracing::field::Empty,
    )
)]
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    request_id: Option<Extension<RequestId>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, HttpAppError> {
    if let Some(Extension(id)) = &request_id {
        tracing::Span::current().record("request_id", id.as_str());
    }

    enter(IngestionStage::AwaitingToken);
    let token = headers
        .get(TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AppError::MissingToken)?;
    tracing::Span::current().record("token_prefix", token_prefix(token));

    let pending = state.tokens.consume(token).await?;
    enter(IngestionStage::TokenValidated);

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    let result = process(&state, &pending, content_type, body).await;

    // The capture requester learns about the outcome whatever the uploader sees.
    let outcome = result.as_ref().cloned().map_err(DispatchFailure::from);
    if let Err(e) = state.dispatcher.dispatch(&pending.dispatch_target, outcome).await {
        tracing::error!(error = %e, "Failed to deliver capture outcome");
    }

    result?;
    enter(IngestionStage::Dispatched);
    tracing::info!("Capture upload processed");

    Ok((StatusCode::OK, Json(SuccessResponse::new())))
}

/// `OPTIONS /image` without CORS request headers. Real preflights are answered
/// by the CORS layer.
pub async fn upload_preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn process(
    state: &AppState,
    pending: &PendingUpload,
    content_type: &str,
    body: Bytes,
) -> Result<CaptureResult, AppError> {
    let payload = decode_payload(pending, content_type, body)?;
    enter(IngestionStage::BodyDecoded);

    if !pending.is_forwarded {
        return Ok(CaptureResult::Payload(payload));
    }

    let config = pending.remote_config.as_ref().ok_or(AppError::NoRemoteConfig)?;
    let response = state
        .forwarder
        .forward(&config.url, Some(config), payload, pending.representation)
        .await?;

    Ok(CaptureResult::Forwarded(response))
}

fn decode_payload(
    pending: &PendingUpload,
    content_type: &str,
    body: Bytes,
) -> Result<OutboundPayload, AppError> {
    if pending.representation == Representation::Base64 && !multipart::is_multipart(content_type) {
        let data = codec::inline_payload(&body)?;
        return Ok(OutboundPayload::DataUrl(data));
    }

    let boundary = multipart::boundary_from_content_type(content_type)?;
    let form = multipart::decode(&body, &boundary)?;

    let file = form
        .file(pending.form_field())
        .filter(|content| !content.is_empty())
        .cloned()
        .ok_or(AppError::NoFileProvided)?;

    tracing::debug!(
        field = pending.form_field(),
        size_bytes = file.len(),
        fields = form.len(),
        "Upload file decoded"
    );

    Ok(codec::encode(
        file,
        pending.representation,
        Some(pending.encoding_hint()),
    ))
}
