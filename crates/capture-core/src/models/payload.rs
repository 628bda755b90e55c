use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, ErrorMetadata};

/// Payload in the representation the capture requester asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundPayload {
    Binary(Bytes),
    DataUrl(String),
}

impl OutboundPayload {
    pub fn len(&self) -> usize {
        match self {
            OutboundPayload::Binary(bytes) => bytes.len(),
            OutboundPayload::DataUrl(url) => url.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// String form used when the payload crosses a text-only channel.
    pub fn to_text(&self) -> String {
        match self {
            OutboundPayload::Binary(bytes) => STANDARD.encode(bytes),
            OutboundPayload::DataUrl(url) => url.clone(),
        }
    }
}

/// What a dispatch target finally receives on success.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureResult {
    /// The decoded upload, delivered locally.
    Payload(OutboundPayload),
    /// JSON body returned by the remote service the upload was forwarded to.
    Forwarded(serde_json::Value),
}

impl CaptureResult {
    /// Serialized form relayed to remote participants.
    pub fn relay_data(&self) -> String {
        match self {
            CaptureResult::Payload(payload) => payload.to_text(),
            CaptureResult::Forwarded(value) => value.to_string(),
        }
    }
}

/// Error reported to a dispatch target instead of a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchFailure {
    pub code: String,
    pub message: String,
}

impl From<&AppError> for DispatchFailure {
    fn from(err: &AppError) -> Self {
        Self {
            code: err.error_code().to_string(),
            message: err.client_message(),
        }
    }
}

pub type DispatchOutcome = Result<CaptureResult, DispatchFailure>;
