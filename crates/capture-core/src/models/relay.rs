use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::payload::DispatchOutcome;
use super::upload::Representation;

/// Result of a capture, addressed to the participant that requested it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayMessage {
    pub participant_id: String,
    pub correlation_id: String,
    pub outcome: RelayOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RelayOutcome {
    Success { data: String },
    Error { code: String, message: String },
}

impl RelayMessage {
    pub fn from_outcome(
        participant_id: impl Into<String>,
        correlation_id: impl Into<String>,
        outcome: &DispatchOutcome,
    ) -> Self {
        let outcome = match outcome {
            Ok(result) => RelayOutcome::Success {
                data: result.relay_data(),
            },
            Err(failure) => RelayOutcome::Error {
                code: failure.code.clone(),
                message: failure.message.clone(),
            },
        };

        Self {
            participant_id: participant_id.into(),
            correlation_id: correlation_id.into(),
            outcome,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, RelayOutcome::Success { .. })
    }
}

/// Options a capture requester can set on a capture.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptureOptions {
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default)]
    pub quality: Option<f32>,
    /// Extra headers the capture client adds to its upload request.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// Instruction sent to a capture client: take a screenshot and upload it here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureInstruction {
    pub participant_id: String,
    pub upload_token: String,
    pub upload_url: String,
    pub encoding: String,
    pub quality: Option<f32>,
    pub headers: BTreeMap<String, String>,
    pub form_field: String,
    pub representation: Representation,
}

/// A remote participant asking for a token to upload its own capture through this relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTokenRequest {
    pub url: String,
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default)]
    pub quality: Option<f32>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    pub correlation_id: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub form_field: Option<String>,
}

/// Everything a participant bridge emits, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BridgeEvent {
    CaptureRequested(CaptureInstruction),
    ResultReady(RelayMessage),
}
