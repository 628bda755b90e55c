//! Delivery traits
//!
//! The relay core never knows who asked for a capture. Local consumers
//! implement `LocalHandler`; the transport that talks to remote participants
//! implements `ParticipantBridge`.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::AppError;
use crate::models::{CaptureInstruction, DispatchOutcome, RelayMessage};

/// Receives the outcome of a locally requested capture.
#[async_trait]
pub trait LocalHandler: Send + Sync {
    async fn deliver(&self, outcome: DispatchOutcome) -> Result<(), AppError>;
}

/// Adapts a plain closure into a `LocalHandler`.
pub struct FnHandler<F>(F);

impl<F> FnHandler<F>
where
    F: Fn(DispatchOutcome) + Send + Sync + 'static,
{
    pub fn shared(f: F) -> Arc<dyn LocalHandler> {
        Arc::new(Self(f))
    }
}

#[async_trait]
impl<F> LocalHandler for FnHandler<F>
where
    F: Fn(DispatchOutcome) + Send + Sync + 'static,
{
    async fn deliver(&self, outcome: DispatchOutcome) -> Result<(), AppError> {
        (self.0)(outcome);
        Ok(())
    }
}

/// Transport to capture clients and remote requesters.
#[async_trait]
pub trait ParticipantBridge: Send + Sync {
    /// Ask a capture client to take a screenshot and upload it.
    async fn request_capture(&self, instruction: CaptureInstruction) -> Result<(), AppError>;

    /// Send a capture result back to the participant that asked for it.
    async fn relay_result(&self, message: RelayMessage) -> Result<(), AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CaptureResult, OutboundPayload};
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_fn_handler_invokes_closure() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handler = FnHandler::shared(move |outcome| sink.lock().unwrap().push(outcome));

        handler
            .deliver(Ok(CaptureResult::Payload(OutboundPayload::DataUrl(
                "data:image/webp;base64,".to_string(),
            ))))
            .await
            .unwrap();

        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
