use std::sync::Arc;

use capture_core::models::{DispatchOutcome, DispatchTarget, RelayMessage};
use capture_core::{AppError, ParticipantBridge};

/// Delivers a capture outcome to whoever asked for the capture.
#[derive(Clone)]
pub struct CallbackDispatcher {
    bridge: Arc<dyn ParticipantBridge>,
}

impl CallbackDispatcher {
    pub fn new(bridge: Arc<dyn ParticipantBridge>) -> Self {
        Self { bridge }
    }

    #[tracing::instrument(
        skip(self, target, outcome),
        fields(dispatch_target = target.kind(), success = outcome.is_ok())
    )]
    pub async fn dispatch(
        &self,
        target: &DispatchTarget,
        outcome: DispatchOutcome,
    ) -> Result<(), AppError> {
        match target {
            DispatchTarget::Local(handler) => handler.deliver(outcome).await,
            DispatchTarget::Remote {
                participant_id,
                correlation_id,
            } => {
                let message = RelayMessage::from_outcome(participant_id, correlation_id, &outcome);
                self.bridge.relay_result(message).await?;
                tracing::debug!(
                    participant_id = %participant_id,
                    correlation_id = %correlation_id,
                    "Capture result relayed"
                );
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::ChannelBridge;
    use capture_core::models::{
        BridgeEvent, CaptureResult, DispatchFailure, OutboundPayload, RelayOutcome,
    };
    use capture_core::FnHandler;
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_local_target_invokes_handler() {
        let (bridge, mut rx) = ChannelBridge::new(4);
        let dispatcher = CallbackDispatcher::new(Arc::new(bridge));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let target =
            DispatchTarget::Local(FnHandler::shared(move |o| sink.lock().unwrap().push(o)));

        let outcome: DispatchOutcome = Ok(CaptureResult::Payload(OutboundPayload::DataUrl(
            "data:image/webp;base64,AA==".to_string(),
        )));
        dispatcher.dispatch(&target, outcome.clone()).await.unwrap();

        assert_eq!(seen.lock().unwrap().as_slice(), &[outcome]);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_remote_target_relays_with_correlation_id() {
        let (bridge, mut rx) = ChannelBridge::new(4);
        let dispatcher = CallbackDispatcher::new(Arc::new(bridge));
        let target = DispatchTarget::Remote {
            participant_id: "42".to_string(),
            correlation_id: "corr-9".to_string(),
        };

        let outcome: DispatchOutcome = Err(DispatchFailure {
            code: "UPSTREAM_HTTP_ERROR".to_string(),
            message: "nope".to_string(),
        });
        dispatcher.dispatch(&target, outcome).await.unwrap();

        match rx.recv().await.unwrap() {
            BridgeEvent::ResultReady(message) => {
                assert_eq!(message.participant_id, "42");
                assert_eq!(message.correlation_id, "corr-9");
                assert!(matches!(message.outcome, RelayOutcome::Error { .. }));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
