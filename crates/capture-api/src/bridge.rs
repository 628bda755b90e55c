//! Channel-backed participant bridge
//!
//! The relay only ever pushes `BridgeEvent`s into a bounded channel. A network
//! transport subscribes on the receiving half.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use capture_core::models::{BridgeEvent, CaptureInstruction, RelayMessage};
use capture_core::{AppError, ParticipantBridge};
use capture_infra::token_prefix;

#[derive(Clone)]
pub struct ChannelBridge {
    sender: mpsc::Sender<BridgeEvent>,
}

impl ChannelBridge {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<BridgeEvent>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }

    async fn send(&self, event: BridgeEvent) -> Result<(), AppError> {
        self.sender
            .send(event)
            .await
            .map_err(|_| AppError::BridgeUnavailable("event channel closed".to_string()))
    }
}

#[async_trait]
impl ParticipantBridge for ChannelBridge {
    async fn request_capture(&self, instruction: CaptureInstruction) -> Result<(), AppError> {
        self.send(BridgeEvent::CaptureRequested(instruction)).await
    }

    async fn relay_result(&self, message: RelayMessage) -> Result<(), AppError> {
        self.send(BridgeEvent::ResultReady(message)).await
    }
}

/// Drain `receiver` into the log. Used when no transport is attached.
pub fn spawn_event_logger(mut receiver: mpsc::Receiver<BridgeEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = receiver.recv().await {
            match event {
                BridgeEvent::CaptureRequested(instruction) => {
                    tracing::info!(
                        participant_id = %instruction.participant_id,
                        token_prefix = token_prefix(&instruction.upload_token),
                        upload_url = %instruction.upload_url,
                        "Capture requested"
                    );
                }
                BridgeEvent::ResultReady(message) => {
                    tracing::info!(
                        participant_id = %message.participant_id,
                        correlation_id = %message.correlation_id,
                        success = message.is_success(),
                        "Capture result ready"
                    );
                }
            }
        }
        tracing::debug!("Bridge event channel closed");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use capture_core::models::RelayOutcome;

    fn message() -> RelayMessage {
        RelayMessage {
            participant_id: "p1".to_string(),
            correlation_id: "c1".to_string(),
            outcome: RelayOutcome::Success {
                data: "{}".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_relay_result_emits_event() {
        let (bridge, mut rx) = ChannelBridge::new(4);
        bridge.relay_result(message()).await.unwrap();

        match rx.recv().await.unwrap() {
            BridgeEvent::ResultReady(received) => assert_eq!(received, message()),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_closed_channel_is_unavailable() {
        let (bridge, rx) = ChannelBridge::new(1);
        drop(rx);

        let err = bridge.relay_result(message()).await.unwrap_err();
        assert!(matches!(err, AppError::BridgeUnavailable(_)));
    }
}
