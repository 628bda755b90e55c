//! Capture broker
//!
//! Issues upload tokens for capture requests and tells capture clients where to
//! send their screenshot. Three flows exist:
//!
//! - a local capture, whose decoded payload goes straight to a handler;
//! - a forwarded capture, whose payload is re-sent to a third-party service and
//!   whose upstream response goes to a local handler;
//! - a remote participant asking for a token for its own upload, whose upstream
//!   response is relayed back to that participant by correlation id.

use std::collections::BTreeMap;
use std::sync::Arc;

use capture_core::constants::DEFAULT_ENCODING;
use capture_core::models::{
    CaptureInstruction, CaptureOptions, DispatchTarget, PendingUpload, RemoteConfig,
    Representation, UploadTokenRequest,
};
use capture_core::{AppError, LocalHandler, ParticipantBridge};
use capture_infra::{token_prefix, TokenStore};

#[derive(Clone)]
pub struct CaptureBroker {
    tokens: TokenStore,
    bridge: Arc<dyn ParticipantBridge>,
    upload_url: String,
}

impl CaptureBroker {
    pub fn new(
        tokens: TokenStore,
        bridge: Arc<dyn ParticipantBridge>,
        upload_url: impl Into<String>,
    ) -> Self {
        Self {
            tokens,
            bridge,
            upload_url: upload_url.into(),
        }
    }

    /// Ask `participant_id` for a screenshot delivered to `handler`.
    #[tracing::instrument(skip(self, options, handler))]
    pub async fn request_capture(
        &self,
        participant_id: &str,
        options: CaptureOptions,
        representation: Representation,
        handler: Arc<dyn LocalHandler>,
    ) -> Result<String, AppError> {
        let encoding = options
            .encoding
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ENCODING.to_string());

        let pending = PendingUpload::local(handler, representation).with_encoding(encoding);
        self.issue_and_instruct(participant_id, pending, options.quality, options.headers)
            .await
    }

    /// Ask `participant_id` for a screenshot that is re-sent to `remote_config.url`.
    /// The upstream response, or the failure, is delivered to `handler`.
    #[tracing::instrument(skip(self, remote_config, handler), fields(url = %remote_config.url))]
    pub async fn request_forwarded_capture(
        &self,
        participant_id: &str,
        remote_config: RemoteConfig,
        representation: Representation,
        handler: Arc<dyn LocalHandler>,
    ) -> Result<String, AppError> {
        let quality = remote_config.quality;
        let pending = PendingUpload::forwarded(
            DispatchTarget::Local(handler),
            remote_config,
            representation,
        );
        self.issue_and_instruct(participant_id, pending, quality, BTreeMap::new())
            .await
    }

    /// Issue a token for a remote participant that performs the upload itself.
    ///
    /// The upload is forwarded to `request.url` as a multipart file part and the
    /// upstream response is relayed back under `request.correlation_id`.
    #[tracing::instrument(
        skip(self, request),
        fields(correlation_id = %request.correlation_id, url = %request.url)
    )]
    pub async fn issue_remote_upload_token(
        &self,
        participant_id: &str,
        request: UploadTokenRequest,
    ) -> Result<String, AppError> {
        let remote_config = RemoteConfig {
            url: request.url,
            headers: request.headers,
            form_field: request.form_field,
            filename: request.filename,
            encoding: request.encoding,
            quality: request.quality,
        };
        let target = DispatchTarget::Remote {
            participant_id: participant_id.to_string(),
            correlation_id: request.correlation_id,
        };

        let token = self
            .tokens
            .issue(PendingUpload::forwarded(
                target,
                remote_config,
                Representation::Raw,
            ))
            .await?;

        tracing::info!(token_prefix = token_prefix(&token), "Remote upload token issued");
        Ok(token)
    }

    async fn issue_and_instruct(
        &self,
        participant_id: &str,
        pending: PendingUpload,
        quality: Option<f32>,
        headers: BTreeMap<String, String>,
    ) -> Result<String, AppError> {
        let encoding = pending.encoding_hint().to_string();
        let form_field = pending.form_field().to_string();
        let representation = pending.representation;

        let token = self.tokens.issue(pending).await?;

        let instruction = CaptureInstruction {
            participant_id: participant_id.to_string(),
            upload_token: token.clone(),
            upload_url: self.upload_url.clone(),
            encoding,
            quality,
            headers,
            form_field,
            representation,
        };

        if let Err(e) = self.bridge.request_capture(instruction).await {
            // Nobody will ever upload against this token.
            if let Err(release) = self.tokens.consume(&token).await {
                tracing::debug!(
                    token_prefix = token_prefix(&token),
                    error = %release,
                    "Token already gone when releasing after bridge failure"
                );
            }
            return Err(e);
        }

        tracing::info!(token_prefix = token_prefix(&token), "Capture requested");
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::ChannelBridge;
    use capture_core::models::BridgeEvent;
    use capture_core::FnHandler;

    use tokio::sync::mpsc::Receiver;

    fn broker(capacity: usize) -> (CaptureBroker, TokenStore, Receiver<BridgeEvent>) {
        let tokens = TokenStore::new(None, 100);
        let (bridge, rx) = ChannelBridge::new(capacity);
        let broker = CaptureBroker::new(
            tokens.clone(),
            Arc::new(bridge),
            "http://localhost:4000/image",
        );
        (broker, tokens, rx)
    }

    #[tokio::test]
    async fn test_request_capture_sends_instruction() {
        let (broker, tokens, mut rx) = broker(4);
        let options = CaptureOptions {
            encoding: Some("png".to_string()),
            quality: Some(0.8),
            ..Default::default()
        };

        let token = broker
            .request_capture("7", options, Representation::Base64, FnHandler::shared(|_| {}))
            .await
            .unwrap();

        match rx.recv().await.unwrap() {
            BridgeEvent::CaptureRequested(instruction) => {
                assert_eq!(instruction.participant_id, "7");
                assert_eq!(instruction.upload_token, token);
                assert_eq!(instruction.upload_url, "http://localhost:4000/image");
                assert_eq!(instruction.encoding, "png");
                assert_eq!(instruction.form_field, "file");
                assert_eq!(instruction.quality, Some(0.8));
            }
            other => panic!("unexpected event {:?}", other),
        }

        let pending = tokens.consume(&token).await.unwrap();
        assert!(!pending.is_forwarded);
        assert_eq!(pending.encoding_hint(), "png");
    }

    #[tokio::test]
    async fn test_request_forwarded_capture_uses_remote_field() {
        let (broker, tokens, mut rx) = broker(4);
        let config = RemoteConfig::new("https://u.example.com/upload").with_form_field("image");

        let token = broker
            .request_forwarded_capture("7", config, Representation::Raw, FnHandler::shared(|_| {}))
            .await
            .unwrap();

        match rx.recv().await.unwrap() {
            BridgeEvent::CaptureRequested(instruction) => {
                assert_eq!(instruction.form_field, "image");
                assert_eq!(instruction.encoding, "webp");
                assert_eq!(instruction.representation, Representation::Raw);
            }
            other => panic!("unexpected event {:?}", other),
        }

        let pending = tokens.consume(&token).await.unwrap();
        assert!(pending.is_forwarded);
        assert!(matches!(pending.dispatch_target, DispatchTarget::Local(_)));
    }

    #[tokio::test]
    async fn test_bridge_failure_releases_token() {
        let (broker, tokens, rx) = broker(1);
        drop(rx);

        let err = broker
            .request_capture(
                "7",
                CaptureOptions::default(),
                Representation::Base64,
                FnHandler::shared(|_| {}),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::BridgeUnavailable(_)));
        assert!(tokens.is_empty().await);
    }

    #[tokio::test]
    async fn test_remote_upload_token() {
        let (broker, tokens, mut rx) = broker(4);
        let request: UploadTokenRequest = serde_json::from_value(serde_json::json!({
            "url": "https://u.example.com/upload",
            "correlationId": "corr-1",
            "filename": "match-42",
            "formField": "image",
            "headers": {"Authorization": "Bearer abc"}
        }))
        .unwrap();

        let token = broker.issue_remote_upload_token("p9", request).await.unwrap();
        assert!(rx.try_recv().is_err());

        let pending = tokens.consume(&token).await.unwrap();
        assert!(pending.is_forwarded);
        assert_eq!(pending.representation, Representation::Raw);
        assert_eq!(pending.form_field(), "file");
        assert_eq!(pending.remote_config.as_ref().unwrap().field_name(), "image");
        match pending.dispatch_target {
            DispatchTarget::Remote {
                participant_id,
                correlation_id,
            } => {
                assert_eq!(participant_id, "p9");
                assert_eq!(correlation_id, "corr-1");
            }
            other => panic!("unexpected target {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_remote_upload_token_requires_url() {
        let (broker, tokens, _rx) = broker(4);
        let request: UploadTokenRequest =
            serde_json::from_value(serde_json::json!({"url": "", "correlationId": "c"}))
                .unwrap();

        let err = broker.issue_remote_upload_token("p9", request).await.unwrap_err();
        assert!(matches!(err, AppError::NoRemoteUrl));
        assert!(tokens.is_empty().await);
    }
}
