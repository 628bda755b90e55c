use std::sync::Arc;

use anyhow::Context;
use capture_core::{Config, LocalHandler, ParticipantBridge};
use capture_infra::{RemoteForwarder, TokenStore};
use capture_storage::DiskSink;

use crate::dispatch::CallbackDispatcher;
use crate::services::CaptureBroker;

/// Shared state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub tokens: TokenStore,
    pub forwarder: RemoteForwarder,
    pub dispatcher: CallbackDispatcher,
    pub broker: CaptureBroker,
    /// Handler for captures requested by the relay itself, if local saving is enabled.
    pub local_handler: Option<Arc<dyn LocalHandler>>,
}

impl AppState {
    pub async fn new(config: Config, bridge: Arc<dyn ParticipantBridge>) -> anyhow::Result<Self> {
        let tokens = TokenStore::from_config(&config);
        let forwarder = RemoteForwarder::new(config.forward_timeout())?;
        let dispatcher = CallbackDispatcher::new(bridge.clone());
        let broker = CaptureBroker::new(tokens.clone(), bridge, config.public_upload_url.clone());

        let local_handler: Option<Arc<dyn LocalHandler>> = match &config.capture_save_dir {
            Some(dir) => {
                let sink = DiskSink::new(dir.clone())
                    .await
                    .with_context(|| format!("Failed to prepare {}", dir.display()))?;
                tracing::info!(path = %dir.display(), "Saving local captures to disk");
                Some(Arc::new(sink))
            }
            None => None,
        };

        Ok(Self {
            config,
            tokens,
            forwarder,
            dispatcher,
            broker,
            local_handler,
        })
    }
}
