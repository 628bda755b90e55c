use std::sync::Arc;

use capture_api::{setup, spawn_event_logger, ChannelBridge};
use capture_core::Config;

const BRIDGE_CHANNEL_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    let (bridge, events) = ChannelBridge::new(BRIDGE_CHANNEL_CAPACITY);

    let (state, router) = setup::initialize_app(config.clone(), Arc::new(bridge)).await?;

    // No network transport is attached in the standalone binary.
    let mut background = vec![spawn_event_logger(events)];

    if let Some(interval) = config.upload_token_sweep_interval() {
        background.push(state.tokens.spawn_sweeper(interval));
    }

    setup::server::start_server(&config, router, background).await?;

    Ok(())
}
