//! Test helpers: build AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p capture-api`.

#![allow(dead_code)]

pub mod fixtures;
pub mod recording;

use axum_test::TestServer;
use capture_api::setup;
use capture_api::state::AppState;
use capture_api::ChannelBridge;
use capture_core::models::BridgeEvent;
use capture_core::Config;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::mpsc::Receiver;

/// Test application: server, shared state and the bridge's event stream.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub events: Receiver<BridgeEvent>,
    pub _save_dir: Option<TempDir>,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

fn test_config() -> Config {
    Config {
        upload_token_ttl_seconds: 0,
        upload_token_sweep_interval_secs: 0,
        ..Config::default()
    }
}

/// Setup test app with in-memory tokens and no disk output.
pub async fn setup_test_app() -> TestApp {
    build(test_config(), None).await
}

/// Setup test app whose local handler saves captures into a temp dir.
pub async fn setup_test_app_with_save_dir() -> TestApp {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = Config {
        capture_save_dir: Some(dir.path().to_path_buf()),
        ..test_config()
    };
    build(config, Some(dir)).await
}

async fn build(config: Config, save_dir: Option<TempDir>) -> TestApp {
    let (bridge, events) = ChannelBridge::new(16);
    let (state, router) = setup::build_app(config, Arc::new(bridge))
        .await
        .expect("Failed to build app");

    let server =
        TestServer::new(router.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        state,
        events,
        _save_dir: save_dir,
    }
}
