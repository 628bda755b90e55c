//! Capture API Library
//!
//! The HTTP side of the relay: the `/image` upload endpoint, the dispatcher that
//! hands results to whoever asked for the capture, the broker that issues
//! tokens, and application setup.

pub mod bridge;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod services;
pub mod setup;
pub mod state;

// Re-exports
pub use bridge::{spawn_event_logger, ChannelBridge};
pub use dispatch::CallbackDispatcher;
pub use error::{ErrorResponse, HttpAppError, SuccessResponse};
pub use services::CaptureBroker;
pub use state::AppState;
