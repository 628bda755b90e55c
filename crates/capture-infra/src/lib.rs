//! Capture Infrastructure Library
//!
//! This crate provides the stateful and I/O-bound pieces of the relay:
//! - Token store (one-time upload tokens, expiry sweep)
//! - Remote forwarding of uploads to third-party services
//! - Middleware (request ID)
//! - Telemetry initialization

pub mod token_store;

#[cfg(feature = "forward")]
pub mod forward;

#[cfg(feature = "middleware")]
pub mod middleware;

#[cfg(feature = "observability-basic")]
pub mod telemetry;

pub use token_store::{generate_token, token_prefix, TokenStore};

#[cfg(feature = "forward")]
pub use forward::{ForwardError, RemoteForwarder};

#[cfg(feature = "middleware")]
pub use middleware::{request_id_middleware, RequestId};

#[cfg(feature = "observability-basic")]
pub use telemetry::{init_telemetry, shutdown_telemetry};
