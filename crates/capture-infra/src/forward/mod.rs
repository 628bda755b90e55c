//! Forwarding of uploaded captures to third-party HTTP services.

mod error;
mod service;

pub use error::ForwardError;
pub use service::{upload_filename, RemoteForwarder};
