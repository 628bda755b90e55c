//! Capture Storage Library
//!
//! Local persistence of capture results for deployments that save screenshots
//! to disk instead of (or besides) handing them to a callback.

pub mod error;
pub mod local;

pub use error::{StorageError, StorageResult};
pub use local::DiskSink;
