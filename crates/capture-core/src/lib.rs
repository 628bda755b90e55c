//! Capture Core Library
//!
//! This crate provides the domain models, error types, configuration and the
//! delivery traits shared by every capture relay component.

pub mod config;
pub mod constants;
pub mod error;
pub mod hooks;
pub mod models;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use hooks::{FnHandler, LocalHandler, ParticipantBridge};
