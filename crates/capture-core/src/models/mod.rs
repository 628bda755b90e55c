//! Data models for the capture relay
//!
//! Pending uploads and their dispatch targets, the payload and result types
//! handed to those targets, and the messages exchanged with participants.

mod payload;
mod relay;
mod upload;

pub use payload::*;
pub use relay::*;
pub use upload::*;
