//! Ambient infrastructure shared by the chat server and client: structured
//! logging, timestamp helpers, and the crate-wide error type. Nothing in
//! here is protocol-specific.

pub mod error;
pub mod logging;
pub mod time;

pub use error::{ChatError, ChatResult};
