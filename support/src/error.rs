//! Crate-wide error type for ambient (non-protocol) failures: logger
//! setup and config loading. Protocol-level errors live in
//! `chatnet-protocol` instead, since they need to travel without pulling
//! in this crate's config/logging concerns.

use std::fmt;

#[derive(Debug)]
pub enum ChatError {
    Config(String),
    Io(std::io::Error),
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatError::Config(msg) => write!(f, "configuration error: {}", msg),
            ChatError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for ChatError {}

impl From<std::io::Error> for ChatError {
    fn from(err: std::io::Error) -> Self {
        ChatError::Io(err)
    }
}

pub type ChatResult<T> = Result<T, ChatError>;
