//! The framed wire protocol: message types, codec, stream framer, and
//! listener/acceptor plumbing. Protocol-only - no roster, no dispatch,
//! no session state. See `chatnet-server` and `chatnet-client` for
//! those.

pub mod codec;
pub mod error;
pub mod framer;
pub mod listener;
pub mod message;

pub use error::{ProtocolError, ProtocolResult};
pub use message::{Message, MessageType};
