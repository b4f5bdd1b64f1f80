//! Protocol-level error type. Kept small and hand-enumerated, deriving
//! its `Display`/`std::error::Error` impls through `thiserror` instead
//! of writing them out by hand.

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    /// `payloadLength` on the wire was `>= MAX_PAYLOAD_SIZE`. The frame
    /// is malformed; the connection should be torn down.
    #[error("payload length exceeds the protocol maximum")]
    PayloadTooLarge,

    /// Not enough bytes were available yet for a full frame and the
    /// stream would have blocked. Not an error condition, callers
    /// retry on the next readiness event.
    #[error("operation would block")]
    Wait,

    /// Real I/O failure other than `WouldBlock`.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// No listener could be bound for any resolved address.
    #[error("failed to bind any listener on {0}")]
    NoListenerBound(String),
}

impl ProtocolError {
    /// Classifies a raw I/O error the way the framer needs to: a
    /// `WouldBlock`/`EAGAIN` becomes `Wait` (retry), everything else is
    /// `Io`.
    pub fn from_io(err: io::Error) -> ProtocolError {
        if err.kind() == io::ErrorKind::WouldBlock {
            ProtocolError::Wait
        } else {
            ProtocolError::Io(err)
        }
    }
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
