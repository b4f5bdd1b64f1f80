//! Reads and writes exactly one framed message from/to a byte stream,
//! retrying the underlying I/O until either a full frame is assembled
//! or the stream would block.

use crate::codec;
use crate::error::{ProtocolError, ProtocolResult};
use crate::message::{Message, MAX_PAYLOAD_SIZE, MESSAGE_PREFIX_SIZE};
use byteorder::ByteOrder;
use std::io::{self, Read, Write};

const TOTAL_BUFFER_SIZE: usize = MESSAGE_PREFIX_SIZE + MAX_PAYLOAD_SIZE;

/// Reads as many bytes as are immediately available (without blocking)
/// into `buf[written..]`, looping while the underlying stream keeps
/// making progress. Returns the new `written` count. A `WouldBlock`
/// simply ends the loop early - that's "no progress this round", not an
/// error.
fn fill_nonblocking<R: Read>(stream: &mut R, buf: &mut [u8], mut written: usize) -> io::Result<usize> {
    loop {
        if written == buf.len() {
            return Ok(written);
        }
        match stream.read(&mut buf[written..]) {
            Ok(0) => return Ok(written),
            Ok(n) => written += n,
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => return Ok(written),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
}

/// Attempts to read one complete framed message from `stream`.
///
/// - `Ok(Some(message))`, a full frame was read.
/// - `Ok(None)`, clean EOF at a frame boundary (zero bytes read at the
///   very start of the prefix): the peer closed the connection.
/// - `Err(ProtocolError::Wait)`, not enough bytes were available yet
///   (the socket would have blocked before a full frame arrived); the
///   caller should retry on the next readiness event.
/// - `Err(ProtocolError::PayloadTooLarge)`, `payloadLength >=
///   MAX_PAYLOAD_SIZE`; the connection should be torn down.
/// - `Err(ProtocolError::Io(_))`, a real I/O failure.
pub fn recv_message<R: Read>(stream: &mut R) -> ProtocolResult<Option<Message>> {
    let mut prefix = [0u8; MESSAGE_PREFIX_SIZE];
    let prefix_read = fill_nonblocking(stream, &mut prefix, 0).map_err(ProtocolError::from_io)?;

    if prefix_read == 0 {
        return Ok(None);
    }
    if prefix_read < MESSAGE_PREFIX_SIZE {
        return Err(ProtocolError::Wait);
    }

    let len_off = 4 + crate::message::MAX_NAME_SIZE;
    let payload_len =
        byteorder::BigEndian::read_u32(&prefix[len_off..len_off + 4]) as usize;
    if payload_len >= MAX_PAYLOAD_SIZE {
        return Err(ProtocolError::PayloadTooLarge);
    }

    let mut buffer = [0u8; TOTAL_BUFFER_SIZE];
    buffer[..MESSAGE_PREFIX_SIZE].copy_from_slice(&prefix);

    let payload_read = fill_nonblocking(
        stream,
        &mut buffer[MESSAGE_PREFIX_SIZE..MESSAGE_PREFIX_SIZE + payload_len],
        0,
    )
    .map_err(ProtocolError::from_io)?;

    if payload_read < payload_len {
        return Err(ProtocolError::Wait);
    }

    Ok(Some(codec::decode(&buffer)))
}

/// Writes `msg` to `stream` as a single logical unit:
/// `MESSAGE_PREFIX_SIZE + msg.payload_len` bytes. Short writes are
/// looped until complete; a `WouldBlock` before the frame is fully
/// written returns `Err(ProtocolError::Wait)` without retrying further -
/// a blocked send is abandoned rather than buffered for a later retry.
/// Callers that need delivery guarantees beyond "best effort on a ready
/// socket" would need to layer buffering on top.
pub fn send_message<W: Write>(stream: &mut W, msg: &Message) -> ProtocolResult<()> {
    let frame_len = MESSAGE_PREFIX_SIZE + msg.payload_len;
    let mut buffer = [0u8; TOTAL_BUFFER_SIZE];
    codec::encode(msg, &mut buffer);

    let mut written = 0;
    while written < frame_len {
        match stream.write(&buffer[written..frame_len]) {
            Ok(0) => return Err(ProtocolError::Io(io::ErrorKind::WriteZero.into())),
            Ok(n) => written += n,
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => return Err(ProtocolError::Wait),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(ProtocolError::Io(err)),
        }
    }
    Ok(())
}
