//! Fixed-layout serializer/deserializer and the payload sanitizer. Given
//! a contiguous buffer of at least `MESSAGE_PREFIX_SIZE + MAX_PAYLOAD_SIZE`
//! bytes, `encode`/`decode` are exact inverses of each other on all
//! fields up through `payload_len` bytes of payload.

use crate::message::{Message, MessageType, MAX_NAME_SIZE, MAX_PAYLOAD_SIZE, MESSAGE_PREFIX_SIZE};
use byteorder::{BigEndian, ByteOrder};

/// Writes `msg` into `buffer` in wire order: type, name, payloadLength,
/// payload. `buffer` must be at least `MESSAGE_PREFIX_SIZE +
/// MAX_PAYLOAD_SIZE` bytes; fixed-size fields are copied verbatim,
/// trusting the framer to have sized the buffer correctly.
pub fn encode(msg: &Message, buffer: &mut [u8]) {
    BigEndian::write_u32(&mut buffer[0..4], msg.kind.0);
    buffer[4..4 + MAX_NAME_SIZE].copy_from_slice(&msg.name);
    let len_off = 4 + MAX_NAME_SIZE;
    BigEndian::write_u32(&mut buffer[len_off..len_off + 4], msg.payload_len as u32);
    let payload_off = len_off + 4;
    buffer[payload_off..payload_off + MAX_PAYLOAD_SIZE].copy_from_slice(&msg.payload);
}

/// Reads a `Message` back out of `buffer`, the exact inverse of
/// `encode`. `payload_len` is trusted as-is; callers that received the
/// prefix over the wire should have already rejected an out-of-range
/// value before calling this (see `framer::recv_message`).
pub fn decode(buffer: &[u8]) -> Message {
    let kind = MessageType(BigEndian::read_u32(&buffer[0..4]));

    let mut name = [0u8; MAX_NAME_SIZE];
    name.copy_from_slice(&buffer[4..4 + MAX_NAME_SIZE]);

    let len_off = 4 + MAX_NAME_SIZE;
    let payload_len = BigEndian::read_u32(&buffer[len_off..len_off + 4]) as usize;

    let payload_off = len_off + 4;
    let mut payload = [0u8; MAX_PAYLOAD_SIZE];
    payload.copy_from_slice(&buffer[payload_off..payload_off + MAX_PAYLOAD_SIZE]);

    Message {
        kind,
        name,
        payload_len,
        payload,
    }
}

const _: () = assert_prefix_size();
const fn assert_prefix_size() {
    if MESSAGE_PREFIX_SIZE != 40 {
        panic!("MESSAGE_PREFIX_SIZE drifted from the wire contract");
    }
}

/// Normalizes `payload[..len]` in place to printable ASCII (32..=127)
/// with collapsed whitespace: leading spaces are dropped, runs of
/// spaces collapse to one. Returns the new length; 0 means the payload
/// sanitized to nothing and the message carrying it should be dropped.
/// A terminating NUL is written at the new length.
///
/// Idempotent: `sanitize(sanitize(p))` always equals `sanitize(p)`.
pub fn sanitize(payload: &mut [u8], len: usize) -> usize {
    let mut count = 0;
    let mut prev_was_space = true; // true at the start drops leading spaces

    for i in 0..len {
        let byte = payload[i];
        if byte < 32 || byte > 127 {
            continue;
        }
        if byte == b' ' {
            if prev_was_space {
                continue;
            }
            prev_was_space = true;
        } else {
            prev_was_space = false;
        }
        payload[count] = byte;
        count += 1;
    }

    if count < payload.len() {
        payload[count] = 0;
    }
    count
}

/// Splits off the first whitespace-delimited token from
/// `payload[..len]`. Returns `(token, end_index)` where `end_index` is
/// the offset just past the token, or `None` if the payload is empty or
/// starts with a separator (a sanitized payload never starts with a
/// space, so this only triggers on an empty or all-separator input).
/// Used to pull the target nickname off a `PRV` payload and the new
/// nickname off a `NIC` payload.
fn read_token(payload: &[u8], len: usize) -> Option<(&[u8], usize)> {
    let mut start = 0;
    while start < len && payload[start] == b' ' {
        start += 1;
    }
    if start == len {
        return None;
    }
    let mut end = start;
    while end < len && payload[end] != b' ' {
        end += 1;
    }
    Some((&payload[start..end], end))
}

/// Parses a `PRV` payload of the form `"<target> <text>"`. Returns the
/// target token and the remaining text (possibly empty), or `None` if
/// no target token could be found.
pub fn split_target_and_text(payload: &[u8], len: usize) -> Option<(&[u8], &[u8])> {
    let (target, end) = read_token(payload, len)?;
    let text_start = (end + 1).min(len);
    Some((target, &payload[text_start..len]))
}

/// Parses a `NIC` payload (a single token: the new nickname). Returns
/// `None` if the payload has no token at all.
pub fn read_new_name(payload: &[u8], len: usize) -> Option<&[u8]> {
    read_token(payload, len).map(|(token, _)| token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{MessageType, CON};

    #[test]
    fn round_trip_preserves_all_fields() {
        let msg = Message::build(MessageType::new(crate::message::REQ, 0, CON), b"alice", b"hello world");
        let mut buf = [0u8; MESSAGE_PREFIX_SIZE + MAX_PAYLOAD_SIZE];
        encode(&msg, &mut buf);
        let decoded = decode(&buf);

        assert_eq!(decoded.kind, msg.kind);
        assert_eq!(decoded.name, msg.name);
        assert_eq!(decoded.payload_len, msg.payload_len);
        assert_eq!(decoded.payload(), msg.payload());
    }

    #[test]
    fn sanitize_collapses_and_strips_whitespace() {
        let mut buf = [0u8; MAX_PAYLOAD_SIZE];
        let input = b"  hello   world \t!";
        buf[..input.len()].copy_from_slice(input);
        let len = sanitize(&mut buf, input.len());
        assert_eq!(&buf[..len], b"hello world !");
    }

    #[test]
    fn sanitize_is_idempotent() {
        let mut buf = [0u8; MAX_PAYLOAD_SIZE];
        let input = b"  hello   world \t!";
        buf[..input.len()].copy_from_slice(input);
        let len1 = sanitize(&mut buf, input.len());

        let mut buf2 = [0u8; MAX_PAYLOAD_SIZE];
        buf2[..len1].copy_from_slice(&buf[..len1]);
        let len2 = sanitize(&mut buf2, len1);

        assert_eq!(len1, len2);
        assert_eq!(&buf[..len1], &buf2[..len2]);
    }

    #[test]
    fn sanitize_of_only_control_bytes_is_empty() {
        let mut buf = [0u8; MAX_PAYLOAD_SIZE];
        let input = [1u8, 2, 3, 9, 10];
        buf[..input.len()].copy_from_slice(&input);
        assert_eq!(sanitize(&mut buf, input.len()), 0);
    }

    #[test]
    fn split_target_and_text_parses_private_message() {
        let payload = b"bob hi there";
        let (target, text) = split_target_and_text(payload, payload.len()).unwrap();
        assert_eq!(target, b"bob");
        assert_eq!(text, b"hi there");
    }

    #[test]
    fn split_target_and_text_handles_missing_body() {
        let payload = b"bob";
        let (target, text) = split_target_and_text(payload, payload.len()).unwrap();
        assert_eq!(target, b"bob");
        assert_eq!(text, b"");
    }

    #[test]
    fn split_target_and_text_rejects_empty_payload() {
        assert!(split_target_and_text(b"", 0).is_none());
    }

    #[test]
    fn read_new_name_takes_first_token_only() {
        let payload = b"alice2 trailing garbage";
        assert_eq!(read_new_name(payload, payload.len()), Some(&b"alice2"[..]));
    }
}
