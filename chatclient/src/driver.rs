//! The client-side protocol half: local nick state, translation of UI
//! events into outbound `REQ` messages, and dispatch of inbound
//! `SIG`/`RES` messages to a caller-supplied `RosterSink`. No terminal
//! UI lives here - that's an external collaborator, out of scope per
//! the protocol split this crate implements.

use chatnet_protocol::message::{self, Message, MessageType, MAX_NAME_SIZE};

/// Callbacks the embedding UI implements to learn about roster and chat
/// events. Mirrors the external UI's listbox/chat-pad mutations in the
/// original terminal client, but as a trait instead of free functions
/// reaching into global UI state.
pub trait RosterSink {
    /// A `SIG·REG` broadcast arrived: append a timestamped line to the
    /// chat output.
    fn on_chat_line(&mut self, time: &str, from: &[u8], text: &[u8]);
    /// A `SIG·PRV` arrived addressed to us.
    fn on_private(&mut self, time: &str, from: &[u8], text: &[u8]);
    /// A `SIG·CON` arrived: add `name` to the roster (this fires once
    /// per known client immediately after our own `REQ·CON`, including
    /// for ourselves, and once more per later joiner).
    fn on_join(&mut self, name: &[u8]);
    /// A `SIG·DIS` arrived: remove `name` from the roster.
    fn on_part(&mut self, name: &[u8]);
    /// A `SIG·NIC` arrived: replace `old` with `new` in the roster.
    fn on_rename(&mut self, old: &[u8], new: &[u8]);
    /// Our own `REQ·NIC` was acknowledged, successfully or not.
    fn on_nick_result(&mut self, success: bool, name_or_rejected: &[u8]);
    /// Our own `REQ·PRV` was acknowledged, successfully or not.
    /// `from` is the target's name on success, the attempted target on
    /// failure (per spec.md's `RES·PRV` body contract).
    fn on_private_result(&mut self, success: bool, from: &[u8], body: &[u8]);
}

/// One of the three outbound intents a line of user input can produce.
/// Kept separate from `Message` construction so tests can assert on
/// intent without round-tripping through the wire format.
#[derive(Debug, PartialEq, Eq)]
pub enum Intent {
    Text(Vec<u8>),
    Nick(Vec<u8>),
    Private { target: Vec<u8>, text: Vec<u8> },
}

/// Parses one line of raw user input into an `Intent`. `/nick <name>`
/// and `/msg <target> <text>` are recognized commands; everything else
/// (including a bare `/` with no match) is plain chat text, matching
/// the original client's `isCommand`/`runCommand`/fallback-to-`REG_MSG`
/// structure.
pub fn parse_line(line: &[u8]) -> Intent {
    if let Some(rest) = strip_prefix(line, b"/nick ") {
        return Intent::Nick(trim(rest).to_vec());
    }
    if let Some(rest) = strip_prefix(line, b"/msg ") {
        let rest = trim(rest);
        let split = rest.iter().position(|&b| b == b' ');
        return match split {
            Some(at) => Intent::Private {
                target: rest[..at].to_vec(),
                text: rest[at + 1..].to_vec(),
            },
            None => Intent::Private {
                target: rest.to_vec(),
                text: Vec::new(),
            },
        };
    }
    Intent::Text(line.to_vec())
}

fn strip_prefix<'a>(line: &'a [u8], prefix: &[u8]) -> Option<&'a [u8]> {
    if line.starts_with(prefix) {
        Some(&line[prefix.len()..])
    } else {
        None
    }
}

fn trim(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| b != b' ').unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|&b| b != b' ').map_or(start, |e| e + 1);
    &bytes[start..end]
}

/// The client-side session: holds the local nick and turns `Intent`s
/// and inbound server messages into wire `Message`s / `RosterSink`
/// calls.
pub struct Session {
    nick: Vec<u8>,
}

impl Session {
    pub fn new(nick: impl Into<Vec<u8>>) -> Session {
        let mut nick = nick.into();
        nick.truncate(MAX_NAME_SIZE - 1);
        Session { nick }
    }

    pub fn nick(&self) -> &[u8] {
        &self.nick
    }

    /// The initial `REQ·CON` handshake: the chosen nick travels in the
    /// message's `name` field (trusted by the server only for this one
    /// message type), payload empty.
    pub fn connect_request(&self) -> Message {
        Message::build(MessageType::new(message::REQ, 0, message::CON), &self.nick, &[])
    }

    /// Turns a parsed `Intent` into the `Message` to send. `Intent::Nick`
    /// does *not* update `self.nick` here - per spec.md §9's spoofing
    /// note, the local nick only changes once `RES·NIC·SUCCESS` is
    /// observed in `handle_inbound`, otherwise our very next message
    /// would be dropped by the server as spoofed.
    pub fn to_message(&self, intent: &Intent) -> Message {
        match intent {
            Intent::Text(text) => {
                Message::build(MessageType::new(message::REQ, 0, message::REG), &self.nick, text)
            }
            Intent::Nick(new_nick) => {
                Message::build(MessageType::new(message::REQ, 0, message::NIC), &self.nick, new_nick)
            }
            Intent::Private { target, text } => {
                let mut payload = Vec::with_capacity(target.len() + 1 + text.len());
                payload.extend_from_slice(target);
                payload.push(b' ');
                payload.extend_from_slice(text);
                Message::build(MessageType::new(message::REQ, 0, message::PRV), &self.nick, &payload)
            }
        }
    }

    /// Dispatches one inbound message to `sink`, updating local state
    /// where the protocol requires it (currently: adopting a new nick
    /// on `RES·NIC·SUCCESS`). Messages whose main kind isn't `RES`/`SIG`,
    /// or whose sub-kind this driver doesn't recognize, are ignored -
    /// a client only ever receives what the server sends, but a
    /// forward-compatible peer should still tolerate the unexpected.
    pub fn handle_inbound(&mut self, msg: &Message, time: &str, sink: &mut dyn RosterSink) {
        let kind = msg.kind;
        match (kind.main(), kind.status(), kind.sub()) {
            (message::SIG, _, message::REG) => sink.on_chat_line(time, msg.name_str(), msg.payload()),
            (message::SIG, _, message::PRV) => sink.on_private(time, msg.name_str(), msg.payload()),
            (message::SIG, _, message::CON) => sink.on_join(msg.name_str()),
            (message::SIG, _, message::DIS) => sink.on_part(msg.name_str()),
            (message::SIG, _, message::NIC) => sink.on_rename(msg.name_str(), msg.payload()),
            (message::RES, message::SUCCESS, message::NIC) => {
                self.nick = msg.payload().to_vec();
                sink.on_nick_result(true, msg.payload());
            }
            (message::RES, message::FAILURE, message::NIC) => {
                sink.on_nick_result(false, msg.name_str());
            }
            (message::RES, message::SUCCESS, message::PRV) => {
                sink.on_private_result(true, msg.name_str(), msg.payload());
            }
            (message::RES, message::FAILURE, message::PRV) => {
                sink.on_private_result(false, msg.name_str(), msg.payload());
            }
            _ => {}
        }
    }
}
