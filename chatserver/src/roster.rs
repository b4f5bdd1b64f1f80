//! The packed parallel-array roster: listeners occupy indices `[0, L)`,
//! client sessions occupy `[L, N)`, capacity is fixed at `L + 256`, and
//! a disconnect compacts the tail left to keep the `[L, N)` range
//! dense. Shift-left compaction with no free list and no id reuse
//! stands in for slot-reuse free lists other event-loop designs favor.

use chatnet_protocol::message::MAX_NAME_SIZE;
use mio::net::{TcpListener, TcpStream};
use mio::Token;

/// Maximum number of concurrently connected client sessions; total
/// roster size never exceeds `L + MAX_CLIENTS`.
pub const MAX_CLIENTS: usize = 256;

/// Default name assigned to a client immediately after accept, before
/// its first `REQ·CON`.
pub const DEFAULT_NAME: &[u8] = b"CLIENT";

/// One connected client session. `token` is the session's *permanent*
/// `mio` registration token, assigned once at accept time and never
/// reused or reassigned - it is what lets the roster keep `mio`
/// registrations stable even though a session's position in `sessions`
/// moves down by one on every earlier disconnect.
pub struct Session {
    pub stream: TcpStream,
    pub token: Token,
    pub name: [u8; MAX_NAME_SIZE],
}

impl Session {
    fn new(stream: TcpStream, token: Token) -> Session {
        let mut name = [0u8; MAX_NAME_SIZE];
        name[..DEFAULT_NAME.len()].copy_from_slice(DEFAULT_NAME);
        Session { stream, token, name }
    }

    /// The recorded name up to its NUL terminator.
    pub fn name(&self) -> &[u8] {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(MAX_NAME_SIZE);
        &self.name[..end]
    }

    pub fn set_name(&mut self, name: &[u8]) {
        self.name = [0u8; MAX_NAME_SIZE];
        let len = name.len().min(MAX_NAME_SIZE - 1);
        self.name[..len].copy_from_slice(&name[..len]);
    }
}

/// Listeners (indices `[0, L)`, stable forever) plus the packed,
/// compacting array of client sessions (conceptually `[L, N)`; stored
/// densely starting at 0 here since the listener count is tracked
/// separately).
pub struct Roster {
    listeners: Vec<TcpListener>,
    sessions: Vec<Session>,
    next_token: usize,
    max_clients: usize,
}

impl Roster {
    /// `max_clients` bounds `sessions.len()`; it defaults to
    /// `MAX_CLIENTS` but is overridable via `ServerConfig`.
    pub fn new(listeners: Vec<TcpListener>, max_clients: usize) -> Roster {
        let next_token = listeners.len();
        Roster {
            listeners,
            sessions: Vec::new(),
            next_token,
            max_clients,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn listeners(&self) -> &[TcpListener] {
        &self.listeners
    }

    pub fn session(&self, idx: usize) -> &Session {
        &self.sessions[idx]
    }

    pub fn session_mut(&mut self, idx: usize) -> &mut Session {
        &mut self.sessions[idx]
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// `true` once the session count reaches the configured
    /// `max_clients`: the roster is at capacity and a freshly accepted
    /// socket must be closed immediately instead of being registered.
    pub fn at_capacity(&self) -> bool {
        self.sessions.len() == self.max_clients
    }

    /// Registers a newly accepted, already-non-blocking stream as a new
    /// session with a freshly minted, permanent token. Returns the new
    /// session's current index (always `sessions.len() - 1` right after
    /// this call) and its token.
    pub fn insert(&mut self, stream: TcpStream) -> (usize, Token) {
        let token = Token(self.next_token);
        self.next_token += 1;
        self.sessions.push(Session::new(stream, token));
        (self.sessions.len() - 1, token)
    }

    pub fn find_by_name(&self, target: &[u8]) -> Option<usize> {
        self.sessions.iter().position(|s| s.name() == target)
    }

    /// Removes the session at `idx`, shifting every later session left
    /// by one to keep the array packed.
    pub fn remove(&mut self, idx: usize) -> Session {
        self.sessions.remove(idx)
    }
}
