//! The server core: event loop, message dispatch by sub-kind, broadcast
//! with exclusion, and roster compaction on disconnect.

use chatnet_protocol::codec;
use chatnet_protocol::framer;
use chatnet_protocol::listener;
use chatnet_protocol::message::{self, Message, MessageType};
use chatnet_support::logging::{debug, info, warn};
use mio::Token;
use std::collections::HashSet;
use std::time::Duration;

use crate::roster::Roster;

const SERVER_NAME: &[u8] = b"SERVER";
const GREETING: &[u8] = b"To set a name, do /nick <name>";

pub struct Server {
    roster: Roster,
    poll: mio::Poll,
    events: mio::Events,
    log: slog::Logger,
}

impl Server {
    /// Binds `port` and sets up the event loop. `max_clients` overrides
    /// `roster::MAX_CLIENTS` as the capacity that `Roster::at_capacity`
    /// enforces, per `ServerConfig::max_clients`.
    pub fn bind(port: u16, max_clients: usize, log: slog::Logger) -> chatnet_protocol::ProtocolResult<Server> {
        let listeners = listener::bind_listeners(port)?;
        info!(log, "listener bound"; "port" => port, "count" => listeners.len());

        let poll = mio::Poll::new().expect("failed to create poll instance");
        for (i, l) in listeners.iter().enumerate() {
            poll.register(l, Token(i), mio::Ready::readable(), mio::PollOpt::level())
                .expect("failed to register listener");
        }

        Ok(Server {
            roster: Roster::new(listeners, max_clients),
            poll,
            events: mio::Events::with_capacity(1024),
            log,
        })
    }

    /// The address of the first bound listener, for callers that bound
    /// to port 0 and need to discover which port the OS picked.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.roster.listeners()[0].local_addr()
    }

    /// Blocks (up to `timeout`, or forever if `None`) on readiness,
    /// then services every descriptor that was ready *at the start* of
    /// the pass, in ascending index order: new accepts made mid-pass
    /// are not serviced until the next call.
    pub fn step(&mut self, timeout: Option<Duration>) -> std::io::Result<()> {
        self.poll.poll(&mut self.events, timeout)?;

        let ready: HashSet<Token> = self.events.iter().map(|e| e.token()).collect();
        if ready.is_empty() {
            return Ok(());
        }

        for i in 0..self.roster.listener_count() {
            if ready.contains(&Token(i)) {
                self.accept_on(i);
            }
        }

        // Snapshot the session count: indices appended to `sessions`
        // during this pass (there are none - accepts only append at the
        // listener stage above) aren't serviced until the next pass.
        // Compaction during this loop shrinks `current`, and removed
        // slots are never revisited in the same pass.
        let mut idx = 0;
        let mut current = self.roster.session_count();
        while idx < current {
            let token = self.roster.session(idx).token;
            if ready.contains(&token) {
                if self.service_session(idx) {
                    // Session was removed; the entry that shifted into
                    // this position isn't revisited this pass.
                    current -= 1;
                    idx += 1;
                    continue;
                }
            }
            idx += 1;
        }

        Ok(())
    }

    fn accept_on(&mut self, listener_idx: usize) {
        let listener = &self.roster.listeners()[listener_idx];
        match listener::accept_one(listener) {
            Ok(Some(stream)) => {
                if self.roster.at_capacity() {
                    debug!(self.log, "rejecting connection: roster at capacity");
                    drop(stream);
                    return;
                }

                let (idx, token) = self.roster.insert(stream);
                self.poll
                    .register(
                        &self.roster.session(idx).stream,
                        token,
                        mio::Ready::readable(),
                        mio::PollOpt::level(),
                    )
                    .expect("failed to register accepted stream");

                info!(self.log, "client connected"; "index" => idx);

                let greeting = Message::build(
                    MessageType::new(message::SIG, 0, message::REG),
                    SERVER_NAME,
                    GREETING,
                );
                self.send_to(idx, &greeting);
            }
            Ok(None) => {}
            Err(err) => warn!(self.log, "accept failed"; "error" => %err),
        }
    }

    /// Services readiness on the session at `idx`. Returns `true` if the
    /// session was disconnected (and therefore removed from the
    /// roster), `false` if it's still live.
    fn service_session(&mut self, idx: usize) -> bool {
        let recv_result = {
            let stream = &mut self.roster.session_mut(idx).stream;
            framer::recv_message(stream)
        };

        match recv_result {
            Ok(Some(msg)) => {
                self.handle(idx, msg);
                false
            }
            Ok(None) => {
                self.disconnect(idx, "peer closed connection");
                true
            }
            Err(chatnet_protocol::ProtocolError::Wait) => false,
            Err(err) => {
                self.disconnect(idx, &err.to_string());
                true
            }
        }
    }

    fn disconnect(&mut self, idx: usize, reason: &str) {
        let name = self.roster.session(idx).name().to_vec();
        info!(self.log, "client disconnected"; "index" => idx, "reason" => reason);

        self.broadcast_exclude(
            MessageType::new(message::SIG, 0, message::DIS),
            &name,
            &[],
            &[idx],
        );

        let session = self.roster.remove(idx);
        let _ = self.poll.deregister(&session.stream);
    }

    /// Dispatches a validated `REQ` by sub-kind. Anti-spoofing and
    /// sanitization have already been applied by `handle`'s caller
    /// below `recv_message`.
    fn handle(&mut self, idx: usize, msg: Message) {
        if !msg.kind.is_request() {
            return; // clients only ever send REQ; anything else is dropped
        }
        if msg.name_str() != self.roster.session(idx).name() {
            // anti-spoofing: the name field must match what the server
            // has on record for this index, except during REQ·CON
            // (handled inside handle_connect, which doesn't go through
            // this check on the inbound name).
            if msg.kind.sub() != message::CON {
                return;
            }
        }

        match msg.kind.sub() {
            message::REG => self.handle_regular(idx, msg),
            message::PRV => self.handle_private(idx, msg),
            message::CON => self.handle_connect(idx, msg),
            message::NIC => self.handle_nickname(idx, msg),
            _ => {}
        }
    }

    fn handle_regular(&mut self, idx: usize, mut msg: Message) {
        let len = codec::sanitize(&mut msg.payload, msg.payload_len);
        if len == 0 {
            return;
        }
        let name = self.roster.session(idx).name().to_vec();
        self.broadcast_exclude(
            MessageType::new(message::SIG, 0, message::REG),
            &name,
            &msg.payload[..len],
            &[idx],
        );
    }

    fn handle_private(&mut self, idx: usize, mut msg: Message) {
        let len = codec::sanitize(&mut msg.payload, msg.payload_len);
        if len == 0 {
            return;
        }

        let parsed = codec::split_target_and_text(&msg.payload, len)
            .map(|(target, text)| (target.to_vec(), text.to_vec()));

        let sender_name = self.roster.session(idx).name().to_vec();

        if let Some((target, text)) = parsed {
            if let Some(target_idx) = self.roster.find_by_name(&target) {
                if target_idx != idx {
                    let signal = Message::build(
                        MessageType::new(message::SIG, 0, message::PRV),
                        &sender_name,
                        &text,
                    );
                    if self.send_to(target_idx, &signal) {
                        let target_name = self.roster.session(target_idx).name().to_vec();
                        let response = Message::build(
                            MessageType::new(message::RES, message::SUCCESS, message::PRV),
                            &target_name,
                            &text,
                        );
                        self.send_to(idx, &response);
                        return;
                    }
                }
            }
            self.send_failure_prv(idx, &sender_name, &target);
            return;
        }
        self.send_failure_prv(idx, &sender_name, b"");
    }

    fn send_failure_prv(&mut self, idx: usize, sender_name: &[u8], attempted_target: &[u8]) {
        let response = Message::build(
            MessageType::new(message::RES, message::FAILURE, message::PRV),
            sender_name,
            attempted_target,
        );
        self.send_to(idx, &response);
    }

    fn handle_connect(&mut self, idx: usize, msg: Message) {
        let name = msg.name_str().to_vec();
        self.roster.session_mut(idx).set_name(&name);

        self.broadcast_exclude(
            MessageType::new(message::SIG, 0, message::CON),
            &name,
            &[],
            &[idx],
        );

        // The joiner learns the entire current roster, including
        // itself, in index order, seeding its local roster listbox.
        for j in 0..self.roster.session_count() {
            let known_name = self.roster.session(j).name().to_vec();
            let sig = Message::build(
                MessageType::new(message::SIG, 0, message::CON),
                &known_name,
                &[],
            );
            self.send_to(idx, &sig);
        }
    }

    fn handle_nickname(&mut self, idx: usize, mut msg: Message) {
        let len = codec::sanitize(&mut msg.payload, msg.payload_len);
        let new_name = if len == 0 {
            None
        } else {
            codec::read_new_name(&msg.payload, len).map(|n| n.to_vec())
        };

        let current_name = self.roster.session(idx).name().to_vec();

        match new_name {
            Some(new_name) => {
                let response = Message::build(
                    MessageType::new(message::RES, message::SUCCESS, message::NIC),
                    &current_name,
                    &new_name,
                );
                self.send_to(idx, &response);

                self.broadcast_exclude(
                    MessageType::new(message::SIG, 0, message::NIC),
                    &current_name,
                    &new_name,
                    &[],
                );

                self.roster.session_mut(idx).set_name(&new_name);
            }
            None => {
                let response = Message::build(
                    MessageType::new(message::RES, message::FAILURE, message::NIC),
                    &current_name,
                    &[],
                );
                self.send_to(idx, &response);
            }
        }
    }

    /// Sends to every session except the (ascending-order) indices in
    /// `excludes`.
    fn broadcast_exclude(&mut self, kind: MessageType, name: &[u8], payload: &[u8], excludes: &[usize]) {
        let msg_template = Message::build(kind, name, payload);
        let mut exclude_iter = excludes.iter().peekable();

        for i in 0..self.roster.session_count() {
            if exclude_iter.peek() == Some(&&i) {
                exclude_iter.next();
                continue;
            }
            // A recipient that dropped mid-broadcast gets reaped on its
            // own readiness pass, not here.
            let _ = framer::send_message(&mut self.roster.session_mut(i).stream, &msg_template);
        }
    }

    /// Sends one message to session `idx`, ignoring the specific
    /// failure but reporting whether it succeeded (used by `PRV`
    /// routing, which needs to know before echoing a success response).
    fn send_to(&mut self, idx: usize, msg: &Message) -> bool {
        framer::send_message(&mut self.roster.session_mut(idx).stream, msg).is_ok()
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        debug!(self.log, "server shutting down");
    }
}
