//! End-to-end tests driving `Server` over real loopback TCP sockets,
//! covering the literal scenarios in spec.md §8 (S1-S5). Sanitization
//! (S6) and the wire round-trip/idempotence properties are covered by
//! `chatnet-protocol`'s own unit tests instead, since those don't need
//! a running server.

use chatnet_protocol::framer;
use chatnet_protocol::message::{self, Message, MessageType};
use chatnet_server::roster::MAX_CLIENTS;
use chatnet_server::Server;
use chatnet_support::logging;
use std::net::TcpStream;
use std::time::Duration;

/// Spins up a server on an OS-assigned port and drives its event loop
/// on a background thread for the lifetime of the test process. Tests
/// never join the thread - it dies with the test binary.
fn spawn_server() -> std::net::SocketAddr {
    let mut server = Server::bind(0, MAX_CLIENTS, logging::discard()).expect("failed to bind server");
    let addr = server.local_addr().expect("failed to read bound address");

    std::thread::spawn(move || loop {
        server.step(Some(Duration::from_millis(20))).expect("server event loop I/O failure");
    });

    addr
}

fn connect(addr: std::net::SocketAddr) -> TcpStream {
    let stream = TcpStream::connect(addr).expect("failed to connect to server");
    stream.set_nodelay(true).ok();
    stream
}

fn send(stream: &mut TcpStream, kind: MessageType, name: &[u8], payload: &[u8]) {
    let msg = Message::build(kind, name, payload);
    framer::send_message(stream, &msg).expect("failed to send message");
}

fn recv(stream: &mut TcpStream) -> Message {
    framer::recv_message(stream)
        .expect("failed to read message")
        .expect("peer closed connection unexpectedly")
}

fn connect_and_join(addr: std::net::SocketAddr, nick: &[u8]) -> TcpStream {
    let mut stream = connect(addr);
    let greeting = recv(&mut stream);
    assert_eq!(greeting.kind.sub(), message::REG);
    assert_eq!(greeting.name_str(), b"SERVER");

    send(&mut stream, MessageType::new(message::REQ, 0, message::CON), nick, b"");
    stream
}

#[test]
fn s1_single_chat_room_roster_and_broadcast() {
    let addr = spawn_server();

    let mut alice = connect_and_join(addr, b"alice");
    // alice is alone: her own REQ·CON roster reflection is one SIG·CON for herself.
    let self_con = recv(&mut alice);
    assert_eq!(self_con.kind.sub(), message::CON);
    assert_eq!(self_con.name_str(), b"alice");

    let mut bob = connect_and_join(addr, b"bob");

    // alice observes bob joining.
    let bob_joined = recv(&mut alice);
    assert_eq!(bob_joined.kind.sub(), message::CON);
    assert_eq!(bob_joined.name_str(), b"bob");

    // bob's own roster reflection enumerates both currently-known clients.
    let roster_1 = recv(&mut bob);
    let roster_2 = recv(&mut bob);
    let mut names: Vec<Vec<u8>> = vec![roster_1.name_str().to_vec(), roster_2.name_str().to_vec()];
    names.sort();
    assert_eq!(names, vec![b"alice".to_vec(), b"bob".to_vec()]);

    send(&mut alice, MessageType::new(message::REQ, 0, message::REG), b"alice", b"world");
    let heard = recv(&mut bob);
    assert_eq!(heard.kind.sub(), message::REG);
    assert_eq!(heard.name_str(), b"alice");
    assert_eq!(heard.payload(), b"world");
}

#[test]
fn s2_nickname_change_broadcasts_to_everyone_including_self() {
    let addr = spawn_server();

    let mut alice = connect_and_join(addr, b"alice");
    let _self_con = recv(&mut alice);
    let mut bob = connect_and_join(addr, b"bob");
    let _bob_con_on_alice = recv(&mut alice);
    let _roster_1 = recv(&mut bob);
    let _roster_2 = recv(&mut bob);

    send(&mut alice, MessageType::new(message::REQ, 0, message::NIC), b"alice", b"alice2");

    let ack = recv(&mut alice);
    assert_eq!(ack.kind.sub(), message::NIC);
    assert_eq!(ack.kind.status(), message::SUCCESS);
    assert_eq!(ack.payload(), b"alice2");

    let sig_to_alice = recv(&mut alice);
    assert_eq!(sig_to_alice.kind.sub(), message::NIC);
    assert_eq!(sig_to_alice.name_str(), b"alice");
    assert_eq!(sig_to_alice.payload(), b"alice2");

    let sig_to_bob = recv(&mut bob);
    assert_eq!(sig_to_bob.kind.sub(), message::NIC);
    assert_eq!(sig_to_bob.name_str(), b"alice");
    assert_eq!(sig_to_bob.payload(), b"alice2");

    // the renamed connection's next REG is attributed to the new name.
    send(&mut alice, MessageType::new(message::REQ, 0, message::REG), b"alice2", b"hi");
    let heard = recv(&mut bob);
    assert_eq!(heard.name_str(), b"alice2");
    assert_eq!(heard.payload(), b"hi");
}

#[test]
fn s3_private_message_delivery() {
    let addr = spawn_server();

    let mut alice = connect_and_join(addr, b"alice");
    let _self_con = recv(&mut alice);
    let mut bob = connect_and_join(addr, b"bob");
    let _bob_con_on_alice = recv(&mut alice);
    let _roster_1 = recv(&mut bob);
    let _roster_2 = recv(&mut bob);

    send(&mut alice, MessageType::new(message::REQ, 0, message::PRV), b"alice", b"bob hi there");

    let delivered = recv(&mut bob);
    assert_eq!(delivered.kind.sub(), message::PRV);
    assert_eq!(delivered.name_str(), b"alice");
    assert_eq!(delivered.payload(), b"hi there");

    let ack = recv(&mut alice);
    assert_eq!(ack.kind.sub(), message::PRV);
    assert_eq!(ack.kind.status(), message::SUCCESS);
    assert_eq!(ack.name_str(), b"bob");
    assert_eq!(ack.payload(), b"hi there");
}

#[test]
fn s4_private_message_to_absent_target_fails_without_side_effects() {
    let addr = spawn_server();

    let mut alice = connect_and_join(addr, b"alice");
    let _self_con = recv(&mut alice);

    send(&mut alice, MessageType::new(message::REQ, 0, message::PRV), b"alice", b"charlie ping");

    let failure = recv(&mut alice);
    assert_eq!(failure.kind.sub(), message::PRV);
    assert_eq!(failure.kind.status(), message::FAILURE);
    assert_eq!(failure.payload(), b"charlie");
}

#[test]
fn s5_disconnect_fans_out_and_does_not_break_concurrent_broadcast() {
    let addr = spawn_server();

    let mut alice = connect_and_join(addr, b"alice");
    let _self_con = recv(&mut alice);
    let mut bob = connect_and_join(addr, b"bob");
    let _bob_con_on_alice = recv(&mut alice);
    let _roster_1 = recv(&mut bob);
    let _roster_2 = recv(&mut bob);
    let mut carol = connect_and_join(addr, b"carol");
    let _carol_con_on_alice = recv(&mut alice);
    let _carol_con_on_bob = recv(&mut bob);
    let _roster_1c = recv(&mut carol);
    let _roster_2c = recv(&mut carol);
    let _roster_3c = recv(&mut carol);

    drop(bob);

    send(&mut alice, MessageType::new(message::REQ, 0, message::REG), b"alice", b"hi");
    let heard = recv(&mut carol);
    assert_eq!(heard.kind.sub(), message::REG);
    assert_eq!(heard.name_str(), b"alice");
    assert_eq!(heard.payload(), b"hi");

    let alice_sees_dis = recv(&mut alice);
    assert_eq!(alice_sees_dis.kind.sub(), message::DIS);
    assert_eq!(alice_sees_dis.name_str(), b"bob");

    let carol_sees_dis = recv(&mut carol);
    assert_eq!(carol_sees_dis.kind.sub(), message::DIS);
    assert_eq!(carol_sees_dis.name_str(), b"bob");
}

#[test]
fn connection_capacity_rejects_accepts_past_the_limit() {
    let addr = spawn_server();
    let mut streams = Vec::with_capacity(MAX_CLIENTS);
    for i in 0..MAX_CLIENTS {
        streams.push(connect_and_join(addr, format!("client{}", i).as_bytes()));
    }

    // give the server a couple of poll passes to actually register the
    // last accept before probing capacity.
    std::thread::sleep(Duration::from_millis(100));

    let mut rejected = connect(addr);
    // the server closes the socket outright rather than replying, so
    // the read side should observe a clean EOF.
    let result = framer::recv_message(&mut rejected).expect("read must not error");
    assert!(result.is_none(), "connection past MAX_CLIENTS should be closed by the server");
}
