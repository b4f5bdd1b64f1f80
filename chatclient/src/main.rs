//! Thin demonstration binary over `chatnet_client::driver`: connects,
//! multiplexes stdin and the server socket with the same readiness
//! primitive the server uses, and prints chat/roster events to stdout.
//! No TUI - that's the external collaborator's job per spec.md §1; this
//! just proves the driver works end to end over a real socket.

use chatnet_client::{RosterSink, Session};
use chatnet_protocol::framer;
use chatnet_support::{logging, time};
use clap::{App, Arg};
use mio::unix::EventedFd;
use mio::{Events, Poll, PollOpt, Ready, Token};
use std::io::{self, BufRead, Write};
use std::net::TcpStream;

const STDIN_TOKEN: Token = Token(0);
const SOCKET_TOKEN: Token = Token(1);

/// Prints roster/chat events straight to stdout, in the shape the
/// original terminal client rendered them in its chat pad and client
/// list (see spec.md §4.6 and `examples/original_source/client.c`).
struct ConsoleSink;

impl RosterSink for ConsoleSink {
    fn on_chat_line(&mut self, time: &str, from: &[u8], text: &[u8]) {
        println!("[{}] {}: {}", time, String::from_utf8_lossy(from), String::from_utf8_lossy(text));
    }

    fn on_private(&mut self, time: &str, from: &[u8], text: &[u8]) {
        println!("[{}] (private) {}: {}", time, String::from_utf8_lossy(from), String::from_utf8_lossy(text));
    }

    fn on_join(&mut self, name: &[u8]) {
        println!("* {} joined", String::from_utf8_lossy(name));
    }

    fn on_part(&mut self, name: &[u8]) {
        println!("* {} left", String::from_utf8_lossy(name));
    }

    fn on_rename(&mut self, old: &[u8], new: &[u8]) {
        println!(
            "* {} is now known as {}",
            String::from_utf8_lossy(old),
            String::from_utf8_lossy(new)
        );
    }

    fn on_nick_result(&mut self, success: bool, name_or_rejected: &[u8]) {
        if success {
            println!("* nick changed to {}", String::from_utf8_lossy(name_or_rejected));
        } else {
            println!("! nick change rejected");
        }
    }

    fn on_private_result(&mut self, success: bool, from: &[u8], body: &[u8]) {
        if success {
            println!("* sent to {}: {}", String::from_utf8_lossy(from), String::from_utf8_lossy(body));
        } else {
            println!("! no such user: {}", String::from_utf8_lossy(from));
        }
    }
}

fn main() {
    let matches = App::new("Chat Client")
        .version("1.0")
        .about("Connects to a chatnet-server and drives the session over stdin.")
        .arg(Arg::with_name("ADDRESS").long("address").takes_value(true).default_value("127.0.0.1"))
        .arg(Arg::with_name("PORT").long("port").takes_value(true).default_value("8080"))
        .arg(Arg::with_name("NICK").long("nick").takes_value(true).default_value("CLIENT"))
        .get_matches();

    let log = logging::init(false);
    let address = matches.value_of("ADDRESS").unwrap();
    let port = matches.value_of("PORT").unwrap();
    let nick = matches.value_of("NICK").unwrap();

    let std_stream = TcpStream::connect((address, port.parse::<u16>().expect("PORT must be a valid u16")))
        .expect("failed to connect to server");
    std_stream.set_nonblocking(true).expect("failed to set socket non-blocking");
    let mut stream = mio::net::TcpStream::from_stream(std_stream).expect("failed to wrap connected stream");

    let mut session = Session::new(nick.as_bytes());
    framer::send_message(&mut stream, &session.connect_request()).expect("failed to send initial connect request");

    let poll = Poll::new().expect("failed to create poll instance");
    poll.register(&stream, SOCKET_TOKEN, Ready::readable(), PollOpt::level())
        .expect("failed to register socket");
    poll.register(&EventedFd(&0), STDIN_TOKEN, Ready::readable(), PollOpt::level())
        .expect("failed to register stdin");

    let mut events = Events::with_capacity(128);
    let mut sink = ConsoleSink;
    let stdin = io::stdin();

    logging::info!(log, "connected"; "address" => address, "port" => port);

    loop {
        poll.poll(&mut events, None).expect("poll failed");

        for event in events.iter() {
            match event.token() {
                STDIN_TOKEN => {
                    let mut line = String::new();
                    if stdin.lock().read_line(&mut line).unwrap_or(0) == 0 {
                        return; // stdin closed
                    }
                    let line = line.trim_end();
                    if line.is_empty() {
                        continue;
                    }
                    let intent = chatnet_client::driver::parse_line(line.as_bytes());
                    let msg = session.to_message(&intent);
                    if framer::send_message(&mut stream, &msg).is_err() {
                        logging::error!(log, "server closed connection");
                        return;
                    }
                }
                SOCKET_TOKEN => loop {
                    match framer::recv_message(&mut stream) {
                        Ok(Some(msg)) => session.handle_inbound(&msg, &time::hour_minute(), &mut sink),
                        Ok(None) => {
                            logging::error!(log, "server closed connection");
                            return;
                        }
                        Err(chatnet_protocol::ProtocolError::Wait) => break,
                        Err(err) => {
                            logging::error!(log, "read failed"; "error" => %err);
                            return;
                        }
                    }
                },
                _ => unreachable!(),
            }
        }

        io::stdout().flush().ok();
    }
}
