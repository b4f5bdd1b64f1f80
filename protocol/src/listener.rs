//! Listener factory and connection acceptor. Resolves a service port
//! into one non-blocking, address/port-reusable listener per address
//! family, in resolution order, skipping endpoints that fail any step.
//!
//! Each listener is built with `socket2` so `SO_REUSEADDR`/
//! `SO_REUSEPORT` can be set before bind, then handed to
//! `mio::net::TcpListener::from_std` for the actual event-loop
//! registration.

use crate::error::{ProtocolError, ProtocolResult};
use socket2::{Domain, Socket, Type};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

const BACKLOG: i32 = 128;

/// Binds one non-blocking, passively-bound stream socket per candidate
/// address family (IPv4 then IPv6), with address and port reuse
/// enabled. Endpoints that fail any step (socket creation, option
/// setting, bind, listen) are skipped; only if *none* bound is this an
/// error.
pub fn bind_listeners(port: u16) -> ProtocolResult<Vec<mio::net::TcpListener>> {
    let candidates = [
        SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), port),
        SocketAddr::new(Ipv6Addr::UNSPECIFIED.into(), port),
    ];

    let mut bound = Vec::new();
    for addr in &candidates {
        if let Some(listener) = try_bind(*addr) {
            bound.push(listener);
        }
    }

    if bound.is_empty() {
        return Err(ProtocolError::NoListenerBound(port.to_string()));
    }
    Ok(bound)
}

fn try_bind(addr: SocketAddr) -> Option<mio::net::TcpListener> {
    let domain = if addr.is_ipv4() { Domain::IPV4 } else { Domain::IPV6 };
    let socket = Socket::new(domain, Type::STREAM, None).ok()?;

    socket.set_reuse_address(true).ok()?;
    #[cfg(unix)]
    socket.set_reuse_port(true).ok()?;

    socket.set_nonblocking(true).ok()?;
    socket.bind(&addr.into()).ok()?;
    socket.listen(BACKLOG).ok()?;

    mio::net::TcpListener::from_std(socket.into()).ok()
}

/// Accepts one pending connection on `listener`. Returns `Ok(None)` when
/// there is nothing to accept right now (`WouldBlock`), never an error -
/// that's the routine "no connection waiting" case, not a failure.
/// `mio`'s accepted stream is already non-blocking.
pub fn accept_one(listener: &mio::net::TcpListener) -> ProtocolResult<Option<mio::net::TcpStream>> {
    match listener.accept() {
        Ok((stream, _addr)) => Ok(Some(stream)),
        Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
        Err(err) => Err(ProtocolError::from_io(err)),
    }
}
