use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::LinkStream;

/// TCP transport for Space Packet links.
///
/// Provides bind/accept/connect. Accepted and connected streams have
/// Nagle's algorithm disabled; packets are written whole and small
/// telecommands should not wait for coalescing.
#[derive(Debug)]
pub struct TcpLink {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl TcpLink {
    /// Bind and listen on `addr`. Port 0 picks a free port.
    pub fn bind(addr: impl ToSocketAddrs + std::fmt::Display) -> Result<Self> {
        let resolved = resolve(&addr)?;
        let listener = TcpListener::bind(resolved).map_err(|e| TransportError::bind(resolved, e))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| TransportError::bind(resolved, e))?;

        info!(%local_addr, "listening on tcp");

        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<LinkStream> {
        let (stream, peer) = self.listener.accept().map_err(TransportError::Accept)?;
        stream.set_nodelay(true)?;
        debug!(%peer, "accepted connection");
        Ok(stream.into())
    }

    /// Connect to a listening peer (blocking).
    pub fn connect(addr: impl ToSocketAddrs + std::fmt::Display) -> Result<LinkStream> {
        let resolved = resolve(&addr)?;
        let stream = TcpStream::connect(resolved).map_err(|e| TransportError::Connect {
            addr: addr.to_string(),
            source: e,
        })?;
        stream.set_nodelay(true)?;
        debug!(%resolved, "connected over tcp");
        Ok(stream.into())
    }

    /// The address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        "tcp"
    }
}

fn resolve(addr: &(impl ToSocketAddrs + std::fmt::Display)) -> Result<SocketAddr> {
    addr.to_socket_addrs()
        .map_err(|e| TransportError::Connect {
            addr: addr.to_string(),
            source: e,
        })?
        .next()
        .ok_or_else(|| TransportError::Unresolved(addr.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    #[test]
    fn test_bind_accept_connect() {
        let listener = TcpLink::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr();
        assert_ne!(addr.port(), 0);

        let handle = std::thread::spawn(move || {
            let mut client = TcpLink::connect(addr).unwrap();
            client.write_all(b"hello").unwrap();
        });

        let mut server = listener.accept().unwrap();
        let mut buf = [0u8; 5];
        server.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello");

        handle.join().unwrap();
    }

    #[test]
    fn test_connect_refused() {
        let listener = TcpLink::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr();
        drop(listener);

        let result = TcpLink::connect(addr);
        assert!(matches!(result, Err(TransportError::Connect { .. })));
    }

    #[test]
    fn test_bind_conflict() {
        let first = TcpLink::bind("127.0.0.1:0").unwrap();
        let result = TcpLink::bind(first.local_addr());
        assert!(matches!(result, Err(TransportError::Bind { .. })));
    }

    #[test]
    fn test_unresolvable_address() {
        let result = TcpLink::connect("not an address");
        assert!(matches!(result, Err(TransportError::Connect { .. })));
    }

    #[test]
    fn test_stream_labels() {
        let listener = TcpLink::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr();
        let client = TcpLink::connect(addr).unwrap();
        let server = listener.accept().unwrap();
        assert_eq!(client.peer_label(), addr.to_string());
        assert_eq!(server.local_label(), addr.to_string());
    }
}
