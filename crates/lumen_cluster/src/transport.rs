//! # Transport Layer
//!
//! Minimal TCP wrapper for the cluster event stream.
//!
//! ## Design
//!
//! - Non-blocking listener, polled once per frame for new node admissions
//! - Blocking connections for the event stream itself: TCP's in-order
//!   delivery is what gives each node the root's exact emission order
//! - `TCP_NODELAY` everywhere - events are tiny and latency-critical
//! - Per-connection traffic counters

use std::io::{self, Read};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::time::Duration;

use lumen_protocol::{
    decode, wire, Event, EventEncoder, ProtocolError, WireError, DATAMAX, FRAME_MAX, HEADER_SIZE,
};

use crate::error::ClusterError;

/// Non-blocking listening socket for node (and script) admissions.
pub struct Listener {
    inner: TcpListener,
}

impl Listener {
    /// Opens a listener on the given port on all interfaces.
    ///
    /// Pass port 0 to let the OS choose; see [`Listener::local_port`].
    pub fn bind(port: u16) -> Result<Self, ClusterError> {
        let inner = TcpListener::bind(("0.0.0.0", port))
            .and_then(|listener| listener.set_nonblocking(true).map(|()| listener))
            .map_err(|source| ClusterError::Bind { port, source })?;
        Ok(Self { inner })
    }

    /// Returns the port this listener is bound to.
    #[must_use]
    pub fn local_port(&self) -> u16 {
        self.inner
            .local_addr()
            .map(|addr| addr.port())
            .unwrap_or_default()
    }

    /// Accepts one pending connection, if any.
    ///
    /// Never blocks; returns `Ok(None)` when no connection is waiting.
    pub fn poll_accept(&self) -> Result<Option<Connection>, ClusterError> {
        match self.inner.accept() {
            Ok((stream, peer)) => Ok(Some(Connection::from_stream(stream, peer)?)),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(ClusterError::Io(e)),
        }
    }
}

/// Per-connection traffic statistics.
#[derive(Clone, Copy, Debug, Default)]
pub struct LinkStats {
    /// Events sent on this connection.
    pub events_sent: u64,
    /// Events received on this connection.
    pub events_received: u64,
    /// Bytes sent on this connection.
    pub bytes_sent: u64,
    /// Bytes received on this connection.
    pub bytes_received: u64,
}

/// One established cluster connection carrying framed events.
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
    encoder: EventEncoder,
    stats: LinkStats,
}

impl Connection {
    /// Connects to an upstream root.
    ///
    /// Fails with [`ClusterError::Resolve`] if the host yields no address
    /// and [`ClusterError::Connect`] on refusal or timeout. Both are fatal
    /// to process startup.
    pub fn open(host: &str, port: u16) -> Result<Self, ClusterError> {
        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(|_| ClusterError::Resolve { host: host.into() })?
            .collect();
        if addrs.is_empty() {
            return Err(ClusterError::Resolve { host: host.into() });
        }

        let mut last_error = None;
        for addr in &addrs {
            match TcpStream::connect(addr) {
                Ok(stream) => return Self::from_stream(stream, *addr),
                Err(e) => last_error = Some(e),
            }
        }
        Err(ClusterError::Connect {
            addr: format!("{host}:{port}"),
            source: last_error
                .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "no address attempted")),
        })
    }

    fn from_stream(stream: TcpStream, peer: SocketAddr) -> Result<Self, ClusterError> {
        // Accepted sockets may inherit non-blocking mode from the listener.
        stream.set_nonblocking(false)?;
        stream.set_nodelay(true)?;
        Ok(Self {
            stream,
            peer,
            encoder: EventEncoder::new(),
            stats: LinkStats::default(),
        })
    }

    /// Returns the peer address.
    #[inline]
    #[must_use]
    pub const fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Returns traffic statistics.
    #[inline]
    #[must_use]
    pub const fn stats(&self) -> &LinkStats {
        &self.stats
    }

    /// Bounds how long [`Connection::recv`] may block, `None` for forever.
    pub fn set_recv_timeout(&self, timeout: Option<Duration>) -> Result<(), ClusterError> {
        self.stream.set_read_timeout(timeout)?;
        Ok(())
    }

    /// Switches the connection into polled mode for [`Connection::try_recv`].
    pub fn set_nonblocking(&self, nonblocking: bool) -> Result<(), ClusterError> {
        self.stream.set_nonblocking(nonblocking)?;
        Ok(())
    }

    /// Sends one event, blocking until it is written.
    pub fn send(&mut self, event: &Event) -> Result<(), ClusterError> {
        let frame = self.encoder.encode(event)?;
        io::Write::write_all(&mut self.stream, frame).map_err(WireError::Io)?;
        self.stats.events_sent += 1;
        self.stats.bytes_sent += frame.len() as u64;
        Ok(())
    }

    /// Receives one event, blocking until it is complete.
    pub fn recv(&mut self) -> Result<Event, ClusterError> {
        let event = wire::read_event(&mut self.stream)?;
        self.stats.events_received += 1;
        self.stats.bytes_received += event.encoded_len() as u64;
        Ok(event)
    }

    /// Receives one event if a complete frame is already buffered.
    ///
    /// Requires the connection to be in non-blocking mode. A frame is only
    /// consumed once all of its bytes have arrived, so a partial frame is
    /// never lost. Returns `Ok(None)` when no complete frame is waiting.
    pub fn try_recv(&mut self) -> Result<Option<Event>, ClusterError> {
        let mut header = [0u8; HEADER_SIZE];
        let peeked = match self.stream.peek(&mut header) {
            Ok(0) => {
                return Err(WireError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed",
                ))
                .into())
            }
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(None),
            Err(e) => return Err(WireError::Io(e).into()),
        };
        if peeked < HEADER_SIZE {
            return Ok(None);
        }

        let payload_len = header[1] as usize;
        if payload_len > DATAMAX {
            return Err(ProtocolError::LengthOutOfBounds(payload_len).into());
        }
        let frame_len = HEADER_SIZE + payload_len;

        let mut frame = [0u8; FRAME_MAX];
        let buffered = match self.stream.peek(&mut frame[..frame_len]) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(None),
            Err(e) => return Err(WireError::Io(e).into()),
        };
        if buffered < frame_len {
            return Ok(None);
        }

        // The whole frame is in the socket buffer; this cannot block.
        self.stream
            .read_exact(&mut frame[..frame_len])
            .map_err(WireError::Io)?;
        self.stats.events_received += 1;
        self.stats.bytes_received += frame_len as u64;
        Ok(Some(decode(&frame[..frame_len])?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback_pair() -> (Connection, Connection) {
        let listener = Listener::bind(0).unwrap();
        let port = listener.local_port();
        let client = Connection::open("127.0.0.1", port).unwrap();
        let server = loop {
            if let Some(conn) = listener.poll_accept().unwrap() {
                break conn;
            }
        };
        (client, server)
    }

    #[test]
    fn test_poll_accept_is_non_blocking() {
        let listener = Listener::bind(0).unwrap();
        assert!(listener.poll_accept().unwrap().is_none());
    }

    #[test]
    fn test_resolve_failure() {
        let err = Connection::open("no-such-host.invalid", 2847).unwrap_err();
        assert!(matches!(err, ClusterError::Resolve { .. }));
    }

    #[test]
    fn test_send_recv_round_trip() {
        let (mut client, mut server) = loopback_pair();

        client.send(&Event::tick(0.0166)).unwrap();
        client.send(&Event::Draw).unwrap();

        assert_eq!(server.recv().unwrap(), Event::tick(0.0166));
        assert_eq!(server.recv().unwrap(), Event::Draw);

        assert_eq!(client.stats().events_sent, 2);
        assert_eq!(server.stats().events_received, 2);
        assert_eq!(client.stats().bytes_sent, server.stats().bytes_received);
    }

    #[test]
    fn test_try_recv_polls_without_blocking() {
        let (mut client, mut server) = loopback_pair();
        server.set_nonblocking(true).unwrap();

        assert!(server.try_recv().unwrap().is_none());

        client.send(&Event::user(42)).unwrap();
        let event = loop {
            if let Some(event) = server.try_recv().unwrap() {
                break event;
            }
        };
        assert_eq!(event, Event::user(42));
    }

    #[test]
    fn test_recv_on_closed_connection_fails() {
        let (client, mut server) = loopback_pair();
        drop(client);
        assert!(matches!(
            server.recv().unwrap_err(),
            ClusterError::Transport(WireError::Io(_))
        ));
    }

    #[test]
    fn test_recv_timeout_bounds_the_wait() {
        let (_client, mut server) = loopback_pair();
        server
            .set_recv_timeout(Some(Duration::from_millis(50)))
            .unwrap();
        assert!(server.recv().is_err());
    }
}
