//! Byte transports underneath a session.
//!
//! A transport is a connected byte stream split into a read half and a write half so the session
//! actor can read and write concurrently. Plain and secure transports implement the same
//! capability traits:
//!
//! - [`Transport`]: peer address and the split into halves
//! - [`TransportRead`]: read into the session's receive buffer, `Ok(0)` on orderly close
//! - [`TransportWrite`]: write a prefix of a buffer, shut the write side down
//!
//! Implementations:
//!
//! - [`StreamTransport`] over any tokio stream, [`TcpTransport`] for TCP
//! - [`SecureTransport`] layering a [`TlsEngine`] over a stream
//!
//! Outbound data waits in a [`SendQueue`] owned by the session until the actor writes it.
//!
//! Reads and writes must be cancel-safe: the session actor races them against each other and
//! against disconnect requests, dropping whichever future lost.

mod send_queue;
mod stream_transport;

pub mod secure;

pub use secure::{HandshakeState, HandshakeStatus, SecureReader, SecureTransport, SecureWriter, TlsEngine, TlsError};
pub use send_queue::{SendQueue, SendStatus};
pub use stream_transport::{StreamReader, StreamTransport, StreamWriter, TcpTransport};

use std::net::SocketAddr;

use bytes::BytesMut;

use crate::NetError;

/// The read half of a transport.
#[trait_variant::make(TransportRead: Send)]
pub trait LocalTransportRead {
    /// Appends received bytes to `dst` and returns how many were added.
    ///
    /// `Ok(0)` means the peer closed the connection in an orderly way.
    async fn read_into(&mut self, dst: &mut BytesMut) -> Result<usize, NetError>;
}

/// The write half of a transport.
#[trait_variant::make(TransportWrite: Send)]
pub trait LocalTransportWrite {
    /// Writes a prefix of `src` and returns its length, which is never zero on success.
    async fn write_some(&mut self, src: &[u8]) -> Result<usize, NetError>;

    /// Flushes and shuts down the write side.
    async fn shutdown(&mut self) -> Result<(), NetError>;
}

/// A connected transport that can be handed to a session.
pub trait Transport: Send + 'static {
    type Reader: TransportRead + 'static;
    type Writer: TransportWrite + 'static;

    fn peer_addr(&self) -> Option<SocketAddr>;

    fn into_split(self) -> (Self::Reader, Self::Writer);
}
