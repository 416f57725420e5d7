use std::fmt;
use std::net::SocketAddr;

use tokio::net::TcpStream;

use crate::NetError;
use crate::transport::{SecureTransport, TcpTransport, TlsEngine, Transport};

/// Turns an accepted TCP stream into a session transport.
///
/// Runs inside the new session while it is `Connecting`, so a slow handshake never blocks the
/// accept loop.
#[trait_variant::make(Acceptor: Send)]
pub trait LocalAcceptor {
    type Transport: Transport;

    async fn accept(&self, stream: TcpStream, peer_addr: SocketAddr) -> Result<Self::Transport, NetError>;
}

/// Plain TCP sessions.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainAcceptor;

impl Acceptor for PlainAcceptor {
    type Transport = TcpTransport;

    async fn accept(&self, stream: TcpStream, _peer_addr: SocketAddr) -> Result<Self::Transport, NetError> {
        TcpTransport::from_tcp(stream)
    }
}

/// TLS sessions, with a fresh engine from `new_engine` for every connection.
pub struct TlsAcceptor<F> {
    new_engine: F,
}

impl<F> fmt::Debug for TlsAcceptor<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsAcceptor").finish_non_exhaustive()
    }
}

impl<F> TlsAcceptor<F> {
    pub fn new(new_engine: F) -> Self {
        Self { new_engine }
    }
}

impl<F, E> Acceptor for TlsAcceptor<F>
where
    F: Fn() -> E + Send + Sync,
    E: TlsEngine,
{
    type Transport = SecureTransport<TcpStream, E>;

    async fn accept(&self, stream: TcpStream, peer_addr: SocketAddr) -> Result<Self::Transport, NetError> {
        stream.set_nodelay(true)?;
        let mut transport = SecureTransport::new(stream, (self.new_engine)()).with_peer_addr(peer_addr);
        transport.handshake().await?;
        Ok(transport)
    }
}
