use std::io;
use std::net::SocketAddr;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::{debug, trace};

use crate::NetError;
use crate::transport::{Transport, TransportRead, TransportWrite};

/// A plain transport over any tokio byte stream.
#[derive(Debug)]
pub struct StreamTransport<S> {
    stream: S,
    peer_addr: Option<SocketAddr>,
}

/// A plain TCP transport.
pub type TcpTransport = StreamTransport<TcpStream>;

impl<S> StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    pub fn new(stream: S) -> Self {
        Self { stream, peer_addr: None }
    }

    pub fn with_peer_addr(mut self, peer_addr: SocketAddr) -> Self {
        self.peer_addr = Some(peer_addr);
        self
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl StreamTransport<TcpStream> {
    /// Connects to `addr` with `TCP_NODELAY` set.
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, NetError> {
        let stream = TcpStream::connect(addr).await?;
        let transport = Self::from_tcp(stream)?;
        debug!(peer_addr = ?transport.peer_addr, "tcp connected");
        Ok(transport)
    }

    /// Wraps an accepted or connected TCP stream.
    pub fn from_tcp(stream: TcpStream) -> Result<Self, NetError> {
        stream.set_nodelay(true)?;
        let peer_addr = stream.peer_addr().ok();
        Ok(Self { stream, peer_addr })
    }
}

impl<S> Transport for StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    type Reader = StreamReader<S>;
    type Writer = StreamWriter<S>;

    fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    fn into_split(self) -> (Self::Reader, Self::Writer) {
        let (reader, writer) = tokio::io::split(self.stream);
        (StreamReader { inner: reader }, StreamWriter { inner: writer })
    }
}

#[derive(Debug)]
pub struct StreamReader<S> {
    inner: ReadHalf<S>,
}

#[derive(Debug)]
pub struct StreamWriter<S> {
    inner: WriteHalf<S>,
}

impl<S> TransportRead for StreamReader<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    async fn read_into(&mut self, dst: &mut BytesMut) -> Result<usize, NetError> {
        let n = self.inner.read_buf(dst).await?;
        trace!(read = n, "read from stream");
        Ok(n)
    }
}

impl<S> TransportWrite for StreamWriter<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    async fn write_some(&mut self, src: &[u8]) -> Result<usize, NetError> {
        let n = self.inner.write(src).await?;
        if n == 0 && !src.is_empty() {
            return Err(NetError::io(io::Error::from(io::ErrorKind::WriteZero)));
        }
        trace!(written = n, "wrote to stream");
        Ok(n)
    }

    async fn shutdown(&mut self) -> Result<(), NetError> {
        self.inner.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn split_halves_move_bytes() {
        let (local, mut remote) = tokio::io::duplex(64);
        let (mut reader, mut writer) = StreamTransport::new(local).into_split();

        assert_eq!(writer.write_some(b"ping").await.unwrap(), 4);
        let mut buf = [0u8; 4];
        remote.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");

        remote.write_all(b"pong").await.unwrap();
        let mut dst = BytesMut::with_capacity(16);
        assert_eq!(reader.read_into(&mut dst).await.unwrap(), 4);
        assert_eq!(&dst[..], b"pong");

        drop(remote);
        assert_eq!(reader.read_into(&mut dst).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn tcp_connect_sets_peer_addr() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (connected, accepted) = tokio::join!(TcpTransport::connect(addr), listener.accept());
        let transport = connected.unwrap();
        assert_eq!(transport.peer_addr(), Some(addr));
        assert!(transport.get_ref().nodelay().unwrap());
        drop(accepted.unwrap());
    }

    #[tokio::test]
    async fn connect_refused_is_io_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let error = TcpTransport::connect(addr).await.unwrap_err();
        assert_eq!(error.kind(), crate::ErrorKind::IoError);
    }
}
