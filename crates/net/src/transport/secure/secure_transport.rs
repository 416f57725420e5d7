use std::{fmt, io};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tracing::{debug, trace, warn};

use crate::transport::{HandshakeStatus, TlsEngine, TlsError, Transport, TransportRead, TransportWrite};
use crate::{NetError, ensure};

const READ_CAPACITY: usize = 16 * 1024;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HandshakeState {
    NotStarted,
    Handshaking,
    Established,
    /// Terminal, the underlying stream was shut down.
    Failed,
}

struct TlsSession<E> {
    engine: E,
    state: HandshakeState,
}

impl<E: TlsEngine> TlsSession<E> {
    fn fail(&mut self, e: TlsError) -> NetError {
        warn!(cause = %e, "tls session failed");
        self.state = HandshakeState::Failed;
        e.into()
    }

    fn encrypt(&mut self, plaintext: &[u8], output: &mut BytesMut) -> Result<(), NetError> {
        ensure!(self.state == HandshakeState::Established, NetError::invalid_handle("tls session is not established"));
        self.engine.encrypt(plaintext, output).map_err(|e| self.fail(e))
    }

    fn decrypt(&mut self, input: &mut BytesMut, output: &mut BytesMut) -> Result<(), NetError> {
        ensure!(self.state == HandshakeState::Established, NetError::invalid_handle("tls session is not established"));
        self.engine.decrypt(input, output).map_err(|e| self.fail(e))
    }
}

fn lock<E>(session: &Mutex<TlsSession<E>>) -> MutexGuard<'_, TlsSession<E>> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A stream protected by a [`TlsEngine`].
///
/// # Example
///
/// ```no_run
/// # use micro_net::transport::{SecureTransport, TcpTransport, TlsEngine};
/// # async fn connect<E: TlsEngine>(engine: E) -> Result<(), micro_net::NetError> {
/// let tcp = tokio::net::TcpStream::connect("127.0.0.1:8443").await?;
/// let mut transport = SecureTransport::new(tcp, engine);
/// transport.handshake().await?;
/// # Ok(())
/// # }
/// ```
pub struct SecureTransport<S, E> {
    stream: S,
    session: TlsSession<E>,
    received: BytesMut,
    peer_addr: Option<SocketAddr>,
}

impl<S, E> fmt::Debug for SecureTransport<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureTransport")
            .field("state", &self.session.state)
            .field("peer_addr", &self.peer_addr)
            .finish_non_exhaustive()
    }
}

impl<S, E> SecureTransport<S, E>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    E: TlsEngine,
{
    pub fn new(stream: S, engine: E) -> Self {
        Self {
            stream,
            session: TlsSession { engine, state: HandshakeState::NotStarted },
            received: BytesMut::new(),
            peer_addr: None,
        }
    }

    pub fn with_peer_addr(mut self, peer_addr: SocketAddr) -> Self {
        self.peer_addr = Some(peer_addr);
        self
    }

    pub fn state(&self) -> HandshakeState {
        self.session.state
    }

    /// Runs the handshake to completion.
    ///
    /// On failure the transport moves to [`HandshakeState::Failed`] and the stream is shut down.
    pub async fn handshake(&mut self) -> Result<(), NetError> {
        ensure!(self.session.state == HandshakeState::NotStarted, NetError::invalid_handle("tls handshake already started"));

        self.session.state = HandshakeState::Handshaking;
        debug!(peer_addr = ?self.peer_addr, "tls handshake started");

        match self.drive_handshake().await {
            Ok(()) => {
                self.session.state = HandshakeState::Established;
                debug!(peer_addr = ?self.peer_addr, "tls handshake complete");
                Ok(())
            }
            Err(e) => {
                warn!(peer_addr = ?self.peer_addr, cause = %e, "tls handshake failed");
                self.session.state = HandshakeState::Failed;
                // the handshake error is what matters to the caller
                let _ = self.stream.shutdown().await;
                Err(e)
            }
        }
    }

    async fn drive_handshake(&mut self) -> Result<(), NetError> {
        let mut output = BytesMut::new();
        loop {
            let status = self.session.engine.handshake_step(&mut self.received, &mut output)?;

            if !output.is_empty() {
                trace!(len = output.len(), "sending handshake bytes");
                self.stream.write_all(&output).await?;
                self.stream.flush().await?;
                output.clear();
            }

            if status == HandshakeStatus::Complete {
                return Ok(());
            }

            self.received.reserve(READ_CAPACITY);
            if self.stream.read_buf(&mut self.received).await? == 0 {
                return Err(TlsError::handshake_failed("peer closed the connection during the handshake").into());
            }
        }
    }
}

impl<S, E> Transport for SecureTransport<S, E>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    E: TlsEngine,
{
    type Reader = SecureReader<S, E>;
    type Writer = SecureWriter<S, E>;

    fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    /// Splits into halves sharing the engine; bytes received past the handshake go to the reader.
    fn into_split(self) -> (Self::Reader, Self::Writer) {
        let session = Arc::new(Mutex::new(self.session));
        let (reader, writer) = tokio::io::split(self.stream);
        (
            SecureReader { inner: reader, session: session.clone(), received: self.received },
            SecureWriter { inner: writer, session, records: BytesMut::new(), pending_plaintext: 0 },
        )
    }
}

pub struct SecureReader<S, E> {
    inner: ReadHalf<S>,
    session: Arc<Mutex<TlsSession<E>>>,
    received: BytesMut,
}

impl<S, E> fmt::Debug for SecureReader<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureReader")
            .field("state", &lock(&self.session).state)
            .field("received", &self.received.len())
            .finish_non_exhaustive()
    }
}

impl<S, E: TlsEngine> SecureReader<S, E> {
    pub fn state(&self) -> HandshakeState {
        lock(&self.session).state
    }

    fn decrypt_into(&mut self, dst: &mut BytesMut) -> Result<usize, NetError> {
        let before = dst.len();
        lock(&self.session).decrypt(&mut self.received, dst)?;
        Ok(dst.len() - before)
    }
}

impl<S, E> TransportRead for SecureReader<S, E>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    E: TlsEngine,
{
    /// Returns once at least one byte of plaintext was produced, or `Ok(0)` on close.
    async fn read_into(&mut self, dst: &mut BytesMut) -> Result<usize, NetError> {
        loop {
            if !self.received.is_empty() {
                let n = self.decrypt_into(dst)?;
                if n > 0 {
                    trace!(plaintext = n, "decrypted records");
                    return Ok(n);
                }
            }

            self.received.reserve(READ_CAPACITY);
            if self.inner.read_buf(&mut self.received).await? == 0 {
                return Ok(0);
            }
        }
    }
}

/// Write half of a [`SecureTransport`].
///
/// Records produced for one `write_some` call are kept until fully written, so dropping the
/// write future and retrying with the same bytes never loses or duplicates a record.
pub struct SecureWriter<S, E> {
    inner: WriteHalf<S>,
    session: Arc<Mutex<TlsSession<E>>>,
    records: BytesMut,
    pending_plaintext: usize,
}

impl<S, E> fmt::Debug for SecureWriter<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureWriter")
            .field("state", &lock(&self.session).state)
            .field("records", &self.records.len())
            .finish_non_exhaustive()
    }
}

impl<S: AsyncWrite, E: TlsEngine> SecureWriter<S, E> {
    pub fn state(&self) -> HandshakeState {
        lock(&self.session).state
    }

    fn encrypt(&mut self, plaintext: &[u8]) -> Result<(), NetError> {
        lock(&self.session).encrypt(plaintext, &mut self.records)?;
        self.pending_plaintext = plaintext.len();
        Ok(())
    }

    fn close_notify(&mut self) -> Result<(), NetError> {
        let mut session = lock(&self.session);
        if session.state == HandshakeState::Established {
            session.engine.close(&mut self.records)?;
        }
        Ok(())
    }

    async fn write_records(&mut self) -> Result<(), NetError> {
        while !self.records.is_empty() {
            let n = self.inner.write(&self.records).await?;
            if n == 0 {
                return Err(NetError::io(io::Error::from(io::ErrorKind::WriteZero)));
            }
            self.records.advance(n);
        }
        Ok(())
    }
}

impl<S, E> TransportWrite for SecureWriter<S, E>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    E: TlsEngine,
{
    /// Encrypts all of `src` and reports it written once every record reached the stream.
    async fn write_some(&mut self, src: &[u8]) -> Result<usize, NetError> {
        if self.records.is_empty() {
            self.encrypt(src)?;
        }
        self.write_records().await?;
        Ok(std::mem::take(&mut self.pending_plaintext))
    }

    async fn shutdown(&mut self) -> Result<(), NetError> {
        self.close_notify()?;
        self.write_records().await?;
        self.inner.shutdown().await?;
        Ok(())
    }
}
