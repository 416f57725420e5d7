//! The session actor.
//!
//! Each session is one task owning the transport halves, the receive buffer, the decoder and the
//! handler. The task races four events and handles whichever comes first:
//!
//! 1. a disconnect request
//! 2. completion of the write of the front send-queue buffer
//! 3. received bytes, fed to the decoder
//! 4. a wake-up from [`SessionHandle::send`]
//!
//! All handler callbacks run on this task, one at a time.

use std::{fmt, io};

use bytes::{Bytes, BytesMut};
use tokio_util::codec::Decoder;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::handler::SessionHandler;
use crate::service::ServiceHandle;
use crate::session::{SessionConfig, SessionHandle, SessionState};
use crate::transport::{Transport, TransportRead, TransportWrite};
use crate::{DisconnectReason, NetError};

/// A connection paired with a decoder and a handler, running as its own task.
pub struct Session<D, H> {
    handle: SessionHandle,
    decoder: D,
    handler: H,
    config: SessionConfig,
    received: BytesMut,
    service_shutdown: CancellationToken,
}

impl<D, H> fmt::Debug for Session<D, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.handle.id())
            .field("state", &self.handle.state())
            .field("buffered", &self.received.len())
            .finish_non_exhaustive()
    }
}

enum Event {
    Disconnect,
    Written(Result<usize, NetError>),
    Read(Result<usize, NetError>),
    Wake,
}

impl<D, H> Session<D, H>
where
    D: Decoder + Send + 'static,
    D::Item: Send,
    D::Error: Into<NetError>,
    H: SessionHandler<D::Item>,
{
    /// Starts a session whose transport is produced by `connect`.
    ///
    /// The session is `Connecting` until `connect` resolves; data sent meanwhile is queued and
    /// written after `on_connected`. If `connect` fails the handler gets `on_error` and then
    /// `on_disconnected`, without `on_connected`.
    pub fn spawn<C, T>(
        service: &ServiceHandle,
        config: SessionConfig,
        connect: C,
        decoder: D,
        handler: H,
    ) -> Result<SessionHandle, NetError>
    where
        C: Future<Output = Result<T, NetError>> + Send + 'static,
        T: Transport,
    {
        let service_shutdown = service.shutdown_token();
        let handle = SessionHandle::new(&config, service_shutdown.child_token());

        let session = Session {
            handle: handle.clone(),
            decoder,
            handler,
            config,
            received: BytesMut::with_capacity(config.receive_buffer_capacity()),
            service_shutdown,
        };

        let span = info_span!("session", id = %handle.id());
        service.spawn(session.run(connect).instrument(span))?;
        Ok(handle)
    }

    /// Starts a session over an already connected transport.
    pub fn attach<T: Transport>(
        service: &ServiceHandle,
        config: SessionConfig,
        transport: T,
        decoder: D,
        handler: H,
    ) -> Result<SessionHandle, NetError> {
        Self::spawn(service, config, async move { Ok::<_, NetError>(transport) }, decoder, handler)
    }

    async fn run<C, T>(mut self, connect: C)
    where
        C: Future<Output = Result<T, NetError>> + Send + 'static,
        T: Transport,
    {
        let disconnect = self.handle.disconnect_token().clone();

        let connected = tokio::select! {
            biased;
            _ = disconnect.cancelled() => Err(DisconnectReason::Requested),
            result = connect => result.map_err(|e| self.report_error(&e)),
        };

        let transport = match connected {
            Ok(transport) => transport,
            Err(reason) => {
                self.finish(reason);
                return;
            }
        };

        if let Some(peer_addr) = transport.peer_addr() {
            self.handle.set_peer_addr(peer_addr);
        }
        let (mut reader, mut writer) = transport.into_split();

        self.handle.set_state(SessionState::Connected);
        info!(peer_addr = ?self.handle.peer_addr(), "session connected");
        self.handler.on_connected(&self.handle);

        let reason = self.pump(&mut reader, &mut writer, &disconnect).await;

        self.handle.outbox().closed = true;
        self.handle.set_state(SessionState::Disconnecting);
        debug!(%reason, "session disconnecting");

        let reason = self.close_writer(&mut writer, reason).await;
        self.finish(reason);
    }

    /// Flushes what is still queued and shuts the write side down.
    ///
    /// A write failure here loses queued data, so it replaces a clean `reason`. A failed shutdown
    /// after the peer closed, or with `NotConnected`, only means the peer is already gone.
    async fn close_writer<W: TransportWrite>(&mut self, writer: &mut W, reason: DisconnectReason) -> DisconnectReason {
        if matches!(reason, DisconnectReason::Error(_)) {
            if let Err(e) = writer.shutdown().await {
                debug!(cause = %e, "transport shutdown failed");
            }
            return reason;
        }

        if self.config.flush_on_disconnect() {
            let service_shutdown = self.service_shutdown.clone();
            let flushed = tokio::select! {
                biased;
                _ = service_shutdown.cancelled() => {
                    debug!("flush abandoned, service stopping");
                    Ok(())
                }
                result = self.flush(writer) => result,
            };
            if let Err(e) = flushed {
                return self.report_error(&e);
            }
        }

        match writer.shutdown().await {
            Err(e) if reason == DisconnectReason::PeerClosed || is_not_connected(&e) => {
                debug!(cause = %e, "transport already disconnected");
                reason
            }
            Err(e) => self.report_error(&e),
            Ok(()) => reason,
        }
    }

    async fn pump<R, W>(&mut self, reader: &mut R, writer: &mut W, disconnect: &CancellationToken) -> DisconnectReason
    where
        R: TransportRead,
        W: TransportWrite,
    {
        loop {
            self.report_backpressure();

            let front = self.handle.outbox().queue.front();
            self.received.reserve(self.config.receive_buffer_capacity());

            let event = tokio::select! {
                biased;
                _ = disconnect.cancelled() => Event::Disconnect,
                result = write_front(writer, front) => Event::Written(result),
                result = reader.read_into(&mut self.received) => Event::Read(result),
                _ = self.handle.wake().notified() => Event::Wake,
            };

            match event {
                Event::Disconnect => return DisconnectReason::Requested,
                Event::Wake => {}
                Event::Written(Ok(n)) => {
                    let ready = self.handle.outbox().queue.advance(n);
                    if ready {
                        self.report_backpressure();
                        debug!("send queue drained below low water");
                        self.handler.on_ready(&self.handle);
                    }
                }
                Event::Read(Ok(0)) => {
                    debug!(buffered = self.received.len(), "peer closed");
                    return match self.decode_eof() {
                        Ok(()) => DisconnectReason::PeerClosed,
                        Err(reason) => reason,
                    };
                }
                Event::Read(Ok(_)) => {
                    if let Err(reason) = self.decode() {
                        return reason;
                    }
                }
                Event::Written(Err(e)) | Event::Read(Err(e)) => return self.report_error(&e),
            }
        }
    }

    fn decode(&mut self) -> Result<(), DisconnectReason> {
        loop {
            if self.handle.disconnect_token().is_cancelled() {
                return Ok(());
            }
            match self.decoder.decode(&mut self.received) {
                Ok(Some(message)) => self.handler.on_message(&self.handle, message),
                Ok(None) => break,
                Err(e) => return Err(self.report_error(&e.into())),
            }
        }

        let buffered = self.received.len();
        let limit = self.config.max_receive_buffer();
        if buffered > limit {
            return Err(self.report_error(&NetError::buffer_overflow(buffered, limit)));
        }
        Ok(())
    }

    fn decode_eof(&mut self) -> Result<(), DisconnectReason> {
        loop {
            match self.decoder.decode_eof(&mut self.received) {
                Ok(Some(message)) => self.handler.on_message(&self.handle, message),
                Ok(None) => return Ok(()),
                Err(e) => return Err(self.report_error(&e.into())),
            }
        }
    }

    async fn flush<W: TransportWrite>(&mut self, writer: &mut W) -> Result<(), NetError> {
        loop {
            let Some(front) = self.handle.outbox().queue.front() else {
                return Ok(());
            };
            let n = writer.write_some(&front).await?;
            self.handle.outbox().queue.advance(n);
        }
    }

    fn report_backpressure(&mut self) {
        let event = self.handle.outbox().queue.take_backpressure_event();
        if event {
            debug!(queued = self.handle.queued_bytes(), "send queue above high water");
            self.handler.on_backpressure(&self.handle);
        }
    }

    fn report_error(&mut self, error: &NetError) -> DisconnectReason {
        warn!(cause = %error, "session error");
        self.handler.on_error(&self.handle, error);
        DisconnectReason::Error(error.kind())
    }

    fn finish(&mut self, reason: DisconnectReason) {
        {
            let mut outbox = self.handle.outbox();
            outbox.closed = true;
            outbox.queue.clear();
        }
        self.handle.set_state(SessionState::Disconnected);
        info!(%reason, "session disconnected");
        self.handler.on_disconnected(&self.handle, reason);
        self.handle.terminate();
    }
}

/// Writes a prefix of the front buffer, or never resolves when there is nothing to send.
async fn write_front<W: TransportWrite>(writer: &mut W, front: Option<Bytes>) -> Result<usize, NetError> {
    match front {
        Some(bytes) => writer.write_some(&bytes).await,
        None => std::future::pending().await,
    }
}

fn is_not_connected(error: &NetError) -> bool {
    matches!(error, NetError::Io { source } if source.kind() == io::ErrorKind::NotConnected)
}
