#![allow(dead_code)]

use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::{Buf, BufMut, BytesMut};
use micro_net::handler::SessionHandler;
use micro_net::session::SessionHandle;
use micro_net::transport::{HandshakeStatus, TlsEngine, TlsError};
use micro_net::{DisconnectReason, ErrorKind, NetError};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::sync::mpsc;

#[derive(Debug)]
pub enum Event<M> {
    Connected,
    Message(M),
    Error(ErrorKind),
    Disconnected(DisconnectReason),
    Backpressure,
    Ready,
}

/// Forwards every callback to a channel.
pub struct Recorder<M> {
    events: mpsc::UnboundedSender<Event<M>>,
}

pub fn recorder<M>() -> (Recorder<M>, mpsc::UnboundedReceiver<Event<M>>) {
    let (events, rx) = mpsc::unbounded_channel();
    (Recorder { events }, rx)
}

impl<M: Send + 'static> SessionHandler<M> for Recorder<M> {
    fn on_connected(&mut self, _session: &SessionHandle) {
        let _ = self.events.send(Event::Connected);
    }

    fn on_message(&mut self, _session: &SessionHandle, message: M) {
        let _ = self.events.send(Event::Message(message));
    }

    fn on_error(&mut self, _session: &SessionHandle, error: &NetError) {
        let _ = self.events.send(Event::Error(error.kind()));
    }

    fn on_disconnected(&mut self, _session: &SessionHandle, reason: DisconnectReason) {
        let _ = self.events.send(Event::Disconnected(reason));
    }

    fn on_backpressure(&mut self, _session: &SessionHandle) {
        let _ = self.events.send(Event::Backpressure);
    }

    fn on_ready(&mut self, _session: &SessionHandle) {
        let _ = self.events.send(Event::Ready);
    }
}

pub async fn next_event<M>(events: &mut mpsc::UnboundedReceiver<Event<M>>) -> Event<M> {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for a session event")
        .expect("event channel closed")
}

/// Collects events up to and including `Disconnected`.
pub async fn events_until_disconnected<M>(events: &mut mpsc::UnboundedReceiver<Event<M>>) -> Vec<Event<M>> {
    let mut seen = Vec::new();
    loop {
        let event = next_event(events).await;
        let done = matches!(event, Event::Disconnected(_));
        seen.push(event);
        if done {
            return seen;
        }
    }
}

const HELLO: &[u8] = b"HELLO";

/// A toy engine: both sides send `HELLO` and wait for the peer's. Records are a length byte
/// followed by the payload xor-ed with the key, and an empty record is a fatal alert.
pub struct XorEngine {
    key: u8,
    hello_sent: bool,
    accept_hello: bool,
}

impl XorEngine {
    pub fn new(key: u8) -> Self {
        Self { key, hello_sent: false, accept_hello: true }
    }

    /// An engine that stays silent and rejects whatever the peer sends during the handshake.
    pub fn rejecting(key: u8) -> Self {
        Self { key, hello_sent: true, accept_hello: false }
    }
}

impl TlsEngine for XorEngine {
    fn handshake_step(&mut self, input: &mut BytesMut, output: &mut BytesMut) -> Result<HandshakeStatus, TlsError> {
        if !self.hello_sent {
            output.put_slice(HELLO);
            self.hello_sent = true;
        }
        if input.len() < HELLO.len() {
            return Ok(HandshakeStatus::InProgress);
        }
        if !self.accept_hello || &input[..HELLO.len()] != HELLO {
            return Err(TlsError::handshake_failed("unexpected hello"));
        }
        input.advance(HELLO.len());
        Ok(HandshakeStatus::Complete)
    }

    fn encrypt(&mut self, plaintext: &[u8], output: &mut BytesMut) -> Result<(), TlsError> {
        for chunk in plaintext.chunks(255) {
            output.put_u8(chunk.len() as u8);
            output.extend(chunk.iter().map(|b| b ^ self.key));
        }
        Ok(())
    }

    fn decrypt(&mut self, input: &mut BytesMut, output: &mut BytesMut) -> Result<(), TlsError> {
        while let Some(&len) = input.first() {
            if len == 0 {
                return Err(TlsError::fatal_alert("unexpected_message"));
            }
            if input.len() < 1 + len as usize {
                break;
            }
            input.advance(1);
            let record = input.split_to(len as usize);
            output.extend(record.iter().map(|b| b ^ self.key));
        }
        Ok(())
    }
}

/// A stream that never yields data and accepts a single byte per write.
#[derive(Clone, Default)]
pub struct OneByteStream {
    pub written: Arc<Mutex<Vec<u8>>>,
}

impl OneByteStream {
    pub fn written(&self) -> Vec<u8> {
        self.written.lock().unwrap().clone()
    }
}

impl AsyncRead for OneByteStream {
    fn poll_read(self: Pin<&mut Self>, _cx: &mut Context<'_>, _buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        Poll::Pending
    }
}

impl AsyncWrite for OneByteStream {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        match buf.first() {
            Some(&b) => {
                self.written.lock().unwrap().push(b);
                Poll::Ready(Ok(1))
            }
            None => Poll::Ready(Ok(0)),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// A stream that never yields data and fails every write with `BrokenPipe`.
pub struct BrokenStream;

impl AsyncRead for BrokenStream {
    fn poll_read(self: Pin<&mut Self>, _cx: &mut Context<'_>, _buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        Poll::Pending
    }
}

impl AsyncWrite for BrokenStream {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, _buf: &[u8]) -> Poll<io::Result<usize>> {
        Poll::Ready(Err(io::ErrorKind::BrokenPipe.into()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Polls `condition` until it holds, failing after a few seconds.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition did not hold in time");
}
