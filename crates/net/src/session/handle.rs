use std::fmt;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use bytes::Bytes;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::NetError;
use crate::session::state::AtomicSessionState;
use crate::session::{SessionConfig, SessionId, SessionState};
use crate::transport::{SendQueue, SendStatus};

/// The send queue plus whether it still accepts data, under one lock.
#[derive(Debug)]
pub(crate) struct Outbox {
    pub(crate) queue: SendQueue,
    pub(crate) closed: bool,
}

#[derive(Debug)]
struct Shared {
    id: SessionId,
    peer_addr: OnceLock<SocketAddr>,
    state: AtomicSessionState,
    outbox: Mutex<Outbox>,
    wake: Notify,
    disconnect: CancellationToken,
    terminated: CancellationToken,
}

/// A cloneable reference to a running session.
///
/// Handles may be used from any thread. Sending only enqueues: the session's actor task performs
/// the actual writes, in order, and reports backpressure through the session handler.
#[derive(Clone)]
pub struct SessionHandle {
    shared: Arc<Shared>,
}

impl SessionHandle {
    pub(crate) fn new(config: &SessionConfig, disconnect: CancellationToken) -> Self {
        let queue = SendQueue::new(config.send_high_water(), config.send_low_water());
        Self {
            shared: Arc::new(Shared {
                id: SessionId::next(),
                peer_addr: OnceLock::new(),
                state: AtomicSessionState::new(SessionState::Connecting),
                outbox: Mutex::new(Outbox { queue, closed: false }),
                wake: Notify::new(),
                disconnect,
                terminated: CancellationToken::new(),
            }),
        }
    }

    pub fn id(&self) -> SessionId {
        self.shared.id
    }

    pub fn state(&self) -> SessionState {
        self.shared.state.load()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Connected
    }

    /// The remote address, known once connected.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.shared.peer_addr.get().copied()
    }

    /// Enqueues `message` for sending.
    ///
    /// Accepted while connecting, the data is written once the session is established. Anything
    /// convertible into [`Bytes`] works; [`Request`](crate::protocol::Request) and
    /// [`Response`](crate::protocol::Response) hand over their buffer without copying.
    ///
    /// # Errors
    ///
    /// `InvalidHandle` once the session is disconnecting or disconnected.
    pub fn send<B: Into<Bytes>>(&self, message: B) -> Result<SendStatus, NetError> {
        let bytes = message.into();
        let len = bytes.len();

        let status = {
            let mut outbox = self.outbox();
            if outbox.closed {
                return Err(NetError::invalid_handle("session is closed"));
            }
            outbox.queue.push(bytes)
        };

        trace!(session = %self.id(), len, ?status, "enqueued");
        self.shared.wake.notify_one();
        Ok(status)
    }

    /// Requests the session to disconnect. Repeated calls have no further effect.
    pub fn disconnect(&self) {
        self.shared.disconnect.cancel();
    }

    /// Waits until the session reached [`SessionState::Disconnected`] and its handler was told.
    pub async fn closed(&self) {
        self.shared.terminated.cancelled().await
    }

    /// Bytes enqueued but not yet written.
    pub fn queued_bytes(&self) -> usize {
        self.outbox().queue.len()
    }

    pub(crate) fn outbox(&self) -> MutexGuard<'_, Outbox> {
        self.shared.outbox.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_state(&self, state: SessionState) {
        self.shared.state.store(state);
    }

    pub(crate) fn set_peer_addr(&self, peer_addr: SocketAddr) {
        let _ = self.shared.peer_addr.set(peer_addr);
    }

    pub(crate) fn disconnect_token(&self) -> &CancellationToken {
        &self.shared.disconnect
    }

    pub(crate) fn wake(&self) -> &Notify {
        &self.shared.wake
    }

    pub(crate) fn terminate(&self) {
        self.shared.terminated.cancel();
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id())
            .field("state", &self.state())
            .field("peer_addr", &self.peer_addr())
            .finish()
    }
}
