use std::fmt;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

/// Lifecycle of a session.
///
/// ```text
/// Connecting -> Connected -> Disconnecting -> Disconnected
///      |                                          ^
///      +------------------------------------------+  connect or handshake failure
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SessionState {
    Connecting = 0,
    Connected = 1,
    Disconnecting = 2,
    /// Terminal.
    Disconnected = 3,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => SessionState::Connecting,
            1 => SessionState::Connected,
            2 => SessionState::Disconnecting,
            _ => SessionState::Disconnected,
        }
    }

    /// Returns true once the session stopped accepting data to send.
    pub fn is_closing(self) -> bool {
        matches!(self, SessionState::Disconnecting | SessionState::Disconnected)
    }
}

#[derive(Debug)]
pub(crate) struct AtomicSessionState(AtomicU8);

impl AtomicSessionState {
    pub(crate) fn new(state: SessionState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub(crate) fn load(&self) -> SessionState {
        SessionState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn store(&self, state: SessionState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

/// Process-wide unique session identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    pub(crate) fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
