//! The callback interface a session reports to.
//!
//! A [`SessionHandler`] is owned by its session's actor task, so its callbacks run one at a time
//! and may mutate the handler freely. Every method except [`on_message`](SessionHandler::on_message)
//! defaults to doing nothing.

use std::fmt;

use crate::session::SessionHandle;
use crate::{DisconnectReason, NetError};

pub trait SessionHandler<M>: Send + 'static {
    /// The session finished connecting (and, for secure sessions, handshaking).
    fn on_connected(&mut self, _session: &SessionHandle) {}

    /// A complete message was decoded.
    fn on_message(&mut self, session: &SessionHandle, message: M);

    /// An error occurred; the session disconnects right after.
    fn on_error(&mut self, _session: &SessionHandle, _error: &NetError) {}

    /// The session reached its terminal state. Called exactly once.
    fn on_disconnected(&mut self, _session: &SessionHandle, _reason: DisconnectReason) {}

    /// The send queue exceeded its high water mark.
    fn on_backpressure(&mut self, _session: &SessionHandle) {}

    /// The send queue drained to its low water mark after backpressure.
    fn on_ready(&mut self, _session: &SessionHandle) {}
}

/// A handler built from a message closure, for sessions that only care about messages.
pub struct HandlerFn<F> {
    f: F,
}

impl<F> fmt::Debug for HandlerFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerFn").finish_non_exhaustive()
    }
}

impl<M, F> SessionHandler<M> for HandlerFn<F>
where
    F: FnMut(&SessionHandle, M) + Send + 'static,
{
    fn on_message(&mut self, session: &SessionHandle, message: M) {
        (self.f)(session, message)
    }
}

pub fn make_handler<M, F>(f: F) -> HandlerFn<F>
where
    F: FnMut(&SessionHandle, M) + Send + 'static,
{
    HandlerFn { f }
}
