use std::fmt;
use std::io;

use thiserror::Error;

use crate::protocol::ParseError;
use crate::transport::TlsError;

/// Top-level error type of the crate.
///
/// Codec and transport failures never unwind across callback boundaries: they travel as values of
/// this type to the owning session, which reports them through
/// [`SessionHandler::on_error`](crate::handler::SessionHandler::on_error) and then disconnects.
#[derive(Debug, Error)]
pub enum NetError {
    #[error("invalid handle: {reason}")]
    InvalidHandle { reason: &'static str },

    #[error("protocol error: {source}")]
    Protocol {
        #[from]
        source: ParseError,
    },

    #[error("receive buffer overflow, buffered: {buffered} exceed the limit {limit}")]
    BufferOverflow { buffered: usize, limit: usize },

    #[error("tls failure: {source}")]
    Tls {
        #[from]
        source: TlsError,
    },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    #[error("session disconnected: {reason}")]
    Disconnected { reason: DisconnectReason },
}

impl NetError {
    pub fn invalid_handle(reason: &'static str) -> Self {
        Self::InvalidHandle { reason }
    }

    pub fn buffer_overflow(buffered: usize, limit: usize) -> Self {
        Self::BufferOverflow { buffered, limit }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }

    pub fn disconnected(reason: DisconnectReason) -> Self {
        Self::Disconnected { reason }
    }

    /// Classifies this error into the taxonomy reported to applications.
    pub fn kind(&self) -> ErrorKind {
        match self {
            NetError::InvalidHandle { .. } => ErrorKind::InvalidHandle,
            NetError::Protocol { .. } => ErrorKind::ProtocolError,
            NetError::BufferOverflow { .. } => ErrorKind::BufferOverflow,
            NetError::Tls { .. } => ErrorKind::HandshakeFailure,
            NetError::Io { .. } => ErrorKind::IoError,
            NetError::Disconnected { reason: DisconnectReason::Error(kind) } => *kind,
            NetError::Disconnected { .. } => ErrorKind::IoError,
        }
    }
}

/// Error classification shared by [`NetError`] and [`DisconnectReason`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An operation was submitted on a stopped service or a closed session
    InvalidHandle,
    /// Malformed wire data, terminates the current connection
    ProtocolError,
    /// The receive buffer limit was exceeded
    BufferOverflow,
    /// The TLS engine rejected the handshake or raised a fatal alert
    HandshakeFailure,
    /// Transport level failure such as a reset
    IoError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidHandle => "invalid handle",
            ErrorKind::ProtocolError => "protocol error",
            ErrorKind::BufferOverflow => "buffer overflow",
            ErrorKind::HandshakeFailure => "handshake failure",
            ErrorKind::IoError => "io error",
        };
        f.write_str(name)
    }
}

/// Why a session reached the `Disconnected` state.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// [`SessionHandle::disconnect`](crate::session::SessionHandle::disconnect) was called
    Requested,
    /// The peer closed the connection in an orderly way
    PeerClosed,
    /// The session was torn down after an error of the given kind
    Error(ErrorKind),
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::Requested => f.write_str("requested"),
            DisconnectReason::PeerClosed => f.write_str("peer closed"),
            DisconnectReason::Error(kind) => write!(f, "{kind}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_follows_variant() {
        assert_eq!(NetError::invalid_handle("stopped").kind(), ErrorKind::InvalidHandle);
        assert_eq!(NetError::buffer_overflow(10, 5).kind(), ErrorKind::BufferOverflow);
        assert_eq!(NetError::io(io::Error::from(io::ErrorKind::ConnectionReset)).kind(), ErrorKind::IoError);
        assert_eq!(NetError::from(ParseError::invalid_start_line("empty")).kind(), ErrorKind::ProtocolError);
        assert_eq!(NetError::from(TlsError::fatal_alert("bad_record_mac")).kind(), ErrorKind::HandshakeFailure);
    }

    #[test]
    fn disconnected_error_keeps_the_original_kind() {
        let error = NetError::disconnected(DisconnectReason::Error(ErrorKind::ProtocolError));
        assert_eq!(error.kind(), ErrorKind::ProtocolError);

        let error = NetError::disconnected(DisconnectReason::PeerClosed);
        assert_eq!(error.kind(), ErrorKind::IoError);
        assert_eq!(error.to_string(), "session disconnected: peer closed");
    }
}
