//! TLS layered over a byte stream through a pluggable engine.
//!
//! The crate ships no cryptography: a [`TlsEngine`] implementation performs the handshake and
//! the record protection, [`SecureTransport`] drives it over a stream.
//!
//! ```text
//! NotStarted --handshake()--> Handshaking --success--> Established
//!                                  |
//!                                  +--failure--> Failed
//! ```

mod secure_transport;
mod tls_engine;

pub use secure_transport::{HandshakeState, SecureReader, SecureTransport, SecureWriter};
pub use tls_engine::{HandshakeStatus, TlsEngine, TlsError};

#[cfg(test)]
pub(crate) use tls_engine::MockTlsEngine;
