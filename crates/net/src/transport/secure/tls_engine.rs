use bytes::BytesMut;
use thiserror::Error;

/// Progress reported by [`TlsEngine::handshake_step`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HandshakeStatus {
    /// More handshake messages must be exchanged.
    InProgress,
    /// The handshake finished, application data may flow.
    Complete,
}

#[derive(Error, Debug)]
pub enum TlsError {
    #[error("handshake failed: {reason}")]
    HandshakeFailed { reason: String },

    #[error("fatal alert: {description}")]
    FatalAlert { description: String },

    #[error("invalid record: {reason}")]
    InvalidRecord { reason: String },
}

impl TlsError {
    pub fn handshake_failed<S: ToString>(str: S) -> Self {
        Self::HandshakeFailed { reason: str.to_string() }
    }

    pub fn fatal_alert<S: ToString>(str: S) -> Self {
        Self::FatalAlert { description: str.to_string() }
    }

    pub fn invalid_record<S: ToString>(str: S) -> Self {
        Self::InvalidRecord { reason: str.to_string() }
    }
}

/// The cryptographic side of a TLS connection.
///
/// All methods consume from `input` what they could process, leaving partial records for the
/// next call, and append whatever they produce to `output`. Renegotiation and record buffering
/// are up to the engine.
#[cfg_attr(test, mockall::automock)]
pub trait TlsEngine: Send + 'static {
    /// Processes handshake bytes received from the peer and appends bytes to send back.
    ///
    /// Called first with an empty `input`, so a client engine can emit its hello.
    fn handshake_step(&mut self, input: &mut BytesMut, output: &mut BytesMut) -> Result<HandshakeStatus, TlsError>;

    /// Protects all of `plaintext` into records appended to `output`.
    fn encrypt(&mut self, plaintext: &[u8], output: &mut BytesMut) -> Result<(), TlsError>;

    /// Opens the complete records in `input`, appending their plaintext to `output`.
    fn decrypt(&mut self, input: &mut BytesMut, output: &mut BytesMut) -> Result<(), TlsError>;

    /// Appends a close notification, if the protocol has one.
    fn close(&mut self, _output: &mut BytesMut) -> Result<(), TlsError> {
        Ok(())
    }
}
