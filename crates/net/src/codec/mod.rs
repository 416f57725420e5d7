//! Incremental decoders turning received bytes into [`Request`](crate::protocol::Request) and
//! [`Response`](crate::protocol::Response) values.
//!
//! # Architecture
//!
//! - [`RequestDecoder`] and [`ResponseDecoder`] implement [`tokio_util::codec::Decoder`]
//!   - start line and headers via the `header` module
//!   - body framing via the `body` module: content length, chunked, until close, none
//!
//! Decoders never copy header or body bytes: they record spans while scanning and finally split
//! the consumed region off the receive buffer as the message buffer. A chunked body is compacted
//! in place so it is contiguous like any other body.
//!
//! # Example
//!
//! ```
//! use micro_net::codec::{ParseState, ResponseDecoder};
//! use tokio_util::codec::Decoder;
//! use bytes::BytesMut;
//!
//! let mut decoder = ResponseDecoder::new();
//! let mut buffer = BytesMut::from(&b"HTTP/1.1 200 OK\r\nContent-Len"[..]);
//! assert!(decoder.decode(&mut buffer).unwrap().is_none());
//! assert_eq!(decoder.state(), ParseState::Headers);
//!
//! buffer.extend_from_slice(b"gth: 2\r\n\r\nok");
//! let response = decoder.decode(&mut buffer).unwrap().unwrap();
//! assert_eq!(response.body(), b"ok");
//! ```

mod body;
mod header;
mod message_decoder;
mod request_decoder;
mod response_decoder;

pub use request_decoder::RequestDecoder;
pub use response_decoder::ResponseDecoder;

/// Progress of a decoder within the current message.
///
/// After producing a message a decoder reports [`Complete`](ParseState::Complete) until it is
/// called again, then starts over at [`StartLine`](ParseState::StartLine).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ParseState {
    /// Waiting for the start line.
    StartLine,
    /// Reading header lines.
    Headers,
    /// Waiting for a `Content-Length` delimited body.
    BodyFixedLength,
    /// Reading a chunked body.
    BodyChunked,
    /// Reading a body delimited by connection close.
    BodyUntilClose,
    /// The message has no body.
    NoBody,
    /// The last call produced a message.
    Complete,
}
