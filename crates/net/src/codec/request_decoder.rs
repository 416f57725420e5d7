//! Incremental decoder for HTTP requests.
//!
//! # Example
//!
//! ```
//! use micro_net::codec::RequestDecoder;
//! use tokio_util::codec::Decoder;
//! use bytes::BytesMut;
//!
//! let mut decoder = RequestDecoder::new();
//! let mut buffer = BytesMut::from(&b"GET /index.html HTTP/1.1\r\nHost: localhost\r\n\r\n"[..]);
//!
//! let request = decoder.decode(&mut buffer).unwrap().unwrap();
//! assert_eq!(request.url(), "/index.html");
//! assert_eq!(request.header_value("Host"), Some("localhost"));
//! assert!(buffer.is_empty());
//! ```

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::codec::ParseState;
use crate::codec::header::RequestLine;
use crate::codec::message_decoder::{DecodedMessage, MessageDecoder};
use crate::protocol::{ParseError, Request};

/// Decodes [`Request`]s from a receive buffer, one complete message at a time.
///
/// Feeding the same bytes in any fragmentation produces the same requests; progress is kept
/// between calls so nothing is scanned twice. Pipelined requests are returned one per call, and
/// the bytes of the next request stay in the buffer.
///
/// After an error the decoder state is unspecified and the connection should be closed.
#[derive(Debug)]
pub struct RequestDecoder {
    inner: MessageDecoder<RequestLine>,
}

impl RequestDecoder {
    pub fn new() -> Self {
        Default::default()
    }

    /// The part of the message the decoder is waiting for.
    pub fn state(&self) -> ParseState {
        self.inner.state()
    }
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self { inner: MessageDecoder::new() }
    }
}

fn into_request(message: DecodedMessage<RequestLine>) -> Request {
    let RequestLine { method, url, protocol } = message.start_line;
    Request::from_parts(message.buffer, method, url, protocol)
}

impl Decoder for RequestDecoder {
    type Item = Request;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        Ok(self.inner.decode(src)?.map(into_request))
    }

    /// Requests never read their body until close, so a partial request at end of input is an
    /// [`UnexpectedEof`](ParseError::UnexpectedEof).
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        Ok(self.inner.decode_eof(src)?.map(into_request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn crlf(text: &str) -> BytesMut {
        BytesMut::from(text.replace('\n', "\r\n").as_str())
    }

    #[test]
    fn content_length_body() {
        let mut buf = crlf(indoc! {"
        POST /submit HTTP/1.1
        Host: localhost
        Content-Length: 11

        hello world"});

        let mut decoder = RequestDecoder::new();
        let request = decoder.decode(&mut buf).unwrap().unwrap();

        assert_eq!(request.method(), "POST");
        assert_eq!(request.url(), "/submit");
        assert_eq!(request.protocol(), "HTTP/1.1");
        assert_eq!(request.headers_len(), 2);
        assert_eq!(request.body(), b"hello world");
        assert_eq!(request.body_length(), 11);
        assert!(buf.is_empty());
        assert_eq!(decoder.state(), ParseState::Complete);

        assert!(decoder.decode(&mut buf).unwrap().is_none());
        assert_eq!(decoder.state(), ParseState::StartLine);
    }

    #[test]
    fn chunked_body_is_contiguous() {
        let mut buf = crlf("POST /upload HTTP/1.1\nTransfer-Encoding: chunked\n\n5\nhello\n6\n world\n0\n\n");

        let request = RequestDecoder::new().decode(&mut buf).unwrap().unwrap();
        assert_eq!(request.body(), b"hello world");
        assert_eq!(request.body_length(), 11);
        assert_eq!(request.header_value("Transfer-Encoding"), Some("chunked"));
        assert!(request.cache().ends_with(b"hello world"));
        assert!(buf.is_empty());
    }

    #[test]
    fn waits_for_body() {
        let mut buf = crlf("PUT /x HTTP/1.1\nContent-Length: 4\n\nab");
        let mut decoder = RequestDecoder::new();

        assert!(decoder.decode(&mut buf).unwrap().is_none());
        assert_eq!(decoder.state(), ParseState::BodyFixedLength);

        buf.extend_from_slice(b"cd");
        let request = decoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(request.body(), b"abcd");
    }

    #[test]
    fn pipelined_requests() {
        let mut buf = crlf("GET /a HTTP/1.1\n\nGET /b HTTP/1.1\nContent-Length: 1\n\nxGET /c HTTP/1.1\n");
        let mut decoder = RequestDecoder::new();

        assert_eq!(decoder.decode(&mut buf).unwrap().unwrap().url(), "/a");
        let second = decoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(second.url(), "/b");
        assert_eq!(second.body(), b"x");
        assert!(decoder.decode(&mut buf).unwrap().is_none());
        assert_eq!(decoder.state(), ParseState::Headers);
        assert_eq!(&buf[..], b"GET /c HTTP/1.1\r\n");
    }

    #[test]
    fn eof_in_the_middle() {
        let mut decoder = RequestDecoder::new();
        let mut empty = BytesMut::new();
        assert!(decoder.decode_eof(&mut empty).unwrap().is_none());

        let mut buf = crlf("GET / HTTP/1.1\nHost: a\n");
        assert!(matches!(decoder.decode_eof(&mut buf), Err(ParseError::UnexpectedEof { state: ParseState::Headers })));
    }

    #[test]
    fn malformed_request_line() {
        let mut buf = crlf("NONSENSE\n\n");
        assert!(matches!(RequestDecoder::new().decode(&mut buf), Err(ParseError::InvalidStartLine { .. })));
    }
}
