//! Incremental decoder for HTTP responses.

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::codec::ParseState;
use crate::codec::header::StatusLine;
use crate::codec::message_decoder::{DecodedMessage, MessageDecoder};
use crate::protocol::{ParseError, Response};

/// Decodes [`Response`]s from a receive buffer.
///
/// Behaves like [`RequestDecoder`](crate::codec::RequestDecoder) with one addition: a response
/// without `Content-Length` or chunked encoding is delimited by the peer closing the connection
/// and only completes in [`decode_eof`](Decoder::decode_eof). Responses with a 1xx, 204 or 304
/// status never carry a body.
#[derive(Debug)]
pub struct ResponseDecoder {
    inner: MessageDecoder<StatusLine>,
}

impl ResponseDecoder {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn state(&self) -> ParseState {
        self.inner.state()
    }
}

impl Default for ResponseDecoder {
    fn default() -> Self {
        Self { inner: MessageDecoder::new() }
    }
}

fn into_response(message: DecodedMessage<StatusLine>) -> Response {
    let StatusLine { protocol, status, phrase } = message.start_line;
    Response::from_parts(message.buffer, protocol, status, phrase)
}

impl Decoder for ResponseDecoder {
    type Item = Response;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        Ok(self.inner.decode(src)?.map(into_response))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        Ok(self.inner.decode_eof(src)?.map(into_response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crlf(text: &str) -> BytesMut {
        BytesMut::from(text.replace('\n', "\r\n").as_str())
    }

    #[test]
    fn status_line_and_body() {
        let mut buf = crlf("HTTP/1.1 404 Not Found\nContent-Type: text/plain\nContent-Length: 4\n\nnope");
        let response = ResponseDecoder::new().decode(&mut buf).unwrap().unwrap();

        assert_eq!(response.protocol(), "HTTP/1.1");
        assert_eq!(response.status(), 404);
        assert_eq!(response.status_phrase(), "Not Found");
        assert_eq!(response.header_value("Content-Type"), Some("text/plain"));
        assert_eq!(response.body(), b"nope");
    }

    #[test]
    fn empty_phrase() {
        let mut buf = crlf("HTTP/1.1 200\nContent-Length: 0\n\n");
        let response = ResponseDecoder::new().decode(&mut buf).unwrap().unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.status_phrase(), "");
    }

    #[test]
    fn body_until_close() {
        let mut buf = crlf("HTTP/1.0 200 OK\nServer: old\n\nstreamed until the end");
        let mut decoder = ResponseDecoder::new();

        assert!(decoder.decode(&mut buf).unwrap().is_none());
        assert_eq!(decoder.state(), ParseState::BodyUntilClose);

        let response = decoder.decode_eof(&mut buf).unwrap().unwrap();
        assert_eq!(response.body(), b"streamed until the end");
        assert_eq!(response.body_length(), 22);
        assert!(buf.is_empty());
        assert!(decoder.decode_eof(&mut buf).unwrap().is_none());
    }

    #[test]
    fn no_content_has_no_body() {
        let mut buf = crlf("HTTP/1.1 204 No Content\n\nHTTP/1.1 200 OK\nContent-Length: 2\n\nok");
        let mut decoder = ResponseDecoder::new();

        let first = decoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(first.status(), 204);
        assert!(first.body().is_empty());

        let second = decoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(second.body(), b"ok");
    }

    #[test]
    fn truncated_chunked_body() {
        let mut buf = crlf("HTTP/1.1 200 OK\nTransfer-Encoding: chunked\n\n5\nhel");
        let mut decoder = ResponseDecoder::new();
        assert!(matches!(decoder.decode_eof(&mut buf), Err(ParseError::UnexpectedEof { state: ParseState::BodyChunked })));
    }
}
