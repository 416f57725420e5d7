//! Zero-copy HTTP response message.
//!
//! Mirrors [`Request`](crate::protocol::Request): one buffer, spans for every textual field, and a
//! declared body length that may diverge from the materialized body for streamed responses.

use std::fmt;

use bytes::Bytes;

use crate::protocol::buffer::{CRLF, MessageBuffer};
use crate::protocol::{HTTP_1_1, HeaderSpan, Span, TEXT_PLAIN_UTF8, status_phrase};

/// An HTTP response backed by a single buffer.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Response {
    buffer: MessageBuffer,
    protocol: Span,
    status: u16,
    status_phrase: Span,
}

impl Response {
    pub fn new() -> Self {
        Default::default()
    }

    pub(crate) fn from_parts(buffer: MessageBuffer, protocol: Span, status: u16, status_phrase: Span) -> Self {
        Self { buffer, protocol, status, status_phrase }
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.len() == 0
    }

    pub fn protocol(&self) -> &str {
        self.buffer.str(self.protocol)
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn status_phrase(&self) -> &str {
        self.buffer.str(self.status_phrase)
    }

    pub fn headers_len(&self) -> usize {
        self.buffer.headers_len()
    }

    pub fn header(&self, index: usize) -> Option<(&str, &str)> {
        self.buffer.header(index)
    }

    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.buffer.headers()
    }

    /// Value of the first header whose key equals `key` exactly.
    pub fn header_value(&self, key: &str) -> Option<&str> {
        self.buffer.header_value(key)
    }

    pub fn header_value_ignore_case(&self, key: &str) -> Option<&str> {
        self.buffer.header_value_ignore_case(key)
    }

    pub fn header_spans(&self) -> &[HeaderSpan] {
        self.buffer.header_spans()
    }

    pub fn body(&self) -> &[u8] {
        self.buffer.body()
    }

    pub fn body_span(&self) -> Span {
        self.buffer.body_span()
    }

    /// The declared body length; consult this rather than `body().len()` for framing.
    pub fn body_length(&self) -> usize {
        self.buffer.body_length()
    }

    pub fn cache(&self) -> &[u8] {
        self.buffer.as_bytes()
    }

    pub fn into_bytes(self) -> Bytes {
        self.buffer.freeze()
    }

    pub fn clear(&mut self) -> &mut Self {
        self.buffer.clear();
        self.protocol = Span::EMPTY;
        self.status = 0;
        self.status_phrase = Span::EMPTY;
        self
    }

    /// Clears the response and writes the status line, taking the phrase from the status table.
    pub fn set_begin(&mut self, status: u16, protocol: &str) -> &mut Self {
        self.set_begin_with_phrase(status, status_phrase(status), protocol)
    }

    /// Clears the response and writes `PROTOCOL STATUS PHRASE\r\n` with a caller chosen phrase.
    pub fn set_begin_with_phrase(&mut self, status: u16, phrase: &str, protocol: &str) -> &mut Self {
        self.clear();

        self.protocol = self.buffer.append(protocol.as_bytes());
        self.buffer.append(b" ");
        self.buffer.append_decimal(status as u64);
        self.status = status;
        self.buffer.append(b" ");
        self.status_phrase = self.buffer.append(phrase.as_bytes());
        self.buffer.append(CRLF);
        self
    }

    pub fn set_header(&mut self, key: &str, value: &str) -> &mut Self {
        self.buffer.set_header(key, value);
        self
    }

    pub fn set_body<B: AsRef<[u8]>>(&mut self, body: B) -> &mut Self {
        self.buffer.set_body(body.as_ref());
        self
    }

    /// Declares a body of `length` bytes streamed after the header.
    pub fn set_body_length(&mut self, length: usize) -> &mut Self {
        self.buffer.set_body_length(length);
        self
    }

    pub fn make_ok_response(&mut self, status: u16) -> &mut Self {
        self.set_begin(status, HTTP_1_1).set_body(b"")
    }

    pub fn make_error_response(&mut self, status: u16, content: &str) -> &mut Self {
        self.set_begin(status, HTTP_1_1);
        if !content.is_empty() {
            self.set_header("Content-Type", TEXT_PLAIN_UTF8);
        }
        self.set_body(content)
    }

    pub fn make_head_response(&mut self) -> &mut Self {
        self.set_begin(200, HTTP_1_1).set_body(b"")
    }

    pub fn make_get_response(&mut self, content: &[u8], content_type: &str) -> &mut Self {
        self.set_begin(200, HTTP_1_1);
        if !content_type.is_empty() {
            self.set_header("Content-Type", content_type);
        }
        self.set_body(content)
    }
}

impl From<Response> for Bytes {
    fn from(response: Response) -> Self {
        response.into_bytes()
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("protocol", &self.protocol())
            .field("status", &self.status)
            .field("status_phrase", &self.status_phrase())
            .field("headers", &self.headers().collect::<Vec<_>>())
            .field("body_length", &self.body_length())
            .finish()
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.cache()))
    }
}
