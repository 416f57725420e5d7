//! Zero-copy HTTP request message.
//!
//! A [`Request`] owns one contiguous buffer holding its serialized start line, headers and body.
//! Builder calls append to that buffer and record [`Span`]s; accessors resolve spans back into
//! borrowed slices. The same type is produced by [`RequestDecoder`](crate::codec::RequestDecoder),
//! in which case the buffer is the exact region split off the receive buffer.

use std::fmt;

use bytes::Bytes;

use crate::protocol::buffer::{CRLF, MessageBuffer};
use crate::protocol::{HTTP_1_1, HeaderSpan, Span, TEXT_PLAIN_UTF8};

/// An HTTP request backed by a single buffer.
///
/// # Lifecycle
///
/// 1. [`set_begin`](Request::set_begin) clears the buffer and writes `METHOD URL PROTOCOL\r\n`
/// 2. zero or more [`set_header`](Request::set_header) calls append `Key: Value\r\n`
/// 3. [`set_body`](Request::set_body) or [`set_body_length`](Request::set_body_length) appends the
///    blank line and finishes the message
///
/// The message is immutable by convention until the next `clear` or `set_begin`.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Request {
    buffer: MessageBuffer,
    method: Span,
    url: Span,
    protocol: Span,
}

impl Request {
    pub fn new() -> Self {
        Default::default()
    }

    pub(crate) fn from_parts(buffer: MessageBuffer, method: Span, url: Span, protocol: Span) -> Self {
        Self { buffer, method, url, protocol }
    }

    /// Returns true if nothing was built or parsed into this request yet.
    pub fn is_empty(&self) -> bool {
        self.buffer.len() == 0
    }

    pub fn method(&self) -> &str {
        self.buffer.str(self.method)
    }

    pub fn url(&self) -> &str {
        self.buffer.str(self.url)
    }

    pub fn protocol(&self) -> &str {
        self.buffer.str(self.protocol)
    }

    /// Number of header lines, duplicates included.
    pub fn headers_len(&self) -> usize {
        self.buffer.headers_len()
    }

    /// Returns the `index`-th header in wire order, or `None` when out of bounds.
    pub fn header(&self, index: usize) -> Option<(&str, &str)> {
        self.buffer.header(index)
    }

    /// Iterates headers in wire order.
    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.buffer.headers()
    }

    /// Value of the first header whose key equals `key` exactly.
    ///
    /// Keys are compared as received; see [`header_value_ignore_case`](Request::header_value_ignore_case)
    /// for HTTP's case-insensitive matching.
    pub fn header_value(&self, key: &str) -> Option<&str> {
        self.buffer.header_value(key)
    }

    pub fn header_value_ignore_case(&self, key: &str) -> Option<&str> {
        self.buffer.header_value_ignore_case(key)
    }

    pub fn header_spans(&self) -> &[HeaderSpan] {
        self.buffer.header_spans()
    }

    /// The materialized body bytes.
    pub fn body(&self) -> &[u8] {
        self.buffer.body()
    }

    pub fn body_span(&self) -> Span {
        self.buffer.body_span()
    }

    /// The declared body length, which may exceed `body().len()` for streamed bodies.
    pub fn body_length(&self) -> usize {
        self.buffer.body_length()
    }

    /// The whole serialized message.
    pub fn cache(&self) -> &[u8] {
        self.buffer.as_bytes()
    }

    /// Consumes the request and returns its buffer without copying it.
    pub fn into_bytes(self) -> Bytes {
        self.buffer.freeze()
    }

    pub fn clear(&mut self) -> &mut Self {
        self.buffer.clear();
        self.method = Span::EMPTY;
        self.url = Span::EMPTY;
        self.protocol = Span::EMPTY;
        self
    }

    /// Clears the request and writes the request line.
    pub fn set_begin(&mut self, method: &str, url: &str, protocol: &str) -> &mut Self {
        self.clear();

        self.method = self.buffer.append(method.as_bytes());
        self.buffer.append(b" ");
        self.url = self.buffer.append(url.as_bytes());
        self.buffer.append(b" ");
        self.protocol = self.buffer.append(protocol.as_bytes());
        self.buffer.append(CRLF);
        self
    }

    /// Appends a header line; keys are neither merged, validated nor normalized.
    pub fn set_header(&mut self, key: &str, value: &str) -> &mut Self {
        self.buffer.set_header(key, value);
        self
    }

    /// Appends the blank line and `body`, adding `Content-Length` first when it is not empty.
    pub fn set_body<B: AsRef<[u8]>>(&mut self, body: B) -> &mut Self {
        self.buffer.set_body(body.as_ref());
        self
    }

    /// Declares a body of `length` bytes that will be sent separately.
    pub fn set_body_length(&mut self, length: usize) -> &mut Self {
        self.buffer.set_body_length(length);
        self
    }

    pub fn make_head_request(&mut self, url: &str) -> &mut Self {
        self.set_begin("HEAD", url, HTTP_1_1).set_body(b"")
    }

    pub fn make_get_request(&mut self, url: &str) -> &mut Self {
        self.set_begin("GET", url, HTTP_1_1).set_body(b"")
    }

    pub fn make_post_request(&mut self, url: &str, content: &[u8], content_type: &str) -> &mut Self {
        self.make_request_with_content("POST", url, content, content_type)
    }

    pub fn make_put_request(&mut self, url: &str, content: &[u8], content_type: &str) -> &mut Self {
        self.make_request_with_content("PUT", url, content, content_type)
    }

    pub fn make_delete_request(&mut self, url: &str) -> &mut Self {
        self.set_begin("DELETE", url, HTTP_1_1).set_body(b"")
    }

    pub fn make_options_request(&mut self, url: &str) -> &mut Self {
        self.set_begin("OPTIONS", url, HTTP_1_1).set_body(b"")
    }

    pub fn make_trace_request(&mut self, url: &str) -> &mut Self {
        self.set_begin("TRACE", url, HTTP_1_1).set_body(b"")
    }

    fn make_request_with_content(&mut self, method: &str, url: &str, content: &[u8], content_type: &str) -> &mut Self {
        self.set_begin(method, url, HTTP_1_1);
        if !content_type.is_empty() {
            self.set_header("Content-Type", content_type);
        }
        self.set_body(content)
    }

    /// A plain text POST, the common case of [`make_post_request`](Request::make_post_request).
    pub fn make_text_post_request(&mut self, url: &str, content: &str) -> &mut Self {
        self.make_post_request(url, content.as_bytes(), TEXT_PLAIN_UTF8)
    }
}

impl From<Request> for Bytes {
    fn from(request: Request) -> Self {
        request.into_bytes()
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method())
            .field("url", &self.url())
            .field("protocol", &self.protocol())
            .field("headers", &self.headers().collect::<Vec<_>>())
            .field("body_length", &self.body_length())
            .finish()
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.cache()))
    }
}
