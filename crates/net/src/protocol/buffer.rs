//! The single contiguous buffer backing one request or response.
//!
//! Every textual field of a message is recorded as a [`Span`] into this buffer instead of being
//! copied out. Spans recorded here are never invalidated until [`MessageBuffer::clear`]: the
//! buffer only grows by appending.

use bytes::{BufMut, Bytes, BytesMut};

use crate::protocol::{HeaderSpan, Span};

pub(crate) const CRLF: &[u8] = b"\r\n";
pub(crate) const CONTENT_LENGTH: &str = "Content-Length";

#[derive(Clone, Default, PartialEq, Eq)]
pub(crate) struct MessageBuffer {
    cache: BytesMut,
    headers: Vec<HeaderSpan>,
    body: Span,
    body_length: usize,
}

impl MessageBuffer {
    /// Wraps bytes split off the wire by a decoder.
    ///
    /// The decoder guarantees every span lies inside `cache` and that every header span covers
    /// UTF-8 text.
    pub(crate) fn from_parts(cache: BytesMut, headers: Vec<HeaderSpan>, body: Span, body_length: usize) -> Self {
        debug_assert!(headers.iter().all(|h| h.key.end() <= cache.len() && h.value.end() <= cache.len()));
        debug_assert!(body.end() <= cache.len());
        Self { cache, headers, body, body_length }
    }

    pub(crate) fn clear(&mut self) {
        self.cache.clear();
        self.headers.clear();
        self.body = Span::EMPTY;
        self.body_length = 0;
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.cache.len()
    }

    #[inline]
    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.cache
    }

    pub(crate) fn freeze(self) -> Bytes {
        self.cache.freeze()
    }

    /// Appends `bytes` and returns the span they occupy.
    pub(crate) fn append(&mut self, bytes: &[u8]) -> Span {
        let offset = self.cache.len();
        self.cache.put_slice(bytes);
        Span::new(offset, bytes.len())
    }

    /// Appends the decimal form of `value` and returns its span.
    pub(crate) fn append_decimal(&mut self, value: u64) -> Span {
        let mut digits = [0u8; 20];
        let mut pos = digits.len();
        let mut rest = value;
        loop {
            pos -= 1;
            digits[pos] = b'0' + (rest % 10) as u8;
            rest /= 10;
            if rest == 0 {
                break;
            }
        }
        self.append(&digits[pos..])
    }

    pub(crate) fn set_header(&mut self, key: &str, value: &str) {
        let key = self.append(key.as_bytes());
        self.cache.put_slice(b": ");
        let value = self.append(value.as_bytes());
        self.cache.put_slice(CRLF);
        self.headers.push(HeaderSpan::new(key, value));
    }

    fn set_content_length(&mut self, length: usize) {
        let key = self.append(CONTENT_LENGTH.as_bytes());
        self.cache.put_slice(b": ");
        let value = self.append_decimal(length as u64);
        self.cache.put_slice(CRLF);
        self.headers.push(HeaderSpan::new(key, value));
    }

    pub(crate) fn set_body(&mut self, body: &[u8]) {
        if !body.is_empty() {
            self.set_content_length(body.len());
        }
        self.cache.put_slice(CRLF);
        self.body = self.append(body);
        self.body_length = body.len();
    }

    pub(crate) fn set_body_length(&mut self, length: usize) {
        self.set_content_length(length);
        self.cache.put_slice(CRLF);
        self.body = Span::new(self.cache.len(), 0);
        self.body_length = length;
    }

    /// Resolves a span that covers text.
    pub(crate) fn str(&self, span: Span) -> &str {
        let bytes = span.slice(&self.cache);
        debug_assert!(std::str::from_utf8(bytes).is_ok());
        // SAFETY: text spans are recorded either from `&str` arguments of the builder methods or
        // from lines the decoders validated as UTF-8, and the buffer is append-only until
        // `clear`, which also drops every span.
        unsafe { std::str::from_utf8_unchecked(bytes) }
    }

    #[inline]
    pub(crate) fn bytes(&self, span: Span) -> &[u8] {
        span.slice(&self.cache)
    }

    #[inline]
    pub(crate) fn headers_len(&self) -> usize {
        self.headers.len()
    }

    pub(crate) fn header(&self, index: usize) -> Option<(&str, &str)> {
        self.headers.get(index).map(|h| (self.str(h.key), self.str(h.value)))
    }

    pub(crate) fn header_spans(&self) -> &[HeaderSpan] {
        &self.headers
    }

    pub(crate) fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|h| (self.str(h.key), self.str(h.value)))
    }

    pub(crate) fn header_value(&self, key: &str) -> Option<&str> {
        self.headers().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    pub(crate) fn header_value_ignore_case(&self, key: &str) -> Option<&str> {
        self.headers().find(|(k, _)| k.eq_ignore_ascii_case(key)).map(|(_, v)| v)
    }

    #[inline]
    pub(crate) fn body_span(&self) -> Span {
        self.body
    }

    #[inline]
    pub(crate) fn body(&self) -> &[u8] {
        self.bytes(self.body)
    }

    #[inline]
    pub(crate) fn body_length(&self) -> usize {
        self.body_length
    }
}
