/// An `(offset, length)` reference into a message buffer.
///
/// Spans are plain values: they do not borrow the buffer they point into. Messages only hand out
/// the borrowed slices a span resolves to, so a resolved view can never outlive a rebuild of its
/// buffer.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Span {
    offset: usize,
    len: usize,
}

impl Span {
    pub const EMPTY: Span = Span { offset: 0, len: 0 };

    #[inline]
    pub const fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    /// Builds the span covering `start..end`.
    #[inline]
    pub(crate) const fn range(start: usize, end: usize) -> Self {
        Self { offset: start, len: end - start }
    }

    #[inline]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Offset one past the last byte of the span.
    #[inline]
    pub const fn end(&self) -> usize {
        self.offset + self.len
    }

    /// Resolves the span against `buf`.
    ///
    /// # Panics
    ///
    /// Panics if the span is out of bounds, which means the span was recorded against another
    /// buffer.
    #[inline]
    pub fn slice<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        &buf[self.offset..self.end()]
    }
}

/// The key and value spans of one header line.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct HeaderSpan {
    pub key: Span,
    pub value: Span,
}

impl HeaderSpan {
    #[inline]
    pub const fn new(key: Span, value: Span) -> Self {
        Self { key, value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_against_buffer() {
        let buf = b"GET /index.html HTTP/1.1";
        let url = Span::new(4, 11);
        assert_eq!(url.slice(buf), b"/index.html");
        assert_eq!(url.end(), 15);
        assert_eq!(Span::range(16, 24).slice(buf), b"HTTP/1.1");
        assert!(Span::EMPTY.slice(buf).is_empty());
    }

    #[test]
    #[should_panic]
    fn out_of_bounds_span_panics() {
        Span::new(20, 10).slice(b"short");
    }
}
