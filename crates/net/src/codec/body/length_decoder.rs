use crate::codec::body::BodyRange;
use crate::protocol::Span;

/// Waits until a body of a fixed, declared length is buffered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LengthDecoder {
    body_offset: usize,
    length: usize,
}

impl LengthDecoder {
    pub(crate) fn new(body_offset: usize, length: usize) -> Self {
        Self { body_offset, length }
    }

    pub(crate) fn decode(&self, buffered: usize) -> Option<BodyRange> {
        let end = self.body_offset + self.length;
        (buffered >= end).then(|| BodyRange::new(Span::new(self.body_offset, self.length), end))
    }
}
