//! Body framing for decoded messages.
//!
//! Once the head is parsed, [`PayloadDecoder`] picks one of the framings below and reports where
//! the body lives in the receive buffer:
//!
//! - [`Framing::Length`]: exactly `Content-Length` bytes
//! - [`Framing::Chunked`]: chunked transfer encoding, compacted in place
//! - [`Framing::UntilClose`]: everything until the peer closes (responses only)
//! - [`Framing::Empty`]: no body at all

mod chunked_decoder;
mod length_decoder;

use bytes::BytesMut;

use crate::codec::ParseState;
use crate::protocol::{ParseError, Span};
use chunked_decoder::ChunkedDecoder;
use length_decoder::LengthDecoder;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Framing {
    Length(usize),
    Chunked,
    UntilClose,
    Empty,
}

/// Location of a completed body within the receive buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct BodyRange {
    /// The body bytes, after any chunk framing was removed.
    pub(crate) body: Span,
    /// Number of wire bytes the whole message occupied.
    pub(crate) consumed: usize,
}

impl BodyRange {
    pub(crate) fn new(body: Span, consumed: usize) -> Self {
        debug_assert!(body.end() <= consumed);
        Self { body, consumed }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PayloadDecoder {
    kind: Kind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    Length(LengthDecoder),
    Chunked(ChunkedDecoder),
    UntilClose { body_offset: usize },
    NoBody { body_offset: usize },
}

impl PayloadDecoder {
    pub(crate) fn new(framing: Framing, body_offset: usize) -> Self {
        let kind = match framing {
            Framing::Length(length) => Kind::Length(LengthDecoder::new(body_offset, length)),
            Framing::Chunked => Kind::Chunked(ChunkedDecoder::new(body_offset)),
            Framing::UntilClose => Kind::UntilClose { body_offset },
            Framing::Empty => Kind::NoBody { body_offset },
        };
        Self { kind }
    }

    pub(crate) fn state(&self) -> ParseState {
        match &self.kind {
            Kind::Length(_) => ParseState::BodyFixedLength,
            Kind::Chunked(_) => ParseState::BodyChunked,
            Kind::UntilClose { .. } => ParseState::BodyUntilClose,
            Kind::NoBody { .. } => ParseState::NoBody,
        }
    }

    pub(crate) fn decode(&mut self, src: &mut BytesMut) -> Result<Option<BodyRange>, ParseError> {
        match &mut self.kind {
            Kind::Length(decoder) => Ok(decoder.decode(src.len())),
            Kind::Chunked(decoder) => decoder.decode(&mut src[..]),
            Kind::UntilClose { .. } => Ok(None),
            Kind::NoBody { body_offset } => Ok(Some(BodyRange::new(Span::new(*body_offset, 0), *body_offset))),
        }
    }

    /// Called once the peer closed; only a body read until close can complete here.
    pub(crate) fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<BodyRange>, ParseError> {
        if let Some(range) = self.decode(src)? {
            return Ok(Some(range));
        }

        match &self.kind {
            Kind::UntilClose { body_offset } => Ok(Some(BodyRange::new(Span::range(*body_offset, src.len()), src.len()))),
            _ => Err(ParseError::unexpected_eof(self.state())),
        }
    }
}
