//! Decoder core shared by [`RequestDecoder`](crate::codec::RequestDecoder) and
//! [`ResponseDecoder`](crate::codec::ResponseDecoder).
//!
//! The decoder runs in two phases:
//!
//! 1. head: start line and headers, via [`HeadDecoder`]
//! 2. body: framing picked from the headers, via [`PayloadDecoder`]
//!
//! When the body completes, the consumed region is split off the receive buffer and becomes the
//! message buffer, so every span recorded along the way stays valid without copying. Whatever
//! follows in the receive buffer is left for the next message.

use bytes::BytesMut;

use crate::codec::ParseState;
use crate::codec::body::{BodyRange, PayloadDecoder};
use crate::codec::header::{HeadDecoder, StartLine};
use crate::protocol::{HeaderSpan, MessageBuffer, ParseError};

pub(crate) struct DecodedMessage<L> {
    pub(crate) start_line: L,
    pub(crate) buffer: MessageBuffer,
}

#[derive(Debug)]
struct Pending<L> {
    start_line: L,
    headers: Vec<HeaderSpan>,
    payload: PayloadDecoder,
}

impl<L> Pending<L> {
    fn finish(self, src: &mut BytesMut, range: BodyRange) -> DecodedMessage<L> {
        let mut cache = src.split_to(range.consumed);
        // drop chunk framing left behind the compacted body
        cache.truncate(range.body.end());

        let buffer = MessageBuffer::from_parts(cache, self.headers, range.body, range.body.len());
        DecodedMessage { start_line: self.start_line, buffer }
    }
}

#[derive(Debug)]
pub(crate) struct MessageDecoder<L> {
    head: HeadDecoder<L>,
    pending: Option<Pending<L>>,
    completed: bool,
}

impl<L: StartLine> MessageDecoder<L> {
    pub(crate) fn new() -> Self {
        Self { head: HeadDecoder::new(), pending: None, completed: false }
    }

    pub(crate) fn state(&self) -> ParseState {
        match &self.pending {
            Some(pending) => pending.payload.state(),
            None if self.completed => ParseState::Complete,
            None => self.head.state(),
        }
    }

    pub(crate) fn decode(&mut self, src: &mut BytesMut) -> Result<Option<DecodedMessage<L>>, ParseError> {
        self.completed = false;
        if self.pending.is_none() {
            let Some(head) = self.head.decode(src)? else {
                return Ok(None);
            };
            self.pending = Some(Pending {
                start_line: head.start_line,
                headers: head.headers,
                payload: PayloadDecoder::new(head.framing, head.body_offset),
            });
        }

        let range = match self.pending.as_mut() {
            Some(pending) => pending.payload.decode(src)?,
            None => None,
        };
        Ok(range.and_then(|range| self.finish(src, range)))
    }

    fn finish(&mut self, src: &mut BytesMut, range: BodyRange) -> Option<DecodedMessage<L>> {
        let message = self.pending.take().map(|pending| pending.finish(src, range));
        self.completed = message.is_some();
        message
    }

    pub(crate) fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<DecodedMessage<L>>, ParseError> {
        if let Some(message) = self.decode(src)? {
            return Ok(Some(message));
        }

        let range = match self.pending.as_mut() {
            Some(pending) => pending.payload.decode_eof(src)?,
            None if src.is_empty() => return Ok(None),
            None => return Err(ParseError::unexpected_eof(self.head.state())),
        };
        Ok(range.and_then(|range| self.finish(src, range)))
    }
}
