//! In-place decoder for chunked transfer encoding.
//!
//! Chunk framing (`SIZE[;ext]\r\n DATA \r\n ... 0\r\n [trailers] \r\n`) is stripped by moving each
//! chunk's data backwards over the framing that precedes it, so once the terminating chunk is seen
//! the body sits contiguously right after the header section. Nothing is allocated and the message
//! keeps a single buffer.
//!
//! The decoder keeps two cursors into the receive buffer:
//!
//! - `read`: next wire byte to examine
//! - `write`: end of the compacted body so far, never ahead of `read`

use tracing::trace;

use crate::codec::body::BodyRange;
use crate::protocol::{ParseError, Span};
use ChunkedState::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ChunkedDecoder {
    state: ChunkedState,
    remaining_size: u64,
    body_offset: usize,
    read: usize,
    write: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkedState {
    /// Read the first hex digit of a chunk size
    SizeStart,
    /// Read further hex digits of the chunk size
    Size,
    /// Whitespace after the size
    SizeLws,
    /// Skip chunk extensions
    Extension,
    /// LF ending the size line
    SizeLf,
    /// Chunk data
    Body,
    /// CR after chunk data
    BodyCr,
    /// LF after chunk data
    BodyLf,
    /// Trailer field, ignored
    Trailer,
    /// LF after a trailer field
    TrailerLf,
    /// CR of the final line
    EndCr,
    /// LF of the final line
    EndLf,
    End,
}

impl ChunkedDecoder {
    /// Creates a decoder for a chunked body whose framing starts at `body_offset`.
    pub(crate) fn new(body_offset: usize) -> Self {
        Self { state: SizeStart, remaining_size: 0, body_offset, read: body_offset, write: body_offset }
    }

    /// Advances through the bytes of `src` not examined yet.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(range))` after the terminating chunk; `range.body` is the compacted body and
    ///   `range.consumed` the wire length of the whole message
    /// - `Ok(None)` when more data is needed
    /// - `Err(ParseError)` if the chunk framing is malformed
    pub(crate) fn decode(&mut self, src: &mut [u8]) -> Result<Option<BodyRange>, ParseError> {
        loop {
            if self.state == End {
                trace!(body_size = self.write - self.body_offset, "finished reading chunked data");
                return Ok(Some(BodyRange::new(Span::range(self.body_offset, self.write), self.read)));
            }

            if self.read >= src.len() {
                return Ok(None);
            }

            if self.state == Body {
                self.read_body(src);
                continue;
            }

            let byte = src[self.read];
            self.read += 1;
            self.state = self.state.step(byte, &mut self.remaining_size)?;
        }
    }

    /// Moves as much of the current chunk as is buffered down to the write cursor.
    fn read_body(&mut self, src: &mut [u8]) {
        let available = (src.len() - self.read) as u64;
        let take = self.remaining_size.min(available) as usize;

        if self.read != self.write {
            src.copy_within(self.read..self.read + take, self.write);
        }
        self.read += take;
        self.write += take;
        self.remaining_size -= take as u64;

        if self.remaining_size == 0 {
            self.state = BodyCr;
        }
    }
}

impl ChunkedState {
    fn step(self, byte: u8, size: &mut u64) -> Result<ChunkedState, ParseError> {
        match self {
            SizeStart => Self::read_size_start(byte, size),
            Size => Self::read_size(byte, size),
            SizeLws => Self::read_size_lws(byte),
            Extension => Self::read_extension(byte),
            SizeLf => Self::read_size_lf(byte, *size),
            BodyCr => Self::expect(byte, b'\r', BodyLf, "invalid chunk body CR"),
            BodyLf => Self::expect(byte, b'\n', SizeStart, "invalid chunk body LF"),
            Trailer => Ok(if byte == b'\r' { TrailerLf } else { Trailer }),
            TrailerLf => Self::expect(byte, b'\n', EndCr, "invalid trailer end LF"),
            EndCr => Ok(if byte == b'\r' { EndLf } else { Trailer }),
            EndLf => Self::expect(byte, b'\n', End, "invalid chunk end LF"),
            Body | End => Ok(self),
        }
    }

    fn expect(byte: u8, expected: u8, next: ChunkedState, reason: &'static str) -> Result<ChunkedState, ParseError> {
        if byte == expected { Ok(next) } else { Err(ParseError::invalid_chunk(reason)) }
    }

    fn hex_value(byte: u8) -> Option<u64> {
        match byte {
            b'0'..=b'9' => Some((byte - b'0') as u64),
            b'a'..=b'f' => Some((byte + 10 - b'a') as u64),
            b'A'..=b'F' => Some((byte + 10 - b'A') as u64),
            _ => None,
        }
    }

    /// A size line must start with a hex digit.
    fn read_size_start(byte: u8, size: &mut u64) -> Result<ChunkedState, ParseError> {
        match Self::hex_value(byte) {
            Some(digit) => {
                *size = digit;
                Ok(Size)
            }
            None => Err(ParseError::invalid_chunk("chunk size line without size")),
        }
    }

    fn read_size(byte: u8, size: &mut u64) -> Result<ChunkedState, ParseError> {
        if let Some(digit) = Self::hex_value(byte) {
            *size = size
                .checked_mul(16)
                .and_then(|s| s.checked_add(digit))
                .ok_or_else(|| ParseError::invalid_chunk("chunk size overflow"))?;
            return Ok(Size);
        }

        match byte {
            b'\t' | b' ' => Ok(SizeLws),
            b';' => Ok(Extension),
            b'\r' => Ok(SizeLf),
            _ => Err(ParseError::invalid_chunk("invalid chunk size")),
        }
    }

    fn read_size_lws(byte: u8) -> Result<ChunkedState, ParseError> {
        match byte {
            // no more digits may follow the whitespace
            b'\t' | b' ' => Ok(SizeLws),
            b';' => Ok(Extension),
            b'\r' => Ok(SizeLf),
            _ => Err(ParseError::invalid_chunk("invalid chunk size linear white space")),
        }
    }

    /// Extensions are ignored up to the CR; a bare LF inside them is rejected.
    fn read_extension(byte: u8) -> Result<ChunkedState, ParseError> {
        match byte {
            b'\r' => Ok(SizeLf),
            b'\n' => Err(ParseError::invalid_chunk("chunk extension contains newline")),
            _ => Ok(Extension),
        }
    }

    fn read_size_lf(byte: u8, size: u64) -> Result<ChunkedState, ParseError> {
        match byte {
            b'\n' if size == 0 => Ok(EndCr),
            b'\n' => Ok(Body),
            _ => Err(ParseError::invalid_chunk("invalid chunk size LF")),
        }
    }
}
