//! Incremental decoder for the start line and header section of a message.
//!
//! The decoder scans the receive buffer line by line and records spans instead of copying
//! anything. It keeps two cursors between calls:
//!
//! - `line_start`: where the line currently being assembled begins
//! - `scanned`: how far that line has already been searched for its terminator
//!
//! so bytes are never searched twice, however the input is fragmented. Offsets are relative to
//! the start of the buffer handed to [`HeadDecoder::decode`]; the caller must keep passing the
//! same buffer, without consuming from its front, until the whole message is split off.

use std::fmt;

use bytes::{Buf, BytesMut};
use tracing::trace;

use crate::codec::ParseState;
use crate::codec::body::Framing;
use crate::protocol::{HeaderSpan, ParseError, Span, status_has_no_body};
use crate::utils::find_byte;
use crate::ensure;

/// A start line grammar.
pub(crate) trait StartLine: Copy + fmt::Debug {
    fn parse(buf: &[u8], line: Span) -> Result<Self, ParseError>;

    /// The status code, for status lines.
    fn status(&self) -> Option<u16>;
}

/// `METHOD URL PROTOCOL`
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct RequestLine {
    pub(crate) method: Span,
    pub(crate) url: Span,
    pub(crate) protocol: Span,
}

/// `PROTOCOL STATUS PHRASE`, the phrase may be empty
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct StatusLine {
    pub(crate) protocol: Span,
    pub(crate) status: u16,
    pub(crate) phrase: Span,
}

/// A fully decoded head: start line, header table and where the body begins.
#[derive(Debug)]
pub(crate) struct ParsedHead<L> {
    pub(crate) start_line: L,
    pub(crate) headers: Vec<HeaderSpan>,
    pub(crate) body_offset: usize,
    pub(crate) framing: Framing,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum HeadState {
    StartLine,
    Headers,
}

#[derive(Debug)]
pub(crate) struct HeadDecoder<L> {
    state: HeadState,
    line_start: usize,
    scanned: usize,
    start_line: Option<L>,
    headers: Vec<HeaderSpan>,
}

impl<L: StartLine> HeadDecoder<L> {
    pub(crate) fn new() -> Self {
        Self { state: HeadState::StartLine, line_start: 0, scanned: 0, start_line: None, headers: Vec::new() }
    }

    pub(crate) fn state(&self) -> ParseState {
        match self.state {
            HeadState::StartLine => ParseState::StartLine,
            HeadState::Headers => ParseState::Headers,
        }
    }

    /// Attempts to decode a complete head from `src`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(head))` once the blank line ending the header section was seen
    /// - `Ok(None)` if more data is needed; progress is kept for the next call
    /// - `Err(ParseError)` if the start line or a header line is malformed
    pub(crate) fn decode(&mut self, src: &mut BytesMut) -> Result<Option<ParsedHead<L>>, ParseError> {
        loop {
            let line_end = match find_byte(&src[self.scanned..], b'\n') {
                Some(index) => self.scanned + index,
                None => {
                    self.scanned = src.len();
                    return Ok(None);
                }
            };

            let content_end = if line_end > self.line_start && src[line_end - 1] == b'\r' { line_end - 1 } else { line_end };
            let line = Span::range(self.line_start, content_end);
            let next_line = line_end + 1;

            match self.state {
                HeadState::StartLine if line.is_empty() => {
                    // tolerate stray line terminators between pipelined messages
                    src.advance(next_line);
                    self.line_start = 0;
                    self.scanned = 0;
                    continue;
                }
                HeadState::StartLine => {
                    self.start_line = Some(L::parse(src, line)?);
                    self.state = HeadState::Headers;
                }
                HeadState::Headers if line.is_empty() => {
                    let start_line = match self.start_line.take() {
                        Some(start_line) => start_line,
                        None => return Err(ParseError::invalid_start_line("missing start line")),
                    };
                    let headers = std::mem::take(&mut self.headers);
                    let framing = select_framing(start_line.status(), &headers, src, next_line)?;
                    trace!(head_size = next_line, headers = headers.len(), ?framing, "parsed message head");

                    self.reset();
                    return Ok(Some(ParsedHead { start_line, headers, body_offset: next_line, framing }));
                }
                HeadState::Headers => {
                    self.headers.push(parse_header_line(src, line)?);
                }
            }

            self.line_start = next_line;
            self.scanned = next_line;
        }
    }

    pub(crate) fn reset(&mut self) {
        self.state = HeadState::StartLine;
        self.line_start = 0;
        self.scanned = 0;
        self.start_line = None;
        self.headers.clear();
    }
}

fn is_whitespace(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

/// Splits off the token starting at `from`, returning its end and the start of the next token.
fn next_token(bytes: &[u8], from: usize) -> (usize, usize) {
    let token_end = bytes[from..].iter().position(|b| is_whitespace(*b)).map_or(bytes.len(), |i| from + i);
    let next_start = bytes[token_end..].iter().position(|b| !is_whitespace(*b)).map_or(bytes.len(), |i| token_end + i);
    (token_end, next_start)
}

/// Splits a start line on its first two whitespace runs into three spans.
fn split_start_line(buf: &[u8], line: Span) -> Result<(Span, Span, Span), ParseError> {
    let bytes = line.slice(buf);
    ensure!(std::str::from_utf8(bytes).is_ok(), ParseError::invalid_start_line("start line is not valid utf-8"));

    let (first_end, second_start) = next_token(bytes, 0);
    let (second_end, third_start) = next_token(bytes, second_start);

    ensure!(first_end > 0, ParseError::invalid_start_line("start line begins with whitespace"));
    ensure!(second_end > second_start, ParseError::invalid_start_line("start line has a single token"));

    let base = line.offset();
    Ok((
        Span::new(base, first_end),
        Span::range(base + second_start, base + second_end),
        Span::range(base + third_start, line.end()),
    ))
}

impl StartLine for RequestLine {
    fn parse(buf: &[u8], line: Span) -> Result<Self, ParseError> {
        let (method, url, protocol) = split_start_line(buf, line)?;

        let protocol_bytes = protocol.slice(buf);
        ensure!(!protocol_bytes.is_empty(), ParseError::invalid_start_line("request line misses the protocol"));
        ensure!(
            !protocol_bytes.iter().any(|b| is_whitespace(*b)),
            ParseError::invalid_start_line("request line has more than three tokens")
        );
        Ok(Self { method, url, protocol })
    }

    fn status(&self) -> Option<u16> {
        None
    }
}

impl StartLine for StatusLine {
    fn parse(buf: &[u8], line: Span) -> Result<Self, ParseError> {
        let (protocol, status, phrase) = split_start_line(buf, line)?;

        let status_bytes = status.slice(buf);
        ensure!(status_bytes.iter().all(u8::is_ascii_digit), ParseError::invalid_start_line("status code is not numeric"));
        let status = std::str::from_utf8(status_bytes)
            .ok()
            .and_then(|s| s.parse::<u16>().ok())
            .ok_or_else(|| ParseError::invalid_start_line("status code out of range"))?;
        Ok(Self { protocol, status, phrase })
    }

    fn status(&self) -> Option<u16> {
        Some(self.status)
    }
}

/// Splits a header line on its first colon; the value loses a single leading space.
fn parse_header_line(buf: &[u8], line: Span) -> Result<HeaderSpan, ParseError> {
    let bytes = line.slice(buf);
    ensure!(std::str::from_utf8(bytes).is_ok(), ParseError::invalid_header("header line is not valid utf-8"));

    let colon = find_byte(bytes, b':').ok_or_else(|| ParseError::invalid_header("header line without colon"))?;
    ensure!(colon > 0, ParseError::invalid_header("empty header name"));

    let value_start = if bytes.get(colon + 1) == Some(&b' ') { colon + 2 } else { colon + 1 };
    let base = line.offset();
    Ok(HeaderSpan::new(Span::new(base, colon), Span::range(base + value_start, line.end())))
}

/// Determines how the body of a message is delimited.
///
/// - `Transfer-Encoding` whose last coding is `chunked`: chunked body
/// - otherwise `Content-Length`: fixed length body
/// - otherwise responses read until the connection closes, requests have no body
///
/// Responses with a 1xx, 204 or 304 status never carry a body. Header names are matched
/// ignoring ASCII case. A length whose end would overflow past `body_offset` is rejected.
fn select_framing(status: Option<u16>, headers: &[HeaderSpan], buf: &[u8], body_offset: usize) -> Result<Framing, ParseError> {
    let is_response = match status {
        Some(status) if status_has_no_body(status) => return Ok(Framing::Empty),
        Some(_) => true,
        None => false,
    };

    let mut chunked = false;
    let mut content_length: Option<usize> = None;

    for header in headers {
        let key = header.key.slice(buf);
        let value = header.value.slice(buf);

        if key.eq_ignore_ascii_case(b"transfer-encoding") {
            chunked = is_chunked(value);
        } else if key.eq_ignore_ascii_case(b"content-length") {
            let length = parse_content_length(value)?;
            match content_length {
                Some(previous) if previous != length => {
                    return Err(ParseError::invalid_content_length(format!("conflicting values {previous} and {length}")));
                }
                _ => content_length = Some(length),
            }
        }
    }

    Ok(match (chunked, content_length) {
        (true, _) => Framing::Chunked,
        (false, Some(length)) => {
            ensure!(
                body_offset.checked_add(length).is_some(),
                ParseError::invalid_content_length(format!("length {length} overflows the buffer"))
            );
            Framing::Length(length)
        }
        (false, None) if is_response => Framing::UntilClose,
        (false, None) => Framing::Empty,
    })
}

fn parse_content_length(value: &[u8]) -> Result<usize, ParseError> {
    let text = std::str::from_utf8(value.trim_ascii()).map_err(|_| ParseError::invalid_content_length("value is not utf-8"))?;
    text.parse::<usize>().map_err(|_| ParseError::invalid_content_length(format!("value {text} is not a length")))
}

/// Checks if a `Transfer-Encoding` value ends with the chunked coding.
fn is_chunked(value: &[u8]) -> bool {
    const CHUNKED: &[u8] = b"chunked";
    match value.rsplit(|b| *b == b',').next() {
        Some(last) => last.trim_ascii().eq_ignore_ascii_case(CHUNKED),
        None => false,
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
    fn check_is_chunked() {
        assert!(!is_chunked(b""));
        assert!(is_chunked(b"chunked"));
        assert!(is_chunked(b"gzip, chunked"));
        assert!(is_chunked(b"Chunked"));
        assert!(!is_chunked(b"chunked, gzip"));
        assert!(!is_chunked(b"gzip"));
    }

    #[test]
    fn from_curl() {
        let mut buf = crlf(indoc! {"
        GET /index.html HTTP/1.1
        Host: 127.0.0.1:8080
        User-Agent: curl/7.79.1
        Accept: */*

        "});

        let head = HeadDecoder::<RequestLine>::new().decode(&mut buf).unwrap().unwrap();

        let RequestLine { method, url, protocol } = head.start_line;
        assert_eq!(method.slice(&buf), b"GET");
        assert_eq!(url.slice(&buf), b"/index.html");
        assert_eq!(protocol.slice(&buf), b"HTTP/1.1");

        assert_eq!(head.headers.len(), 3);
        assert_eq!(head.headers[0].key.slice(&buf), b"Host");
        assert_eq!(head.headers[0].value.slice(&buf), b"127.0.0.1:8080");
        assert_eq!(head.headers[2].value.slice(&buf), b"*/*");
        assert_eq!(head.body_offset, buf.len());
        assert_eq!(head.framing, Framing::Empty);
    }

    #[test]
    fn resumes_without_losing_progress() {
        let wire = crlf("GET / HTTP/1.1\nHost: a\n\n");
        let mut buf = BytesMut::new();
        let mut decoder = HeadDecoder::<RequestLine>::new();

        for (i, byte) in wire.iter().enumerate() {
            buf.extend_from_slice(&[*byte]);
            let result = decoder.decode(&mut buf).unwrap();
            if i + 1 < wire.len() {
                assert!(result.is_none());
                assert!(decoder.scanned <= buf.len());
            } else {
                let head = result.unwrap();
                assert_eq!(head.headers.len(), 1);
                assert_eq!(head.body_offset, wire.len());
            }
        }
    }

    #[test]
    fn value_loses_one_leading_space() {
        let mut buf = crlf("HTTP/1.1 200 OK\nX-A:  two spaces\nX-B:none\n\n");
        let head = HeadDecoder::<StatusLine>::new().decode(&mut buf).unwrap().unwrap();
        assert_eq!(head.headers[0].value.slice(&buf), b" two spaces");
        assert_eq!(head.headers[1].value.slice(&buf), b"none");
    }

    #[test]
    fn response_phrase_keeps_inner_whitespace() {
        let mut buf = crlf("HTTP/1.1 404 Not Found\n\n");
        let head = HeadDecoder::<StatusLine>::new().decode(&mut buf).unwrap().unwrap();
        let StatusLine { protocol, status, phrase } = head.start_line;
        assert_eq!(protocol.slice(&buf), b"HTTP/1.1");
        assert_eq!(status, 404);
        assert_eq!(phrase.slice(&buf), b"Not Found");
        assert_eq!(head.framing, Framing::UntilClose);
    }

    #[test]
    fn skips_leading_blank_lines() {
        let mut buf = crlf("\n\nGET / HTTP/1.1\n\n");
        let head = HeadDecoder::<RequestLine>::new().decode(&mut buf).unwrap().unwrap();
        assert_eq!(&buf[..], b"GET / HTTP/1.1\r\n\r\n");
        assert_eq!(head.body_offset, buf.len());
    }

    #[test]
    fn malformed_lines() {
        let requests = ["GET\n\n", "GET /\n\n", " GET / HTTP/1.1\n\n", "GET / HTTP/1.1 extra\n\n", "GET / HTTP/1.1\nno colon\n\n"];
        for text in requests {
            let mut buf = crlf(text);
            assert!(HeadDecoder::<RequestLine>::new().decode(&mut buf).is_err(), "{text:?} should be rejected");
        }

        let responses = ["HTTP/1.1 abc OK\n\n", "HTTP/1.1 99999 Big\n\n", "HTTP/1.1 200 OK\n: empty key\n\n"];
        for text in responses {
            let mut buf = crlf(text);
            assert!(HeadDecoder::<StatusLine>::new().decode(&mut buf).is_err(), "{text:?} should be rejected");
        }
    }

    #[test]
    fn rejects_invalid_utf8() {
        let mut buf = BytesMut::from(&b"GET /\xff HTTP/1.1\r\n\r\n"[..]);
        assert!(matches!(
            HeadDecoder::<RequestLine>::new().decode(&mut buf),
            Err(ParseError::InvalidStartLine { .. })
        ));
    }

    #[test]
    fn framing_selection() {
        fn request(text: &str) -> Result<Framing, ParseError> {
            let mut buf = crlf(text);
            HeadDecoder::<RequestLine>::new().decode(&mut buf).map(|head| head.unwrap().framing)
        }
        fn response(text: &str) -> Result<Framing, ParseError> {
            let mut buf = crlf(text);
            HeadDecoder::<StatusLine>::new().decode(&mut buf).map(|head| head.unwrap().framing)
        }

        assert_eq!(request("POST / HTTP/1.1\nContent-Length: 12\n\n").unwrap(), Framing::Length(12));
        assert_eq!(request("POST / HTTP/1.1\ncontent-length:  7 \n\n").unwrap(), Framing::Length(7));
        assert_eq!(
            request("POST / HTTP/1.1\nTransfer-Encoding: gzip, chunked\nContent-Length: 3\n\n").unwrap(),
            Framing::Chunked
        );
        assert_eq!(request("POST / HTTP/1.1\n\n").unwrap(), Framing::Empty);
        assert_eq!(response("HTTP/1.1 200 OK\n\n").unwrap(), Framing::UntilClose);
        assert_eq!(response("HTTP/1.1 204 No Content\nContent-Length: 5\n\n").unwrap(), Framing::Empty);
        assert_eq!(response("HTTP/1.1 304 Not Modified\n\n").unwrap(), Framing::Empty);

        assert!(request("POST / HTTP/1.1\nContent-Length: abc\n\n").is_err());
        assert!(request("POST / HTTP/1.1\nContent-Length: 1\nContent-Length: 2\n\n").is_err());
        assert!(matches!(
            request(&format!("POST / HTTP/1.1\nContent-Length: {}\n\n", usize::MAX)),
            Err(ParseError::InvalidContentLength { .. })
        ));
        assert!(matches!(
            request(&format!("POST / HTTP/1.1\nContent-Length: {}\n\n", usize::MAX - 10)),
            Err(ParseError::InvalidContentLength { .. })
        ));
    }
}
