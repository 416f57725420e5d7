//! Message representation for line-based header + body protocols.
//!
//! # Architecture
//!
//! - **Spans** ([`span`]): `(offset, length)` references used instead of substring copies
//!   - [`Span`]: one field
//!   - [`HeaderSpan`]: one header line, key and value
//!
//! - **Messages** ([`request`], [`response`]): each owns exactly one contiguous buffer
//!   - [`Request`]: `METHOD URL PROTOCOL` start line, headers, body
//!   - [`Response`]: `PROTOCOL STATUS PHRASE` start line, headers, body
//!
//! - **Status table** ([`status`]): fixed status code to reason phrase mapping
//!
//! - **Errors** ([`error`]): [`ParseError`] for malformed wire data
//!
//! # Zero copy
//!
//! Building a message appends to its buffer exactly once; sending it freezes that buffer into
//! [`bytes::Bytes`] for the send queue. Parsing a message splits the consumed region off the
//! receive buffer and keeps it as the message buffer, so neither direction copies header or body
//! content.

mod buffer;

mod span;
pub use span::HeaderSpan;
pub use span::Span;

mod request;
pub use request::Request;

mod response;
pub use response::Response;

mod status;
pub use status::UNKNOWN_STATUS_PHRASE;
pub use status::status_phrase;
pub(crate) use status::status_has_no_body;

mod error;
pub use error::ParseError;

pub(crate) use buffer::MessageBuffer;

/// Protocol token written by the convenience constructors.
pub const HTTP_1_1: &str = "HTTP/1.1";

/// Content type written by the plain text convenience constructors.
pub const TEXT_PLAIN_UTF8: &str = "text/plain; charset=UTF-8";
