//! Start line and header section decoding.

mod header_decoder;

pub(crate) use header_decoder::{HeadDecoder, RequestLine, StartLine, StatusLine};
