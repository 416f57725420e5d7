use bytes::BytesMut;
use indoc::indoc;
use micro_net::codec::{ParseState, RequestDecoder, ResponseDecoder};
use micro_net::protocol::{Request, Response};
use tokio_util::codec::Decoder;

fn built_request() -> Request {
    let mut request = Request::new();
    request
        .set_begin("POST", "/upload?name=a%20b", "HTTP/1.1")
        .set_header("Host", "localhost")
        .set_header("Content-Type", "text/plain")
        .set_body("hello, world");
    request
}

/// Feeds `wire` in pieces of `step` bytes, collecting every decoded message.
fn decode_in_steps<D: Decoder>(decoder: &mut D, wire: &[u8], step: usize) -> Vec<D::Item>
where
    D::Error: std::fmt::Debug,
{
    let mut buffer = BytesMut::new();
    let mut messages = Vec::new();
    for piece in wire.chunks(step) {
        buffer.extend_from_slice(piece);
        while let Some(message) = decoder.decode(&mut buffer).unwrap() {
            messages.push(message);
        }
    }
    assert!(buffer.is_empty());
    messages
}

#[test]
fn built_request_decodes_at_every_split() {
    let wire = built_request().into_bytes();

    for step in 1..=wire.len() {
        let mut decoder = RequestDecoder::new();
        let requests = decode_in_steps(&mut decoder, &wire, step);

        assert_eq!(requests.len(), 1, "step {step}");
        let request = &requests[0];
        assert_eq!(request.method(), "POST");
        assert_eq!(request.url(), "/upload?name=a%20b");
        assert_eq!(request.protocol(), "HTTP/1.1");
        assert_eq!(request.header_value("Host"), Some("localhost"));
        assert_eq!(request.header_value("Content-Length"), Some("12"));
        assert_eq!(request.body(), b"hello, world");
        assert_eq!(request.cache(), &wire[..]);
    }
}

#[test]
fn pipelined_requests_at_every_split() {
    let mut wire = Vec::new();
    for path in ["/one", "/two", "/three"] {
        let mut request = Request::new();
        request.make_get_request(path);
        wire.extend_from_slice(request.cache());
    }

    for step in [1, 3, 7, 64, wire.len()] {
        let mut decoder = RequestDecoder::new();
        let urls: Vec<String> = decode_in_steps(&mut decoder, &wire, step).iter().map(|r| r.url().to_owned()).collect();
        assert_eq!(urls, ["/one", "/two", "/three"], "step {step}");
    }
}

#[test]
fn chunked_response_at_every_split() {
    let wire = indoc! {"
        HTTP/1.1 200 OK\r
        Transfer-Encoding: chunked\r
        \r
        4\r
        Wiki\r
        6;ext=1\r
        pedia \r
        E\r
        in \r
        \r
        chunks.\r
        0\r
        Trailer: x\r
        \r
    "}
    .as_bytes();

    for step in 1..=wire.len() {
        let mut decoder = ResponseDecoder::new();
        let responses = decode_in_steps(&mut decoder, wire, step);

        assert_eq!(responses.len(), 1, "step {step}");
        assert_eq!(responses[0].body(), b"Wikipedia in \r\n\r\nchunks.");
        assert_eq!(responses[0].body_length(), 24);
        assert_eq!(decoder.state(), ParseState::StartLine);
    }
}

#[test]
fn response_until_close() {
    let mut decoder = ResponseDecoder::new();
    let mut buffer = BytesMut::from(&b"HTTP/1.0 200 OK\r\nServer: test\r\n\r\nstreamed "[..]);

    assert!(decoder.decode(&mut buffer).unwrap().is_none());
    assert_eq!(decoder.state(), ParseState::BodyUntilClose);

    buffer.extend_from_slice(b"until close");
    assert!(decoder.decode(&mut buffer).unwrap().is_none());

    let response = decoder.decode_eof(&mut buffer).unwrap().unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.body(), b"streamed until close");
    assert!(decoder.decode_eof(&mut buffer).unwrap().is_none());
}

#[test]
fn built_response_keeps_its_phrase() {
    let mut response = Response::new();
    response.set_begin_with_phrase(418, "I'm a teapot", "HTTP/1.1").set_header("X-Kind", "tea").set_body("short and stout");
    let wire = response.into_bytes();

    let mut decoder = ResponseDecoder::new();
    let decoded = decode_in_steps(&mut decoder, &wire, 5).pop().unwrap();

    assert_eq!(decoded.status(), 418);
    assert_eq!(decoded.status_phrase(), "I'm a teapot");
    assert_eq!(decoded.header_value_ignore_case("x-kind"), Some("tea"));
    assert_eq!(decoded.body(), b"short and stout");
}
