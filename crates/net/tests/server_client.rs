mod common;

use std::net::SocketAddr;
use std::time::Duration;

use common::{Event, XorEngine, eventually, events_until_disconnected, next_event, recorder};
use micro_net::client::{Client, HttpClient, RetryPolicy};
use micro_net::codec::RequestDecoder;
use micro_net::handler::make_handler;
use micro_net::protocol::{Request, Response};
use micro_net::server::{Server, ServerConfig, TlsAcceptor};
use micro_net::service::{ExecutionService, ServiceConfig, ServiceHandle};
use micro_net::session::SessionHandle;
use micro_net::{DisconnectReason, ErrorKind};
use tokio_util::codec::BytesCodec;

fn localhost() -> ServerConfig {
    ServerConfig::new("127.0.0.1:0".parse().unwrap())
}

/// Answers every request with its own url as the body.
fn echo_url(_peer: SocketAddr) -> (RequestDecoder, impl micro_net::handler::SessionHandler<Request>) {
    let handler = make_handler(|session: &SessionHandle, request: Request| {
        let mut response = Response::new();
        response.make_get_response(request.url().as_bytes(), "text/plain");
        session.send(response).unwrap();
    });
    (RequestDecoder::new(), handler)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn http_client_round_trip() {
    let service = ServiceHandle::current().unwrap();
    let mut server = Server::new(service.clone(), localhost(), echo_url);
    let addr = server.start().await.unwrap();
    assert_eq!(server.local_addr(), Some(addr));

    let client = HttpClient::connect(&service, addr).unwrap();

    let mut request = Request::new();
    request.set_begin("GET", "/hello", "HTTP/1.1").set_header("Host", "localhost").set_body("");
    let response = client.send_request(request).await.unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.status_phrase(), "OK");
    assert_eq!(response.header_value("Content-Type"), Some("text/plain"));
    assert_eq!(response.body(), b"/hello");
    assert_eq!(server.session_count(), 1);

    client.disconnect();
    client.closed().await;
    eventually(|| server.session_count() == 0).await;
    server.stop();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_requests_are_matched_in_order() {
    let service = ServiceHandle::current().unwrap();
    let mut server = Server::new(service.clone(), localhost(), echo_url);
    let addr = server.start().await.unwrap();
    let client = HttpClient::connect(&service, addr).unwrap();

    let requests = (0..8).map(|i| {
        let mut request = Request::new();
        request.make_get_request(&format!("/item/{i}"));
        client.send_request(request)
    });
    let responses = futures::future::join_all(requests).await;

    for (i, response) in responses.into_iter().enumerate() {
        assert_eq!(response.unwrap().body(), format!("/item/{i}").as_bytes());
    }
    server.stop();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn pending_request_fails_when_the_server_hangs_up() {
    let service = ServiceHandle::current().unwrap();
    let mut server = Server::new(service.clone(), localhost(), |_peer: SocketAddr| {
        (RequestDecoder::new(), make_handler(|session: &SessionHandle, _request: Request| session.disconnect()))
    });
    let addr = server.start().await.unwrap();
    let client = HttpClient::connect(&service, addr).unwrap();

    let mut request = Request::new();
    request.make_get_request("/");
    let error = client.send_request(request).await.unwrap_err();
    assert_eq!(error.to_string(), "session disconnected: peer closed");

    client.closed().await;
    let mut request = Request::new();
    request.make_get_request("/");
    assert_eq!(client.send_request(request).await.unwrap_err().kind(), ErrorKind::InvalidHandle);
    server.stop();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn multicast_reaches_every_session() {
    let service = ServiceHandle::current().unwrap();
    let mut server = Server::new(service.clone(), localhost(), |_peer: SocketAddr| {
        (BytesCodec::new(), make_handler(|_session: &SessionHandle, _bytes: bytes::BytesMut| {}))
    });
    let addr = server.start().await.unwrap();

    let client = Client::new(service.clone());
    let mut peers = Vec::new();
    for _ in 0..3 {
        let (handler, mut events) = recorder();
        let session = client.connect(addr, BytesCodec::new(), handler).unwrap();
        assert!(matches!(next_event(&mut events).await, Event::Connected));
        peers.push((session, events));
    }

    eventually(|| server.session_count() == 3).await;
    let ids: Vec<_> = server.sessions().iter().map(SessionHandle::id).collect();
    assert!(ids.iter().all(|id| server.find_session(*id).is_some()));

    assert_eq!(server.multicast("news"), 3);
    for (_, events) in &mut peers {
        let Event::Message(bytes) = next_event(events).await else { panic!("expected the multicast") };
        assert_eq!(&bytes[..], b"news");
    }

    server.stop();
    for (session, events) in &mut peers {
        let rest = events_until_disconnected(events).await;
        assert!(matches!(rest[..], [Event::Disconnected(DisconnectReason::PeerClosed)]));
        session.closed().await;
    }
    eventually(|| server.session_count() == 0).await;
    assert!(ids.iter().all(|id| server.find_session(*id).is_none()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn tls_server_and_client() {
    let service = ServiceHandle::current().unwrap();
    let mut server =
        Server::new(service.clone(), localhost(), echo_url).with_acceptor(TlsAcceptor::new(|| XorEngine::new(0x33)));
    let addr = server.start().await.unwrap();

    let (handler, mut events) = recorder();
    let session = Client::new(service.clone())
        .connect_secure(addr, || XorEngine::new(0x33), micro_net::codec::ResponseDecoder::new(), handler)
        .unwrap();
    assert!(matches!(next_event(&mut events).await, Event::Connected));

    let mut request = Request::new();
    request.make_get_request("/tls");
    session.send(request).unwrap();

    let Event::Message(response) = next_event(&mut events).await else { panic!("expected a response") };
    assert_eq!(response.body(), b"/tls");

    session.disconnect();
    session.closed().await;
    server.stop();
}

#[tokio::test]
async fn connect_gives_up_after_retries() {
    let service = ServiceHandle::current().unwrap();
    let unused = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };

    let retry = RetryPolicy::new().with_max_attempts(2).with_initial_delay(Duration::from_millis(5));
    let (handler, mut events) = recorder::<bytes::BytesMut>();
    Client::new(service).with_retry_policy(retry).connect(unused, BytesCodec::new(), handler).unwrap();

    let rest = events_until_disconnected(&mut events).await;
    assert!(matches!(rest[..], [Event::Error(ErrorKind::IoError), Event::Disconnected(DisconnectReason::Error(ErrorKind::IoError))]));
}

#[test]
fn server_on_its_own_execution_service() {
    let service = ExecutionService::new(ServiceConfig::new().with_worker_threads(2)).unwrap();
    let handle = service.handle();

    let body = service.block_on(async {
        let mut server = Server::new(handle.clone(), localhost(), echo_url);
        let addr = server.start().await.unwrap();
        assert!(server.start().await.is_err());

        let client = HttpClient::connect(&handle, addr).unwrap();
        let mut request = Request::new();
        request.make_get_request("/pool");
        let response = client.send_request(request).await.unwrap();
        response.body().to_vec()
    });

    assert_eq!(body, b"/pool");
    service.stop();
}
