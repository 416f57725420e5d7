//! An asynchronous micro networking runtime with a zero-copy HTTP message codec
//!
//! This crate multiplexes many concurrent TCP (and TLS) connections over a tokio worker pool
//! and pairs every connection with an incremental message parser. It is meant to be embedded
//! by servers and clients that want connection lifecycle, send-queue backpressure and message
//! framing without re-deriving them.
//!
//! # Features
//!
//! - Execution service owning a fixed pool of worker threads
//! - One actor task per session: no concurrent callbacks for the same connection
//! - FIFO send queue with partial-write handling and high/low water mark backpressure
//! - TLS layered over any stream through a pluggable [`transport::TlsEngine`]
//! - Zero-copy request/response messages: one buffer, fields referenced by spans
//! - Incremental decoders for fixed-length, chunked and read-until-close bodies
//! - Pipelined messages on a single connection
//!
//! # Example
//!
//! ```no_run
//! use micro_net::client::HttpClient;
//! use micro_net::protocol::Request;
//! use micro_net::service::ExecutionService;
//!
//! let service = ExecutionService::start().expect("failed to start the execution service");
//! let handle = service.handle();
//!
//! service.block_on(async move {
//!     let client = HttpClient::connect(&handle, "93.184.216.34:80".parse().unwrap()).unwrap();
//!
//!     let mut request = Request::new();
//!     request.set_begin("GET", "/", "HTTP/1.1").set_header("Host", "example.com").set_body("");
//!
//!     let response = client.send_request(request).await.unwrap();
//!     println!("{} {}", response.status(), response.status_phrase());
//!     client.disconnect();
//! });
//!
//! service.stop();
//! ```
//!
//! # Architecture
//!
//! - [`service`]: worker pool, operation submission and completion delivery
//! - [`transport`]: plain and secure byte transports, the send queue
//! - [`session`]: connection lifecycle, backpressure and receive-buffer limits
//! - [`handler`]: the callback interface a session reports to
//! - [`protocol`]: span-based [`protocol::Request`] and [`protocol::Response`] messages
//! - [`codec`]: incremental [`codec::RequestDecoder`] and [`codec::ResponseDecoder`]
//! - [`server`] and [`client`]: accept loop, session table, connect retry, HTTP client
//!
//! # Error Handling
//!
//! - [`NetError`]: top-level error type, classified by [`ErrorKind`]
//! - [`protocol::ParseError`]: malformed wire data
//! - [`transport::TlsError`]: failures reported by the TLS engine
//!
//! # Limitations
//!
//! - HTTP/1.x style line framing only
//! - No bundled TLS engine, callers plug their own implementation
//! - TCP only

pub mod client;
pub mod codec;
pub mod handler;
pub mod protocol;
pub mod server;
pub mod service;
pub mod session;
pub mod transport;

mod error;
pub use error::{DisconnectReason, ErrorKind, NetError};

mod utils;
pub(crate) use utils::ensure;
