//! Connection lifecycle.
//!
//! A session pairs one transport with a decoder and a [`SessionHandler`](crate::handler::SessionHandler):
//!
//! - [`Session`]: starts the actor task, from a connect future or an accepted transport
//! - [`SessionHandle`]: cloneable, thread-safe reference used to send and disconnect
//! - [`SessionState`]: `Connecting -> Connected -> Disconnecting -> Disconnected`
//! - [`SessionConfig`]: receive buffer limit, send water marks, flush on disconnect
//!
//! # Example
//!
//! ```no_run
//! use micro_net::codec::RequestDecoder;
//! use micro_net::handler::make_handler;
//! use micro_net::protocol::{Request, Response};
//! use micro_net::service::ExecutionService;
//! use micro_net::session::{Session, SessionConfig};
//! use micro_net::transport::TcpTransport;
//!
//! let service = ExecutionService::start().unwrap();
//! let handle = service.handle();
//!
//! let session = Session::spawn(
//!     &handle,
//!     SessionConfig::default(),
//!     TcpTransport::connect("127.0.0.1:8080"),
//!     RequestDecoder::new(),
//!     make_handler(|session, request: Request| {
//!         let mut response = Response::new();
//!         response.make_get_response(request.url().as_bytes(), "text/plain");
//!         let _ = session.send(response);
//!     }),
//! )
//! .unwrap();
//!
//! service.block_on(session.closed());
//! service.stop();
//! ```

mod config;
mod handle;
#[allow(clippy::module_inception)]
mod session;
mod state;

pub use config::SessionConfig;
pub use handle::SessionHandle;
pub use session::Session;
pub use state::{SessionId, SessionState};
