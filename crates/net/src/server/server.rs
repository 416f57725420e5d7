use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tokio::net::TcpListener;
use tokio_util::codec::Decoder;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::handler::SessionHandler;
use crate::server::{Acceptor, PlainAcceptor, ServerConfig};
use crate::service::ServiceHandle;
use crate::session::{Session, SessionConfig, SessionHandle, SessionId};
use crate::{NetError, ensure};

/// Produces the decoder and handler of every accepted session.
///
/// Implemented for closures `Fn(SocketAddr) -> (decoder, handler)`.
pub trait SessionFactory: Send + Sync + 'static {
    type Decoder: Decoder<Item: Send, Error: Into<NetError>> + Send + 'static;
    type Handler: SessionHandler<<Self::Decoder as Decoder>::Item>;

    fn create(&self, peer_addr: SocketAddr) -> (Self::Decoder, Self::Handler);
}

impl<F, D, H> SessionFactory for F
where
    F: Fn(SocketAddr) -> (D, H) + Send + Sync + 'static,
    D: Decoder<Item: Send, Error: Into<NetError>> + Send + 'static,
    H: SessionHandler<D::Item>,
{
    type Decoder = D;
    type Handler = H;

    fn create(&self, peer_addr: SocketAddr) -> (D, H) {
        self(peer_addr)
    }
}

type SessionTable = Arc<Mutex<HashMap<SessionId, SessionHandle>>>;

fn lock(sessions: &SessionTable) -> MutexGuard<'_, HashMap<SessionId, SessionHandle>> {
    sessions.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Listens on one address and runs a session per accepted connection.
///
/// # Example
///
/// ```no_run
/// use std::net::SocketAddr;
///
/// use micro_net::codec::RequestDecoder;
/// use micro_net::handler::make_handler;
/// use micro_net::protocol::{Request, Response};
/// use micro_net::server::{Server, ServerConfig};
/// use micro_net::service::ExecutionService;
/// use micro_net::session::SessionHandle;
///
/// let service = ExecutionService::start().unwrap();
/// let config = ServerConfig::new("127.0.0.1:8080".parse().unwrap());
///
/// let mut server = Server::new(service.handle(), config, |_peer: SocketAddr| {
///     let handler = make_handler(|session: &SessionHandle, _request: Request| {
///         let mut response = Response::new();
///         response.make_get_response(b"hello", "text/plain");
///         let _ = session.send(response);
///     });
///     (RequestDecoder::new(), handler)
/// });
///
/// service.block_on(async { server.start().await.unwrap() });
/// ```
pub struct Server<A, F> {
    service: ServiceHandle,
    config: ServerConfig,
    acceptor: Arc<A>,
    factory: Arc<F>,
    sessions: SessionTable,
    local_addr: Option<SocketAddr>,
    stop: CancellationToken,
}

impl<A, F> fmt::Debug for Server<A, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("local_addr", &self.local_addr)
            .field("sessions", &lock(&self.sessions).len())
            .finish_non_exhaustive()
    }
}

impl<F: SessionFactory> Server<PlainAcceptor, F> {
    /// A plain TCP server.
    pub fn new(service: ServiceHandle, config: ServerConfig, factory: F) -> Self {
        Self {
            service,
            config,
            acceptor: Arc::new(PlainAcceptor),
            factory: Arc::new(factory),
            sessions: Arc::new(Mutex::new(HashMap::new())),
            local_addr: None,
            stop: CancellationToken::new(),
        }
    }
}

impl<A, F> Server<A, F>
where
    A: Acceptor + Sync + 'static,
    F: SessionFactory,
{
    /// Replaces how accepted streams become transports, e.g. with a [`TlsAcceptor`](crate::server::TlsAcceptor).
    pub fn with_acceptor<B: Acceptor + Sync + 'static>(self, acceptor: B) -> Server<B, F> {
        Server {
            service: self.service,
            config: self.config,
            acceptor: Arc::new(acceptor),
            factory: self.factory,
            sessions: self.sessions,
            local_addr: self.local_addr,
            stop: self.stop,
        }
    }

    /// Binds the listener and starts accepting on the execution service.
    ///
    /// Returns the bound address, which differs from the configured one when binding port 0.
    pub async fn start(&mut self) -> Result<SocketAddr, NetError> {
        ensure!(self.local_addr.is_none(), NetError::invalid_handle("server already started"));
        ensure!(!self.stop.is_cancelled(), NetError::invalid_handle("server is stopped"));

        let address = self.config.address();
        let listener = match TcpListener::bind(address).await {
            Ok(listener) => listener,
            Err(e) => {
                error!(cause = %e, "bind server error");
                return Err(e.into());
            }
        };
        let local_addr = listener.local_addr()?;
        info!("start listening at {:?}", local_addr);

        let accept_loop = AcceptLoop {
            listener,
            service: self.service.clone(),
            session_config: self.config.session_config(),
            acceptor: self.acceptor.clone(),
            factory: self.factory.clone(),
            sessions: self.sessions.clone(),
            stop: self.stop.clone(),
        };
        self.service.spawn(accept_loop.run().instrument(info_span!("server", %local_addr)))?;

        self.local_addr = Some(local_addr);
        Ok(local_addr)
    }

    /// The bound address once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Number of sessions not yet disconnected.
    pub fn session_count(&self) -> usize {
        lock(&self.sessions).len()
    }

    pub fn find_session(&self, id: SessionId) -> Option<SessionHandle> {
        lock(&self.sessions).get(&id).cloned()
    }

    /// Snapshot of the live sessions.
    pub fn sessions(&self) -> Vec<SessionHandle> {
        lock(&self.sessions).values().cloned().collect()
    }

    /// Enqueues `message` on every live session, returning how many accepted it.
    pub fn multicast<B: Into<Bytes>>(&self, message: B) -> usize {
        let message = message.into();
        self.sessions().iter().filter(|session| session.send(message.clone()).is_ok()).count()
    }

    pub fn disconnect_all(&self) {
        for session in self.sessions() {
            session.disconnect();
        }
    }

    /// Stops accepting and disconnects every session.
    pub fn stop(&self) {
        self.stop.cancel();
        self.disconnect_all();
    }
}

struct AcceptLoop<A, F> {
    listener: TcpListener,
    service: ServiceHandle,
    session_config: SessionConfig,
    acceptor: Arc<A>,
    factory: Arc<F>,
    sessions: SessionTable,
    stop: CancellationToken,
}

impl<A, F> AcceptLoop<A, F>
where
    A: Acceptor + Sync + 'static,
    F: SessionFactory,
{
    async fn run(self) {
        let shutdown = self.service.shutdown_token();

        loop {
            let (stream, peer_addr) = tokio::select! {
                biased;
                _ = self.stop.cancelled() => break,
                _ = shutdown.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!(cause = %e, "failed to accept");
                        continue;
                    }
                },
            };
            debug!(%peer_addr, "accepted connection");

            if let Err(e) = self.start_session(stream, peer_addr) {
                warn!(cause = %e, "failed to start session");
                break;
            }
        }

        info!("stop listening");
    }

    fn start_session(&self, stream: tokio::net::TcpStream, peer_addr: SocketAddr) -> Result<(), NetError> {
        let (decoder, handler) = self.factory.create(peer_addr);
        let acceptor = self.acceptor.clone();
        let connect = async move { acceptor.accept(stream, peer_addr).await };

        let handle = Session::spawn(&self.service, self.session_config, connect, decoder, handler)?;
        track_session(&self.sessions, &self.service, handle)
    }
}

/// Keeps `handle` in the table until its session closes.
///
/// If the watcher cannot be spawned the entry is removed again and the session disconnected.
fn track_session(sessions: &SessionTable, service: &ServiceHandle, handle: SessionHandle) -> Result<(), NetError> {
    let id = handle.id();
    lock(sessions).insert(id, handle.clone());

    let table = sessions.clone();
    let watched = handle.clone();
    let watcher = service.spawn(async move {
        watched.closed().await;
        lock(&table).remove(&id);
    });

    if let Err(e) = watcher {
        lock(sessions).remove(&id);
        handle.disconnect();
        return Err(e);
    }
    Ok(())
}
