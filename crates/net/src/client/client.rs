use std::net::SocketAddr;

use tokio::net::TcpStream;
use tokio_util::codec::Decoder;
use tracing::{debug, warn};

use crate::client::RetryPolicy;
use crate::handler::SessionHandler;
use crate::service::ServiceHandle;
use crate::session::{Session, SessionConfig, SessionHandle};
use crate::transport::{SecureTransport, TcpTransport, TlsEngine};
use crate::{ErrorKind, NetError};

/// Opens client sessions on an execution service.
///
/// Connecting happens inside the session: the returned handle is `Connecting` until the TCP
/// connect (and TLS handshake) succeeds, and data sent in the meantime is written afterwards.
/// When every attempt fails the handler gets `on_error` followed by `on_disconnected`.
#[derive(Debug, Clone)]
pub struct Client {
    service: ServiceHandle,
    config: SessionConfig,
    retry: RetryPolicy,
}

impl Client {
    pub fn new(service: ServiceHandle) -> Self {
        Self { service, config: SessionConfig::default(), retry: RetryPolicy::default() }
    }

    pub fn with_session_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn connect<D, H>(&self, addr: SocketAddr, decoder: D, handler: H) -> Result<SessionHandle, NetError>
    where
        D: Decoder + Send + 'static,
        D::Item: Send,
        D::Error: Into<NetError>,
        H: SessionHandler<D::Item>,
    {
        let retry = self.retry;
        let connect = async move { with_retry(retry, addr, || TcpTransport::connect(addr)).await };
        Session::spawn(&self.service, self.config, connect, decoder, handler)
    }

    /// Connects and runs a TLS handshake with a fresh engine from `new_engine` on every attempt.
    pub fn connect_secure<D, H, F, E>(
        &self,
        addr: SocketAddr,
        new_engine: F,
        decoder: D,
        handler: H,
    ) -> Result<SessionHandle, NetError>
    where
        D: Decoder + Send + 'static,
        D::Item: Send,
        D::Error: Into<NetError>,
        H: SessionHandler<D::Item>,
        F: Fn() -> E + Send + Sync + 'static,
        E: TlsEngine,
    {
        let retry = self.retry;
        let connect = async move {
            with_retry(retry, addr, || {
                let engine = new_engine();
                async move {
                    let stream = TcpStream::connect(addr).await?;
                    stream.set_nodelay(true)?;
                    let mut transport = SecureTransport::new(stream, engine).with_peer_addr(addr);
                    transport.handshake().await?;
                    Ok(transport)
                }
            })
            .await
        };
        Session::spawn(&self.service, self.config, connect, decoder, handler)
    }
}

async fn with_retry<T, C, Fut>(policy: RetryPolicy, addr: SocketAddr, mut attempt: C) -> Result<T, NetError>
where
    C: FnMut() -> Fut,
    Fut: Future<Output = Result<T, NetError>>,
{
    let mut failed = 0;
    loop {
        let e = match attempt().await {
            Ok(transport) => return Ok(transport),
            Err(e) => e,
        };

        failed += 1;
        if failed >= policy.max_attempts() || e.kind() != ErrorKind::IoError {
            debug!(%addr, attempts = failed, "giving up connecting");
            return Err(e);
        }

        let delay = policy.delay_for(failed);
        warn!(%addr, cause = %e, ?delay, "connect failed, retrying");
        tokio::time::sleep(delay).await;
    }
}
