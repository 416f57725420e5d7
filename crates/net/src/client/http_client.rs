use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::channel::oneshot;
use tracing::warn;

use crate::client::Client;
use crate::codec::ResponseDecoder;
use crate::handler::SessionHandler;
use crate::protocol::{Request, Response};
use crate::service::ServiceHandle;
use crate::session::SessionHandle;
use crate::{DisconnectReason, NetError};

type Waiter = oneshot::Sender<Result<Response, NetError>>;
type Waiters = Arc<Mutex<VecDeque<Waiter>>>;

fn lock(waiters: &Waiters) -> MutexGuard<'_, VecDeque<Waiter>> {
    waiters.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Request/response exchange over one client session.
///
/// Requests may be issued concurrently: they are written in call order and responses are matched
/// to them in the same order, so several requests can be in flight at once.
///
/// Responses to `HEAD` requests must not carry a `Content-Length`, since the decoder frames bodies
/// from the headers alone.
#[derive(Debug)]
pub struct HttpClient {
    session: SessionHandle,
    waiters: Waiters,
}

impl HttpClient {
    /// Connects with the default retry policy and session settings.
    pub fn connect(service: &ServiceHandle, addr: SocketAddr) -> Result<Self, NetError> {
        Self::connect_with(&Client::new(service.clone()), addr)
    }

    pub fn connect_with(client: &Client, addr: SocketAddr) -> Result<Self, NetError> {
        let waiters = Waiters::default();
        let forwarder = ResponseForwarder { waiters: waiters.clone() };
        let session = client.connect(addr, ResponseDecoder::new(), forwarder)?;
        Ok(Self { session, waiters })
    }

    /// Sends `request` and waits for its response.
    ///
    /// # Errors
    ///
    /// `InvalidHandle` when the session is already closed; `Disconnected` carrying the reason when
    /// the session ends before the response arrived.
    pub async fn send_request(&self, request: Request) -> Result<Response, NetError> {
        let (tx, rx) = oneshot::channel();
        {
            let mut waiters = lock(&self.waiters);
            self.session.send(request)?;
            waiters.push_back(tx);
        }

        rx.await.map_err(|_| NetError::invalid_handle("session dropped before responding"))?
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn disconnect(&self) {
        self.session.disconnect();
    }

    /// Waits until the underlying session is disconnected.
    pub async fn closed(&self) {
        self.session.closed().await
    }
}

struct ResponseForwarder {
    waiters: Waiters,
}

impl SessionHandler<Response> for ResponseForwarder {
    fn on_message(&mut self, _session: &SessionHandle, response: Response) {
        match lock(&self.waiters).pop_front() {
            Some(waiter) => {
                let _ = waiter.send(Ok(response));
            }
            None => warn!(status = response.status(), "dropping unsolicited response"),
        }
    }

    fn on_disconnected(&mut self, _session: &SessionHandle, reason: DisconnectReason) {
        for waiter in lock(&self.waiters).drain(..) {
            let _ = waiter.send(Err(NetError::disconnected(reason)));
        }
    }
}
