use std::net::SocketAddr;

use micro_net::codec::RequestDecoder;
use micro_net::handler::SessionHandler;
use micro_net::protocol::{Request, Response};
use micro_net::server::{Server, ServerConfig};
use micro_net::service::ExecutionService;
use micro_net::session::SessionHandle;
use micro_net::{DisconnectReason, NetError};
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

struct HttpHandler {
    peer: SocketAddr,
    served: usize,
}

impl SessionHandler<Request> for HttpHandler {
    fn on_message(&mut self, session: &SessionHandle, request: Request) {
        info!(peer = %self.peer, method = request.method(), url = request.url(), "request");
        self.served += 1;

        let mut response = Response::new();
        match (request.method(), request.url()) {
            ("GET", "/") => response.make_get_response(b"hello world", "text/plain; charset=utf-8"),
            ("POST", "/echo") => response.make_get_response(request.body(), "application/octet-stream"),
            _ => response.make_error_response(404, "404 not found"),
        };

        if let Err(e) = session.send(response) {
            warn!(cause = %e, "failed to send response");
        }
    }

    fn on_error(&mut self, _session: &SessionHandle, error: &NetError) {
        warn!(peer = %self.peer, cause = %error, "session error");
    }

    fn on_disconnected(&mut self, _session: &SessionHandle, reason: DisconnectReason) {
        info!(peer = %self.peer, served = self.served, %reason, "bye");
    }
}

fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let service = ExecutionService::start().expect("failed to start the execution service");
    let config = ServerConfig::new("127.0.0.1:8080".parse().unwrap());
    let mut server = Server::new(service.handle(), config, |peer: SocketAddr| (RequestDecoder::new(), HttpHandler { peer, served: 0 }));

    service.block_on(async {
        server.start().await.expect("failed to start the server");
        tokio::signal::ctrl_c().await.expect("failed to listen for ctrl-c");
    });

    server.stop();
    service.stop();
}
