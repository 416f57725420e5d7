use std::env;
use std::net::ToSocketAddrs;

use micro_net::client::HttpClient;
use micro_net::protocol::Request;
use micro_net::service::ExecutionService;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let host = env::args().nth(1).unwrap_or_else(|| "example.com".to_owned());
    let addr = (host.as_str(), 80).to_socket_addrs().expect("failed to resolve host").next().expect("no address for host");

    let service = ExecutionService::start().expect("failed to start the execution service");
    let handle = service.handle();

    service.block_on(async move {
        let client = HttpClient::connect(&handle, addr).expect("failed to connect");

        let mut request = Request::new();
        request.set_begin("GET", "/", "HTTP/1.1").set_header("Host", &host).set_header("Connection", "close").set_body("");

        match client.send_request(request).await {
            Ok(response) => {
                info!(status = response.status(), phrase = response.status_phrase(), "response");
                for (key, value) in response.headers() {
                    info!("{key}: {value}");
                }
                info!(body_length = response.body_length(), "body");
            }
            Err(e) => error!(cause = %e, "request failed"),
        }

        client.disconnect();
        client.closed().await;
    });

    service.stop();
}
