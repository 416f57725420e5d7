//! Outbound connections.
//!
//! [`Client`] opens plain or TLS sessions, retrying failed connects according to a
//! [`RetryPolicy`]. [`HttpClient`] builds on it for the common request/response exchange.

#[allow(clippy::module_inception)]
mod client;
mod http_client;
mod retry;

pub use client::Client;
pub use http_client::HttpClient;
pub use retry::RetryPolicy;
