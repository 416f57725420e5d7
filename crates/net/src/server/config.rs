use std::net::SocketAddr;

use crate::session::SessionConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    address: SocketAddr,
    session: SessionConfig,
}

impl ServerConfig {
    pub fn new(address: SocketAddr) -> Self {
        Self { address, session: SessionConfig::default() }
    }

    /// Settings applied to every accepted session.
    pub fn with_session_config(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn session_config(&self) -> SessionConfig {
        self.session
    }
}
