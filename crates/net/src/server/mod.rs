//! Accept loop and session table.
//!
//! A [`Server`] listens on one address. Each accepted connection goes through an [`Acceptor`]
//! (plain or TLS) and becomes a session whose decoder and handler come from a [`SessionFactory`].
//! Live sessions are kept in a table until they disconnect.

mod acceptor;
mod config;
#[allow(clippy::module_inception)]
mod server;

pub use acceptor::{Acceptor, LocalAcceptor, PlainAcceptor, TlsAcceptor};
pub use config::ServerConfig;
pub use server::{Server, SessionFactory};
