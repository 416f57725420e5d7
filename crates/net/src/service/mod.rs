//! Worker pool, operation submission and completion delivery.
//!
//! An [`ExecutionService`] owns a multi-threaded tokio runtime. Everything else in the crate runs
//! on it through a cloneable [`ServiceHandle`]:
//!
//! - [`ServiceHandle::submit`]: run an I/O future and hand its `io::Result` to a completion
//! - [`ServiceHandle::arm_timer`]: deliver a completion after a delay
//! - [`ServiceHandle::spawn`]: run a long-lived task such as a session actor
//!
//! Every completion runs exactly once. Cancelling an [`Operation`], or stopping the service,
//! delivers an [`Interrupted`](std::io::ErrorKind::Interrupted) error instead of the result.

mod config;
mod execution_service;

pub use config::ServiceConfig;
pub use execution_service::{ExecutionService, Operation, ServiceHandle};
