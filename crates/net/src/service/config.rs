use std::num::NonZeroUsize;
use std::time::Duration;

const DEFAULT_THREAD_NAME: &str = "micro-net-worker";
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings of an [`ExecutionService`](crate::service::ExecutionService) worker pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    worker_threads: usize,
    thread_name: String,
    shutdown_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            worker_threads: std::thread::available_parallelism().map(NonZeroUsize::get).unwrap_or(1),
            thread_name: DEFAULT_THREAD_NAME.to_string(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl ServiceConfig {
    pub fn new() -> Self {
        Default::default()
    }

    /// Number of worker threads, at least one.
    pub fn with_worker_threads(mut self, worker_threads: usize) -> Self {
        self.worker_threads = worker_threads.max(1);
        self
    }

    pub fn with_thread_name<S: Into<String>>(mut self, thread_name: S) -> Self {
        self.thread_name = thread_name.into();
        self
    }

    /// How long `stop` waits for in-flight operations to deliver their completions.
    pub fn with_shutdown_timeout(mut self, shutdown_timeout: Duration) -> Self {
        self.shutdown_timeout = shutdown_timeout;
        self
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }

    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }
}
