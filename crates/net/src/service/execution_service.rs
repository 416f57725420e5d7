use std::io;
use std::time::Duration;

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

use crate::service::ServiceConfig;
use crate::{NetError, ensure};

/// A fixed pool of worker threads shared by every session.
///
/// # Example
///
/// ```
/// use micro_net::service::{ExecutionService, ServiceConfig};
/// use std::sync::mpsc;
///
/// let service = ExecutionService::new(ServiceConfig::new().with_worker_threads(2)).unwrap();
/// let (tx, rx) = mpsc::channel();
///
/// service
///     .handle()
///     .submit(async { Ok::<_, std::io::Error>(21 * 2) }, move |result: std::io::Result<i32>| tx.send(result.unwrap()).unwrap())
///     .unwrap();
///
/// assert_eq!(rx.recv().unwrap(), 42);
/// service.stop();
/// ```
#[derive(Debug)]
pub struct ExecutionService {
    runtime: Runtime,
    handle: ServiceHandle,
    config: ServiceConfig,
}

impl ExecutionService {
    pub fn new(config: ServiceConfig) -> Result<Self, NetError> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(config.worker_threads())
            .thread_name(config.thread_name())
            .enable_all()
            .build()
            .map_err(NetError::io)?;

        let handle = ServiceHandle::new(runtime.handle().clone());
        info!(worker_threads = config.worker_threads(), "execution service started");
        Ok(Self { runtime, handle, config })
    }

    /// Starts a service with the default configuration.
    pub fn start() -> Result<Self, NetError> {
        Self::new(ServiceConfig::default())
    }

    pub fn handle(&self) -> ServiceHandle {
        self.handle.clone()
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Runs `future` to completion on the calling thread, driving it with the worker pool.
    ///
    /// Must not be called from a worker thread.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Stops the service.
    ///
    /// Pending operations are cancelled and get their `Interrupted` completion; sessions
    /// disconnect and report it. Waits up to the configured shutdown timeout for that, then drops
    /// whatever is left. Later submissions through any handle fail with `InvalidHandle`.
    pub fn stop(self) {
        let Self { runtime, handle, config } = self;
        handle.shutdown.cancel();
        handle.tracker.close();

        let drained = runtime.block_on(async { tokio::time::timeout(config.shutdown_timeout(), handle.tracker.wait()).await });
        if drained.is_err() {
            warn!(remaining = handle.tracker.len(), "execution service stopped with tasks still running");
        }

        runtime.shutdown_timeout(config.shutdown_timeout());
        info!("execution service stopped");
    }
}

/// Cloneable access to an execution service, usable from any thread.
#[derive(Debug, Clone)]
pub struct ServiceHandle {
    runtime: Handle,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl ServiceHandle {
    fn new(runtime: Handle) -> Self {
        Self { runtime, shutdown: CancellationToken::new(), tracker: TaskTracker::new() }
    }

    /// A handle onto the tokio runtime the caller is already running in.
    ///
    /// The runtime stays owned by the caller; [`ServiceHandle::shutdown`] stops work submitted
    /// through this handle.
    pub fn current() -> Result<Self, NetError> {
        let runtime = Handle::try_current().map_err(|_| NetError::invalid_handle("not inside a tokio runtime"))?;
        Ok(Self::new(runtime))
    }

    pub fn is_running(&self) -> bool {
        !self.shutdown.is_cancelled()
    }

    /// Cancels every pending operation and session, and refuses new submissions.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        self.tracker.close();
    }

    /// A token cancelled when the service stops.
    pub(crate) fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }

    /// Spawns a task on the worker pool.
    pub fn spawn<F>(&self, future: F) -> Result<JoinHandle<F::Output>, NetError>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        ensure!(self.is_running(), NetError::invalid_handle("execution service is stopped"));
        Ok(self.tracker.spawn_on(future, &self.runtime))
    }

    /// Runs `operation` on the worker pool and passes its result to `completion`.
    ///
    /// I/O failures are delivered to the completion; only submitting to a stopped service fails
    /// here, with `InvalidHandle`.
    pub fn submit<T, F, C>(&self, operation: F, completion: C) -> Result<Operation, NetError>
    where
        T: Send + 'static,
        F: Future<Output = io::Result<T>> + Send + 'static,
        C: FnOnce(io::Result<T>) + Send + 'static,
    {
        let token = self.shutdown.child_token();
        let cancelled = token.clone();

        let join = self.spawn(async move {
            let result = tokio::select! {
                biased;
                _ = cancelled.cancelled() => Err(io::Error::new(io::ErrorKind::Interrupted, "operation cancelled")),
                result = operation => result,
            };
            completion(result);
        })?;

        Ok(Operation { token, join })
    }

    /// Delivers `Ok(())` to `completion` once `delay` has elapsed.
    pub fn arm_timer<C>(&self, delay: Duration, completion: C) -> Result<Operation, NetError>
    where
        C: FnOnce(io::Result<()>) + Send + 'static,
    {
        self.submit(
            async move {
                tokio::time::sleep(delay).await;
                Ok(())
            },
            completion,
        )
    }
}

/// A submitted operation.
#[derive(Debug)]
pub struct Operation {
    token: CancellationToken,
    join: JoinHandle<()>,
}

impl Operation {
    /// Cancels the operation; its completion receives `Interrupted` unless it already ran.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns true once the completion has run.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Waits until the completion has run.
    pub async fn wait(self) -> Result<(), NetError> {
        self.join.await.map_err(|e| NetError::io(io::Error::other(e)))
    }
}
