//! Device command stream
//!
//! Each handle owns one device thread that consumes commands in submission
//! order, which is what serializes traversal calls. Submitting returns
//! immediately; [`DeviceQueue::synchronize`] is the explicit blocking step
//! after which output slots are defined.
//!
//! A faulting worker (error or panic) never unwinds past this loop: the
//! failure is recorded and handed back as a single aggregate status by the
//! next synchronization.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{LockResult, Mutex, MutexGuard, PoisonError};
use std::thread;

use tokio::sync::{mpsc, oneshot};

use crate::error::{GraphError, Result};

/// Work executed on the device thread.
pub(crate) type DeviceJob = Box<dyn FnOnce(&Backend) -> Result<()> + Send + 'static>;

/// Execution backend owned by the device thread.
pub(crate) enum Backend {
    /// Data-parallel execution on a dedicated host thread pool.
    Host { pool: rayon::ThreadPool },
    /// WGSL compute kernels on a wgpu device.
    #[cfg(feature = "gpu")]
    Gpu { device: crate::gpu::GpuDevice },
}

impl Backend {
    pub(crate) fn host(worker_threads: Option<usize>) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(worker_threads.unwrap_or(0))
            .thread_name(|i| format!("wavefront-worker-{i}"))
            .build()
            .map_err(|e| GraphError::InternalError(format!("executor pool: {e}")))?;
        Ok(Self::Host { pool })
    }
}

enum Command {
    Run { label: &'static str, job: DeviceJob },
    Sync(oneshot::Sender<Vec<GraphError>>),
}

/// Handle-owned command queue plus the thread that drains it.
pub(crate) struct DeviceQueue {
    sender: Mutex<Option<mpsc::UnboundedSender<Command>>>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
}

fn unpoisoned<'a, T>(guard: LockResult<MutexGuard<'a, T>>) -> MutexGuard<'a, T> {
    guard.unwrap_or_else(PoisonError::into_inner)
}

impl DeviceQueue {
    /// Spawn the device thread; `backend` moves onto it for its lifetime.
    pub(crate) fn start(backend: Backend) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = thread::Builder::new()
            .name("wavefront-device".to_owned())
            .spawn(move || run_device_loop(backend, rx));
        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(e) => {
                // The sender is still live, so submissions queue up but never
                // drain; surface the spawn failure on first synchronize.
                log::error!("failed to spawn device thread: {e}");
                None
            }
        };
        Self {
            sender: Mutex::new(Some(tx)),
            worker: Mutex::new(worker),
        }
    }

    /// Enqueue a job. Returns once the command is in the stream, not once it
    /// has executed.
    pub(crate) fn submit(&self, label: &'static str, job: DeviceJob) -> Result<()> {
        let guard = unpoisoned(self.sender.lock());
        let sender = guard.as_ref().ok_or(GraphError::InvalidHandle)?;
        sender
            .send(Command::Run { label, job })
            .map_err(|_| GraphError::InternalError("device thread terminated".to_owned()))
    }

    /// Block until every previously submitted command has executed, returning
    /// the first deferred failure (remaining ones are logged).
    pub(crate) async fn synchronize(&self) -> Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        {
            let guard = unpoisoned(self.sender.lock());
            let sender = guard.as_ref().ok_or(GraphError::InvalidHandle)?;
            sender
                .send(Command::Sync(ack_tx))
                .map_err(|_| GraphError::InternalError("device thread terminated".to_owned()))?;
        }
        let mut deferred = ack_rx
            .await
            .map_err(|_| GraphError::InternalError("device thread terminated".to_owned()))?;
        if deferred.is_empty() {
            return Ok(());
        }
        for extra in deferred.drain(1..) {
            log::warn!("additional deferred device error: {extra}");
        }
        // Non-empty after the drain above.
        Err(deferred
            .pop()
            .unwrap_or_else(|| GraphError::InternalError("lost deferred error".to_owned())))
    }

    /// Close the stream and join the device thread. In-flight commands run to
    /// completion first; traversals cannot be cancelled once issued.
    pub(crate) fn shutdown(&self) {
        unpoisoned(self.sender.lock()).take();
        if let Some(worker) = unpoisoned(self.worker.lock()).take() {
            if worker.join().is_err() {
                log::error!("device thread panicked outside command containment");
            }
        }
    }
}

impl Drop for DeviceQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_device_loop(backend: Backend, mut rx: mpsc::UnboundedReceiver<Command>) {
    let mut deferred: Vec<GraphError> = Vec::new();
    while let Some(command) = rx.blocking_recv() {
        match command {
            Command::Run { label, job } => {
                match panic::catch_unwind(AssertUnwindSafe(|| job(&backend))) {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        log::warn!("device command '{label}' failed: {e}");
                        deferred.push(e);
                    }
                    Err(_) => {
                        log::error!("device command '{label}' panicked; contained");
                        deferred.push(GraphError::InternalError(format!(
                            "device worker panicked while executing '{label}'"
                        )));
                    }
                }
            }
            Command::Sync(ack) => {
                let _ = ack.send(std::mem::take(&mut deferred));
            }
        }
    }
    if !deferred.is_empty() {
        log::warn!(
            "device queue shut down with {} unreported deferred error(s)",
            deferred.len()
        );
    }
}
