//! Library context: the handle owning one device
//!
//! A [`GraphHandle`] binds everything created under it to a single device: the
//! memory tracker, the executor backend and the command stream all live here.
//! Handles are created and destroyed explicitly; once destroyed, the handle
//! and every descriptor created under it answer [`GraphError::InvalidHandle`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::descriptor::GraphDescriptor;
use crate::device::{
    Backend, DeviceJob, DeviceMemoryInfo, DeviceQueue, MemoryTracker, DEFAULT_DEVICE_MEMORY,
};
use crate::error::{GraphError, Result};

/// Device configuration for a new handle.
#[derive(Debug, Clone, Copy)]
pub struct DeviceOptions {
    /// Device capacity in bytes. Allocations past this fail with
    /// [`GraphError::AllocationFailure`].
    pub memory_limit: u64,
    /// Worker threads for the host executor; `None` sizes the pool to the
    /// machine.
    pub worker_threads: Option<usize>,
}

impl Default for DeviceOptions {
    fn default() -> Self {
        Self {
            memory_limit: DEFAULT_DEVICE_MEMORY,
            worker_threads: None,
        }
    }
}

pub(crate) struct HandleInner {
    pub(crate) tracker: Arc<MemoryTracker>,
    pub(crate) queue: DeviceQueue,
    destroyed: AtomicBool,
    next_descriptor_id: AtomicU64,
}

impl std::fmt::Debug for HandleInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandleInner")
            .field("destroyed", &self.destroyed.load(Ordering::Relaxed))
            .field("memory", &self.tracker.info())
            .finish_non_exhaustive()
    }
}

impl HandleInner {
    pub(crate) fn ensure_alive(&self) -> Result<()> {
        if self.destroyed.load(Ordering::Acquire) {
            return Err(GraphError::InvalidHandle);
        }
        Ok(())
    }

    pub(crate) fn submit(&self, label: &'static str, job: DeviceJob) -> Result<()> {
        self.ensure_alive()?;
        self.queue.submit(label, job)
    }
}

/// Process-wide context binding descriptors to one device.
///
/// # Example
///
/// ```no_run
/// use wavefront_graph::{DeviceOptions, GraphHandle};
///
/// # fn example() -> wavefront_graph::Result<()> {
/// let handle = GraphHandle::new(DeviceOptions::default())?;
/// let descriptor = handle.create_graph()?;
/// // ... install topology, allocate slots, traverse ...
/// # drop(descriptor);
/// handle.destroy()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct GraphHandle {
    inner: Arc<HandleInner>,
}

impl GraphHandle {
    /// Create a handle bound to the host executor.
    ///
    /// # Errors
    ///
    /// [`GraphError::InternalError`] if the executor pool cannot be built.
    pub fn new(options: DeviceOptions) -> Result<Self> {
        let backend = Backend::host(options.worker_threads)?;
        Ok(Self::with_backend(options, backend))
    }

    /// Create a handle bound to a wgpu compute device. Traversals submitted
    /// under this handle dispatch the WGSL kernel instead of the host pool.
    ///
    /// # Errors
    ///
    /// [`GraphError::InternalError`] when no compatible adapter is available
    /// or device initialization fails.
    #[cfg(feature = "gpu")]
    pub async fn with_gpu(options: DeviceOptions) -> Result<Self> {
        let device = crate::gpu::GpuDevice::new()
            .await
            .map_err(|e| GraphError::InternalError(format!("gpu device init: {e}")))?;
        log::debug!("gpu handle bound to {}", device.info().name);
        Ok(Self::with_backend(options, Backend::Gpu { device }))
    }

    fn with_backend(options: DeviceOptions, backend: Backend) -> Self {
        let tracker = MemoryTracker::new(options.memory_limit);
        log::debug!(
            "handle created ({} bytes device capacity)",
            options.memory_limit
        );
        Self {
            inner: Arc::new(HandleInner {
                tracker,
                queue: DeviceQueue::start(backend),
                destroyed: AtomicBool::new(false),
                next_descriptor_id: AtomicU64::new(0),
            }),
        }
    }

    /// Create a new, empty graph descriptor under this handle.
    ///
    /// # Errors
    ///
    /// [`GraphError::InvalidHandle`] after destruction.
    pub fn create_graph(&self) -> Result<GraphDescriptor> {
        self.inner.ensure_alive()?;
        let id = self.inner.next_descriptor_id.fetch_add(1, Ordering::Relaxed);
        log::debug!("descriptor {id} created");
        Ok(GraphDescriptor::new(Arc::clone(&self.inner), id))
    }

    /// Block until every traversal submitted so far has completed.
    ///
    /// Output slots hold defined results only after this returns; device-side
    /// failures (scratch allocation, contained worker faults) surface here as
    /// a single aggregate status.
    ///
    /// # Errors
    ///
    /// The first deferred device error, or [`GraphError::InvalidHandle`]
    /// after destruction.
    pub async fn synchronize(&self) -> Result<()> {
        self.inner.ensure_alive()?;
        self.inner.queue.synchronize().await
    }

    /// Device memory telemetry: capacity, bytes in use, bytes free.
    ///
    /// # Errors
    ///
    /// [`GraphError::InvalidHandle`] after destruction.
    pub fn memory_info(&self) -> Result<DeviceMemoryInfo> {
        self.inner.ensure_alive()?;
        Ok(self.inner.tracker.info())
    }

    /// Destroy the handle: completes in-flight work, stops the device thread
    /// and invalidates every descriptor created under this handle.
    ///
    /// # Errors
    ///
    /// [`GraphError::InvalidHandle`] on a second destroy; the double-destroy
    /// is a caller error, not a silent no-op.
    pub fn destroy(&self) -> Result<()> {
        if self.inner.destroyed.swap(true, Ordering::AcqRel) {
            return Err(GraphError::InvalidHandle);
        }
        self.inner.queue.shutdown();
        log::debug!("handle destroyed");
        Ok(())
    }
}

impl Drop for GraphHandle {
    fn drop(&mut self) {
        // Backstop for callers that skip the explicit destroy.
        if !self.inner.destroyed.swap(true, Ordering::AcqRel) {
            self.inner.queue.shutdown();
            log::debug!("handle dropped without explicit destroy");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_create_destroy() {
        let handle = GraphHandle::new(DeviceOptions::default()).unwrap();
        assert!(handle.memory_info().is_ok());
        handle.destroy().unwrap();
    }

    #[test]
    fn test_double_destroy_is_an_error() {
        let handle = GraphHandle::new(DeviceOptions::default()).unwrap();
        handle.destroy().unwrap();
        assert!(matches!(handle.destroy(), Err(GraphError::InvalidHandle)));
    }

    #[test]
    fn test_destroyed_handle_rejects_operations() {
        let handle = GraphHandle::new(DeviceOptions::default()).unwrap();
        handle.destroy().unwrap();

        assert!(matches!(
            handle.create_graph(),
            Err(GraphError::InvalidHandle)
        ));
        assert!(matches!(
            handle.memory_info(),
            Err(GraphError::InvalidHandle)
        ));
    }

    #[tokio::test]
    async fn test_synchronize_on_destroyed_handle() {
        let handle = GraphHandle::new(DeviceOptions::default()).unwrap();
        handle.destroy().unwrap();
        assert!(matches!(
            handle.synchronize().await,
            Err(GraphError::InvalidHandle)
        ));
    }

    #[tokio::test]
    async fn test_idle_synchronize_succeeds() {
        let handle = GraphHandle::new(DeviceOptions::default()).unwrap();
        handle.synchronize().await.unwrap();
        handle.synchronize().await.unwrap();
    }

    #[test]
    fn test_memory_info_starts_empty() {
        let handle = GraphHandle::new(DeviceOptions {
            memory_limit: 1024,
            worker_threads: Some(1),
        })
        .unwrap();
        let info = handle.memory_info().unwrap();
        assert_eq!(info.total, 1024);
        assert_eq!(info.used, 0);
        assert_eq!(info.free, 1024);
    }
}
