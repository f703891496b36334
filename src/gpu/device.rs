//! wgpu device binding
//!
//! Wraps adapter selection and device/queue creation for handles built with
//! [`GraphHandle::with_gpu`](crate::handle::GraphHandle::with_gpu). Failures
//! surface through the engine's status taxonomy rather than a separate error
//! type: a missing adapter is an environment fault, not a caller error.

use crate::error::{GraphError, Result};

/// Compute device executing the WGSL traversal kernel.
#[derive(Debug)]
pub struct GpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    adapter: wgpu::Adapter,
}

impl GpuDevice {
    /// Probe for a usable adapter without keeping the device.
    ///
    /// Lets tests skip gracefully on machines without GPU hardware.
    pub async fn is_gpu_available() -> bool {
        Self::new().await.is_ok()
    }

    /// Bind the highest-performance adapter from any backend.
    ///
    /// # Errors
    ///
    /// [`GraphError::InternalError`] when no compatible adapter exists or the
    /// device request fails.
    pub async fn new() -> Result<Self> {
        Self::with_backends(wgpu::Backends::all()).await
    }

    /// Bind an adapter from the given backend set.
    ///
    /// # Errors
    ///
    /// [`GraphError::InternalError`] when no compatible adapter exists or the
    /// device request fails.
    pub async fn with_backends(backends: wgpu::Backends) -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| {
                GraphError::InternalError("no compatible GPU adapter found".to_owned())
            })?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("wavefront-graph device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .map_err(|e| GraphError::InternalError(format!("GPU device request: {e}")))?;

        Ok(Self {
            device,
            queue,
            adapter,
        })
    }

    /// Adapter info (name, backend, driver).
    #[must_use]
    pub fn info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    pub(crate) fn create_buffer_init(
        &self,
        label: &str,
        contents: &[u8],
        usage: wgpu::BufferUsages,
    ) -> wgpu::Buffer {
        use wgpu::util::DeviceExt;
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage,
            })
    }

    pub(crate) fn create_buffer(
        &self,
        label: &str,
        size: u64,
        usage: wgpu::BufferUsages,
    ) -> wgpu::Buffer {
        self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage,
            mapped_at_creation: false,
        })
    }

    pub(crate) fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub(crate) fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}
