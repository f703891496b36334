//! Device layer: memory accounting and the command stream
//!
//! The "device" is whatever executes traversal kernels for a handle: the
//! default host backend (a rayon pool behind a dedicated command thread) or a
//! wgpu device under the `gpu` feature. Both share the same fixed-capacity
//! memory model, so allocation failures and the free-memory telemetry behave
//! identically across backends.

mod memory;
mod queue;

pub use memory::{DeviceMemoryInfo, DEFAULT_DEVICE_MEMORY};

pub(crate) use memory::{MemoryReservation, MemoryTracker};
pub(crate) use queue::{Backend, DeviceJob, DeviceQueue};
