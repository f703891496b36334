//! Device memory accounting
//!
//! The engine models a fixed-capacity accelerator: every device-resident array
//! (topology, data slots, traversal scratch) reserves its bytes here and
//! releases them on drop. The counters back the telemetry that the repetition
//! stress property reads between traversal calls.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{GraphError, Result};

/// Default device capacity for handles created without an explicit limit.
pub const DEFAULT_DEVICE_MEMORY: u64 = 4 * 1024 * 1024 * 1024; // 4 GiB

/// Point-in-time device memory telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceMemoryInfo {
    /// Total device capacity in bytes.
    pub total: u64,
    /// Bytes currently reserved.
    pub used: u64,
    /// Bytes still available.
    pub free: u64,
}

/// Fixed-capacity allocation tracker shared by everything a handle owns.
#[derive(Debug)]
pub(crate) struct MemoryTracker {
    capacity: u64,
    used: AtomicU64,
}

impl MemoryTracker {
    pub(crate) fn new(capacity: u64) -> Arc<Self> {
        Arc::new(Self {
            capacity,
            used: AtomicU64::new(0),
        })
    }

    /// Reserve `bytes`, failing with `AllocationFailure` when the capacity
    /// would be exceeded. The reservation releases itself on drop.
    pub(crate) fn reserve(self: &Arc<Self>, bytes: u64) -> Result<MemoryReservation> {
        let mut current = self.used.load(Ordering::Relaxed);
        loop {
            let Some(next) = current.checked_add(bytes) else {
                return Err(self.allocation_failure(bytes));
            };
            if next > self.capacity {
                log::warn!(
                    "device allocation of {bytes} bytes rejected ({} of {} in use)",
                    current,
                    self.capacity
                );
                return Err(self.allocation_failure(bytes));
            }
            match self.used.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    return Ok(MemoryReservation {
                        tracker: Arc::clone(self),
                        bytes,
                    })
                }
                Err(observed) => current = observed,
            }
        }
    }

    pub(crate) fn info(&self) -> DeviceMemoryInfo {
        let used = self.used.load(Ordering::Acquire);
        DeviceMemoryInfo {
            total: self.capacity,
            used,
            free: self.capacity.saturating_sub(used),
        }
    }

    fn allocation_failure(&self, requested: u64) -> GraphError {
        let info = self.info();
        GraphError::AllocationFailure {
            requested,
            free: info.free,
            total: info.total,
        }
    }

    fn release(&self, bytes: u64) {
        self.used.fetch_sub(bytes, Ordering::AcqRel);
    }
}

/// RAII guard for a tracked device allocation.
#[derive(Debug)]
pub(crate) struct MemoryReservation {
    tracker: Arc<MemoryTracker>,
    bytes: u64,
}

impl MemoryReservation {
    #[cfg(test)]
    pub(crate) fn bytes(&self) -> u64 {
        self.bytes
    }
}

impl Drop for MemoryReservation {
    fn drop(&mut self) {
        self.tracker.release(self.bytes);
    }
}
