//! Status taxonomy for the traversal engine
//!
//! Every fallible operation returns [`GraphError`] so callers can distinguish
//! "bad call" (argument errors) from "bad sequencing" (state errors) from
//! resource exhaustion.

use thiserror::Error;

/// Errors surfaced by handles, descriptors and the traversal engine.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Bad argument: out-of-range source vertex, slot index referenced by a
    /// traversal configuration, element-kind mismatch, or a host buffer of the
    /// wrong length.
    #[error("invalid argument: {0}")]
    InvalidValue(String),

    /// Operation attempted before the required setup step, e.g. traversal
    /// before topology install or before vertex-slot allocation.
    #[error("not ready: {0}")]
    NotReady(&'static str),

    /// Topology rejected at install time: wrong orientation or array lengths
    /// inconsistent with the declared vertex/edge counts.
    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    /// Direct slot access outside the allocated range.
    #[error("data slot index {index} out of range ({allocated} slot(s) allocated)")]
    InvalidSlotIndex {
        /// Requested slot index.
        index: usize,
        /// Number of slots currently allocated in the addressed table.
        allocated: usize,
    },

    /// The handle (or the handle a descriptor was created under) has been
    /// destroyed; also returned on a second `destroy()`.
    #[error("handle has been destroyed")]
    InvalidHandle,

    /// Device memory exhausted. Recoverable: release slots or recreate the
    /// handle with a larger capacity.
    #[error("device allocation of {requested} bytes failed ({free} bytes free of {total})")]
    AllocationFailure {
        /// Bytes the failed reservation asked for.
        requested: u64,
        /// Bytes still available on the device at the time of the request.
        free: u64,
        /// Total device capacity.
        total: u64,
    },

    /// Unexpected engine fault, including contained panics from traversal
    /// workers and GPU kernel dispatch failures.
    #[error("internal engine fault: {0}")]
    InternalError(String),
}

/// Crate-wide result alias.
pub type Result<T, E = GraphError> = std::result::Result<T, E>;
