//! GPU execution path for the traversal engine
//!
//! Based on research from:
//! - **Gunrock** (Wang et al., ACM `ToPC` 2017) - GPU graph traversal primitives
//! - **`GraphBLAST`** (Yang et al., 2022) - GPU linear algebra for graphs
//!
//! # Architecture
//!
//! - `device`: wgpu adapter/device binding for
//!   [`GraphHandle::with_gpu`](crate::handle::GraphHandle::with_gpu)
//! - `kernel`: per-level dispatch loop around the WGSL shader in `shaders/`
//!
//! # Feature Flag
//!
//! This module is only available with the `gpu` feature flag:
//! ```bash
//! cargo build --features gpu
//! ```
//!
//! Handles created with [`GraphHandle::new`](crate::handle::GraphHandle::new)
//! never touch this module; both backends share validation, slot handling and
//! the distance determinism contract.

mod device;
mod kernel;

pub use device::GpuDevice;

pub(crate) use kernel::{execute, AdjacencyCache};
