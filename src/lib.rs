//! wavefront-graph: device-resident sparse graph BFS engine
//!
//! # Overview
//!
//! wavefront-graph computes breadth-first shortest-hop distances and
//! predecessor trees over large sparse graphs held in device-resident CSR
//! form. Graphs are owned by descriptors created under a handle; traversal
//! inputs (edge masks) and outputs (distances, predecessors) live in typed,
//! index-addressed data slots attached to each graph.
//!
//! # Quick Start
//!
//! ```no_run
//! use wavefront_graph::{
//!     bfs, DeviceOptions, ElementKind, GraphHandle, NodeId, Orientation,
//!     TopologyDescriptor, TraversalConfig,
//! };
//!
//! # async fn example() -> wavefront_graph::Result<()> {
//! let handle = GraphHandle::new(DeviceOptions::default())?;
//! let mut graph = handle.create_graph()?;
//!
//! // 0 → 1 → 2
//! graph.install_topology(&TopologyDescriptor {
//!     orientation: Orientation::Csr,
//!     num_vertices: 3,
//!     num_edges: 2,
//!     row_offsets: &[0, 1, 2, 2],
//!     col_indices: &[1, 2],
//! })?;
//! graph.allocate_vertex_data(&[ElementKind::Int32, ElementKind::Int32])?;
//!
//! let config = TraversalConfig::new().with_distances(0).with_predecessors(1);
//! bfs(&graph, NodeId(0), &config)?;
//! handle.synchronize().await?;
//!
//! let mut distances = vec![0i32; 3];
//! graph.get_vertex_data(0, &mut distances)?;
//! assert_eq!(distances, vec![0, 1, 2]);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Topology**: immutable CSR, copied to device storage at install
//! - **Data slots**: typed arrays addressed by small indices the caller picks
//! - **Execution**: frontier-expansion BFS, level-synchronous, first
//!   discoverer claims each vertex atomically
//! - **Device model**: traversals enqueue on a per-handle command stream and
//!   complete at `synchronize()`; device memory is capacity-tracked, so
//!   repeated identical traversals hold telemetry steady
//!
//! Distances are deterministic across repeated runs; predecessor choice among
//! equidistant parents is not, but always satisfies
//! `distance[v] == distance[pred[v]] + 1`.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod descriptor;
pub mod device;
pub mod error;
pub mod handle;
pub mod slots;
pub mod topology;
pub mod traversal;

// GPU execution path (optional)
#[cfg(feature = "gpu")]
pub mod gpu;

// Re-export core types
pub use descriptor::{DescriptorState, GraphDescriptor};
pub use device::{DeviceMemoryInfo, DEFAULT_DEVICE_MEMORY};
pub use error::{GraphError, Result};
pub use handle::{DeviceOptions, GraphHandle};
pub use slots::{ElementKind, SlotElement};
pub use topology::{NodeId, Orientation, TopologyDescriptor};
pub use traversal::{bfs, TraversalConfig, NO_PREDECESSOR, UNREACHABLE};

#[cfg(feature = "gpu")]
pub use gpu::GpuDevice;
