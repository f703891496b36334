//! BFS execution engine
//!
//! [`bfs`] validates its arguments synchronously, then enqueues a traversal
//! plan on the descriptor's device stream and returns. Results land in the
//! vertex slots named by the [`TraversalConfig`] and are defined once
//! [`GraphHandle::synchronize`](crate::handle::GraphHandle::synchronize) has
//! returned. A call either fully populates the configured slots or fails
//! without touching them.

mod frontier;

use std::sync::Arc;

use crate::descriptor::GraphDescriptor;
use crate::device::{Backend, MemoryTracker};
use crate::error::{GraphError, Result};
use crate::slots::{DataSlot, ElementKind, SlotTable};
use crate::topology::{DeviceTopology, NodeId};

pub(crate) use frontier::KernelOutput;

/// Distance reported for vertices the traversal never reached.
pub const UNREACHABLE: i32 = i32::MAX;

/// Predecessor reported for the source vertex and for unreachable vertices.
pub const NO_PREDECESSOR: i32 = -1;

/// Value object describing where a traversal reads its inputs and writes its
/// outputs.
///
/// All fields start unset; combinators fill them in. The configuration is
/// copied into the traversal plan and never retained by the engine, so one
/// value can be reused (or varied) freely across calls:
///
/// ```
/// use wavefront_graph::TraversalConfig;
///
/// let config = TraversalConfig::new()
///     .with_distances(0)
///     .with_predecessors(1)
///     .with_undirected(true);
/// assert_eq!(config.distances_slot(), Some(0));
/// assert!(config.edge_mask_slot().is_none());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraversalConfig {
    distances_slot: Option<usize>,
    predecessors_slot: Option<usize>,
    edge_mask_slot: Option<usize>,
    undirected: bool,
}

impl TraversalConfig {
    /// Configuration with every output unset and directed semantics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Write hop distances into vertex slot `slot` (must hold `Int32`).
    #[must_use]
    pub fn with_distances(mut self, slot: usize) -> Self {
        self.distances_slot = Some(slot);
        self
    }

    /// Write the predecessor tree into vertex slot `slot` (must hold `Int32`).
    #[must_use]
    pub fn with_predecessors(mut self, slot: usize) -> Self {
        self.predecessors_slot = Some(slot);
        self
    }

    /// Gate traversal by edge slot `slot` (must hold `Int32`): nonzero entries
    /// keep the edge, zero entries prune it.
    #[must_use]
    pub fn with_edge_mask(mut self, slot: usize) -> Self {
        self.edge_mask_slot = Some(slot);
        self
    }

    /// Treat every edge as traversable in both directions. The engine builds
    /// (and caches per descriptor) the reverse adjacency it needs; the input
    /// graph does not have to be symmetric.
    #[must_use]
    pub fn with_undirected(mut self, undirected: bool) -> Self {
        self.undirected = undirected;
        self
    }

    /// Configured distances slot, if any.
    #[must_use]
    pub fn distances_slot(&self) -> Option<usize> {
        self.distances_slot
    }

    /// Configured predecessors slot, if any.
    #[must_use]
    pub fn predecessors_slot(&self) -> Option<usize> {
        self.predecessors_slot
    }

    /// Configured edge-mask slot, if any.
    #[must_use]
    pub fn edge_mask_slot(&self) -> Option<usize> {
        self.edge_mask_slot
    }

    /// Whether edges are traversed in both directions.
    #[must_use]
    pub fn is_undirected(&self) -> bool {
        self.undirected
    }
}

/// Everything a traversal needs, captured at submission time.
///
/// Holding `Arc`s to the topology and slots pins them for the lifetime of the
/// command even if the caller reallocates the descriptor's tables before
/// synchronizing.
pub(crate) struct TraversalPlan {
    descriptor_id: u64,
    topology: Arc<DeviceTopology>,
    tracker: Arc<MemoryTracker>,
    distances: Option<Arc<DataSlot>>,
    predecessors: Option<Arc<DataSlot>>,
    mask: Option<Arc<DataSlot>>,
    undirected: bool,
    source: u32,
}

impl TraversalPlan {
    pub(crate) fn execute(self, backend: &Backend) -> Result<()> {
        let n = self.topology.num_vertices();
        let adjacency = self.topology.adjacency(self.undirected, &self.tracker)?;
        let mask_snapshot = self.mask.as_ref().map(|slot| slot.snapshot_i32());

        // Distance and predecessor working arrays live on the device for the
        // duration of the kernel.
        let scratch = self.tracker.reserve(2 * 4 * n as u64)?;
        let output = match backend {
            Backend::Host { pool } => {
                frontier::run(pool, adjacency, n, mask_snapshot.as_deref(), self.source)
            }
            #[cfg(feature = "gpu")]
            Backend::Gpu { device } => crate::gpu::execute(
                device,
                &self.topology,
                adjacency,
                mask_snapshot.as_deref(),
                self.source,
            )?,
        };
        drop(scratch);

        if let Some(distances) = &self.distances {
            distances.store_i32(&output.distances);
        }
        if let Some(predecessors) = &self.predecessors {
            predecessors.store_i32(&output.predecessors);
        }
        log::debug!(
            "descriptor {}: bfs source={} visited={} levels={}",
            self.descriptor_id,
            self.source,
            output.visited,
            output.levels
        );
        Ok(())
    }
}

fn resolve_config_slot(
    table: &SlotTable,
    slot: usize,
    role: &str,
    expected_len: usize,
) -> Result<Arc<DataSlot>> {
    let Ok(slot_ref) = table.get(slot) else {
        return Err(GraphError::InvalidValue(format!(
            "{role} slot {slot} is outside the allocated range ({} slot(s))",
            table.len()
        )));
    };
    if slot_ref.kind() != ElementKind::Int32 {
        return Err(GraphError::InvalidValue(format!(
            "{role} slot {slot} holds {:?}, traversal requires Int32",
            slot_ref.kind()
        )));
    }
    if slot_ref.len() < expected_len {
        return Err(GraphError::InvalidValue(format!(
            "{role} slot {slot} has {} element(s), {expected_len} required",
            slot_ref.len()
        )));
    }
    Ok(Arc::clone(slot_ref))
}

/// Run breadth-first traversal from `source` over `descriptor`'s graph.
///
/// The call enqueues work on the descriptor's device and returns immediately;
/// traversals on one descriptor execute serially in submission order, and the
/// configured output slots are defined only after
/// [`GraphHandle::synchronize`](crate::handle::GraphHandle::synchronize).
/// Outputs not named by `config` are left untouched.
///
/// # Errors
///
/// - [`GraphError::InvalidHandle`] — the owning handle was destroyed
/// - [`GraphError::NotReady`] — no topology installed, or no vertex slots
///   allocated
/// - [`GraphError::InvalidValue`] — `source` out of range, or a configured
///   slot that is out of range or not `Int32`
/// - deferred: [`GraphError::AllocationFailure`] or
///   [`GraphError::InternalError`] from the device, surfaced by the next
///   synchronization
pub fn bfs(descriptor: &GraphDescriptor, source: NodeId, config: &TraversalConfig) -> Result<()> {
    let inner = descriptor.handle_inner();
    inner.ensure_alive()?;

    let topology = descriptor
        .topology()
        .ok_or(GraphError::NotReady("traversal requires an installed CSR topology"))?;
    if descriptor.vertex_slots().is_empty() {
        return Err(GraphError::NotReady(
            "traversal requires allocated vertex data slots",
        ));
    }

    let n = topology.num_vertices();
    if (source.0 as usize) >= n {
        return Err(GraphError::InvalidValue(format!(
            "source vertex {} out of range (graph has {n} vertices)",
            source.0
        )));
    }

    let distances = config
        .distances_slot
        .map(|slot| resolve_config_slot(descriptor.vertex_slots(), slot, "distances", n))
        .transpose()?;
    let predecessors = config
        .predecessors_slot
        .map(|slot| resolve_config_slot(descriptor.vertex_slots(), slot, "predecessors", n))
        .transpose()?;
    let mask = config
        .edge_mask_slot
        .map(|slot| {
            resolve_config_slot(
                descriptor.edge_slots(),
                slot,
                "edge mask",
                topology.num_edges(),
            )
        })
        .transpose()?;

    let plan = TraversalPlan {
        descriptor_id: descriptor.id(),
        topology: Arc::clone(topology),
        tracker: Arc::clone(&inner.tracker),
        distances,
        predecessors,
        mask,
        undirected: config.undirected,
        source: source.0,
    };
    inner.submit("bfs", Box::new(move |backend| plan.execute(backend)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = TraversalConfig::new();
        assert_eq!(config.distances_slot(), None);
        assert_eq!(config.predecessors_slot(), None);
        assert_eq!(config.edge_mask_slot(), None);
        assert!(!config.is_undirected());
        assert_eq!(config, TraversalConfig::default());
    }

    #[test]
    fn test_config_combinators_do_not_alias() {
        let base = TraversalConfig::new().with_distances(0);
        let masked = base.with_edge_mask(0);

        // `base` is a value; deriving `masked` from it leaves it untouched.
        assert_eq!(base.edge_mask_slot(), None);
        assert_eq!(masked.edge_mask_slot(), Some(0));
        assert_eq!(masked.distances_slot(), Some(0));
    }

    #[test]
    fn test_sentinels() {
        assert_eq!(UNREACHABLE, i32::MAX);
        assert_eq!(NO_PREDECESSOR, -1);
    }
}
