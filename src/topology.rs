//! Topology store: device-resident CSR graphs
//!
//! # CSR format
//!
//! ```text
//! Graph: 0 → 1, 0 → 2, 1 → 2
//!
//! CSR:
//!   row_offsets: [0, 2, 3, 3]  // Vertex 0: edges [0..2), vertex 1: [2..3), vertex 2: [3..3)
//!   col_indices: [1, 2, 2]     // Edge targets, edge index = position
//! ```
//!
//! Only the CSR orientation is a valid input; the transposed (CSC) layout is
//! rejected at install time. Beyond orientation and length consistency the
//! arrays are trusted as-is: malformed offsets yield undefined traversal
//! output, not an install error.

use std::sync::OnceLock;
use std::sync::Arc;

use crate::device::{MemoryReservation, MemoryTracker};
use crate::error::{GraphError, Result};

/// Vertex identifier (zero-indexed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Orientation of a sparse adjacency structure handed to
/// [`install_topology`](crate::descriptor::GraphDescriptor::install_topology).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Compressed sparse row: `row_offsets` indexed by source vertex.
    Csr,
    /// Compressed sparse column (transposed). Not a valid traversal input.
    Csc,
}

/// Borrowed description of a graph structure to install on a descriptor.
///
/// `num_vertices`/`num_edges` are declared explicitly and validated against
/// the array lengths, mirroring the wire format of binary CSR graph files
/// (header counts followed by the offset and index arrays).
#[derive(Debug, Clone, Copy)]
pub struct TopologyDescriptor<'a> {
    /// Layout of `row_offsets`/`col_indices`. Must be [`Orientation::Csr`].
    pub orientation: Orientation,
    /// Declared vertex count `n`.
    pub num_vertices: usize,
    /// Declared edge count `nnz`.
    pub num_edges: usize,
    /// `n + 1` monotone offsets, `row_offsets[0] == 0`, `row_offsets[n] == nnz`.
    pub row_offsets: &'a [u32],
    /// `nnz` edge targets, each in `[0, n)`.
    pub col_indices: &'a [u32],
}

/// Adjacency slice handed to the traversal kernels.
///
/// For directed traversal this is the forward CSR and `edge_ids` is `None`
/// (the edge index is the position). For undirected traversal it is the
/// symmetrized structure and `edge_ids[e]` maps each traversable arc back to
/// the input edge whose mask entry gates it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AdjacencyView<'a> {
    pub(crate) offsets: &'a [u32],
    pub(crate) indices: &'a [u32],
    pub(crate) edge_ids: Option<&'a [u32]>,
}

/// Immutable device-resident CSR topology owned by a descriptor.
#[derive(Debug)]
pub(crate) struct DeviceTopology {
    num_vertices: usize,
    num_edges: usize,
    row_offsets: Vec<u32>,
    col_indices: Vec<u32>,
    symmetric: OnceLock<SymmetricAdjacency>,
    #[cfg(feature = "gpu")]
    pub(crate) gpu: crate::gpu::AdjacencyCache,
    _reservation: MemoryReservation,
}

impl DeviceTopology {
    /// Validate a topology descriptor and copy it into device storage.
    pub(crate) fn install(
        desc: &TopologyDescriptor<'_>,
        tracker: &Arc<MemoryTracker>,
    ) -> Result<Arc<Self>> {
        if desc.orientation != Orientation::Csr {
            return Err(GraphError::InvalidTopology(
                "only the CSR orientation is supported (got CSC)".to_owned(),
            ));
        }
        if desc.num_vertices > i32::MAX as usize || desc.num_edges > i32::MAX as usize {
            return Err(GraphError::InvalidTopology(format!(
                "counts exceed the 32-bit element range (n={}, nnz={})",
                desc.num_vertices, desc.num_edges
            )));
        }
        if desc.row_offsets.len() != desc.num_vertices + 1 {
            return Err(GraphError::InvalidTopology(format!(
                "row_offsets has {} entries, expected n+1 = {}",
                desc.row_offsets.len(),
                desc.num_vertices + 1
            )));
        }
        if desc.col_indices.len() != desc.num_edges {
            return Err(GraphError::InvalidTopology(format!(
                "col_indices has {} entries, expected nnz = {}",
                desc.col_indices.len(),
                desc.num_edges
            )));
        }

        let bytes = 4 * (desc.row_offsets.len() as u64 + desc.col_indices.len() as u64);
        let reservation = tracker.reserve(bytes)?;
        log::debug!(
            "topology installed: n={} nnz={} ({bytes} device bytes)",
            desc.num_vertices,
            desc.num_edges
        );
        Ok(Arc::new(Self {
            num_vertices: desc.num_vertices,
            num_edges: desc.num_edges,
            row_offsets: desc.row_offsets.to_vec(),
            col_indices: desc.col_indices.to_vec(),
            symmetric: OnceLock::new(),
            #[cfg(feature = "gpu")]
            gpu: crate::gpu::AdjacencyCache::default(),
            _reservation: reservation,
        }))
    }

    pub(crate) fn num_vertices(&self) -> usize {
        self.num_vertices
    }

    pub(crate) fn num_edges(&self) -> usize {
        self.num_edges
    }

    /// Adjacency for a traversal. The symmetrized structure for undirected
    /// runs is built at most once per topology and cached; its device bytes
    /// stay reserved until the descriptor is destroyed, so repeated undirected
    /// traversals hold device memory steady after the first call.
    pub(crate) fn adjacency(
        &self,
        undirected: bool,
        tracker: &Arc<MemoryTracker>,
    ) -> Result<AdjacencyView<'_>> {
        if !undirected {
            return Ok(AdjacencyView {
                offsets: &self.row_offsets,
                indices: &self.col_indices,
                edge_ids: None,
            });
        }
        let symmetric = match self.symmetric.get() {
            Some(existing) => existing,
            None => {
                let built = SymmetricAdjacency::build(self, tracker)?;
                self.symmetric.get_or_init(|| built)
            }
        };
        Ok(AdjacencyView {
            offsets: &symmetric.offsets,
            indices: &symmetric.indices,
            edge_ids: Some(&symmetric.edge_ids),
        })
    }
}

/// Union of the forward and reverse adjacency, with originating edge indices.
#[derive(Debug)]
struct SymmetricAdjacency {
    offsets: Vec<u32>,
    indices: Vec<u32>,
    edge_ids: Vec<u32>,
    _reservation: MemoryReservation,
}

impl SymmetricAdjacency {
    #[allow(clippy::cast_possible_truncation)] // counts bounded by i32::MAX at install
    fn build(topology: &DeviceTopology, tracker: &Arc<MemoryTracker>) -> Result<Self> {
        let n = topology.num_vertices;
        let nnz = topology.num_edges;
        let arcs = 2 * nnz;

        let bytes = 4 * ((n as u64 + 1) + 2 * arcs as u64);
        let reservation = tracker.reserve(bytes)?;

        // Out-degree plus in-degree per vertex.
        let mut degree = vec![0u32; n];
        for u in 0..n {
            degree[u] += topology.row_offsets[u + 1] - topology.row_offsets[u];
        }
        for &v in &topology.col_indices {
            degree[v as usize] += 1;
        }

        let mut offsets = Vec::with_capacity(n + 1);
        let mut running = 0u32;
        offsets.push(0);
        for &d in &degree {
            running += d;
            offsets.push(running);
        }

        let mut indices = vec![0u32; arcs];
        let mut edge_ids = vec![0u32; arcs];
        let mut cursor: Vec<u32> = offsets[..n].to_vec();

        for u in 0..n {
            let start = topology.row_offsets[u] as usize;
            let end = topology.row_offsets[u + 1] as usize;
            for e in start..end {
                let slot = cursor[u] as usize;
                indices[slot] = topology.col_indices[e];
                edge_ids[slot] = e as u32;
                cursor[u] += 1;
            }
        }
        for u in 0..n {
            let start = topology.row_offsets[u] as usize;
            let end = topology.row_offsets[u + 1] as usize;
            for e in start..end {
                let v = topology.col_indices[e] as usize;
                let slot = cursor[v] as usize;
                indices[slot] = u as u32;
                edge_ids[slot] = e as u32;
                cursor[v] += 1;
            }
        }

        log::debug!("symmetrized adjacency built: {arcs} arcs ({bytes} device bytes)");
        Ok(Self {
            offsets,
            indices,
            edge_ids,
            _reservation: reservation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> Arc<MemoryTracker> {
        MemoryTracker::new(1024 * 1024)
    }

    fn chain_descriptor<'a>(offsets: &'a [u32], indices: &'a [u32]) -> TopologyDescriptor<'a> {
        TopologyDescriptor {
            orientation: Orientation::Csr,
            num_vertices: offsets.len() - 1,
            num_edges: indices.len(),
            row_offsets: offsets,
            col_indices: indices,
        }
    }

    #[test]
    fn test_install_valid_csr() {
        // 0 → 1 → 2
        let topo = DeviceTopology::install(
            &chain_descriptor(&[0, 1, 2, 2], &[1, 2]),
            &tracker(),
        )
        .unwrap();
        assert_eq!(topo.num_vertices(), 3);
        assert_eq!(topo.num_edges(), 2);
    }

    #[test]
    fn test_install_rejects_csc() {
        let desc = TopologyDescriptor {
            orientation: Orientation::Csc,
            ..chain_descriptor(&[0, 1, 2, 2], &[1, 2])
        };
        let err = DeviceTopology::install(&desc, &tracker()).unwrap_err();
        assert!(matches!(err, GraphError::InvalidTopology(_)));
    }

    #[test]
    fn test_install_rejects_inconsistent_lengths() {
        // Declared n=4 but only 4 offsets.
        let desc = TopologyDescriptor {
            orientation: Orientation::Csr,
            num_vertices: 4,
            num_edges: 2,
            row_offsets: &[0, 1, 2, 2],
            col_indices: &[1, 2],
        };
        assert!(matches!(
            DeviceTopology::install(&desc, &tracker()),
            Err(GraphError::InvalidTopology(_))
        ));

        // Declared nnz=3 but 2 indices.
        let desc = TopologyDescriptor {
            orientation: Orientation::Csr,
            num_vertices: 3,
            num_edges: 3,
            row_offsets: &[0, 1, 2, 2],
            col_indices: &[1, 2],
        };
        assert!(matches!(
            DeviceTopology::install(&desc, &tracker()),
            Err(GraphError::InvalidTopology(_))
        ));
    }

    #[test]
    fn test_install_accounts_device_memory() {
        let t = tracker();
        let before = t.info().used;
        let topo = DeviceTopology::install(&chain_descriptor(&[0, 1, 2, 2], &[1, 2]), &t).unwrap();
        assert_eq!(t.info().used - before, 4 * (4 + 2));
        drop(topo);
        assert_eq!(t.info().used, before);
    }

    #[test]
    fn test_directed_adjacency_is_forward_csr() {
        let t = tracker();
        let topo = DeviceTopology::install(&chain_descriptor(&[0, 1, 2, 2], &[1, 2]), &t).unwrap();
        let adj = topo.adjacency(false, &t).unwrap();
        assert_eq!(adj.offsets, &[0, 1, 2, 2]);
        assert_eq!(adj.indices, &[1, 2]);
        assert!(adj.edge_ids.is_none());
    }

    #[test]
    fn test_symmetric_adjacency_doubles_arcs_and_keeps_edge_ids() {
        let t = tracker();
        // 0 → 1, 0 → 2
        let topo = DeviceTopology::install(&chain_descriptor(&[0, 2, 2, 2], &[1, 2]), &t).unwrap();
        let adj = topo.adjacency(true, &t).unwrap();

        assert_eq!(adj.offsets, &[0, 2, 3, 4]);
        assert_eq!(adj.indices, &[1, 2, 0, 0]);
        // Reverse arcs carry the index of the forward edge they mirror.
        assert_eq!(adj.edge_ids, Some(&[0, 1, 0, 1][..]));
    }

    #[test]
    fn test_symmetric_adjacency_built_once() {
        let t = tracker();
        let topo = DeviceTopology::install(&chain_descriptor(&[0, 1, 2, 2], &[1, 2]), &t).unwrap();

        let used_before = t.info().used;
        topo.adjacency(true, &t).unwrap();
        let used_after_first = t.info().used;
        assert!(used_after_first > used_before);

        topo.adjacency(true, &t).unwrap();
        topo.adjacency(true, &t).unwrap();
        assert_eq!(t.info().used, used_after_first);
    }

    #[test]
    fn test_self_loop_symmetrization() {
        let t = tracker();
        // Single vertex with a self-loop.
        let topo = DeviceTopology::install(&chain_descriptor(&[0, 1], &[0]), &t).unwrap();
        let adj = topo.adjacency(true, &t).unwrap();
        assert_eq!(adj.offsets, &[0, 2]);
        assert_eq!(adj.indices, &[0, 0]);
    }
}
