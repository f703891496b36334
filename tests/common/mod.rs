//! Shared test support: CSR builders, a serial reference BFS and helpers for
//! driving the engine end to end.

#![allow(dead_code)] // each suite uses its own subset

use std::collections::VecDeque;

use wavefront_graph::{
    bfs, DeviceOptions, ElementKind, GraphDescriptor, GraphHandle, NodeId, Orientation,
    TopologyDescriptor, TraversalConfig, UNREACHABLE,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Host-side CSR arrays, the shape the engine ingests.
#[derive(Debug, Clone)]
pub struct CsrInput {
    pub num_vertices: usize,
    pub row_offsets: Vec<u32>,
    pub col_indices: Vec<u32>,
}

impl CsrInput {
    /// Bucket an edge list by source, preserving insertion order per source.
    pub fn from_edges(num_vertices: usize, edges: &[(u32, u32)]) -> Self {
        let mut adjacency: Vec<Vec<u32>> = vec![Vec::new(); num_vertices];
        for &(src, dst) in edges {
            adjacency[src as usize].push(dst);
        }

        let mut row_offsets = Vec::with_capacity(num_vertices + 1);
        let mut col_indices = Vec::with_capacity(edges.len());
        row_offsets.push(0u32);
        for neighbors in &adjacency {
            col_indices.extend_from_slice(neighbors);
            row_offsets.push(col_indices.len() as u32);
        }
        Self {
            num_vertices,
            row_offsets,
            col_indices,
        }
    }

    /// Directed cycle: edge `i → (i + 1) % n`.
    pub fn cycle(num_vertices: usize) -> Self {
        let edges: Vec<(u32, u32)> = (0..num_vertices as u32)
            .map(|i| (i, (i + 1) % num_vertices as u32))
            .collect();
        Self::from_edges(num_vertices, &edges)
    }

    /// Every edge plus its reverse, as a plain directed graph.
    pub fn symmetrized(&self) -> Self {
        let mut edges = Vec::with_capacity(2 * self.col_indices.len());
        for u in 0..self.num_vertices {
            let start = self.row_offsets[u] as usize;
            let end = self.row_offsets[u + 1] as usize;
            for &v in &self.col_indices[start..end] {
                edges.push((u as u32, v));
                edges.push((v, u as u32));
            }
        }
        Self::from_edges(self.num_vertices, &edges)
    }

    pub fn num_edges(&self) -> usize {
        self.col_indices.len()
    }

    pub fn descriptor(&self) -> TopologyDescriptor<'_> {
        TopologyDescriptor {
            orientation: Orientation::Csr,
            num_vertices: self.num_vertices,
            num_edges: self.col_indices.len(),
            row_offsets: &self.row_offsets,
            col_indices: &self.col_indices,
        }
    }
}

/// Serial queue BFS producing the expected distance array: hop counts from
/// `source`, `i32::MAX` where unreachable, mask entries of zero pruning the
/// edge, and (optionally) every edge traversable in reverse as well.
pub fn reference_bfs(
    csr: &CsrInput,
    mask: Option<&[i32]>,
    undirected: bool,
    source: u32,
) -> Vec<i32> {
    let n = csr.num_vertices;
    let mut adjacency: Vec<Vec<(u32, usize)>> = vec![Vec::new(); n];
    for u in 0..n {
        let start = csr.row_offsets[u] as usize;
        let end = csr.row_offsets[u + 1] as usize;
        for e in start..end {
            let v = csr.col_indices[e];
            adjacency[u].push((v, e));
            if undirected {
                adjacency[v as usize].push((u as u32, e));
            }
        }
    }

    let mut distances = vec![UNREACHABLE; n];
    distances[source as usize] = 0;
    let mut queue = VecDeque::new();
    queue.push_back(source);
    while let Some(u) = queue.pop_front() {
        for &(v, edge_id) in &adjacency[u as usize] {
            if let Some(mask) = mask {
                if mask[edge_id] == 0 {
                    continue;
                }
            }
            if distances[v as usize] == UNREACHABLE {
                distances[v as usize] = distances[u as usize] + 1;
                queue.push_back(v);
            }
        }
    }
    distances
}

/// Pseudo-random edge list from a fixed LCG, reproducible across runs.
pub fn lcg_edges(num_vertices: usize, edges_per_vertex: usize, seed: u64) -> Vec<(u32, u32)> {
    let mut state = seed;
    let mut edges = Vec::new();
    for u in 0..num_vertices as u32 {
        for _ in 0..edges_per_vertex {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let v = (state % num_vertices as u64) as u32;
            if v != u {
                edges.push((u, v));
            }
        }
    }
    edges
}

/// Alternating mask: every even-positioned edge pruned, as the original
/// mask stress case did.
pub fn alternating_mask(num_edges: usize) -> Vec<i32> {
    (0..num_edges).map(|e| i32::from(e % 2 != 0)).collect()
}

pub fn default_handle() -> GraphHandle {
    GraphHandle::new(DeviceOptions::default()).expect("handle creation")
}

/// Handle + descriptor with the topology installed and `Int32` slots
/// allocated: `vertex_slots` vertex sets and `edge_slots` edge sets.
pub fn ready_graph(
    handle: &GraphHandle,
    csr: &CsrInput,
    vertex_slots: usize,
    edge_slots: usize,
) -> GraphDescriptor {
    let mut graph = handle.create_graph().expect("descriptor creation");
    graph
        .install_topology(&csr.descriptor())
        .expect("topology install");
    graph
        .allocate_vertex_data(&vec![ElementKind::Int32; vertex_slots])
        .expect("vertex slot allocation");
    if edge_slots > 0 {
        graph
            .allocate_edge_data(&vec![ElementKind::Int32; edge_slots])
            .expect("edge slot allocation");
    }
    graph
}

/// Submit a traversal, synchronize, and read back distance (slot 0) and
/// predecessor (slot 1, when configured) arrays.
pub async fn run_bfs(
    handle: &GraphHandle,
    graph: &GraphDescriptor,
    source: u32,
    config: &TraversalConfig,
) -> (Vec<i32>, Vec<i32>) {
    let n = graph.num_vertices().expect("topology installed");
    bfs(graph, NodeId(source), config).expect("traversal submission");
    handle.synchronize().await.expect("synchronize");

    let mut distances = vec![0i32; n];
    if config.distances_slot().is_some() {
        graph
            .get_vertex_data(0, &mut distances)
            .expect("distance readback");
    }
    let mut predecessors = vec![0i32; n];
    if config.predecessors_slot().is_some() {
        graph
            .get_vertex_data(1, &mut predecessors)
            .expect("predecessor readback");
    }
    (distances, predecessors)
}

/// Predecessor-tree invariants: a set predecessor is one hop closer; an
/// unset predecessor means source or unreachable.
pub fn assert_predecessors_consistent(distances: &[i32], predecessors: &[i32], source: u32) {
    for v in 0..distances.len() {
        let p = predecessors[v];
        if p == -1 {
            assert!(
                v == source as usize || distances[v] == UNREACHABLE,
                "vertex {v}: no predecessor but distance {}",
                distances[v]
            );
        } else {
            assert!(
                (0..distances.len()).contains(&(p as usize)),
                "vertex {v}: predecessor {p} out of range"
            );
            assert_eq!(
                distances[v],
                distances[p as usize] + 1,
                "vertex {v}: predecessor {p} is not one hop closer"
            );
        }
    }
}
