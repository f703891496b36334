//! Edge masking and undirected traversal on a small grid-ish graph.

use anyhow::Result;
use wavefront_graph::{
    bfs, DeviceOptions, ElementKind, GraphHandle, NodeId, Orientation, TopologyDescriptor,
    TraversalConfig, UNREACHABLE,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::init();

    // 0 → 1 → 2 → 3 with a shortcut 0 → 3
    let row_offsets = [0u32, 2, 3, 4, 4];
    let col_indices = [1u32, 3, 2, 3];

    let handle = GraphHandle::new(DeviceOptions::default())?;
    let mut graph = handle.create_graph()?;
    graph.install_topology(&TopologyDescriptor {
        orientation: Orientation::Csr,
        num_vertices: 4,
        num_edges: 4,
        row_offsets: &row_offsets,
        col_indices: &col_indices,
    })?;
    graph.allocate_vertex_data(&[ElementKind::Int32])?;
    graph.allocate_edge_data(&[ElementKind::Int32])?;

    let mut distances = vec![0i32; 4];

    // Unmasked: the shortcut puts vertex 3 one hop away.
    bfs(&graph, NodeId(0), &TraversalConfig::new().with_distances(0))?;
    handle.synchronize().await?;
    graph.get_vertex_data(0, &mut distances)?;
    println!("unmasked:   {distances:?}");

    // Mask off the shortcut (edge 1): vertex 3 now takes the long way.
    graph.set_edge_data(0, &[1i32, 0, 1, 1])?;
    let masked = TraversalConfig::new().with_distances(0).with_edge_mask(0);
    bfs(&graph, NodeId(0), &masked)?;
    handle.synchronize().await?;
    graph.get_vertex_data(0, &mut distances)?;
    println!("masked:     {distances:?}");

    // Undirected from the far end reaches everything.
    let undirected = TraversalConfig::new().with_distances(0).with_undirected(true);
    bfs(&graph, NodeId(3), &undirected)?;
    handle.synchronize().await?;
    graph.get_vertex_data(0, &mut distances)?;
    println!("undirected from 3: {distances:?}");
    assert!(distances.iter().all(|&d| d != UNREACHABLE));

    handle.destroy()?;
    Ok(())
}
