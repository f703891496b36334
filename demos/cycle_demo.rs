//! Directed-cycle walkthrough: install a 1024-vertex cycle, traverse from
//! vertex 0 and print the head of the distance/predecessor arrays.

use anyhow::Result;
use wavefront_graph::{
    bfs, DeviceOptions, ElementKind, GraphHandle, NodeId, Orientation, TopologyDescriptor,
    TraversalConfig,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::init();

    let n: usize = 1024;
    let row_offsets: Vec<u32> = (0..=n as u32).collect();
    let col_indices: Vec<u32> = (0..n as u32).map(|i| (i + 1) % n as u32).collect();

    let handle = GraphHandle::new(DeviceOptions::default())?;
    let mut graph = handle.create_graph()?;
    graph.install_topology(&TopologyDescriptor {
        orientation: Orientation::Csr,
        num_vertices: n,
        num_edges: n,
        row_offsets: &row_offsets,
        col_indices: &col_indices,
    })?;
    graph.allocate_vertex_data(&[ElementKind::Int32, ElementKind::Int32])?;

    let config = TraversalConfig::new().with_distances(0).with_predecessors(1);
    bfs(&graph, NodeId(0), &config)?;
    handle.synchronize().await?;

    let mut distances = vec![0i32; n];
    let mut predecessors = vec![0i32; n];
    graph.get_vertex_data(0, &mut distances)?;
    graph.get_vertex_data(1, &mut predecessors)?;

    println!("cycle of {n} vertices, source 0");
    for v in 0..8 {
        println!(
            "  vertex {v}: distance {}, predecessor {}",
            distances[v], predecessors[v]
        );
    }
    println!("  ...");
    println!(
        "  vertex {}: distance {}, predecessor {}",
        n - 1,
        distances[n - 1],
        predecessors[n - 1]
    );

    let info = handle.memory_info()?;
    println!("device memory: {} of {} bytes in use", info.used, info.total);

    graph.destroy()?;
    handle.destroy()?;
    Ok(())
}
