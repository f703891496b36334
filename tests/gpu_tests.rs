//! GPU backend tests. Require wgpu-capable hardware; every test skips
//! gracefully when no adapter is present.

#![cfg(feature = "gpu")]

mod common;

use common::{
    alternating_mask, assert_predecessors_consistent, reference_bfs, ready_graph, run_bfs,
    CsrInput,
};
use wavefront_graph::{DeviceOptions, GpuDevice, GraphHandle, TraversalConfig};

async fn gpu_handle() -> Option<GraphHandle> {
    if !GpuDevice::is_gpu_available().await {
        eprintln!("skipping: GPU not available");
        return None;
    }
    Some(
        GraphHandle::with_gpu(DeviceOptions::default())
            .await
            .expect("gpu handle"),
    )
}

#[tokio::test]
async fn test_gpu_cycle_matches_expected() {
    let Some(handle) = gpu_handle().await else {
        return;
    };
    let graph = ready_graph(&handle, &CsrInput::cycle(1024), 2, 0);
    let config = TraversalConfig::new().with_distances(0).with_predecessors(1);
    let (distances, predecessors) = run_bfs(&handle, &graph, 0, &config).await;

    for (i, &d) in distances.iter().enumerate() {
        assert_eq!(d, i as i32, "distance of vertex {i}");
    }
    assert_predecessors_consistent(&distances, &predecessors, 0);
}

#[tokio::test]
async fn test_gpu_matches_reference_on_random_graph() {
    let Some(handle) = gpu_handle().await else {
        return;
    };
    let csr = CsrInput::from_edges(500, &common::lcg_edges(500, 3, 11));
    let graph = ready_graph(&handle, &csr, 2, 0);
    let config = TraversalConfig::new().with_distances(0).with_predecessors(1);

    let (distances, predecessors) = run_bfs(&handle, &graph, 0, &config).await;
    assert_eq!(distances, reference_bfs(&csr, None, false, 0));
    assert_predecessors_consistent(&distances, &predecessors, 0);
}

#[tokio::test]
async fn test_gpu_masked_undirected() {
    let Some(handle) = gpu_handle().await else {
        return;
    };
    let csr = CsrInput::from_edges(200, &common::lcg_edges(200, 2, 404));
    let mask = alternating_mask(csr.num_edges());
    let graph = ready_graph(&handle, &csr, 1, 1);
    graph.set_edge_data(0, &mask).unwrap();

    let config = TraversalConfig::new()
        .with_distances(0)
        .with_edge_mask(0)
        .with_undirected(true);
    let (distances, _) = run_bfs(&handle, &graph, 0, &config).await;

    assert_eq!(distances, reference_bfs(&csr, Some(&mask), true, 0));
}

#[tokio::test]
async fn test_gpu_repetition_stability() {
    let Some(handle) = gpu_handle().await else {
        return;
    };
    let csr = CsrInput::from_edges(300, &common::lcg_edges(300, 3, 2718));
    let graph = ready_graph(&handle, &csr, 1, 0);
    let config = TraversalConfig::new().with_distances(0);

    let (first, _) = run_bfs(&handle, &graph, 5, &config).await;
    for _ in 0..3 {
        let (next, _) = run_bfs(&handle, &graph, 5, &config).await;
        assert_eq!(first, next);
    }
}
