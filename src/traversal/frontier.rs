//! Host frontier-expansion kernel
//!
//! Level-synchronous BFS over an adjacency view. Every frontier vertex is
//! expanded in parallel; discovery of a vertex is an atomic compare-and-set
//! on its distance cell, so exactly one worker claims it and writes its
//! predecessor. Because expansion is level-synchronous, the claimed value is
//! always the unique BFS level of the vertex — distances are deterministic
//! even though the winning claimer is not.

use std::sync::atomic::{AtomicI32, Ordering};

use rayon::prelude::*;

use crate::topology::AdjacencyView;
use crate::traversal::{NO_PREDECESSOR, UNREACHABLE};

/// Raw kernel result, written into the configured slots by the plan.
#[derive(Debug)]
pub(crate) struct KernelOutput {
    pub(crate) distances: Vec<i32>,
    pub(crate) predecessors: Vec<i32>,
    pub(crate) visited: usize,
    pub(crate) levels: i32,
}

/// Sequential expansion below this frontier size; claims stay atomic either
/// way, the cutoff only avoids fork-join overhead on tiny frontiers.
const PARALLEL_FRONTIER_CUTOFF: usize = 128;

#[allow(clippy::cast_possible_truncation)] // vertex ids bounded by i32::MAX at install
pub(crate) fn run(
    pool: &rayon::ThreadPool,
    adjacency: AdjacencyView<'_>,
    num_vertices: usize,
    mask: Option<&[i32]>,
    source: u32,
) -> KernelOutput {
    let distances: Vec<AtomicI32> = (0..num_vertices)
        .map(|_| AtomicI32::new(UNREACHABLE))
        .collect();
    let predecessors: Vec<AtomicI32> = (0..num_vertices)
        .map(|_| AtomicI32::new(NO_PREDECESSOR))
        .collect();
    distances[source as usize].store(0, Ordering::Relaxed);

    let mut frontier: Vec<u32> = vec![source];
    let mut level: i32 = 0;
    let mut visited: usize = 1;

    while !frontier.is_empty() {
        let next_level = level + 1;
        let expand = |&u: &u32| {
            let ui = u as usize;
            let start = adjacency.offsets[ui] as usize;
            let end = adjacency.offsets[ui + 1] as usize;
            let mut claimed = Vec::new();
            for e in start..end {
                if let Some(mask) = mask {
                    let edge_id = adjacency.edge_ids.map_or(e, |ids| ids[e] as usize);
                    if mask[edge_id] == 0 {
                        continue;
                    }
                }
                let v = adjacency.indices[e] as usize;
                if distances[v].load(Ordering::Relaxed) != UNREACHABLE {
                    continue;
                }
                // First discoverer wins; losers see the level already written.
                if distances[v]
                    .compare_exchange(UNREACHABLE, next_level, Ordering::AcqRel, Ordering::Relaxed)
                    .is_ok()
                {
                    predecessors[v].store(u as i32, Ordering::Relaxed);
                    claimed.push(v as u32);
                }
            }
            claimed
        };

        let next: Vec<u32> = if frontier.len() < PARALLEL_FRONTIER_CUTOFF {
            frontier.iter().flat_map(expand).collect()
        } else {
            pool.install(|| {
                frontier
                    .par_iter()
                    .flat_map_iter(|u| expand(u).into_iter())
                    .collect()
            })
        };

        visited += next.len();
        frontier = next;
        if !frontier.is_empty() {
            level = next_level;
        }
    }

    log::trace!("frontier kernel done: source={source} levels={level} visited={visited}");
    KernelOutput {
        distances: distances.into_iter().map(AtomicI32::into_inner).collect(),
        predecessors: predecessors
            .into_iter()
            .map(AtomicI32::into_inner)
            .collect(),
        visited,
        levels: level,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> rayon::ThreadPool {
        rayon::ThreadPoolBuilder::new().num_threads(4).build().unwrap()
    }

    fn view<'a>(offsets: &'a [u32], indices: &'a [u32]) -> AdjacencyView<'a> {
        AdjacencyView {
            offsets,
            indices,
            edge_ids: None,
        }
    }

    #[test]
    fn test_chain() {
        // 0 → 1 → 2, plus isolated 3
        let offsets = [0u32, 1, 2, 2, 2];
        let indices = [1u32, 2];
        let out = run(&pool(), view(&offsets, &indices), 4, None, 0);

        assert_eq!(out.distances, vec![0, 1, 2, UNREACHABLE]);
        assert_eq!(out.predecessors, vec![-1, 0, 1, -1]);
        assert_eq!(out.visited, 3);
        assert_eq!(out.levels, 2);
    }

    #[test]
    fn test_source_with_self_loop() {
        let offsets = [0u32, 1];
        let indices = [0u32];
        let out = run(&pool(), view(&offsets, &indices), 1, None, 0);
        assert_eq!(out.distances, vec![0]);
        assert_eq!(out.predecessors, vec![-1]);
        assert_eq!(out.levels, 0);
    }

    #[test]
    fn test_mask_prunes_edges() {
        // 0 → 1 (masked off), 0 → 2 → 1
        let offsets = [0u32, 2, 2, 3];
        let indices = [1u32, 2, 1];
        let mask = [0i32, 1, 1];
        let out = run(&pool(), view(&offsets, &indices), 3, Some(&mask), 0);

        assert_eq!(out.distances, vec![0, 2, 1]);
        assert_eq!(out.predecessors, vec![-1, 2, 0]);
    }

    #[test]
    fn test_mask_can_disconnect() {
        let offsets = [0u32, 1, 2, 2];
        let indices = [1u32, 2];
        let mask = [1i32, 0];
        let out = run(&pool(), view(&offsets, &indices), 3, Some(&mask), 0);

        assert_eq!(out.distances, vec![0, 1, UNREACHABLE]);
        assert_eq!(out.predecessors[2], NO_PREDECESSOR);
    }

    #[test]
    fn test_symmetrized_view_with_edge_ids() {
        // Directed edge 1 → 0 presented symmetrically: arcs 0→1 and 1→0,
        // both gated by input edge 0.
        let offsets = [0u32, 1, 2];
        let indices = [1u32, 0];
        let edge_ids = [0u32, 0];
        let adj = AdjacencyView {
            offsets: &offsets,
            indices: &indices,
            edge_ids: Some(&edge_ids),
        };
        let out = run(&pool(), adj, 2, None, 0);
        assert_eq!(out.distances, vec![0, 1]);

        let mask = [0i32];
        let out = run(&pool(), adj, 2, Some(&mask), 0);
        assert_eq!(out.distances, vec![0, UNREACHABLE]);
    }

    #[test]
    fn test_wide_fanout_claims_exactly_once() {
        // Star: 0 → 1..=512, all of which point at 513. The frontier at level
        // 1 is wide enough to take the parallel path; vertex 513 must be
        // claimed exactly once with a consistent predecessor.
        let n = 514usize;
        let mut offsets = Vec::with_capacity(n + 1);
        let mut indices = Vec::new();
        offsets.push(0u32);
        indices.extend(1..=512u32);
        offsets.push(indices.len() as u32);
        for _ in 1..=512 {
            indices.push(513);
            offsets.push(indices.len() as u32);
        }
        offsets.push(indices.len() as u32); // 513 has no out-edges

        let out = run(&pool(), view(&offsets, &indices), n, None, 0);
        assert_eq!(out.distances[513], 2);
        let p = out.predecessors[513];
        assert!((1..=512).contains(&p));
        assert_eq!(out.distances[p as usize], 1);
        assert_eq!(out.visited, n);
    }
}
