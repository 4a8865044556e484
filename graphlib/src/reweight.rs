//! Priority reweighting.
//!
//! Every finite edge leaving a prioritized node is replaced by
//! [`PRIORITY_WEIGHT`]. The result is a new graph with negative edges: it must
//! not be fed to Dijkstra, and Floyd-Warshall or Bellman-Ford will report a
//! negative cycle as soon as a prioritized node lies on any cycle.

use crate::{Matrix, PrioritySet, SparseGraph};

pub const PRIORITY_WEIGHT: f64 = -1.0e9;

fn flags<'k, F>(n: usize, priority: &PrioritySet, index_to_key: F) -> Vec<bool>
where
    F: Fn(usize) -> &'k str,
{
    (0..n)
        .map(|node| priority.is_prioritized(index_to_key(node)))
        .collect()
}

pub fn reweight<'k, F>(matrix: &Matrix, priority: &PrioritySet, index_to_key: F) -> Matrix
where
    F: Fn(usize) -> &'k str,
{
    let prioritized = flags(matrix.nrows(), priority, index_to_key);
    let mut reweighted = matrix.clone();
    for ((from, to), w) in reweighted.indexed_iter_mut() {
        if from != to && w.is_finite() && prioritized[from] {
            *w = PRIORITY_WEIGHT;
        }
    }
    reweighted
}

/// Adjacency-list counterpart of [`reweight`].
pub fn reweight_sparse<'k, F>(
    graph: &SparseGraph,
    priority: &PrioritySet,
    index_to_key: F,
) -> SparseGraph
where
    F: Fn(usize) -> &'k str,
{
    let prioritized = flags(graph.n(), priority, index_to_key);
    let adjacency = (0..graph.n())
        .map(|from| {
            graph
                .neighbors(from)
                .iter()
                .map(|&(to, w)| {
                    if prioritized[from] && w.is_finite() {
                        (to, PRIORITY_WEIGHT)
                    } else {
                        (to, w)
                    }
                })
                .collect()
        })
        .collect();
    SparseGraph::from_adjacency(adjacency)
}
