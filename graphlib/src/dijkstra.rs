use std::cmp::Ordering;

use binary_heap_plus::BinaryHeap;
use compare::Compare;

use crate::{DistanceTable, SparseGraph};

/// Orders heap entries so that the cheapest `(cost, node)` is popped first.
struct NearestFirst;

impl Compare<(f64, usize)> for NearestFirst {
    fn compare(&self, l: &(f64, usize), r: &(f64, usize)) -> Ordering {
        r.0.total_cmp(&l.0).then_with(|| r.1.cmp(&l.1))
    }
}

/// Single-source shortest path costs from `source`. Edge weights must be non-negative.
pub fn dijkstra(graph: &SparseGraph, source: usize) -> Vec<f64> {
    let mut dist = vec![f64::INFINITY; graph.n()];
    dist[source] = 0.0;

    let mut heap = BinaryHeap::from_vec_cmp(Vec::with_capacity(graph.n()), NearestFirst);
    heap.push((0.0, source));

    while let Some((cost, node)) = heap.pop() {
        if cost > dist[node] {
            continue;
        }
        for &(next, w) in graph.neighbors(node) {
            let candidate = cost + w;
            if candidate < dist[next] {
                dist[next] = candidate;
                heap.push((candidate, next));
            }
        }
    }

    dist
}

/// Runs [`dijkstra`] from every node.
pub fn dijkstra_all_pairs(graph: &SparseGraph) -> DistanceTable {
    log::debug!("Dijkstra all pairs on {} nodes.", graph.n());
    DistanceTable::from_rows((0..graph.n()).map(|s| dijkstra(graph, s)).collect())
}
