mod bellman_ford;
mod builder;
mod dijkstra;
mod floyd_warshall;
mod index;
pub mod provider;
mod reweight;
pub mod sp;
pub mod tsp;

use ndarray::Array2;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use bellman_ford::{bellman_ford, bellman_ford_all_pairs};
pub use builder::{build_graph, sparse_to_dense};
pub use dijkstra::{dijkstra, dijkstra_all_pairs};
pub use floyd_warshall::floyd_warshall;
pub use index::StopIndex;
pub use provider::{Coordinate, DistanceProvider, DurationMatrix, RouteLeg};
pub use reweight::{reweight, reweight_sparse, PRIORITY_WEIGHT};
pub use sp::{DistanceTable, Engine};

/// Dense edge-weight matrix. Absent edges are `f64::INFINITY`, the diagonal is 0.
pub type Matrix = Array2<f64>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("graph has no nodes")]
    EmptyGraph,
    #[error("k = {k} must be smaller than the number of nodes ({n})")]
    InvalidK { k: usize, n: usize },
    #[error("negative cycle reachable from node {origin}")]
    NegativeCycle { origin: usize },
    #[error("negative self-distance at node {node}")]
    NegativeSelfDistance { node: usize },
}

/// A stop to visit. Index 0 of a stop list is always the depot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub key: String,
    pub coordinate: Coordinate,
}

impl Stop {
    pub fn new(key: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            key: key.into(),
            coordinate: Coordinate::new(latitude, longitude),
        }
    }
}

/// Adjacency lists indexed by node; each list holds `(neighbor, weight)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseGraph {
    adjacency: Vec<Vec<(usize, f64)>>,
}

impl SparseGraph {
    pub fn with_nodes(n: usize) -> Self {
        Self {
            adjacency: vec![vec![]; n],
        }
    }

    pub fn from_adjacency(adjacency: Vec<Vec<(usize, f64)>>) -> Self {
        let mut graph = Self::with_nodes(adjacency.len());
        for (node, neighbors) in adjacency.into_iter().enumerate() {
            graph.set_neighbors(node, neighbors);
        }
        graph
    }

    pub fn n(&self) -> usize {
        self.adjacency.len()
    }

    pub fn neighbors(&self, node: usize) -> &[(usize, f64)] {
        &self.adjacency[node]
    }

    /// Replaces the neighbor list of `node`. Self-loops are dropped.
    pub fn set_neighbors(&mut self, node: usize, mut neighbors: Vec<(usize, f64)>) {
        neighbors.retain(|&(target, _)| target != node);
        self.adjacency[node] = neighbors;
    }

    pub fn edges(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.adjacency
            .iter()
            .enumerate()
            .flat_map(|(from, neighbors)| neighbors.iter().map(move |&(to, w)| (from, to, w)))
    }

    pub fn num_edges(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum()
    }

    pub fn has_negative_edge(&self) -> bool {
        self.edges().any(|(_, _, w)| w < 0.0)
    }
}

/// Caller-supplied priority flags, keyed by the stop's external key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrioritySet {
    flags: FxHashMap<String, bool>,
}

impl PrioritySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, prioritized: bool) {
        self.flags.insert(key.into(), prioritized);
    }

    pub fn is_prioritized(&self, key: &str) -> bool {
        self.flags.get(key).copied().unwrap_or(false)
    }

    /// All keys mentioned by the caller, flagged or not.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.flags.keys().map(String::as_str)
    }

    /// True if at least one key is flagged.
    pub fn has_flagged(&self) -> bool {
        self.flags.values().any(|&flag| flag)
    }
}

impl<K: Into<String>> FromIterator<K> for PrioritySet {
    fn from_iter<I: IntoIterator<Item = K>>(keys: I) -> Self {
        Self {
            flags: keys.into_iter().map(|key| (key.into(), true)).collect(),
        }
    }
}

#[cfg(test)]
mod test_sparse_graph {
    use super::*;

    #[test]
    fn test_self_loops_are_dropped() {
        let graph = SparseGraph::from_adjacency(vec![vec![(0, 1.0), (1, 2.0)], vec![(1, 0.0)]]);

        assert_eq!(graph.neighbors(0), &[(1, 2.0)]);
        assert!(graph.neighbors(1).is_empty());
        assert_eq!(graph.num_edges(), 1);
    }

    #[test]
    fn test_edges_and_negative_weights() {
        let graph =
            SparseGraph::from_adjacency(vec![vec![(1, 4.0)], vec![], vec![(0, -1.0), (2, 3.0)]]);

        assert_eq!(
            graph.edges().collect::<Vec<_>>(),
            vec![(0, 1, 4.0), (2, 0, -1.0)]
        );
        assert!(graph.has_negative_edge());
    }

    #[test]
    fn test_priority_set() {
        let mut priority: PrioritySet = vec!["anna"].into_iter().collect();
        priority.insert("bob", false);

        assert!(priority.is_prioritized("anna"));
        assert!(!priority.is_prioritized("bob"));
        assert!(!priority.is_prioritized("carl"));
        assert!(priority.has_flagged());

        let mut unflagged = PrioritySet::new();
        unflagged.insert("x", false);
        assert!(!unflagged.has_flagged());
        assert_eq!(unflagged.keys().collect::<Vec<_>>(), vec!["x"]);
    }
}
