use std::fmt::Display;

use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::{
    bellman_ford_all_pairs, dijkstra_all_pairs, floyd_warshall, GraphError, Matrix, SparseGraph,
};

/// Shortest-path costs between every ordered pair of nodes.
///
/// Unreachable pairs hold `f64::INFINITY`; the diagonal is always 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceTable {
    dist: Array2<f64>,
}

impl DistanceTable {
    pub fn from_matrix(dist: Array2<f64>) -> Self {
        debug_assert!(dist.is_square());
        Self { dist }
    }

    pub fn from_rows(rows: Vec<Vec<f64>>) -> Self {
        let n = rows.len();
        let mut dist = Array2::from_elem((n, n), f64::INFINITY);
        for (i, row) in rows.into_iter().enumerate() {
            for (j, d) in row.into_iter().enumerate().take(n) {
                dist[[i, j]] = d;
            }
        }
        Self { dist }
    }

    pub fn n(&self) -> usize {
        self.dist.nrows()
    }

    pub fn get(&self, from: usize, to: usize) -> f64 {
        self.dist[[from, to]]
    }

    pub fn row(&self, from: usize) -> ArrayView1<'_, f64> {
        self.dist.row(from)
    }

    pub fn into_matrix(self) -> Matrix {
        self.dist
    }

    /// Entry-wise comparison with relative tolerance `tol`. Infinite entries
    /// must match exactly.
    pub fn approx_eq(&self, other: &DistanceTable, tol: f64) -> bool {
        self.dist.dim() == other.dist.dim()
            && self.dist.iter().zip(other.dist.iter()).all(|(&a, &b)| {
                if a.is_infinite() || b.is_infinite() {
                    a == b
                } else {
                    (a - b).abs() <= tol * a.abs().max(b.abs()).max(1.0)
                }
            })
    }
}

/// The interchangeable all-pairs shortest-path engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Engine {
    FloydWarshall,
    Dijkstra,
    BellmanFord,
}

impl Engine {
    pub const ALL: [Engine; 3] = [Engine::FloydWarshall, Engine::Dijkstra, Engine::BellmanFord];

    pub fn name(&self) -> &'static str {
        match self {
            Engine::FloydWarshall => "floyd-warshall",
            Engine::Dijkstra => "dijkstra",
            Engine::BellmanFord => "bellman-ford",
        }
    }

    /// Floyd-Warshall reads the dense `matrix`, the others the sparse `graph`.
    /// Both must describe the same edges.
    pub fn all_pairs(&self, matrix: &Matrix, graph: &SparseGraph) -> Result<DistanceTable, GraphError> {
        match self {
            Engine::FloydWarshall => floyd_warshall(matrix),
            Engine::Dijkstra => Ok(dijkstra_all_pairs(graph)),
            Engine::BellmanFord => bellman_ford_all_pairs(graph),
        }
    }
}

impl Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod test_engines {
    use ndarray::array;
    use proptest::prelude::*;

    use super::*;
    use crate::sparse_to_dense;

    ///   depot --10-- A --5-- B
    ///     \_________15______/
    fn three_stops() -> SparseGraph {
        SparseGraph::from_adjacency(vec![
            vec![(1, 10.0), (2, 15.0)],
            vec![(2, 5.0), (0, 10.0)],
            vec![(1, 5.0), (0, 15.0)],
        ])
    }

    #[test]
    fn test_engines_agree_on_three_stops() {
        let graph = three_stops();
        let matrix = sparse_to_dense(&graph, 3);

        let expected = DistanceTable::from_matrix(array![
            [0.0, 10.0, 15.0],
            [10.0, 0.0, 5.0],
            [15.0, 5.0, 0.0]
        ]);
        for engine in Engine::ALL {
            let table = engine.all_pairs(&matrix, &graph).unwrap();
            assert!(table.approx_eq(&expected, 1e-9), "{} disagrees", engine);
        }
    }

    #[test]
    fn test_approx_eq() {
        let inf = f64::INFINITY;
        let a = DistanceTable::from_rows(vec![vec![0.0, 1.0], vec![inf, 0.0]]);
        let b = DistanceTable::from_rows(vec![vec![0.0, 1.0 + 1e-12], vec![inf, 0.0]]);
        let c = DistanceTable::from_rows(vec![vec![0.0, 1.0], vec![3.0, 0.0]]);

        assert!(a.approx_eq(&b, 1e-6));
        assert!(!a.approx_eq(&c, 1e-6));
        assert_eq!(a.n(), 2);
        assert_eq!(a.get(1, 0), inf);
    }

    fn arb_graph() -> impl Strategy<Value = SparseGraph> {
        (2usize..9).prop_flat_map(|n| {
            proptest::collection::vec(
                proptest::collection::vec((0..n, 0.0f64..1000.0), 0..n),
                n,
            )
            .prop_map(SparseGraph::from_adjacency)
        })
    }

    proptest! {
        #[test]
        fn prop_engines_agree(graph in arb_graph()) {
            let matrix = sparse_to_dense(&graph, graph.n());
            let fw = floyd_warshall(&matrix).unwrap();
            let dj = dijkstra_all_pairs(&graph);
            let bf = bellman_ford_all_pairs(&graph).unwrap();

            prop_assert!(fw.approx_eq(&dj, 1e-6));
            prop_assert!(fw.approx_eq(&bf, 1e-6));
            for i in 0..graph.n() {
                prop_assert_eq!(fw.get(i, i), 0.0);
                prop_assert_eq!(dj.get(i, i), 0.0);
                prop_assert_eq!(bf.get(i, i), 0.0);
            }
        }
    }
}
