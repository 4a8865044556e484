use ndarray::Array2;

use crate::{Coordinate, DistanceProvider, GraphError, Matrix, SparseGraph};

/// Connects every node to its `k` nearest neighbors as reported by `provider`.
///
/// A provider failure for one source leaves that node without outgoing
/// edges; the remaining nodes are still processed.
pub fn build_graph<P>(
    coordinates: &[Coordinate],
    k: usize,
    provider: &P,
) -> Result<SparseGraph, GraphError>
where
    P: DistanceProvider + ?Sized,
{
    let n = coordinates.len();
    if n == 0 {
        return Err(GraphError::EmptyGraph);
    }
    if k >= n {
        return Err(GraphError::InvalidK { k, n });
    }

    log::info!("Building {}-nearest neighbor graph on {} nodes.", k, n);

    let mut graph = SparseGraph::with_nodes(n);
    for source in 0..n {
        match provider.nearest_neighbors(source, k, coordinates) {
            Ok(neighbors) => {
                let neighbors = normalize(source, n, k, neighbors);
                log::trace!("Node {} -> {:?}", source, neighbors);
                graph.set_neighbors(source, neighbors);
            }
            Err(err) => {
                log::warn!(
                    "Neighbor lookup failed for node {}, leaving it isolated: {:#}",
                    source,
                    err
                );
            }
        }
    }

    log::info!("Finished graph with {} edges.", graph.num_edges());

    Ok(graph)
}

// Keeps the k closest valid targets in deterministic order, whatever the provider returned.
fn normalize(source: usize, n: usize, k: usize, neighbors: Vec<(usize, f64)>) -> Vec<(usize, f64)> {
    let mut neighbors: Vec<(usize, f64)> = neighbors
        .into_iter()
        .filter(|&(target, w)| target != source && target < n && !w.is_nan())
        .collect();
    neighbors.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));
    neighbors.dedup_by_key(|(target, _)| *target);
    neighbors.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
    neighbors.truncate(k);
    neighbors
}

/// Dense view of `graph` over `n` nodes. Unlisted pairs are infinite, the diagonal is 0.
pub fn sparse_to_dense(graph: &SparseGraph, n: usize) -> Matrix {
    let mut matrix = Array2::from_elem((n, n), f64::INFINITY);
    for i in 0..n {
        matrix[[i, i]] = 0.0;
    }
    for (from, to, w) in graph.edges() {
        if from < n && to < n && w < matrix[[from, to]] {
            matrix[[from, to]] = w;
        }
    }
    matrix
}

#[cfg(test)]
mod test_builder {
    use ndarray::array;

    use super::*;
    use crate::provider::StaticProvider;

    fn line_of(n: usize) -> Vec<Coordinate> {
        (0..n).map(|i| Coordinate::new(0.0, i as f64)).collect()
    }

    fn provider() -> StaticProvider {
        let distances = array![
            [0.0, 10.0, 15.0, 10.0],
            [10.0, 0.0, 5.0, 12.0],
            [15.0, 5.0, 0.0, 9.0],
            [7.0, 7.0, 7.0, 0.0],
        ];
        StaticProvider::new(line_of(4), distances)
    }

    #[test]
    fn test_k_nearest_with_tie_break() {
        let graph = build_graph(&line_of(4), 2, &provider()).unwrap();

        assert_eq!(graph.n(), 4);
        assert_eq!(graph.neighbors(0), &[(1, 10.0), (3, 10.0)]);
        assert_eq!(graph.neighbors(1), &[(2, 5.0), (0, 10.0)]);
        assert_eq!(graph.neighbors(2), &[(1, 5.0), (3, 9.0)]);
        assert_eq!(graph.neighbors(3), &[(0, 7.0), (1, 7.0)]);
    }

    #[test]
    fn test_failed_source_is_isolated() {
        let provider = provider().failing_source(2);
        let graph = build_graph(&line_of(4), 3, &provider).unwrap();

        assert!(graph.neighbors(2).is_empty());
        assert_eq!(graph.neighbors(1).len(), 3);
        assert_eq!(graph.num_edges(), 9);
    }

    #[test]
    fn test_invalid_input() {
        assert_eq!(
            build_graph(&[], 0, &provider()),
            Err(GraphError::EmptyGraph)
        );
        assert_eq!(
            build_graph(&line_of(4), 4, &provider()),
            Err(GraphError::InvalidK { k: 4, n: 4 })
        );
        let graph = build_graph(&line_of(4), 0, &provider()).unwrap();
        assert_eq!(graph.num_edges(), 0);
    }

    #[test]
    fn test_normalize_drops_invalid_targets() {
        let raw = vec![(3, 2.0), (1, 1.0), (1, 4.0), (7, 0.5), (0, 0.0), (2, f64::NAN)];

        assert_eq!(normalize(0, 4, 5, raw), vec![(1, 1.0), (3, 2.0)]);
    }

    #[test]
    fn test_sparse_to_dense() {
        let graph = SparseGraph::from_adjacency(vec![vec![(1, 10.0)], vec![(2, 5.0)], vec![]]);
        let dense = sparse_to_dense(&graph, 3);
        let inf = f64::INFINITY;

        assert_eq!(
            dense,
            array![[0.0, 10.0, inf], [inf, 0.0, 5.0], [inf, inf, 0.0]]
        );
        assert_eq!(graph.num_edges(), 2);
    }
}
