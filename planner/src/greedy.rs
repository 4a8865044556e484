//! Greedy nearest-neighbor route construction.
//!
//! All three variants share [`greedy_route`]; they only differ in how the
//! distances from the current tail are obtained.

use fixedbitset::FixedBitSet;
use graphlib::{bellman_ford, dijkstra, floyd_warshall, Matrix, SparseGraph};

use crate::RouteError;

/// State of a walk: the order so far, where it ends and what is left.
struct Walk {
    order: Vec<usize>,
    tail: usize,
    remaining: FixedBitSet,
}

impl Walk {
    fn start(start: usize, mut remaining: FixedBitSet) -> Self {
        remaining.set(start, false);
        Self {
            order: vec![start],
            tail: start,
            remaining,
        }
    }

    fn is_done(&self) -> bool {
        self.remaining.count_ones(..) == 0
    }

    fn step(mut self, next: usize) -> Self {
        self.remaining.set(next, false);
        self.order.push(next);
        self.tail = next;
        self
    }
}

/// Picks the closest remaining node, ties and unreachable leftovers going to
/// the lowest index. Remaining prioritized nodes are always picked first.
fn nearest(distances: &[f64], remaining: &FixedBitSet, priority: &FixedBitSet) -> Option<usize> {
    let mut preferred = remaining.clone();
    preferred.intersect_with(priority);
    let candidates = if preferred.count_ones(..) > 0 {
        &preferred
    } else {
        remaining
    };

    candidates.ones().min_by(|&a, &b| {
        let da = distances.get(a).copied().unwrap_or(f64::INFINITY);
        let db = distances.get(b).copied().unwrap_or(f64::INFINITY);
        da.total_cmp(&db).then(a.cmp(&b))
    })
}

/// Builds a visiting order from `start` through every node in `remaining`.
///
/// `distances_from(tail)` yields the shortest distance from `tail` to every
/// node; it is called once per step.
pub fn greedy_route<F>(
    start: usize,
    remaining: FixedBitSet,
    priority: &FixedBitSet,
    mut distances_from: F,
) -> Result<Vec<usize>, RouteError>
where
    F: FnMut(usize) -> Result<Vec<f64>, RouteError>,
{
    let mut walk = Walk::start(start, remaining);
    while !walk.is_done() {
        let distances = distances_from(walk.tail)?;
        walk = match nearest(&distances, &walk.remaining, priority) {
            Some(next) => walk.step(next),
            None => break,
        };
    }
    Ok(walk.order)
}

/// Every node except the depot.
pub fn destinations(n: usize) -> FixedBitSet {
    let mut set = FixedBitSet::with_capacity(n);
    if n > 1 {
        set.insert_range(1..n);
    }
    set
}

/// Recomputes Dijkstra from the tail at every step.
pub fn dijkstra_route(graph: &SparseGraph, priority: &FixedBitSet) -> Result<Vec<usize>, RouteError> {
    if graph.n() == 0 {
        return Err(RouteError::EmptyStops);
    }
    if graph.has_negative_edge() {
        return Err(RouteError::ReweightedDijkstra);
    }
    greedy_route(0, destinations(graph.n()), priority, |tail| {
        Ok(dijkstra(graph, tail))
    })
}

/// Recomputes Bellman-Ford from the tail at every step.
pub fn bellman_ford_route(
    graph: &SparseGraph,
    priority: &FixedBitSet,
) -> Result<Vec<usize>, RouteError> {
    if graph.n() == 0 {
        return Err(RouteError::EmptyStops);
    }
    greedy_route(0, destinations(graph.n()), priority, |tail| {
        Ok(bellman_ford(graph, tail)?)
    })
}

/// Computes the full Floyd-Warshall table once and reuses it for every step.
pub fn floyd_warshall_route(
    matrix: &Matrix,
    priority: &FixedBitSet,
) -> Result<Vec<usize>, RouteError> {
    if matrix.nrows() == 0 {
        return Err(RouteError::EmptyStops);
    }
    let table = floyd_warshall(matrix)?;
    greedy_route(0, destinations(table.n()), priority, |tail| {
        Ok(table.row(tail).to_vec())
    })
}

#[cfg(test)]
mod test_greedy {
    use graphlib::{reweight_sparse, sparse_to_dense, GraphError, PrioritySet};
    use proptest::prelude::*;

    use super::*;
    use crate::exact::is_valid_order;

    ///   depot --10-- A --5-- B
    ///     \_________15______/
    fn three_stops() -> SparseGraph {
        SparseGraph::from_adjacency(vec![
            vec![(1, 10.0), (2, 15.0)],
            vec![(2, 5.0), (0, 10.0)],
            vec![(1, 5.0), (0, 15.0)],
        ])
    }

    fn no_priority(n: usize) -> FixedBitSet {
        FixedBitSet::with_capacity(n)
    }

    #[test]
    fn test_all_variants_visit_closest_first() {
        let graph = three_stops();
        let matrix = sparse_to_dense(&graph, 3);
        let none = no_priority(3);

        assert_eq!(dijkstra_route(&graph, &none).unwrap(), vec![0, 1, 2]);
        assert_eq!(bellman_ford_route(&graph, &none).unwrap(), vec![0, 1, 2]);
        assert_eq!(floyd_warshall_route(&matrix, &none).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_priority_goes_first() {
        let graph = three_stops();
        let mut priority = no_priority(3);
        priority.insert(2);

        assert_eq!(dijkstra_route(&graph, &priority).unwrap(), vec![0, 2, 1]);
        assert_eq!(
            floyd_warshall_route(&sparse_to_dense(&graph, 3), &priority).unwrap(),
            vec![0, 2, 1]
        );
    }

    #[test]
    fn test_unreachable_nodes_are_still_visited() {
        // node 3 has no incoming edges, node 2 is only reachable from 3
        let graph = SparseGraph::from_adjacency(vec![
            vec![(1, 1.0)],
            vec![(0, 1.0)],
            vec![],
            vec![(2, 1.0)],
        ]);

        assert_eq!(
            dijkstra_route(&graph, &no_priority(4)).unwrap(),
            vec![0, 1, 2, 3]
        );
        assert_eq!(
            bellman_ford_route(&graph, &no_priority(4)).unwrap(),
            vec![0, 1, 2, 3]
        );
    }

    #[test]
    fn test_ties_go_to_lowest_index() {
        let graph = SparseGraph::from_adjacency(vec![
            vec![(2, 4.0), (1, 4.0)],
            vec![(2, 1.0)],
            vec![(1, 1.0)],
        ]);

        assert_eq!(
            dijkstra_route(&graph, &no_priority(3)).unwrap(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_reweighted_graph() {
        let graph = three_stops();
        let priority: PrioritySet = vec!["a"].into_iter().collect();
        let keys = ["depot", "a", "b"];
        let reweighted = reweight_sparse(&graph, &priority, |i| keys[i]);

        assert!(matches!(
            dijkstra_route(&reweighted, &no_priority(3)),
            Err(RouteError::ReweightedDijkstra)
        ));
        assert!(matches!(
            bellman_ford_route(&reweighted, &no_priority(3)),
            Err(RouteError::Topology(GraphError::NegativeCycle { .. }))
        ));
    }

    #[test]
    fn test_single_stop() {
        let graph = SparseGraph::with_nodes(1);

        assert_eq!(dijkstra_route(&graph, &no_priority(1)).unwrap(), vec![0]);
        assert!(matches!(
            dijkstra_route(&SparseGraph::with_nodes(0), &no_priority(0)),
            Err(RouteError::EmptyStops)
        ));
    }

    fn arb_graph() -> impl Strategy<Value = SparseGraph> {
        (1usize..8).prop_flat_map(|n| {
            proptest::collection::vec(
                proptest::collection::vec((0..n, 0.0f64..100.0), 0..n),
                n,
            )
            .prop_map(SparseGraph::from_adjacency)
        })
    }

    proptest! {
        #[test]
        fn prop_orders_are_permutations(graph in arb_graph()) {
            let n = graph.n();
            let none = no_priority(n);
            let matrix = sparse_to_dense(&graph, n);

            for order in [
                dijkstra_route(&graph, &none).unwrap(),
                bellman_ford_route(&graph, &none).unwrap(),
                floyd_warshall_route(&matrix, &none).unwrap(),
            ] {
                prop_assert!(is_valid_order(&order, n));
            }
        }

        #[test]
        fn prop_variants_agree(graph in arb_graph()) {
            let n = graph.n();
            let none = no_priority(n);
            let matrix = sparse_to_dense(&graph, n);
            let by_dijkstra = dijkstra_route(&graph, &none).unwrap();

            prop_assert_eq!(&by_dijkstra, &bellman_ford_route(&graph, &none).unwrap());
            prop_assert_eq!(&by_dijkstra, &floyd_warshall_route(&matrix, &none).unwrap());
        }
    }
}
