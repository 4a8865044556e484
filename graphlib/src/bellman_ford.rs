use crate::{DistanceTable, GraphError, SparseGraph};

/// Single-source shortest path costs from `source`, allowing negative edges.
///
/// After `n - 1` relaxation passes one more pass is made; any further
/// improvement means a negative cycle is reachable from `source`.
pub fn bellman_ford(graph: &SparseGraph, source: usize) -> Result<Vec<f64>, GraphError> {
    let n = graph.n();
    let mut dist = vec![f64::INFINITY; n];
    dist[source] = 0.0;

    for _ in 1..n {
        let mut relaxed = false;
        for (u, v, w) in graph.edges() {
            if dist[u] == f64::INFINITY {
                continue;
            }
            if dist[u] + w < dist[v] {
                dist[v] = dist[u] + w;
                relaxed = true;
            }
        }
        if !relaxed {
            break;
        }
    }

    let still_relaxes = graph
        .edges()
        .any(|(u, v, w)| dist[u] != f64::INFINITY && dist[u] + w < dist[v]);
    if still_relaxes {
        return Err(GraphError::NegativeCycle { origin: source });
    }

    Ok(dist)
}

/// Runs [`bellman_ford`] from every node.
pub fn bellman_ford_all_pairs(graph: &SparseGraph) -> Result<DistanceTable, GraphError> {
    log::debug!("Bellman-Ford all pairs on {} nodes.", graph.n());
    let rows = (0..graph.n())
        .map(|s| bellman_ford(graph, s))
        .collect::<Result<Vec<Vec<f64>>, GraphError>>()?;
    Ok(DistanceTable::from_rows(rows))
}
