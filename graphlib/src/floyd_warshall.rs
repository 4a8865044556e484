use crate::{DistanceTable, GraphError, Matrix};

/// All-pairs shortest paths over a dense matrix in O(n³).
///
/// The input is copied, never modified. Relaxation is strict, so a direct
/// edge is kept when a detour costs the same. A negative diagonal entry after
/// the final pass means a negative cycle and is reported instead of a table.
pub fn floyd_warshall(matrix: &Matrix) -> Result<DistanceTable, GraphError> {
    debug_assert!(matrix.is_square());
    let n = matrix.nrows();
    log::debug!("Floyd-Warshall on {} nodes.", n);

    let mut dist = matrix.to_owned();
    for k in 0..n {
        for i in 0..n {
            let via = dist[[i, k]];
            if via == f64::INFINITY {
                continue;
            }
            for j in 0..n {
                let candidate = via + dist[[k, j]];
                if candidate < dist[[i, j]] {
                    dist[[i, j]] = candidate;
                }
            }
        }
    }

    if let Some(node) = (0..n).find(|&i| dist[[i, i]] < 0.0) {
        return Err(GraphError::NegativeSelfDistance { node });
    }

    Ok(DistanceTable::from_matrix(dist))
}
