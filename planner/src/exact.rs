//! Adapter between route construction and an exact [`TourSolver`].

use std::time::Duration;

use fixedbitset::FixedBitSet;
use graphlib::{tsp::TourSolver, Matrix};

use crate::RouteError;

/// True if `order` starts at the depot and visits each of the `n` nodes once.
pub fn is_valid_order(order: &[usize], n: usize) -> bool {
    if order.len() != n || order.first().map_or(n > 0, |&first| first != 0) {
        return false;
    }
    let mut seen = FixedBitSet::with_capacity(n);
    order.iter().all(|&node| {
        if node >= n || seen.contains(node) {
            false
        } else {
            seen.insert(node);
            true
        }
    })
}

/// Returns `order` if it is a valid visiting order, the identity order otherwise.
pub fn validate_order(order: Vec<usize>, n: usize) -> Vec<usize> {
    if is_valid_order(&order, n) {
        order
    } else {
        log::error!(
            "Internal inconsistency: {:?} is not a visiting order of {} stops, using identity order.",
            order,
            n
        );
        (0..n).collect()
    }
}

/// Replaces unknown (non-finite) costs with a penalty above any finite tour.
pub fn solver_costs(matrix: &Matrix) -> Matrix {
    let penalty = 1.0 + matrix
        .iter()
        .filter(|c| c.is_finite())
        .map(|c| c.abs())
        .sum::<f64>();
    matrix.mapv(|c| if c.is_finite() { c } else { penalty })
}

/// Penalizes every edge from a non-prioritized destination into a prioritized
/// one, so that optimal tours serve all prioritized stops first.
///
/// Unknown costs are replaced as in [`solver_costs`] before the penalty is
/// added, so the result is always finite.
pub fn prioritized_costs(costs: &Matrix, priority: &FixedBitSet) -> Matrix {
    let mut penalized = solver_costs(costs);
    if priority.count_ones(..) == 0 {
        return penalized;
    }
    let penalty = 1.0 + penalized.iter().map(|c| c.abs()).sum::<f64>();
    for ((from, to), c) in penalized.indexed_iter_mut() {
        if from != 0 && from != to && !priority.contains(from) && priority.contains(to) {
            *c += penalty;
        }
    }
    penalized
}

/// Orders the stops with `solver`; falls back to `fallback` when it finds nothing.
///
/// The solver's closed tour is cut back to a visiting order (the trailing
/// return to the depot is dropped).
pub fn exact_route<S, F>(
    solver: &S,
    costs: &Matrix,
    budget: Duration,
    fallback: F,
) -> Result<Vec<usize>, RouteError>
where
    S: TourSolver + ?Sized,
    F: FnOnce() -> Result<Vec<usize>, RouteError>,
{
    let n = costs.nrows();
    match solver.solve(&solver_costs(costs), budget) {
        Some(mut tour) => {
            if tour.len() == n + 1 && tour.first() == tour.last() {
                tour.pop();
            }
            log::debug!("Exact tour: {:?}", tour);
            Ok(tour)
        }
        None => {
            log::info!(
                "No exact tour within {:?}, falling back to a greedy order.",
                budget
            );
            fallback()
        }
    }
}
