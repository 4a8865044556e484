//! Exact tour solvers.
//!
//! A solver gets a finite, square cost matrix and returns a closed tour that
//! starts at node 0. The tour may repeat node 0 at the end. `None` means no
//! tour was found within the budget.

use std::time::{Duration, Instant};

use good_lp::{
    constraint, default_solver, variable, variables, Constraint, Expression, ProblemVariables,
    Solution, SolverModel, Variable,
};
use itertools::Itertools;
use rustc_hash::FxHashMap;

use crate::Matrix;

pub trait TourSolver {
    fn solve(&self, costs: &Matrix, budget: Duration) -> Option<Vec<usize>>;
}

/// Cost of the closed tour visiting `tour` in order and returning to its first node.
pub fn tour_cost(costs: &Matrix, tour: &[usize]) -> f64 {
    let inner: f64 = tour.windows(2).map(|e| costs[[e[0], e[1]]]).sum();
    match (tour.first(), tour.last()) {
        (Some(&first), Some(&last)) if first != last => inner + costs[[last, first]],
        _ => inner,
    }
}

/// Tries every ordering of the destinations. The budget is checked while
/// enumerating; on expiry the best tour seen so far is returned.
#[derive(Debug, Clone, Copy, Default)]
pub struct BruteForceSolver;

impl TourSolver for BruteForceSolver {
    fn solve(&self, costs: &Matrix, budget: Duration) -> Option<Vec<usize>> {
        let n = costs.nrows();
        match n {
            0 => return None,
            1 => return Some(vec![0]),
            _ => {}
        }

        let started = Instant::now();
        let mut best: Option<(f64, Vec<usize>)> = None;
        for (i, destinations) in (1..n).permutations(n - 1).enumerate() {
            if i % 1024 == 0 && best.is_some() && started.elapsed() > budget {
                log::warn!(
                    "Exhaustive search stopped after {} orderings ({:?} budget).",
                    i,
                    budget
                );
                break;
            }
            let mut tour = Vec::with_capacity(n);
            tour.push(0);
            tour.extend(destinations);
            let cost = tour_cost(costs, &tour);
            if best.as_ref().map_or(true, |(best_cost, _)| cost < *best_cost) {
                best = Some((cost, tour));
            }
        }

        best.map(|(_, tour)| tour)
    }
}

/// Solves the tour as an integer program with subtour-elimination constraints.
///
/// The number of subtour constraints grows as 2^n, so instances above
/// `max_nodes` are declined.
#[derive(Debug, Clone, Copy)]
pub struct IlpSolver {
    pub max_nodes: usize,
}

impl Default for IlpSolver {
    fn default() -> Self {
        Self { max_nodes: 10 }
    }
}

impl TourSolver for IlpSolver {
    fn solve(&self, costs: &Matrix, budget: Duration) -> Option<Vec<usize>> {
        let n = costs.nrows();
        match n {
            0 => return None,
            1 => return Some(vec![0, 0]),
            2 => return Some(vec![0, 1, 0]),
            _ => {}
        }
        if n > self.max_nodes {
            log::warn!(
                "ILP declined: {} nodes exceed the limit of {}.",
                n,
                self.max_nodes
            );
            return None;
        }

        log::info!("Computing optimal tour on {} nodes with ILP.", n);
        let started = Instant::now();

        let mut constraints = Vec::<Constraint>::new();
        let mut vars = variables!();
        let var_by_edge = add_tour_variables_and_constraints(&mut constraints, &mut vars, n);

        let mut objective: Expression = 0.into();
        for i in 0..n {
            for j in 0..n {
                if let Some(&var) = var_by_edge.get(&(i, j)) {
                    objective += var * costs[[i, j]];
                }
            }
        }

        let mut model = vars.minimise(objective).using(default_solver);
        for constr in constraints {
            model.add_constraint(constr);
        }

        log::trace!("Starting solver");
        let solution = match model.solve() {
            Ok(solution) => solution,
            Err(err) => {
                log::warn!("ILP found no tour: {}", err);
                return None;
            }
        };
        if started.elapsed() > budget {
            log::warn!(
                "ILP took {:?}, longer than its {:?} budget.",
                started.elapsed(),
                budget
            );
        }

        log::trace!("Computing tour from ILP solution");
        let mut tour = Vec::with_capacity(n + 1);
        tour.push(0);
        let mut current = 0;
        for _ in 0..n {
            let next = (0..n).find(|&j| {
                var_by_edge
                    .get(&(current, j))
                    .map_or(false, |&var| solution.value(var) > 0.9)
            })?;
            tour.push(next);
            if next == 0 {
                break;
            }
            current = next;
        }

        Some(tour)
    }
}

fn add_tour_variables_and_constraints(
    constraints: &mut Vec<Constraint>,
    vars: &mut ProblemVariables,
    n: usize,
) -> FxHashMap<(usize, usize), Variable> {
    let mut var_by_edge: FxHashMap<(usize, usize), Variable> = FxHashMap::default();

    for i in 0..n {
        let mut one_succ: Expression = 0.into();
        for j in 0..n {
            if i != j {
                let var = vars.add(variable().binary().name(format!("x_{}_{}", i, j)));
                one_succ += var;
                var_by_edge.insert((i, j), var);
            }
        }
        constraints.push(constraint!(one_succ == 1));
    }

    for j in 0..n {
        let mut one_prec: Expression = 0.into();
        for i in 0..n {
            if let Some(&var) = var_by_edge.get(&(i, j)) {
                one_prec += var;
            }
        }
        constraints.push(constraint!(one_prec == 1));
    }

    log::trace!("Adding subtour constraints");
    for subset in (0..n).powerset().filter(|set| set.len() > 1 && set.len() < n) {
        let mut inside: Expression = 0.into();
        for &i in &subset {
            for &j in &subset {
                if let Some(&var) = var_by_edge.get(&(i, j)) {
                    inside += var;
                }
            }
        }
        let bound = (subset.len() - 1) as i32;
        constraints.push(constraint!(inside <= bound));
    }

    var_by_edge
}

#[cfg(test)]
mod test_tsp {
    use ndarray::array;

    use super::*;

    fn get_costs1() -> Matrix {
        array![
            [0.0, 4.0, 1.0, 3.0],
            [4.0, 0.0, 2.0, 1.0],
            [1.0, 2.0, 0.0, 5.0],
            [3.0, 1.0, 5.0, 0.0]
        ]
    }

    fn get_costs2() -> Matrix {
        array![
            [0.0, 2.0, 9.0, 10.0, 7.0],
            [1.0, 0.0, 6.0, 4.0, 3.0],
            [15.0, 7.0, 0.0, 8.0, 3.0],
            [6.0, 3.0, 12.0, 0.0, 11.0],
            [9.0, 7.0, 5.0, 6.0, 0.0]
        ]
    }

    #[test]
    fn test_tour_cost() {
        let costs = get_costs1();

        assert_eq!(tour_cost(&costs, &[0, 2, 1, 3]), 7.0);
        assert_eq!(tour_cost(&costs, &[0, 2, 1, 3, 0]), 7.0);
    }

    #[test]
    fn test_brute_force_solution() {
        let tour = BruteForceSolver
            .solve(&get_costs1(), Duration::from_secs(10))
            .unwrap();

        assert_eq!(tour, vec![0, 2, 1, 3]);
    }

    #[test]
    fn test_brute_force_asymmetric() {
        let costs = get_costs2();
        let tour = BruteForceSolver
            .solve(&costs, Duration::from_secs(10))
            .unwrap();

        assert_eq!(tour[0], 0);
        assert_eq!(tour, vec![0, 2, 4, 3, 1]);
        assert_eq!(tour_cost(&costs, &tour), 22.0);
    }

    #[test]
    fn test_ilp_matches_brute_force() {
        for costs in [get_costs1(), get_costs2()] {
            let exact = BruteForceSolver
                .solve(&costs, Duration::from_secs(10))
                .unwrap();
            let tour = IlpSolver::default()
                .solve(&costs, Duration::from_secs(10))
                .unwrap();

            assert_eq!(tour.first(), Some(&0));
            assert_eq!(tour.last(), Some(&0));
            assert_eq!(tour.len(), costs.nrows() + 1);
            assert!((tour_cost(&costs, &tour) - tour_cost(&costs, &exact)).abs() < 1e-6);
        }
    }

    #[test]
    fn test_ilp_declines_large_instances() {
        let costs = Matrix::zeros((4, 4));
        let solver = IlpSolver { max_nodes: 3 };

        assert_eq!(solver.solve(&costs, Duration::from_secs(1)), None);
    }

    #[test]
    fn test_trivial_instances() {
        let one = Matrix::zeros((1, 1));

        assert_eq!(BruteForceSolver.solve(&one, Duration::ZERO), Some(vec![0]));
        assert_eq!(IlpSolver::default().solve(&one, Duration::ZERO), Some(vec![0, 0]));
        assert_eq!(BruteForceSolver.solve(&Matrix::zeros((0, 0)), Duration::ZERO), None);
    }
}
