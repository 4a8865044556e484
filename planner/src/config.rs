use std::{fmt::Display, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseChoiceError {
    kind: &'static str,
    value: String,
}

/// Strategy used to order the stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    ExactTour,
    DijkstraGreedy,
    BellmanFordGreedy,
    FloydWarshallGreedy,
}

impl FromStr for Algorithm {
    type Err = ParseChoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.replace('-', "_").as_str() {
            "exact_tour" => Ok(Algorithm::ExactTour),
            "dijkstra_greedy" => Ok(Algorithm::DijkstraGreedy),
            "bellman_ford_greedy" => Ok(Algorithm::BellmanFordGreedy),
            "floyd_warshall_greedy" => Ok(Algorithm::FloydWarshallGreedy),
            _ => Err(ParseChoiceError {
                kind: "algorithm",
                value: s.to_string(),
            }),
        }
    }
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Algorithm::ExactTour => "exact_tour",
            Algorithm::DijkstraGreedy => "dijkstra_greedy",
            Algorithm::BellmanFordGreedy => "bellman_ford_greedy",
            Algorithm::FloydWarshallGreedy => "floyd_warshall_greedy",
        };
        write!(f, "{}", name)
    }
}

/// How prioritized stops influence the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityMode {
    /// Prioritized stops are visited before all other destinations.
    Constraint,
    /// Edges leaving prioritized stops get a large negative weight before the
    /// shortest-path pass. Not available with Dijkstra.
    Reweight,
}

impl FromStr for PriorityMode {
    type Err = ParseChoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "constraint" => Ok(PriorityMode::Constraint),
            "reweight" => Ok(PriorityMode::Reweight),
            _ => Err(ParseChoiceError {
                kind: "priority mode",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteConfig {
    /// Neighbors per stop in the sparse graph. Clamped to the number of other stops.
    pub k: usize,
    pub solver_budget: Duration,
    pub benchmark_repeats: usize,
    pub priority_mode: PriorityMode,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            k: 10,
            solver_budget: Duration::from_secs(10),
            benchmark_repeats: crate::benchmark::DEFAULT_REPEATS,
            priority_mode: PriorityMode::Constraint,
        }
    }
}

#[cfg(test)]
mod test_config {
    use super::*;

    #[test]
    fn test_parse_algorithm() {
        assert_eq!("exact_tour".parse(), Ok(Algorithm::ExactTour));
        assert_eq!(
            "bellman-ford-greedy".parse(),
            Ok(Algorithm::BellmanFordGreedy)
        );
        assert!("a-star".parse::<Algorithm>().is_err());
        assert_eq!(Algorithm::FloydWarshallGreedy.to_string(), "floyd_warshall_greedy");
    }

    #[test]
    fn test_parse_priority_mode() {
        assert_eq!("reweight".parse(), Ok(PriorityMode::Reweight));
        assert_eq!(
            "first".parse::<PriorityMode>().unwrap_err().to_string(),
            "unknown priority mode 'first'"
        );
    }
}
