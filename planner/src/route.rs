use fixedbitset::FixedBitSet;
use graphlib::{
    build_graph, floyd_warshall, reweight, reweight_sparse, sparse_to_dense, tsp::TourSolver,
    Coordinate, DistanceProvider, GraphError, PrioritySet, RouteLeg, Stop, StopIndex,
};
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    benchmark::{benchmark, BenchmarkReport},
    config::{Algorithm, PriorityMode, RouteConfig},
    exact::{exact_route, prioritized_costs, validate_order},
    greedy::{bellman_ford_route, dijkstra_route, floyd_warshall_route},
};

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("no stops to route")]
    EmptyStops,
    #[error("unknown stop '{0}'")]
    UnknownStop(String),
    #[error("invalid neighbor count k = {k} for {n} stops")]
    InvalidK { k: usize, n: usize },
    #[error("topology error: {0}")]
    Topology(#[source] GraphError),
    #[error("Dijkstra cannot run on a reweighted graph with negative edges")]
    ReweightedDijkstra,
    #[error("routing provider failed after ordering the stops as {order:?}")]
    Provider {
        order: Vec<usize>,
        source: anyhow::Error,
    },
}

impl RouteError {
    /// The visiting order computed before the failure, if there was one.
    pub fn visiting_order(&self) -> Option<&[usize]> {
        match self {
            RouteError::Provider { order, .. } => Some(order),
            _ => None,
        }
    }
}

impl From<GraphError> for RouteError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::EmptyGraph => RouteError::EmptyStops,
            GraphError::InvalidK { k, n } => RouteError::InvalidK { k, n },
            err => RouteError::Topology(err),
        }
    }
}

/// A depot, the stops to visit from it and the stops to serve first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRequest {
    pub depot: Stop,
    pub stops: Vec<Stop>,
    pub algorithm: Algorithm,
    #[serde(default)]
    pub priority: PrioritySet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePlan {
    /// Node indices; 0 is the depot, `i > 0` is `stops[i - 1]`.
    pub visiting_order: Vec<usize>,
    pub visiting_keys: Vec<String>,
    pub algorithm: Algorithm,
    /// One GeoJSON geometry per consecutive pair of the visiting order.
    pub route_geometry_segments: Vec<serde_json::Value>,
    /// The whole route in one piece.
    pub path: RouteLeg,
    /// Seconds.
    pub total_duration: f64,
    /// Meters.
    pub total_distance: f64,
    pub benchmark: BenchmarkReport,
}

fn priority_mask(index: &StopIndex, priority: &PrioritySet) -> Result<FixedBitSet, RouteError> {
    if let Some(unknown) = priority.keys().find(|key| index.get(key).is_none()) {
        return Err(RouteError::UnknownStop(unknown.to_string()));
    }
    let n = index.num_nodes();
    let mut mask = FixedBitSet::with_capacity(n);
    for node in 1..n {
        if priority.is_prioritized(index.key(node)) {
            mask.insert(node);
        }
    }
    Ok(mask)
}

/// Orders the stops of `request`, then fetches geometry, durations and
/// engine timings for that order.
///
/// Provider failures while discovering neighbors only isolate the affected
/// stop. Once the order is known, any provider failure aborts the request
/// with [`RouteError::Provider`], which still carries the order.
pub fn compute_route<P, S>(
    request: &RouteRequest,
    config: &RouteConfig,
    provider: &P,
    solver: &S,
) -> Result<RoutePlan, RouteError>
where
    P: DistanceProvider + ?Sized,
    S: TourSolver + ?Sized,
{
    if request.stops.is_empty() {
        return Err(RouteError::EmptyStops);
    }
    let stops: Vec<Stop> = std::iter::once(request.depot.clone())
        .chain(request.stops.iter().cloned())
        .collect();
    let n = stops.len();
    let index = StopIndex::init(&stops);
    let coordinates: Vec<Coordinate> = stops.iter().map(|stop| stop.coordinate).collect();

    let mask = priority_mask(&index, &request.priority)?;
    let k = config.k.min(n - 1);
    if k < config.k {
        log::debug!("Clamped k from {} to {}.", config.k, k);
    }

    log::info!(
        "Routing {} stops with {} ({} prioritized).",
        n,
        request.algorithm,
        mask.count_ones(..)
    );

    let graph = build_graph(&coordinates, k, provider)?;
    let matrix = sparse_to_dense(&graph, n);

    let keys = &index;
    let reweighting =
        config.priority_mode == PriorityMode::Reweight && request.priority.has_flagged();
    let greedy_mask = if reweighting {
        FixedBitSet::with_capacity(n)
    } else {
        mask.clone()
    };
    let order = match request.algorithm {
        Algorithm::DijkstraGreedy => {
            if reweighting {
                return Err(RouteError::ReweightedDijkstra);
            }
            dijkstra_route(&graph, &greedy_mask)?
        }
        Algorithm::BellmanFordGreedy => {
            if reweighting {
                let reweighted =
                    reweight_sparse(&graph, &request.priority, move |i| keys.key(i));
                bellman_ford_route(&reweighted, &greedy_mask)?
            } else {
                bellman_ford_route(&graph, &greedy_mask)?
            }
        }
        Algorithm::FloydWarshallGreedy => {
            if reweighting {
                let reweighted = reweight(&matrix, &request.priority, move |i| keys.key(i));
                floyd_warshall_route(&reweighted, &greedy_mask)?
            } else {
                floyd_warshall_route(&matrix, &greedy_mask)?
            }
        }
        Algorithm::ExactTour => {
            let metric = floyd_warshall(&matrix)?.into_matrix();
            let costs = prioritized_costs(&metric, &mask);
            exact_route(solver, &costs, config.solver_budget, || {
                floyd_warshall_route(&matrix, &mask)
            })?
        }
    };
    let order = validate_order(order, n);
    log::info!("Visiting order: {:?}", order);

    let report = benchmark(&matrix, &graph, config.benchmark_repeats)?;

    let provider_error = |source: anyhow::Error| RouteError::Provider {
        order: order.clone(),
        source,
    };

    let pairs: Vec<(usize, usize)> = order.windows(2).map(|pair| (pair[0], pair[1])).collect();
    let legs = pairs
        .clone()
        .into_par_iter()
        .map(|(from, to)| provider.pairwise_route(coordinates[from], coordinates[to]))
        .collect::<anyhow::Result<Vec<RouteLeg>>>()
        .map_err(provider_error)?;

    let durations = provider
        .duration_matrix(&coordinates)
        .map_err(provider_error)?;
    let total_duration: f64 = pairs
        .iter()
        .zip(&legs)
        .map(|(&(from, to), leg)| {
            durations
                .get((from, to))
                .copied()
                .flatten()
                .unwrap_or(leg.duration)
        })
        .sum();
    let total_distance: f64 = legs.iter().map(|leg| leg.distance).sum();

    let ordered: Vec<Coordinate> = order.iter().map(|&node| coordinates[node]).collect();
    let path = provider
        .sequence_route(&ordered)
        .map_err(provider_error)?;

    Ok(RoutePlan {
        visiting_keys: order.iter().map(|&node| index.key(node).to_string()).collect(),
        visiting_order: order,
        algorithm: request.algorithm,
        route_geometry_segments: legs.into_iter().map(|leg| leg.geometry).collect(),
        path,
        total_duration,
        total_distance,
        benchmark: report,
    })
}
