mod benchmark;
mod config;
mod exact;
mod greedy;
pub mod haversine;
pub mod osrm;
mod route;

pub use benchmark::{benchmark, BenchmarkReport, DEFAULT_REPEATS};
pub use config::{Algorithm, ParseChoiceError, PriorityMode, RouteConfig};
pub use exact::{exact_route, is_valid_order, prioritized_costs, solver_costs, validate_order};
pub use greedy::{bellman_ford_route, destinations, dijkstra_route, floyd_warshall_route, greedy_route};
pub use haversine::GreatCircleProvider;
pub use osrm::OsrmClient;
pub use route::{compute_route, RouteError, RoutePlan, RouteRequest};
