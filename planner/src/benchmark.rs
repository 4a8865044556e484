use std::{hint::black_box, time::Instant};

use graphlib::{Engine, GraphError, Matrix, SparseGraph};
use serde::{Deserialize, Serialize};

pub const DEFAULT_REPEATS: usize = 3;

/// Mean wall-clock seconds per all-pairs engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkReport {
    #[serde(rename = "fwTime")]
    pub floyd_warshall: f64,
    #[serde(rename = "dijkstraTime")]
    pub dijkstra: f64,
    #[serde(rename = "bellmanFordTime")]
    pub bellman_ford: f64,
}

impl BenchmarkReport {
    pub fn mean(&self, engine: Engine) -> f64 {
        match engine {
            Engine::FloydWarshall => self.floyd_warshall,
            Engine::Dijkstra => self.dijkstra,
            Engine::BellmanFord => self.bellman_ford,
        }
    }
}

/// Runs every engine `repeats` times on the same input and averages the
/// elapsed time. A `repeats` of 0 is treated as 1.
pub fn benchmark(
    matrix: &Matrix,
    graph: &SparseGraph,
    repeats: usize,
) -> Result<BenchmarkReport, GraphError> {
    let repeats = repeats.max(1);
    let mut means = [0.0; 3];

    for (mean, engine) in means.iter_mut().zip(Engine::ALL) {
        let mut total = 0.0;
        for _ in 0..repeats {
            let started = Instant::now();
            let table = engine.all_pairs(black_box(matrix), black_box(graph))?;
            total += started.elapsed().as_secs_f64();
            black_box(table);
        }
        *mean = total / repeats as f64;
        log::debug!("{}: {:.6}s on average over {} runs", engine, mean, repeats);
    }

    Ok(BenchmarkReport {
        floyd_warshall: means[0],
        dijkstra: means[1],
        bellman_ford: means[2],
    })
}
