//! The routing service boundary.
//!
//! A [`DistanceProvider`] answers travel distances, durations and route
//! geometry for coordinates. Every call may fail; callers decide whether a
//! failure degrades the result or aborts the request.

use anyhow::{anyhow, bail, Result};
use ndarray::Array2;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::Matrix;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A driven route: meters, seconds and a GeoJSON geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteLeg {
    pub distance: f64,
    pub duration: f64,
    pub geometry: serde_json::Value,
}

/// Travel durations in seconds; `None` marks a pair the provider could not answer.
pub type DurationMatrix = Array2<Option<f64>>;

pub trait DistanceProvider: Sync {
    /// Up to `k` nearest targets of `coordinates[source]`, ascending by
    /// distance, ties broken by increasing index. `source` itself is never
    /// returned.
    fn nearest_neighbors(
        &self,
        source: usize,
        k: usize,
        coordinates: &[Coordinate],
    ) -> Result<Vec<(usize, f64)>>;

    fn pairwise_route(&self, from: Coordinate, to: Coordinate) -> Result<RouteLeg>;

    /// Route through `coordinates` in the given order.
    fn sequence_route(&self, coordinates: &[Coordinate]) -> Result<RouteLeg>;

    fn duration_matrix(&self, coordinates: &[Coordinate]) -> Result<DurationMatrix>;
}

/// Picks the `k` smallest known entries of a distance row, skipping `source`.
pub fn select_nearest(source: usize, row: &[Option<f64>], k: usize) -> Vec<(usize, f64)> {
    let mut candidates: Vec<(usize, f64)> = row
        .iter()
        .enumerate()
        .filter(|&(target, _)| target != source)
        .filter_map(|(target, distance)| distance.map(|d| (target, d)))
        .filter(|(_, d)| !d.is_nan())
        .collect();
    candidates.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
    candidates.truncate(k);
    candidates
}

/// Straight-line GeoJSON geometry through the given points.
pub fn line_string(coordinates: &[Coordinate]) -> serde_json::Value {
    let points: Vec<[f64; 2]> = coordinates
        .iter()
        .map(|c| [c.longitude, c.latitude])
        .collect();
    serde_json::json!({ "type": "LineString", "coordinates": points })
}

/// A provider answering from fixed matrices over a known set of coordinates.
///
/// Coordinates passed in must be among the ones it was built with. Failures
/// can be switched on per source node or for all route calls.
#[derive(Debug, Clone)]
pub struct StaticProvider {
    coordinates: Vec<Coordinate>,
    distances: Matrix,
    durations: Matrix,
    failing_sources: FxHashSet<usize>,
    fail_routes: bool,
    fail_durations: bool,
}

impl StaticProvider {
    /// Durations default to the distances (one meter per second).
    pub fn new(coordinates: Vec<Coordinate>, distances: Matrix) -> Self {
        let durations = distances.clone();
        Self {
            coordinates,
            distances,
            durations,
            failing_sources: FxHashSet::default(),
            fail_routes: false,
            fail_durations: false,
        }
    }

    pub fn with_durations(mut self, durations: Matrix) -> Self {
        self.durations = durations;
        self
    }

    pub fn failing_source(mut self, source: usize) -> Self {
        self.failing_sources.insert(source);
        self
    }

    pub fn failing_routes(mut self) -> Self {
        self.fail_routes = true;
        self
    }

    pub fn failing_durations(mut self) -> Self {
        self.fail_durations = true;
        self
    }

    fn locate(&self, coordinate: Coordinate) -> Result<usize> {
        self.coordinates
            .iter()
            .position(|&c| c == coordinate)
            .ok_or_else(|| anyhow!("unknown coordinate {:?}", coordinate))
    }

    fn leg(&self, from: usize, to: usize) -> Result<(f64, f64)> {
        let distance = self.distances[[from, to]];
        let duration = self.durations[[from, to]];
        if !distance.is_finite() || !duration.is_finite() {
            bail!("no route between {} and {}", from, to);
        }
        Ok((distance, duration))
    }
}

impl DistanceProvider for StaticProvider {
    fn nearest_neighbors(
        &self,
        source: usize,
        k: usize,
        coordinates: &[Coordinate],
    ) -> Result<Vec<(usize, f64)>> {
        if self.failing_sources.contains(&source) {
            bail!("table request failed for node {}", source);
        }
        let from = self.locate(coordinates[source])?;
        let row = coordinates
            .iter()
            .map(|&c| -> Result<Option<f64>> {
                let to = self.locate(c)?;
                let d = self.distances[[from, to]];
                Ok(if d.is_finite() { Some(d) } else { None })
            })
            .collect::<Result<Vec<Option<f64>>>>()?;
        Ok(select_nearest(source, &row, k))
    }

    fn pairwise_route(&self, from: Coordinate, to: Coordinate) -> Result<RouteLeg> {
        if self.fail_routes {
            bail!("route request failed");
        }
        let (distance, duration) = self.leg(self.locate(from)?, self.locate(to)?)?;
        Ok(RouteLeg {
            distance,
            duration,
            geometry: line_string(&[from, to]),
        })
    }

    fn sequence_route(&self, coordinates: &[Coordinate]) -> Result<RouteLeg> {
        if self.fail_routes {
            bail!("route request failed");
        }
        if coordinates.len() < 2 {
            bail!("at least two coordinates are required for a route");
        }
        let mut distance = 0.0;
        let mut duration = 0.0;
        for pair in coordinates.windows(2) {
            let (d, t) = self.leg(self.locate(pair[0])?, self.locate(pair[1])?)?;
            distance += d;
            duration += t;
        }
        Ok(RouteLeg {
            distance,
            duration,
            geometry: line_string(coordinates),
        })
    }

    fn duration_matrix(&self, coordinates: &[Coordinate]) -> Result<DurationMatrix> {
        if self.fail_durations {
            bail!("duration table request failed");
        }
        let nodes = coordinates
            .iter()
            .map(|&c| self.locate(c))
            .collect::<Result<Vec<usize>>>()?;
        let n = nodes.len();
        Ok(Array2::from_shape_fn((n, n), |(i, j)| {
            let t = self.durations[[nodes[i], nodes[j]]];
            if t.is_finite() {
                Some(t)
            } else {
                None
            }
        }))
    }
}
