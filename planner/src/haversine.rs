//! Offline provider based on great-circle distances.

use anyhow::{anyhow, bail, Result};
use graphlib::{
    provider::{line_string, select_nearest},
    Coordinate, DistanceProvider, DurationMatrix, RouteLeg,
};
use ndarray::Array2;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters.
pub fn haversine_m(a: Coordinate, b: Coordinate) -> f64 {
    let (lat1, lat2) = (a.latitude.to_radians(), b.latitude.to_radians());
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();
    let s1 = (dlat / 2.0).sin();
    let s2 = (dlon / 2.0).sin();
    let h = s1 * s1 + lat1.cos() * lat2.cos() * s2 * s2;
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Drives in straight lines at a constant speed.
#[derive(Debug, Clone, Copy)]
pub struct GreatCircleProvider {
    /// Meters per second.
    pub speed: f64,
}

impl Default for GreatCircleProvider {
    fn default() -> Self {
        // ~50 km/h
        Self { speed: 13.9 }
    }
}

impl GreatCircleProvider {
    fn leg(&self, from: Coordinate, to: Coordinate) -> RouteLeg {
        let distance = haversine_m(from, to);
        RouteLeg {
            distance,
            duration: distance / self.speed,
            geometry: line_string(&[from, to]),
        }
    }
}

impl DistanceProvider for GreatCircleProvider {
    fn nearest_neighbors(
        &self,
        source: usize,
        k: usize,
        coordinates: &[Coordinate],
    ) -> Result<Vec<(usize, f64)>> {
        let from = coordinates.get(source).copied().ok_or_else(|| {
            anyhow!("source {} out of range for {} coordinates", source, coordinates.len())
        })?;
        let row: Vec<Option<f64>> = coordinates
            .iter()
            .map(|&to| Some(haversine_m(from, to)))
            .collect();
        Ok(select_nearest(source, &row, k))
    }

    fn pairwise_route(&self, from: Coordinate, to: Coordinate) -> Result<RouteLeg> {
        Ok(self.leg(from, to))
    }

    fn sequence_route(&self, coordinates: &[Coordinate]) -> Result<RouteLeg> {
        if coordinates.len() < 2 {
            bail!("at least two coordinates are required for a route");
        }
        let distance: f64 = coordinates
            .windows(2)
            .map(|pair| haversine_m(pair[0], pair[1]))
            .sum();
        Ok(RouteLeg {
            distance,
            duration: distance / self.speed,
            geometry: line_string(coordinates),
        })
    }

    fn duration_matrix(&self, coordinates: &[Coordinate]) -> Result<DurationMatrix> {
        let n = coordinates.len();
        Ok(Array2::from_shape_fn((n, n), |(i, j)| {
            Some(haversine_m(coordinates[i], coordinates[j]) / self.speed)
        }))
    }
}
