//! Blocking client for an OSRM routing server.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use graphlib::{
    provider::select_nearest, Coordinate, DistanceProvider, DurationMatrix, RouteLeg,
};
use ndarray::Array2;
use serde::Deserialize;

pub const DEFAULT_OSRM_URL: &str = "http://localhost:5000";

#[derive(Debug, Deserialize)]
struct TableResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    distances: Option<Vec<Vec<Option<f64>>>>,
    #[serde(default)]
    durations: Option<Vec<Vec<Option<f64>>>>,
}

#[derive(Debug, Deserialize)]
struct RouteResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<RouteLeg>,
}

fn check_code(code: &str, message: Option<&str>) -> Result<()> {
    if code != "Ok" {
        bail!("OSRM answered {}: {}", code, message.unwrap_or("no message"));
    }
    Ok(())
}

/// `lon,lat;lon,lat;...` as OSRM expects it in the path.
fn coordinate_list(coordinates: &[Coordinate]) -> String {
    coordinates
        .iter()
        .map(|c| format!("{},{}", c.longitude, c.latitude))
        .collect::<Vec<_>>()
        .join(";")
}

fn parse_route(response: RouteResponse) -> Result<RouteLeg> {
    check_code(&response.code, response.message.as_deref())?;
    response
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("OSRM returned no route"))
}

fn parse_table(rows: Option<Vec<Vec<Option<f64>>>>, n: usize) -> Result<DurationMatrix> {
    let rows = rows.ok_or_else(|| anyhow!("OSRM table response has no matrix"))?;
    if rows.len() != n || rows.iter().any(|row| row.len() != n) {
        bail!("OSRM table response is not {}x{}", n, n);
    }
    Ok(Array2::from_shape_fn((n, n), |(i, j)| rows[i][j]))
}

pub struct OsrmClient {
    base_url: String,
    agent: ureq::Agent,
}

impl OsrmClient {
    pub fn new(base_url: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(30))
            .build();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent,
        }
    }

    fn table_url(&self, coordinates: &[Coordinate], query: &str) -> String {
        format!(
            "{}/table/v1/driving/{}?{}",
            self.base_url,
            coordinate_list(coordinates),
            query
        )
    }

    fn route_url(&self, coordinates: &[Coordinate]) -> String {
        format!(
            "{}/route/v1/driving/{}?overview=full&geometries=geojson",
            self.base_url,
            coordinate_list(coordinates)
        )
    }

    fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        log::trace!("GET {}", url);
        match self.agent.get(url).call() {
            Ok(response) => response
                .into_json()
                .with_context(|| format!("malformed OSRM response from {}", url)),
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                bail!("OSRM request failed with status {}: {}", status, body)
            }
            Err(err) => Err(err).with_context(|| format!("OSRM request to {} failed", url)),
        }
    }

    fn route(&self, coordinates: &[Coordinate]) -> Result<RouteLeg> {
        parse_route(self.get(&self.route_url(coordinates))?)
    }
}

impl Default for OsrmClient {
    fn default() -> Self {
        Self::new(DEFAULT_OSRM_URL)
    }
}

impl DistanceProvider for OsrmClient {
    fn nearest_neighbors(
        &self,
        source: usize,
        k: usize,
        coordinates: &[Coordinate],
    ) -> Result<Vec<(usize, f64)>> {
        let url = self.table_url(
            coordinates,
            &format!("sources={}&annotations=distance", source),
        );
        let response: TableResponse = self.get(&url)?;
        check_code(&response.code, response.message.as_deref())?;
        let row = response
            .distances
            .and_then(|rows| rows.into_iter().next())
            .ok_or_else(|| anyhow!("OSRM table response has no distances"))?;
        Ok(select_nearest(source, &row, k))
    }

    fn pairwise_route(&self, from: Coordinate, to: Coordinate) -> Result<RouteLeg> {
        self.route(&[from, to])
    }

    fn sequence_route(&self, coordinates: &[Coordinate]) -> Result<RouteLeg> {
        if coordinates.len() < 2 {
            bail!("at least two coordinates are required for a route");
        }
        self.route(coordinates)
    }

    fn duration_matrix(&self, coordinates: &[Coordinate]) -> Result<DurationMatrix> {
        let response: TableResponse =
            self.get(&self.table_url(coordinates, "annotations=duration"))?;
        check_code(&response.code, response.message.as_deref())?;
        parse_table(response.durations, coordinates.len())
    }
}

#[cfg(test)]
mod test_osrm {
    use super::*;

    #[test]
    fn test_urls() {
        let client = OsrmClient::new("http://osrm:5000/");
        let coordinates = [Coordinate::new(52.5, 13.4), Coordinate::new(48.1, 11.6)];

        assert_eq!(
            client.route_url(&coordinates),
            "http://osrm:5000/route/v1/driving/13.4,52.5;11.6,48.1?overview=full&geometries=geojson"
        );
        assert_eq!(
            client.table_url(&coordinates, "annotations=duration"),
            "http://osrm:5000/table/v1/driving/13.4,52.5;11.6,48.1?annotations=duration"
        );
    }

    #[test]
    fn test_parse_route() {
        let response: RouteResponse = serde_json::from_str(
            r#"{
                "code": "Ok",
                "routes": [{
                    "distance": 1200.5,
                    "duration": 95.2,
                    "geometry": {"type": "LineString", "coordinates": [[13.4, 52.5], [13.5, 52.5]]},
                    "legs": []
                }],
                "waypoints": []
            }"#,
        )
        .unwrap();

        let leg = parse_route(response).unwrap();
        assert_eq!(leg.distance, 1200.5);
        assert_eq!(leg.geometry["coordinates"][1][0], 13.5);
    }

    #[test]
    fn test_error_code_is_an_error() {
        let response: RouteResponse =
            serde_json::from_str(r#"{"code": "NoRoute", "message": "Impossible route"}"#).unwrap();

        let err = parse_route(response).unwrap_err();
        assert!(err.to_string().contains("Impossible route"));
    }

    #[test]
    fn test_parse_table_keeps_unknown_entries() {
        let response: TableResponse = serde_json::from_str(
            r#"{"code": "Ok", "durations": [[0.0, 12.5], [null, 0.0]]}"#,
        )
        .unwrap();

        let durations = parse_table(response.durations, 2).unwrap();
        assert_eq!(durations[[0, 1]], Some(12.5));
        assert_eq!(durations[[1, 0]], None);
        assert!(parse_table(Some(vec![vec![Some(0.0)]]), 2).is_err());
        assert!(parse_table(None, 2).is_err());
    }
}
