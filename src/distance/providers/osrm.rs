use futures::stream::{self, StreamExt};
use itertools::Itertools;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, info, trace, warn};

use super::http_client;
use crate::config::constant::{OSRM_CONCURRENT_REQUESTS, OSRM_MAX_URL_LEN};
use crate::distance::matrix::{DistanceMatrix, UNREACHABLE};
use crate::domain::types::Coordinate;
use crate::error::{Error, Result};

/// OSRM `route` service queried once per ordered pair.
///
/// A pair that cannot be resolved becomes [`UNREACHABLE`]; the rest of the
/// matrix is kept.
#[derive(Debug, Clone)]
pub struct OsrmRouteProvider {
    client: Client,
    base_url: String,
    max_concurrent: usize,
}

impl OsrmRouteProvider {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: http_client(),
            base_url: base_url.trim_end_matches('/').to_string(),
            max_concurrent: OSRM_CONCURRENT_REQUESTS,
        }
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub async fn distance_matrix(&self, points: &[Coordinate]) -> DistanceMatrix {
        let n = points.len();
        let pairs: Vec<(usize, usize)> = (0..n)
            .cartesian_product(0..n)
            .filter(|(i, j)| i != j)
            .collect();
        info!(
            "Sending {} OSRM route requests ({} locations)",
            pairs.len(),
            n
        );

        let resolved: Vec<((usize, usize), f64)> = stream::iter(pairs)
            .map(|(i, j)| async move {
                let distance = match self.pair_distance(points[i], points[j]).await {
                    Ok(distance) => distance,
                    Err(reason) => {
                        warn!("OSRM request failed for pair ({}, {}): {}", i, j, reason);
                        UNREACHABLE
                    }
                };
                ((i, j), distance)
            })
            .buffered(self.max_concurrent)
            .collect()
            .await;

        let mut data = vec![0.0; n * n];
        for ((i, j), distance) in resolved {
            data[i * n + j] = distance;
        }
        DistanceMatrix::from_raw(n, data)
    }

    async fn pair_distance(
        &self,
        from: Coordinate,
        to: Coordinate,
    ) -> std::result::Result<f64, String> {
        let url = format!(
            "{}/route/v1/driving/{},{};{},{}?overview=false",
            self.base_url, from.longitude, from.latitude, to.longitude, to.latitude
        );
        trace!("Sending GET to {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {status}"));
        }

        let body: RouteResponse = response.json().await.map_err(|e| e.to_string())?;
        first_route_distance(&body).ok_or_else(|| "no routes in response".to_string())
    }
}

fn first_route_distance(body: &RouteResponse) -> Option<f64> {
    body.routes
        .first()
        .map(|route| route.distance)
        .filter(|d| d.is_finite() && *d >= 0.0)
}

/// OSRM `table` service: the whole matrix in one request, failing as a whole.
#[derive(Debug, Clone)]
pub struct OsrmTableProvider {
    client: Client,
    base_url: String,
}

impl OsrmTableProvider {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: http_client(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub async fn distance_matrix(&self, points: &[Coordinate]) -> Result<DistanceMatrix> {
        const PROVIDER: &str = "osrm-table";

        let n = points.len();
        if n < 2 {
            return Ok(DistanceMatrix::from_fn(n, |_, _| 0.0));
        }

        // OSRM wants longitude,latitude in that order
        let coord_str = points
            .iter()
            .map(|p| format!("{},{}", p.longitude, p.latitude))
            .join(";");
        let url = format!(
            "{}/table/v1/driving/{}?annotations=distance",
            self.base_url, coord_str
        );
        if url.len() > OSRM_MAX_URL_LEN {
            warn!(
                "OSRM URL too long ({} chars), consider self-hosted OSRM or the per-pair provider",
                url.len()
            );
            return Err(Error::unavailable(
                PROVIDER,
                format!("request URL too long ({} chars)", url.len()),
            ));
        }
        debug!("Built OSRM URL: {} ({} chars)", url, url.len());

        let response = self.client.get(&url).send().await.map_err(|e| {
            error!("OSRM request failed: {} (coords: {})", e, n);
            Error::unavailable(PROVIDER, e)
        })?;

        let status = response.status();
        if !status.is_success() {
            error!(
                "OSRM returned HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            );
            return Err(Error::unavailable(PROVIDER, format!("HTTP {status}")));
        }

        let text = response
            .text()
            .await
            .map_err(|e| Error::unavailable(PROVIDER, e))?;
        trace!("Response size: {} bytes", text.len());

        let body: TableResponse = serde_json::from_str(&text).map_err(|e| {
            error!(
                "Failed to parse OSRM JSON: {} (first 200 chars: {})",
                e,
                excerpt(&text, 200)
            );
            Error::unavailable(PROVIDER, e)
        })?;

        parse_table_response(body, n)
    }
}

/// At most `max_chars` leading characters of a response body, for logging.
fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

fn parse_table_response(body: TableResponse, n: usize) -> Result<DistanceMatrix> {
    const PROVIDER: &str = "osrm-table";

    if body.code != "Ok" {
        let reason = match body.message {
            Some(message) => format!("code {}: {}", body.code, message),
            None => format!("code {}", body.code),
        };
        return Err(Error::unavailable(PROVIDER, reason));
    }

    let distances = body
        .distances
        .ok_or_else(|| Error::unavailable(PROVIDER, "no 'distances' array in response"))?;
    if distances.len() != n || distances.iter().any(|row| row.len() != n) {
        return Err(Error::unavailable(
            PROVIDER,
            format!("expected a {n}x{n} distances array"),
        ));
    }

    Ok(DistanceMatrix::from_fn(n, |i, j| match distances[i][j] {
        Some(d) if d.is_finite() && d >= 0.0 => d,
        _ => {
            trace!("Unreachable distance at ({}, {})", i, j);
            UNREACHABLE
        }
    }))
}

#[derive(Debug, Deserialize)]
struct RouteResponse {
    #[serde(default)]
    routes: Vec<RouteEntry>,
}

#[derive(Debug, Deserialize)]
struct RouteEntry {
    distance: f64, // meters
}

#[derive(Debug, Deserialize)]
struct TableResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    distances: Option<Vec<Vec<Option<f64>>>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_distance_parsing() {
        let body: RouteResponse =
            serde_json::from_str(r#"{"code": "Ok", "routes": [{"distance": 1520.4, "duration": 200}]}"#)
                .unwrap();
        assert_eq!(first_route_distance(&body), Some(1520.4));

        let body: RouteResponse =
            serde_json::from_str(r#"{"code": "NoRoute", "message": "Impossible route"}"#).unwrap();
        assert_eq!(first_route_distance(&body), None);
    }

    #[test]
    fn test_table_parsing_with_null() {
        let body: TableResponse = serde_json::from_str(
            r#"{"code": "Ok", "distances": [[0, 10.5], [null, 0]]}"#,
        )
        .unwrap();
        let dm = parse_table_response(body, 2).unwrap();
        assert_eq!(dm.get(0, 1), 10.5);
        assert!(!dm.is_reachable(1, 0));
    }

    #[test]
    fn test_table_error_code() {
        let body: TableResponse =
            serde_json::from_str(r#"{"code": "TooBig", "message": "Too many table coordinates"}"#)
                .unwrap();
        assert!(matches!(
            parse_table_response(body, 3),
            Err(Error::ProviderUnavailable { .. })
        ));
    }

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        // 'é' straddles byte 200
        let body = format!("{}é and more", "x".repeat(199));
        let head = excerpt(&body, 200);
        assert_eq!(head.chars().count(), 200);
        assert!(head.ends_with('é'));
        assert_eq!(excerpt("short", 200), "short");
        assert_eq!(excerpt("ééé", 2), "éé");
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let provider = OsrmRouteProvider::new("http://localhost:5000/");
        assert_eq!(provider.base_url, "http://localhost:5000");
    }
}
