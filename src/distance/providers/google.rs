use futures::future::join_all;
use itertools::Itertools;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, info};

use super::http_client;
use crate::config::constant::{GOOGLE_MATRIX_URL, GOOGLE_TILE_SIZE};
use crate::distance::matrix::{DistanceMatrix, UNREACHABLE};
use crate::domain::types::Coordinate;
use crate::error::{Error, Result};

const PROVIDER: &str = "google";

/// Batched distance-matrix service. Any failed request fails the whole matrix.
#[derive(Debug, Clone)]
pub struct GoogleMatrixProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GoogleMatrixProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: http_client(),
            base_url: GOOGLE_MATRIX_URL.to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Fetch the full matrix in tiles of at most `GOOGLE_TILE_SIZE` origins by
    /// `GOOGLE_TILE_SIZE` destinations.
    pub async fn distance_matrix(&self, points: &[Coordinate]) -> Result<DistanceMatrix> {
        let n = points.len();
        if n < 2 {
            return Ok(DistanceMatrix::from_fn(n, |_, _| 0.0));
        }

        let blocks: Vec<(usize, usize)> = (0..n)
            .step_by(GOOGLE_TILE_SIZE)
            .cartesian_product((0..n).step_by(GOOGLE_TILE_SIZE))
            .collect();
        info!(
            "Requesting {} distance matrix tile(s) for {} locations",
            blocks.len(),
            n
        );

        let tiles = join_all(blocks.iter().map(|&(row, col)| {
            let origins = &points[row..(row + GOOGLE_TILE_SIZE).min(n)];
            let destinations = &points[col..(col + GOOGLE_TILE_SIZE).min(n)];
            self.fetch_tile(origins, destinations)
        }))
        .await;

        let mut data = vec![0.0; n * n];
        for (&(row, col), tile) in blocks.iter().zip(tiles) {
            let tile = tile?;
            for (di, tile_row) in tile.into_iter().enumerate() {
                for (dj, value) in tile_row.into_iter().enumerate() {
                    let (i, j) = (row + di, col + dj);
                    data[i * n + j] = if i == j { 0.0 } else { value };
                }
            }
        }

        Ok(DistanceMatrix::from_raw(n, data))
    }

    async fn fetch_tile(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
    ) -> Result<Vec<Vec<f64>>> {
        let url = format!(
            "{}?origins={}&destinations={}&key={}",
            self.base_url,
            join_coordinates(origins),
            join_coordinates(destinations),
            self.api_key
        );
        debug!(
            "Sending GET to {} ({} origins x {} destinations)",
            self.base_url,
            origins.len(),
            destinations.len()
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::unavailable(PROVIDER, e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            error!("Google API request failed with status code {}", status);
            return Err(Error::unavailable(PROVIDER, format!("HTTP {status}")));
        }

        let body: DistanceMatrixResponse = response
            .json()
            .await
            .map_err(|e| Error::unavailable(PROVIDER, e.without_url()))?;

        parse_matrix_response(body, origins.len(), destinations.len())
    }
}

fn join_coordinates(points: &[Coordinate]) -> String {
    points
        .iter()
        .map(|p| format!("{},{}", p.latitude, p.longitude))
        .join("|")
}

/// Turn a response body into a `rows x cols` block, failing on anything but
/// a top-level `OK`.
fn parse_matrix_response(
    response: DistanceMatrixResponse,
    rows: usize,
    cols: usize,
) -> Result<Vec<Vec<f64>>> {
    if response.status != "OK" {
        error!("Google API returned error status: {}", response.status);
        let reason = match response.error_message {
            Some(message) => format!("status {}: {}", response.status, message),
            None => format!("status {}", response.status),
        };
        return Err(Error::unavailable(PROVIDER, reason));
    }

    if response.rows.len() != rows {
        return Err(Error::unavailable(
            PROVIDER,
            format!("expected {} rows, got {}", rows, response.rows.len()),
        ));
    }

    response
        .rows
        .into_iter()
        .map(|row| {
            if row.elements.len() != cols {
                return Err(Error::unavailable(
                    PROVIDER,
                    format!("expected {} elements, got {}", cols, row.elements.len()),
                ));
            }
            Ok(row
                .elements
                .into_iter()
                .map(|element| match (element.status.as_str(), element.distance) {
                    ("OK", Some(distance)) => distance.value,
                    _ => UNREACHABLE,
                })
                .collect())
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    rows: Vec<Row>,
}

#[derive(Debug, Deserialize)]
struct Row {
    elements: Vec<Element>,
}

#[derive(Debug, Deserialize)]
struct Element {
    status: String,
    distance: Option<Distance>,
}

#[derive(Debug, Deserialize)]
struct Distance {
    value: f64, // meters
}
