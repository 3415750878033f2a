use tracing::{debug, error, info};

use super::providers::{
    GeometricProvider, GoogleMatrixProvider, OsrmRouteProvider, OsrmTableProvider,
};
use crate::config::{ProviderKind, Settings};
use crate::domain::types::Coordinate;
use crate::error::{Error, Result};

/// Cost of a pair that no route connects.
pub const UNREACHABLE: f64 = f64::INFINITY;

/// Square cost matrix in meters, stored row-major.
///
/// The diagonal is zero and every entry is either a non-negative finite cost
/// or [`UNREACHABLE`].
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    data: Vec<f64>,
    size: usize,
}

impl DistanceMatrix {
    /// Builds a matrix from explicit rows, rejecting malformed input.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let size = rows.len();
        let mut data = Vec::with_capacity(size * size);

        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != size {
                return Err(Error::Input(format!(
                    "distance matrix is not square: row {} has {} entries, expected {}",
                    i,
                    row.len(),
                    size
                )));
            }
            for (j, value) in row.into_iter().enumerate() {
                if value.is_nan() || value < 0.0 {
                    return Err(Error::Input(format!(
                        "invalid distance {value} at ({i}, {j})"
                    )));
                }
                if i == j && value != 0.0 {
                    return Err(Error::Input(format!(
                        "diagonal entry ({i}, {i}) must be zero, got {value}"
                    )));
                }
                data.push(value);
            }
        }

        Ok(Self { data, size })
    }

    /// Wraps row-major data produced by a provider; the caller upholds the invariants.
    pub(crate) fn from_raw(size: usize, data: Vec<f64>) -> Self {
        debug_assert_eq!(data.len(), size * size);
        Self { data, size }
    }

    /// Fills an `size x size` matrix from `f(i, j)`, forcing the diagonal to zero.
    pub(crate) fn from_fn<F>(size: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> f64,
    {
        let mut data = Vec::with_capacity(size * size);
        for i in 0..size {
            for j in 0..size {
                data.push(if i == j { 0.0 } else { f(i, j) });
            }
        }
        Self { data, size }
    }

    pub fn get(&self, from: usize, to: usize) -> f64 {
        self.data[from * self.size + to]
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn is_reachable(&self, from: usize, to: usize) -> bool {
        self.get(from, to).is_finite()
    }

    pub fn is_symmetric(&self, tol: f64) -> bool {
        for i in 0..self.size {
            for j in (i + 1)..self.size {
                let (a, b) = (self.get(i, j), self.get(j, i));
                let equal = if a.is_finite() && b.is_finite() {
                    (a - b).abs() <= tol
                } else {
                    a == b
                };
                if !equal {
                    return false;
                }
            }
        }
        true
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks(self.size.max(1))
    }

    /// Largest finite entry, or zero when there is none.
    pub fn max_finite(&self) -> f64 {
        self.data
            .iter()
            .copied()
            .filter(|d| d.is_finite())
            .fold(0.0, f64::max)
    }

    pub fn unreachable_count(&self) -> usize {
        self.data.iter().filter(|d| !d.is_finite()).count()
    }
}

/// Print distance matrix for debugging
pub fn print_dist_matrix(dm: &DistanceMatrix) {
    debug!("Distance matrix:");
    for row in dm.rows() {
        debug!("{:?}", row);
    }
}

/// The interchangeable sources a distance matrix can be built from.
#[derive(Debug, Clone)]
pub enum DistanceSource {
    Geometric(GeometricProvider),
    GoogleMatrix(GoogleMatrixProvider),
    OsrmRoute(OsrmRouteProvider),
    OsrmTable(OsrmTableProvider),
}

impl DistanceSource {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let source = match settings.provider {
            ProviderKind::Geometric => DistanceSource::Geometric(GeometricProvider),
            ProviderKind::Google => {
                let key = settings.google_api_key.clone().ok_or_else(|| {
                    Error::Config("API key required for Google source".into())
                })?;
                DistanceSource::GoogleMatrix(
                    GoogleMatrixProvider::new(key).with_base_url(&settings.google_matrix_url),
                )
            }
            ProviderKind::OsrmRoute => {
                DistanceSource::OsrmRoute(OsrmRouteProvider::new(&settings.osrm_base_url))
            }
            ProviderKind::OsrmTable => {
                DistanceSource::OsrmTable(OsrmTableProvider::new(&settings.osrm_base_url))
            }
        };
        Ok(source)
    }

    pub fn name(&self) -> &'static str {
        match self {
            DistanceSource::Geometric(_) => "geometric",
            DistanceSource::GoogleMatrix(_) => "google",
            DistanceSource::OsrmRoute(_) => "osrm-route",
            DistanceSource::OsrmTable(_) => "osrm-table",
        }
    }

    /// Create distance matrix from the selected source.
    ///
    /// Batched sources fail as a whole; the per-pair OSRM source marks a failed
    /// pair as [`UNREACHABLE`] and keeps the rest.
    pub async fn distance_matrix(&self, points: &[Coordinate]) -> Result<DistanceMatrix> {
        info!(
            "Creating distance matrix using source '{}' ({} locations)",
            self.name(),
            points.len()
        );

        let result = match self {
            DistanceSource::Geometric(provider) => Ok(provider.distance_matrix(points)),
            DistanceSource::GoogleMatrix(provider) => provider.distance_matrix(points).await,
            DistanceSource::OsrmRoute(provider) => Ok(provider.distance_matrix(points).await),
            DistanceSource::OsrmTable(provider) => provider.distance_matrix(points).await,
        };

        match &result {
            Ok(matrix) => info!(
                "Successfully created {}x{} distance matrix ({} unreachable entries)",
                matrix.size(),
                matrix.size(),
                matrix.unreachable_count()
            ),
            Err(e) => error!("Distance matrix from '{}' failed: {}", self.name(), e),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows() {
        let dm = DistanceMatrix::from_rows(vec![vec![0.0, 5.0], vec![7.0, 0.0]]).unwrap();
        assert_eq!(dm.size(), 2);
        assert_eq!(dm.get(0, 1), 5.0);
        assert_eq!(dm.get(1, 0), 7.0);
        assert!(!dm.is_symmetric(1e-9));
    }

    #[test]
    fn test_rejects_non_square() {
        let err = DistanceMatrix::from_rows(vec![vec![0.0, 1.0], vec![1.0]]);
        assert!(matches!(err, Err(Error::Input(_))));
    }

    #[test]
    fn test_rejects_negative_and_nan() {
        assert!(DistanceMatrix::from_rows(vec![vec![0.0, -1.0], vec![1.0, 0.0]]).is_err());
        assert!(DistanceMatrix::from_rows(vec![vec![0.0, f64::NAN], vec![1.0, 0.0]]).is_err());
    }

    #[test]
    fn test_rejects_non_zero_diagonal() {
        assert!(DistanceMatrix::from_rows(vec![vec![1.0, 1.0], vec![1.0, 0.0]]).is_err());
    }

    #[test]
    fn test_unreachable_is_kept() {
        let dm = DistanceMatrix::from_rows(vec![vec![0.0, UNREACHABLE], vec![UNREACHABLE, 0.0]])
            .unwrap();
        assert!(!dm.is_reachable(0, 1));
        assert!(dm.is_symmetric(1e-9));
        assert_eq!(dm.unreachable_count(), 2);
        assert_eq!(dm.max_finite(), 0.0);
    }

    #[test]
    fn test_from_fn_zero_diagonal() {
        let dm = DistanceMatrix::from_fn(3, |i, j| (i * 10 + j) as f64);
        assert_eq!(dm.get(1, 1), 0.0);
        assert_eq!(dm.get(1, 2), 12.0);
        assert_eq!(dm.rows().count(), 3);
    }

    #[tokio::test]
    async fn test_geometric_source_identical_points() {
        let p = Coordinate::new(1.3521, 103.8198);
        let dm = DistanceSource::Geometric(GeometricProvider)
            .distance_matrix(&[p, p])
            .await
            .unwrap();
        for row in dm.rows() {
            for d in row {
                assert!(d.abs() < 1e-6);
            }
        }
    }
}
