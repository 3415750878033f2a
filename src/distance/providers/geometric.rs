use rayon::prelude::*;

use crate::distance::haversine::great_circle_distance;
use crate::distance::matrix::DistanceMatrix;
use crate::domain::types::Coordinate;

/// Straight-line distances; ignores roads but never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeometricProvider;

impl GeometricProvider {
    pub fn distance_matrix(&self, points: &[Coordinate]) -> DistanceMatrix {
        let n = points.len();
        let data: Vec<f64> = (0..n)
            .into_par_iter()
            .flat_map_iter(|i| {
                (0..n).map(move |j| {
                    if i == j {
                        0.0
                    } else {
                        great_circle_distance(points[i], points[j])
                    }
                })
            })
            .collect();

        DistanceMatrix::from_raw(n, data)
    }
}
