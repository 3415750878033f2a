use crate::distance::matrix::DistanceMatrix;
use crate::error::{Error, Result};

/// A validated routing problem: cost matrix, depot and fleet size.
///
/// Once built, the solver relies on these invariants without checking again.
#[derive(Debug, Clone)]
pub struct RouteProblem {
    matrix: DistanceMatrix,
    depot: usize,
    vehicle_count: usize,
}

impl RouteProblem {
    pub fn new(matrix: DistanceMatrix, depot: usize, vehicle_count: usize) -> Result<Self> {
        if matrix.is_empty() {
            return Err(Error::Input("distance matrix is empty".into()));
        }
        if depot >= matrix.size() {
            return Err(Error::Input(format!(
                "depot index {} out of range for {} nodes",
                depot,
                matrix.size()
            )));
        }
        if vehicle_count < 1 {
            return Err(Error::Input("vehicle count must be at least 1".into()));
        }

        Ok(Self {
            matrix,
            depot,
            vehicle_count,
        })
    }

    pub fn from_rows(rows: Vec<Vec<f64>>, depot: usize, vehicle_count: usize) -> Result<Self> {
        Self::new(DistanceMatrix::from_rows(rows)?, depot, vehicle_count)
    }

    pub fn matrix(&self) -> &DistanceMatrix {
        &self.matrix
    }

    pub fn depot(&self) -> usize {
        self.depot
    }

    pub fn vehicle_count(&self) -> usize {
        self.vehicle_count
    }

    pub fn node_count(&self) -> usize {
        self.matrix.size()
    }

    /// Every node except the depot, ascending.
    pub fn customers(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.node_count()).filter(move |&node| node != self.depot)
    }
}
