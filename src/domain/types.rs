use serde::{Deserialize, Serialize};

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

/// A delivery stop as read from the location file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
}

impl Location {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// Solver output: one depot-anchored node sequence per vehicle.
///
/// A vehicle that serves no stop keeps the sequence `[depot, depot]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tour {
    routes: Vec<Vec<usize>>,
    cost: f64,
}

impl Tour {
    /// Wrap per-vehicle stop sequences (depot excluded) with the depot at both ends.
    pub(crate) fn from_stops(depot: usize, stops: &[Vec<usize>], cost: f64) -> Self {
        let routes = stops
            .iter()
            .map(|route| {
                let mut full = Vec::with_capacity(route.len() + 2);
                full.push(depot);
                full.extend_from_slice(route);
                full.push(depot);
                full
            })
            .collect();
        Tour { routes, cost }
    }

    pub fn routes(&self) -> &[Vec<usize>] {
        &self.routes
    }

    /// Total cost in meters over every vehicle.
    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn vehicle_count(&self) -> usize {
        self.routes.len()
    }

    /// Non-depot nodes in visiting order, vehicle after vehicle.
    pub fn stops(&self) -> impl Iterator<Item = usize> + '_ {
        self.routes
            .iter()
            .flat_map(|route| route[1..route.len() - 1].iter().copied())
    }
}
