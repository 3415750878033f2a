use super::fitness::{route_arcs, ArcCosts};

/// Guided local search memory: how often each arc has been penalized.
#[derive(Debug, Clone)]
pub struct ArcPenalties {
    size: usize,
    counts: Vec<u32>,
    lambda: f64,
    symmetric: bool,
}

impl ArcPenalties {
    /// `lambda = coefficient * mean arc cost`, so penalties scale with the instance.
    pub fn new(costs: &ArcCosts, coefficient: f64) -> Self {
        Self {
            size: costs.size(),
            counts: vec![0; costs.size() * costs.size()],
            lambda: coefficient * costs.mean_arc_cost(),
            symmetric: costs.is_symmetric(),
        }
    }

    pub fn count(&self, from: usize, to: usize) -> u32 {
        self.counts[from * self.size + to]
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Cost the local search minimizes: true cost plus the weighted penalty.
    pub fn augmented(&self, costs: &ArcCosts, from: usize, to: usize) -> f64 {
        costs.get(from, to) + self.lambda * self.count(from, to) as f64
    }

    /// Penalize the arcs of a local optimum with the highest utility
    /// `cost / (1 + penalty)`. Returns how many arcs were penalized.
    pub fn penalize_local_optimum(&mut self, routes: &[Vec<usize>], costs: &ArcCosts) -> usize {
        let arcs: Vec<(usize, usize, f64)> = routes
            .iter()
            .flat_map(|stops| route_arcs(stops, costs.depot()))
            .map(|(a, b)| (a, b, costs.get(a, b) / (1.0 + self.count(a, b) as f64)))
            .collect();

        let max_utility = arcs.iter().map(|&(_, _, u)| u).fold(f64::MIN, f64::max);
        if arcs.is_empty() || max_utility <= 0.0 {
            return 0;
        }

        let tol = max_utility * 1e-12;
        let mut penalized = 0;
        for &(a, b, utility) in &arcs {
            if max_utility - utility <= tol {
                self.counts[a * self.size + b] += 1;
                if self.symmetric && a != b {
                    self.counts[b * self.size + a] += 1;
                }
                penalized += 1;
            }
        }
        penalized
    }
}
