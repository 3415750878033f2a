use crate::domain::problem::RouteProblem;

/// Arc costs as the search sees them.
///
/// Unreachable matrix entries are replaced by a finite forbidden cost that is
/// larger than any tour built only from reachable arcs, so a single forbidden
/// arc always makes a tour worse than every feasible one.
#[derive(Debug, Clone)]
pub struct ArcCosts {
    size: usize,
    depot: usize,
    costs: Vec<f64>,
    forbidden: Vec<bool>,
    forbidden_cost: f64,
    symmetric: bool,
    mean_arc: f64,
}

impl ArcCosts {
    pub fn new(problem: &RouteProblem) -> Self {
        let matrix = problem.matrix();
        let size = matrix.size();

        // a tour uses at most one arc per stop plus one return per vehicle
        let max_arcs = (size - 1 + problem.vehicle_count()) as f64;
        let forbidden_cost = matrix.max_finite().max(1.0) * max_arcs + 1.0;

        let mut costs = Vec::with_capacity(size * size);
        let mut forbidden = Vec::with_capacity(size * size);
        let (mut finite_sum, mut finite_count) = (0.0, 0usize);
        for i in 0..size {
            for j in 0..size {
                let d = matrix.get(i, j);
                let blocked = !d.is_finite();
                if !blocked && i != j {
                    finite_sum += d;
                    finite_count += 1;
                }
                costs.push(if blocked { forbidden_cost } else { d });
                forbidden.push(blocked);
            }
        }

        Self {
            size,
            depot: problem.depot(),
            costs,
            forbidden,
            forbidden_cost,
            symmetric: matrix.is_symmetric(1e-9),
            mean_arc: if finite_count > 0 {
                finite_sum / finite_count as f64
            } else {
                0.0
            },
        }
    }

    pub fn get(&self, from: usize, to: usize) -> f64 {
        self.costs[from * self.size + to]
    }

    pub fn is_forbidden(&self, from: usize, to: usize) -> bool {
        self.forbidden[from * self.size + to]
    }

    pub fn forbidden_cost(&self) -> f64 {
        self.forbidden_cost
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn depot(&self) -> usize {
        self.depot
    }

    pub fn is_symmetric(&self) -> bool {
        self.symmetric
    }

    /// Mean reachable off-diagonal cost.
    pub fn mean_arc_cost(&self) -> f64 {
        self.mean_arc
    }

    pub fn forbidden_arc_count(&self, routes: &[Vec<usize>]) -> usize {
        routes
            .iter()
            .flat_map(|stops| route_arcs(stops, self.depot))
            .filter(|&(a, b)| self.is_forbidden(a, b))
            .count()
    }
}

/// Arcs of `depot -> stops[0] -> ... -> stops[n-1] -> depot`; none for an empty route.
pub fn route_arcs(stops: &[usize], depot: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
    let head = stops.first().map(|&first| (depot, first));
    let tail = stops.last().map(|&last| (last, depot));
    head.into_iter()
        .chain(stops.windows(2).map(|w| (w[0], w[1])))
        .chain(tail)
}

pub fn route_cost<F>(stops: &[usize], depot: usize, arc: F) -> f64
where
    F: Fn(usize, usize) -> f64,
{
    route_arcs(stops, depot).map(|(a, b)| arc(a, b)).sum()
}

/// Total cost of every vehicle route under the search's arc costs.
pub fn find_distance(routes: &[Vec<usize>], costs: &ArcCosts) -> f64 {
    routes
        .iter()
        .map(|stops| route_cost(stops, costs.depot(), |a, b| costs.get(a, b)))
        .sum()
}
