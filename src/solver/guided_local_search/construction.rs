use crate::domain::problem::RouteProblem;
use crate::evaluation::fitness::ArcCosts;

/// Build the starting tour by repeatedly appending, to the end of some
/// vehicle's path, the stop whose insertion before the return to the depot
/// adds the least cost.
///
/// Ties go to the lowest node index, then the lowest vehicle index, so the
/// result is fully deterministic. Unreachable arcs carry the forbidden cost and
/// are only used when nothing else is left.
pub fn path_cheapest_insertion(problem: &RouteProblem, costs: &ArcCosts) -> Vec<Vec<usize>> {
    let depot = problem.depot();
    let mut routes: Vec<Vec<usize>> = vec![Vec::new(); problem.vehicle_count()];
    let mut unvisited: Vec<usize> = problem.customers().collect();

    while !unvisited.is_empty() {
        let mut best: Option<(f64, usize, usize)> = None;

        for (slot, &node) in unvisited.iter().enumerate() {
            for (vehicle, route) in routes.iter().enumerate() {
                let end = route.last().copied().unwrap_or(depot);
                let delta = costs.get(end, node) + costs.get(node, depot) - costs.get(end, depot);
                if best.map_or(true, |(best_delta, _, _)| delta < best_delta) {
                    best = Some((delta, slot, vehicle));
                }
            }
        }

        let Some((_, slot, vehicle)) = best else {
            break;
        };
        let node = unvisited.remove(slot);
        routes[vehicle].push(node);
    }

    routes
}
