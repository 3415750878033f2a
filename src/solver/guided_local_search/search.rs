use std::cmp::max;
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, span, trace, warn, Level};

use crate::config::constant::{
    DEFAULT_TIME_LIMIT_SECS, GLS_LAMBDA_COEFFICIENT, PERTURBATION_INTERVAL, SEED,
};
use crate::domain::problem::RouteProblem;
use crate::domain::types::Tour;
use crate::error::{Error, Result};
use crate::evaluation::fitness::{find_distance, route_cost, ArcCosts};
use crate::evaluation::penalty::ArcPenalties;

use super::construction::path_cheapest_insertion;
use super::diversification::{perform_rollback, perturb};
use super::neighbourhood::local_search;

const EPS: f64 = 1e-9;

/// Knobs of the guided local search.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    pub time_limit: Duration,
    /// Iterations without a new best before giving up; derived from the
    /// instance size when `None`.
    pub max_stagnation: Option<usize>,
    pub max_iterations: Option<usize>,
    pub lambda_coefficient: f64,
    /// Stagnating iterations between two perturbations; 0 disables them.
    pub perturbation_interval: usize,
    pub seed: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_secs(DEFAULT_TIME_LIMIT_SECS),
            max_stagnation: None,
            max_iterations: None,
            lambda_coefficient: GLS_LAMBDA_COEFFICIENT,
            perturbation_interval: PERTURBATION_INTERVAL,
            seed: SEED,
        }
    }
}

impl SolverConfig {
    pub fn with_time_limit(time_limit: Duration) -> Self {
        Self {
            time_limit,
            ..Self::default()
        }
    }
}

/// Best tour plus the history of how the search got there.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub tour: Tour,
    pub initial_cost: f64,
    pub iterations: usize,
    pub best_iteration: usize,
    /// `(iteration, cost)` for every new best; iteration 0 is construction.
    pub improvements: Vec<(usize, f64)>,
}

/// Everything one solve mutates, owned by that solve.
struct SearchState {
    current: Vec<Vec<usize>>,
    best: Vec<Vec<usize>>,
    best_cost: f64,
    best_iteration: usize,
    penalties: ArcPenalties,
    rng: ChaCha8Rng,
    started: Instant,
    stagnation: usize,
    max_stagnation: usize,
    rolled_back: bool,
    improvements: Vec<(usize, f64)>,
    perturbations: usize,
}

impl SearchState {
    fn new(initial: Vec<Vec<usize>>, costs: &ArcCosts, config: &SolverConfig, n: usize) -> Self {
        let initial_cost = find_distance(&initial, costs);
        Self {
            best: initial.clone(),
            current: initial,
            best_cost: initial_cost,
            best_iteration: 0,
            penalties: ArcPenalties::new(costs, config.lambda_coefficient),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            started: Instant::now(),
            stagnation: 0,
            max_stagnation: config
                .max_stagnation
                .unwrap_or_else(|| calculate_max_no_improvement(n)),
            rolled_back: false,
            improvements: vec![(0, initial_cost)],
            perturbations: 0,
        }
    }
}

/// Calculate maximum iterations without improvement based on problem size
fn calculate_max_no_improvement(locations_len: usize) -> usize {
    let scaling_factor = if locations_len < 50 { 15.0 } else { 9.0 };
    max(
        300,
        (scaling_factor * (locations_len as f64).powf(1.33)) as usize,
    )
}

/// Solve with default settings and the given time budget.
pub fn solve(problem: &RouteProblem, time_budget: Duration) -> Result<Tour> {
    solve_with_config(problem, &SolverConfig::with_time_limit(time_budget)).map(|o| o.tour)
}

pub fn solve_with_config(problem: &RouteProblem, config: &SolverConfig) -> Result<SearchOutcome> {
    let costs = ArcCosts::new(problem);
    check_reachability(problem)?;

    let initial = {
        let span = span!(Level::INFO, "construction");
        let _guard = span.enter();
        path_cheapest_insertion(problem, &costs)
    };

    let mut state = SearchState::new(initial, &costs, config, problem.node_count());
    let initial_cost = state.best_cost;
    info!(
        "Initial tour cost {:.2} over {} vehicle(s), stagnation bound {}",
        initial_cost,
        problem.vehicle_count(),
        state.max_stagnation
    );

    let deadline = state
        .started
        .checked_add(config.time_limit)
        .unwrap_or_else(|| state.started + Duration::from_secs(u64::from(u32::MAX)));

    let mut iterations = 0;
    {
        let loop_span = span!(Level::INFO, "main_search_loop", time_limit = ?config.time_limit);
        let _loop_guard = loop_span.enter();

        loop {
            if state.started.elapsed() >= config.time_limit {
                debug!("Time budget used up after {} iterations", iterations);
                break;
            }
            if state.stagnation >= state.max_stagnation {
                info!("ENDED EARLY AT ITERATION: {}", iterations);
                break;
            }
            if config.max_iterations.is_some_and(|cap| iterations >= cap) {
                break;
            }

            iterations += 1;
            if !perform_iteration(iterations, &mut state, &costs, config, deadline) {
                debug!("No arc left to penalize, stopping");
                break;
            }
        }
    }

    report_final_stats(&state, iterations);

    if costs.forbidden_arc_count(&state.best) > 0 {
        warn!("Best tour still uses an unreachable arc");
        return Err(Error::Infeasible);
    }

    let matrix = problem.matrix();
    let cost = state
        .best
        .iter()
        .map(|stops| route_cost(stops, problem.depot(), |a, b| matrix.get(a, b)))
        .sum();

    Ok(SearchOutcome {
        tour: Tour::from_stops(problem.depot(), &state.best, cost),
        initial_cost,
        iterations,
        best_iteration: state.best_iteration,
        improvements: state.improvements,
    })
}

/// A node that cannot be entered or cannot be left makes every tour infeasible.
fn check_reachability(problem: &RouteProblem) -> Result<()> {
    let matrix = problem.matrix();
    let n = problem.node_count();
    if n < 2 {
        return Ok(());
    }

    for node in 0..n {
        let enterable = (0..n).any(|other| other != node && matrix.is_reachable(other, node));
        let leavable = (0..n).any(|other| other != node && matrix.is_reachable(node, other));
        if !enterable || !leavable {
            warn!(
                "Node {} has no reachable {} arc",
                node,
                if enterable { "outgoing" } else { "incoming" }
            );
            return Err(Error::Infeasible);
        }
    }
    Ok(())
}

/// One guided local search step. Returns `false` once nothing can be penalized.
fn perform_iteration(
    iteration: usize,
    state: &mut SearchState,
    costs: &ArcCosts,
    config: &SolverConfig,
    deadline: Instant,
) -> bool {
    let iter_span = span!(Level::DEBUG, "iteration", iter = iteration);
    let _iter_guard = iter_span.enter();

    let moves = {
        let penalties = &state.penalties;
        let augmented = |a: usize, b: usize| penalties.augmented(costs, a, b);
        local_search(
            &mut state.current,
            costs.depot(),
            costs.is_symmetric(),
            &augmented,
            deadline,
        )
    };

    let current_cost = find_distance(&state.current, costs);
    trace!(
        "Local optimum after {} moves: cost {:.2}",
        moves,
        current_cost
    );

    if current_cost < state.best_cost - EPS {
        state.best = state.current.clone();
        state.best_cost = current_cost;
        state.best_iteration = iteration;
        state.improvements.push((iteration, current_cost));
        state.stagnation = 0;
        state.rolled_back = false;
        info!(
            "New best at iteration {}: cost = {:.2}",
            iteration, current_cost
        );
    } else {
        state.stagnation += 1;
    }

    if state.penalties.penalize_local_optimum(&state.current, costs) == 0 {
        return false;
    }

    let interval = config.perturbation_interval;
    if interval > 0 && state.stagnation > 0 && state.stagnation % interval == 0 {
        perturb(&mut state.current, &mut state.rng);
        state.perturbations += 1;
        debug!("Perturbed current tour at stagnation {}", state.stagnation);
    }

    if !state.rolled_back && state.stagnation >= state.max_stagnation / 2 {
        state.rolled_back = true;
        if perform_rollback(&mut state.current, &state.best) {
            debug!("Rolled back to best tour at iteration {}", iteration);
        }
    }

    true
}

fn report_final_stats(state: &SearchState, iterations: usize) {
    info!(
        "Optimization complete after {} iterations in {:?}. Best tour found at iteration {}",
        iterations,
        state.started.elapsed(),
        state.best_iteration
    );
    info!(
        "Best cost {:.2}, final stagnation {}, perturbations {}",
        state.best_cost, state.stagnation, state.perturbations
    );
}
