pub mod guided_local_search;

pub use guided_local_search::{solve, solve_with_config, SearchOutcome, SolverConfig};
