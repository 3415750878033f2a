pub mod problem;
pub mod types;

pub use problem::RouteProblem;
pub use types::{Coordinate, Location, Tour};
