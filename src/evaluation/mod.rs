pub mod fitness;
pub mod penalty;

pub use fitness::{find_distance, ArcCosts};
pub use penalty::ArcPenalties;
