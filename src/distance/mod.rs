pub mod haversine;
pub mod matrix;
pub mod providers;

pub use haversine::great_circle_distance;
pub use matrix::{DistanceMatrix, DistanceSource, UNREACHABLE};
