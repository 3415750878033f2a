pub mod config;
pub mod distance;
pub mod domain;
pub mod error;
pub mod evaluation;
pub mod fixtures;
pub mod output;
pub mod planner;
pub mod setup;
pub mod simulate;
pub mod solver;

pub use error::{Error, Result};
