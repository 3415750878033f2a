pub mod data_generator;

pub use data_generator::{generate_random_locations, locations_to_csv};
