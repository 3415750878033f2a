pub mod loader;

pub use loader::{load_locations, read_locations};
