pub mod formatter;

pub use formatter::{route_ids, save_history_csv, write_route, write_route_to};
