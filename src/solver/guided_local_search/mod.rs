pub mod construction;
pub mod diversification;
pub mod neighbourhood;
pub mod search;

pub use construction::*;
pub use search::*;
