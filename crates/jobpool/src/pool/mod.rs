mod manager;
pub(crate) mod tracker;
mod worker;


pub use manager::*;
pub use tracker::PoolState;
