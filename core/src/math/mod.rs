pub mod integrate;
pub mod stats;

pub use integrate::rk4_step;
pub use stats::{Metric, StatsHelper};
