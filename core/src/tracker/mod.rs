pub mod param_tracker;
pub mod trajectory;

pub use param_tracker::{EstimateOptions, EstimationReport, ParamTracker};
pub use trajectory::{Snapshot, Trajectory};
