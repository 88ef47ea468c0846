pub mod difference;
pub mod estimator;
pub mod pool;

pub use difference::{DifferenceEstimator, DifferenceEstimatorConfig};
pub use estimator::{EstimationDiagnostics, EstimationJob, EstimationOutcome, Estimator, TauTrial};
pub use pool::WorkerPool;
