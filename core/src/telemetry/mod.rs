pub mod metrics;

pub use metrics::{BatchRecorder, BatchStats};
