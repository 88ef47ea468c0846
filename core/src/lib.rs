//! Phase-series and scenario-tracking core for epidemic case records.
//!
//! Records are split into contiguous phases, each phase gets its own ODE
//! parameter values, and named scenarios branch the phase series for
//! what-if comparison.

pub mod estimation;
pub mod math;
pub mod ode;
pub mod phase;
pub mod prelude;
pub mod records;
pub mod scenario;
pub mod telemetry;
pub mod tracker;
pub mod trend;

pub use prelude::{AnalysisError, AnalysisResult, MAIN};
pub use scenario::Scenario;
