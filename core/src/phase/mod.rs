pub mod ordinal;
pub mod series;
pub mod unit;

pub use ordinal::{ordinal, parse_phase_name, LAST};
pub use series::PhaseSeries;
pub use unit::{PhaseSetting, PhaseSummary, PhaseUnit};
