pub mod frame;
pub mod variable;

pub use frame::{Record, RecordFrame};
pub use variable::Variable;
