pub mod finder;
pub mod sr;

pub use finder::{ChangeFinder, TrendOptions};
pub use sr::SrChangeFinder;
