pub mod bridge;
pub mod file;
pub mod model;
