pub mod model;
pub mod params;
pub mod sewirf;
pub mod sir;
pub mod sird;
pub mod sirf;
pub mod sirfv;

pub use model::{model_by_name, model_names, OdeModel};
pub use params::ParamSet;
pub use sewirf::SewirF;
pub use sir::Sir;
pub use sird::SirD;
pub use sirf::SirF;
pub use sirfv::SirFv;
