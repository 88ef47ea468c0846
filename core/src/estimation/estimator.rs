use crate::math::Metric;
use crate::ode::{OdeModel, ParamSet};
use crate::prelude::AnalysisResult;
use crate::records::RecordFrame;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Input of one phase fit: everything the estimator may read.
#[derive(Debug, Clone)]
pub struct EstimationJob {
    pub phase: String,
    pub model: Arc<dyn OdeModel>,
    /// Records of the phase's date range only.
    pub records: RecordFrame,
    pub population: u64,
    /// Tau [min] to use, or `None` to let the estimator choose one.
    pub tau: Option<u32>,
    /// Parameter values held constant during the fit.
    pub fixed: ParamSet,
}

/// Score of one trial tau.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TauTrial {
    pub tau: u32,
    pub score: f64,
}

/// Diagnostics kept with a phase after a successful fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimationDiagnostics {
    pub metric: Metric,
    pub score: f64,
    pub trials: usize,
    pub runtime_secs: f64,
    pub history: Vec<TauTrial>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EstimationOutcome {
    pub tau: u32,
    pub params: ParamSet,
    pub diagnostics: EstimationDiagnostics,
}

/// Fits an ODE model's parameters to the records of one phase.
pub trait Estimator: Send + Sync {
    fn estimate(&self, job: &EstimationJob) -> AnalysisResult<EstimationOutcome>;
}
