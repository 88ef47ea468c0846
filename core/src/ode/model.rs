use crate::math::rk4_step;
use crate::ode::{SewirF, Sir, SirD, SirF, SirFv};
use crate::prelude::{AnalysisError, AnalysisResult, MINUTES_PER_DAY};
use crate::records::{Record, Variable};
use ndarray::{Array1, ArrayView1};
use std::fmt;
use std::sync::Arc;

/// Compartmental ODE model described in tau-scaled (non-dimensional) time.
///
/// Parameter values are passed as slices ordered like [`OdeModel::parameters`],
/// and state vectors are ordered like [`OdeModel::variables`].
pub trait OdeModel: Send + Sync + fmt::Debug {
    /// Stable model name, e.g. "SIR-F".
    fn name(&self) -> &'static str;

    fn variables(&self) -> &'static [Variable];

    fn parameters(&self) -> &'static [&'static str];

    /// Labels of the day-scaled values returned by [`OdeModel::day_values`].
    fn day_parameters(&self) -> &'static [&'static str];

    /// Change of each variable per tau unit.
    fn derivatives(&self, state: ArrayView1<f64>, values: &[f64], population: f64) -> Array1<f64>;

    fn reproduction_number(&self, values: &[f64]) -> Option<f64>;

    /// Day-scaled values such as "1/beta [day]", ordered like `day_parameters`.
    fn day_values(&self, values: &[f64], tau: u32) -> Vec<f64>;

    /// One parameter sample derived from a day-over-day change of the state.
    ///
    /// Entries are NaN where the sample cannot be computed; fixed parameters are
    /// returned unchanged.
    fn rate_sample(
        &self,
        state: ArrayView1<f64>,
        daily_change: ArrayView1<f64>,
        population: f64,
        tau: u32,
        fixed: &[Option<f64>],
    ) -> Vec<f64>;

    fn upper_bound(&self, _parameter: &str) -> Option<f64> {
        None
    }

    /// Advances the state by one tau unit.
    fn step(&self, state: ArrayView1<f64>, values: &[f64], population: f64) -> Array1<f64> {
        rk4_step(state, 1.0, |s| self.derivatives(s, values, population))
    }

    /// Advances the state by whole days, recording the state at the start of every day.
    ///
    /// The returned vector holds `days + 1` states: the initial one and the
    /// state after each day.
    fn advance_days(
        &self,
        state: ArrayView1<f64>,
        values: &[f64],
        population: f64,
        tau: u32,
        days: usize,
    ) -> Vec<Array1<f64>> {
        let steps_per_day = (MINUTES_PER_DAY / tau.max(1)) as usize;
        let mut states = Vec::with_capacity(days + 1);
        let mut current = state.to_owned();
        states.push(current.clone());
        for _ in 0..days {
            for _ in 0..steps_per_day {
                current = self.step(current.view(), values, population);
                current.mapv_inplace(|v| v.max(0.0));
            }
            states.push(current.clone());
        }
        states
    }

    /// State vector read from an observed record.
    fn observed_state(&self, record: &Record) -> Array1<f64> {
        self.variables().iter().map(|v| record.value(*v)).collect()
    }
}

/// Days per transition for a tau-scaled rate, 0 when the rate is 0.
pub(crate) fn days_per_transition(rate: f64, tau: u32) -> f64 {
    if rate <= 0.0 {
        return 0.0;
    }
    (tau as f64 / MINUTES_PER_DAY as f64 / rate).floor()
}

/// Scales a per-day rate to a per-tau rate.
pub(crate) fn per_tau(rate_per_day: f64, tau: u32) -> f64 {
    rate_per_day * tau as f64 / MINUTES_PER_DAY as f64
}

pub fn model_names() -> [&'static str; 5] {
    [Sir.name(), SirD.name(), SirF.name(), SirFv.name(), SewirF.name()]
}

/// Looks up a model descriptor by name (case-insensitive).
pub fn model_by_name(name: &str) -> AnalysisResult<Arc<dyn OdeModel>> {
    let model: Arc<dyn OdeModel> = match name.to_ascii_uppercase().as_str() {
        "SIR" => Arc::new(Sir),
        "SIR-D" => Arc::new(SirD),
        "SIR-F" => Arc::new(SirF),
        "SIR-FV" => Arc::new(SirFv),
        "SEWIR-F" => Arc::new(SewirF),
        _ => {
            return Err(AnalysisError::NotFound(format!(
                "ODE model {} is not registered (models: {})",
                name,
                model_names().join(", ")
            )))
        }
    };
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn models_resolve_by_name() {
        assert_eq!(model_by_name("sir-f").unwrap().name(), "SIR-F");
        assert_eq!(model_by_name("SIR").unwrap().name(), "SIR");
        assert_eq!(model_by_name("sir-fv").unwrap().parameters().len(), 5);
        assert_eq!(model_by_name("SEWIR-F").unwrap().variables().len(), 6);
        assert!(matches!(
            model_by_name("SEIR"),
            Err(AnalysisError::NotFound(_))
        ));
    }

    #[test]
    fn day_conversion_handles_zero_rates() {
        assert_eq!(days_per_transition(0.0, 1440), 0.0);
        assert_eq!(days_per_transition(0.1, 1440), 10.0);
        assert_eq!(days_per_transition(0.05, 720), 10.0);
        assert!((per_tau(0.2, 720) - 0.1).abs() < 1e-12);
    }
}
