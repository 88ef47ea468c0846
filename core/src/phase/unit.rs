use crate::estimation::{EstimationDiagnostics, EstimationOutcome};
use crate::ode::{OdeModel, ParamSet};
use crate::prelude::{days_between, ensure_population, AnalysisError, AnalysisResult};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Optional population/model/parameter overrides for a new or merged phase.
#[derive(Debug, Clone, Default)]
pub struct PhaseSetting {
    pub population: Option<u64>,
    pub model: Option<Arc<dyn OdeModel>>,
    pub params: ParamSet,
}

impl PhaseSetting {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn population(mut self, population: u64) -> Self {
        self.population = Some(population);
        self
    }

    pub fn model(mut self, model: Arc<dyn OdeModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: f64) -> Self {
        self.params.insert(name, value);
        self
    }

    pub fn params(mut self, params: ParamSet) -> Self {
        self.params = params;
        self
    }
}

/// One time segment with its population, model and parameter values.
#[derive(Debug, Clone)]
pub struct PhaseUnit {
    start_date: NaiveDate,
    end_date: NaiveDate,
    population: u64,
    model: Option<Arc<dyn OdeModel>>,
    tau: Option<u32>,
    params: ParamSet,
    estimation: Option<EstimationDiagnostics>,
    enabled: bool,
}

impl PhaseUnit {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate, population: u64) -> AnalysisResult<Self> {
        check_dates(start_date, end_date)?;
        Ok(Self {
            start_date,
            end_date,
            population: ensure_population(population)?,
            model: None,
            tau: None,
            params: ParamSet::new(),
            estimation: None,
            enabled: true,
        })
    }

    /// New unit over the given dates that inherits `parent`'s settings, with `setting` on top.
    pub fn inherit(
        start_date: NaiveDate,
        end_date: NaiveDate,
        parent: Option<&PhaseUnit>,
        setting: &PhaseSetting,
        default_population: u64,
    ) -> AnalysisResult<Self> {
        let population = setting
            .population
            .or(parent.map(|p| p.population))
            .unwrap_or(default_population);
        let mut unit = Self::new(start_date, end_date, population)?;
        unit.tau = parent.and_then(|p| p.tau);
        let model = setting.model.clone().or_else(|| parent.and_then(|p| p.model.clone()));
        let base = match (parent, model.as_deref()) {
            (Some(p), Some(m)) => p.params.restricted_to(m),
            _ => ParamSet::new(),
        };
        unit.set_ode(model, base.merged(&setting.params))?;
        Ok(unit)
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn days(&self) -> usize {
        days_between(self.start_date, self.end_date) as usize
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    pub fn population(&self) -> u64 {
        self.population
    }

    pub fn model(&self) -> Option<&Arc<dyn OdeModel>> {
        self.model.as_ref()
    }

    pub fn model_name(&self) -> Option<&'static str> {
        self.model.as_ref().map(|m| m.name())
    }

    pub fn tau(&self) -> Option<u32> {
        self.tau
    }

    pub fn params(&self) -> &ParamSet {
        &self.params
    }

    pub fn estimation(&self) -> Option<&EstimationDiagnostics> {
        self.estimation.as_ref()
    }

    pub fn is_estimated(&self) -> bool {
        self.estimation.is_some()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// Assigns model and parameter values manually, which discards a previous estimation.
    pub fn set_ode(&mut self, model: Option<Arc<dyn OdeModel>>, params: ParamSet) -> AnalysisResult<()> {
        match model.as_deref() {
            Some(m) => params.validate_for(m)?,
            None if !params.is_empty() => {
                return Err(AnalysisError::InvalidInput(
                    "parameter values cannot be set before an ODE model is assigned".into(),
                ))
            }
            None => {}
        }
        let changed = self.model_name() != model.as_ref().map(|m| m.name()) || self.params != params;
        self.model = model;
        self.params = params;
        if changed {
            self.estimation = None;
        }
        Ok(())
    }

    pub(crate) fn set_tau(&mut self, tau: Option<u32>) {
        self.tau = tau;
    }

    /// Moves the unit to a new date range; the previous estimation no longer applies.
    pub(crate) fn set_dates(&mut self, start_date: NaiveDate, end_date: NaiveDate) -> AnalysisResult<()> {
        check_dates(start_date, end_date)?;
        if (start_date, end_date) != (self.start_date, self.end_date) {
            self.start_date = start_date;
            self.end_date = end_date;
            self.estimation = None;
        }
        Ok(())
    }

    pub(crate) fn record_estimation(&mut self, model: Arc<dyn OdeModel>, outcome: EstimationOutcome) {
        self.model = Some(model);
        self.tau = Some(outcome.tau);
        self.params = outcome.params;
        self.estimation = Some(outcome.diagnostics);
    }

    /// Parameter values ordered by the model, when the model and every value are set.
    pub fn param_values(&self) -> Option<Vec<f64>> {
        let model = self.model.as_deref()?;
        self.params.values_for(model).ok()
    }

    /// Reproduction number rounded to two decimals.
    pub fn reproduction_number(&self) -> Option<f64> {
        let model = self.model.as_deref()?;
        let rt = model.reproduction_number(&self.param_values()?)?;
        Some((rt * 100.0).round() / 100.0)
    }

    pub fn day_values(&self) -> BTreeMap<String, f64> {
        let (Some(model), Some(tau), Some(values)) = (self.model.as_deref(), self.tau, self.param_values()) else {
            return BTreeMap::new();
        };
        model
            .day_parameters()
            .iter()
            .map(|label| label.to_string())
            .zip(model.day_values(&values, tau))
            .collect()
    }

    pub fn summary(&self, phase: &str) -> PhaseSummary {
        PhaseSummary {
            phase: phase.to_string(),
            start: self.start_date,
            end: self.end_date,
            population: self.population,
            model: self.model_name().map(str::to_string),
            tau: self.tau,
            params: self.params.clone(),
            rt: self.reproduction_number(),
            day_params: self.day_values(),
            score: self.estimation.as_ref().map(|e| e.score),
            trials: self.estimation.as_ref().map(|e| e.trials),
            runtime_secs: self.estimation.as_ref().map(|e| e.runtime_secs),
        }
    }
}

fn check_dates(start_date: NaiveDate, end_date: NaiveDate) -> AnalysisResult<()> {
    if start_date > end_date {
        return Err(AnalysisError::Range(format!(
            "end date ({}) must not be earlier than start date ({})",
            end_date, start_date
        )));
    }
    Ok(())
}

/// One row of a phase summary table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseSummary {
    pub phase: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub population: u64,
    pub model: Option<String>,
    pub tau: Option<u32>,
    pub params: ParamSet,
    pub rt: Option<f64>,
    pub day_params: BTreeMap<String, f64>,
    pub score: Option<f64>,
    pub trials: Option<usize>,
    pub runtime_secs: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Metric;
    use crate::ode::{SirD, SirF};
    use crate::prelude::date;

    fn outcome() -> EstimationOutcome {
        EstimationOutcome {
            tau: 720,
            params: ParamSet::new()
                .with("theta", 0.0)
                .with("kappa", 0.005)
                .with("rho", 0.1)
                .with("sigma", 0.045),
            diagnostics: EstimationDiagnostics {
                metric: Metric::Rmsle,
                score: 0.1,
                trials: 3,
                runtime_secs: 0.0,
                history: Vec::new(),
            },
        }
    }

    #[test]
    fn rejects_reversed_dates() {
        assert!(matches!(
            PhaseUnit::new(date("2020-02-01"), date("2020-01-31"), 1000),
            Err(AnalysisError::Range(_))
        ));
        assert!(PhaseUnit::new(date("2020-02-01"), date("2020-02-01"), 1000).is_ok());
        assert!(PhaseUnit::new(date("2020-02-01"), date("2020-02-02"), 0).is_err());
    }

    #[test]
    fn parameters_require_a_model() {
        let mut unit = PhaseUnit::new(date("2020-01-01"), date("2020-01-10"), 1000).unwrap();
        let params = ParamSet::new().with("rho", 0.1);
        assert!(unit.set_ode(None, params.clone()).is_err());
        unit.set_ode(Some(Arc::new(SirF)), params).unwrap();
        assert_eq!(unit.model_name(), Some("SIR-F"));
    }

    #[test]
    fn date_change_discards_estimation() {
        let mut unit = PhaseUnit::new(date("2020-01-01"), date("2020-01-10"), 1000).unwrap();
        unit.record_estimation(Arc::new(SirF), outcome());
        assert!(unit.is_estimated());
        assert_eq!(unit.reproduction_number(), Some(2.0));
        assert_eq!(unit.day_values().get("1/beta [day]"), Some(&5.0));
        unit.set_dates(date("2020-01-01"), date("2020-01-10")).unwrap();
        assert!(unit.is_estimated());
        unit.set_dates(date("2020-01-01"), date("2020-01-12")).unwrap();
        assert!(!unit.is_estimated());
        assert_eq!(unit.params().get("rho"), Some(0.1));
    }

    #[test]
    fn inherit_restricts_parent_parameters_to_new_model() {
        let mut parent = PhaseUnit::new(date("2020-01-01"), date("2020-01-10"), 1000).unwrap();
        parent.record_estimation(Arc::new(SirF), outcome());
        let setting = PhaseSetting::new().model(Arc::new(SirD)).param("rho", 0.2);
        let child = PhaseUnit::inherit(date("2020-01-11"), date("2020-01-20"), Some(&parent), &setting, 5).unwrap();
        assert_eq!(child.population(), 1000);
        assert_eq!(child.tau(), Some(720));
        assert_eq!(child.params().get("rho"), Some(0.2));
        assert_eq!(child.params().get("sigma"), Some(0.045));
        assert!(!child.params().contains("theta"));
        assert!(!child.is_estimated());
    }
}
