use crate::estimation::{
    EstimationDiagnostics, EstimationJob, EstimationOutcome, Estimator, TauTrial,
};
use crate::math::{Metric, StatsHelper};
use crate::ode::ParamSet;
use crate::prelude::{ensure_tau, AnalysisError, AnalysisResult};
use crate::records::Variable;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifferenceEstimatorConfig {
    /// Tau values [min] tried when the job does not fix one.
    pub tau_candidates: Vec<u32>,
    pub min_records: usize,
}

impl Default for DifferenceEstimatorConfig {
    fn default() -> Self {
        Self {
            tau_candidates: vec![360, 480, 720, 1440],
            min_records: 3,
        }
    }
}

/// Reference estimator built on day-over-day finite differences.
///
/// For each tau candidate, every pair of consecutive records yields one sample
/// per parameter; the median of the samples is simulated over the phase and
/// scored with RMSLE against the records. The best-scoring tau wins.
#[derive(Debug, Clone, Default)]
pub struct DifferenceEstimator {
    config: DifferenceEstimatorConfig,
}

impl DifferenceEstimator {
    pub fn new(config: DifferenceEstimatorConfig) -> AnalysisResult<Self> {
        if config.tau_candidates.is_empty() {
            return Err(AnalysisError::InvalidInput(
                "at least one tau candidate is required".into(),
            ));
        }
        for tau in &config.tau_candidates {
            ensure_tau(*tau)?;
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &DifferenceEstimatorConfig {
        &self.config
    }
}

impl Estimator for DifferenceEstimator {
    fn estimate(&self, job: &EstimationJob) -> AnalysisResult<EstimationOutcome> {
        let started = Instant::now();
        let fail = |reason: String| AnalysisError::Estimation {
            phase: job.phase.clone(),
            reason,
        };
        let model = job.model.as_ref();
        if job.records.len() < self.config.min_records.max(2) {
            return Err(fail(format!(
                "{} records are too few (at least {} required)",
                job.records.len(),
                self.config.min_records.max(2)
            )));
        }
        job.fixed.validate_for(model).map_err(|e| fail(e.to_string()))?;
        let fixed: Vec<Option<f64>> = model.parameters().iter().map(|p| job.fixed.get(p)).collect();
        let states: Vec<Array1<f64>> = job
            .records
            .records()
            .iter()
            .map(|record| model.observed_state(record))
            .collect();
        let infected = model
            .variables()
            .iter()
            .position(|v| *v == Variable::Infected)
            .ok_or_else(|| fail(format!("{} model has no infected compartment", model.name())))?;
        if states.iter().all(|state| state[infected] <= 0.0) {
            return Err(fail("no infected cases were recorded in the phase".into()));
        }

        let candidates = match job.tau {
            Some(tau) => vec![ensure_tau(tau).map_err(|e| fail(e.to_string()))?],
            None => self.config.tau_candidates.clone(),
        };
        let population = job.population as f64;
        let observed: Vec<usize> = model
            .variables()
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_observed())
            .map(|(k, _)| k)
            .collect();
        let mut history = Vec::with_capacity(candidates.len());
        let mut best: Option<(u32, Vec<f64>, f64)> = None;
        let mut underived: Option<&str> = None;
        for tau in candidates {
            let samples: Vec<Vec<f64>> = states
                .windows(2)
                .map(|pair| {
                    let change = &pair[1] - &pair[0];
                    model.rate_sample(pair[0].view(), change.view(), population, tau, &fixed)
                })
                .collect();
            let mut values = Vec::with_capacity(model.parameters().len());
            for (k, name) in model.parameters().iter().enumerate() {
                let column: Vec<f64> = samples.iter().map(|sample| sample[k]).collect();
                let Some(value) = StatsHelper::median(&column) else {
                    underived = Some(*name);
                    break;
                };
                let value = value.max(0.0);
                values.push(model.upper_bound(name).map_or(value, |upper| value.min(upper)));
            }
            if values.len() < model.parameters().len() {
                continue;
            }
            let simulated = model.advance_days(states[0].view(), &values, population, tau, states.len() - 1);
            let pairs: Vec<(f64, f64)> = simulated
                .iter()
                .zip(&states)
                .flat_map(|(sim, obs)| observed.iter().map(move |&k| (sim[k], obs[k])))
                .collect();
            let score = Metric::Rmsle.evaluate(&pairs)?;
            history.push(TauTrial { tau, score });
            if best.as_ref().map_or(true, |(_, _, current)| score < *current) {
                best = Some((tau, values, score));
            }
        }

        let (tau, values, score) = best.ok_or_else(|| match underived {
            Some(name) => fail(format!("{} could not be derived from the records; fix its value", name)),
            None => fail("parameter values could not be derived from the records".into()),
        })?;
        Ok(EstimationOutcome {
            tau,
            params: ParamSet::from_values(model, &values),
            diagnostics: EstimationDiagnostics {
                metric: Metric::Rmsle,
                score,
                trials: history.len(),
                runtime_secs: started.elapsed().as_secs_f64(),
                history,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ode::{OdeModel, SewirF, SirF};
    use crate::records::frame::fixtures::outbreak;
    use crate::records::{Record, RecordFrame};
    use crate::prelude::date;
    use std::sync::Arc;

    fn job(records: RecordFrame, tau: Option<u32>, fixed: ParamSet) -> EstimationJob {
        EstimationJob {
            phase: "1st".into(),
            model: Arc::new(SirF),
            records,
            population: 1_000_000,
            tau,
            fixed,
        }
    }

    /// Records produced by the model itself, so the fit should be close.
    fn model_records(values: &[f64], tau: u32, days: usize) -> RecordFrame {
        let population = 1_000_000.0;
        let start = ndarray::array![population - 1000.0, 900.0, 80.0, 20.0];
        let states = SirF.advance_days(start.view(), values, population, tau, days - 1);
        let first = date("2020-03-01");
        let records = states
            .iter()
            .enumerate()
            .map(|(i, s)| {
                Record::new(
                    first + chrono::Duration::days(i as i64),
                    population - s[0],
                    s[1],
                    s[3],
                    s[2],
                    population as u64,
                )
            })
            .collect();
        RecordFrame::new(records).unwrap()
    }

    #[test]
    fn recovers_parameters_of_model_generated_records() {
        let truth = [0.0, 0.005, 0.2, 0.075];
        let records = model_records(&truth, 1440, 30);
        let outcome = DifferenceEstimator::default()
            .estimate(&job(records, Some(1440), ParamSet::new()))
            .unwrap();
        assert_eq!(outcome.tau, 1440);
        let rho = outcome.params.get("rho").unwrap();
        assert!((rho - 0.2).abs() < 0.05, "rho {}", rho);
        assert!(outcome.diagnostics.score < 0.5);
        assert_eq!(outcome.diagnostics.trials, 1);
    }

    #[test]
    fn chooses_tau_among_candidates() {
        let records = outbreak("2020-01-01", 20, 1_000_000);
        let outcome = DifferenceEstimator::default()
            .estimate(&job(records, None, ParamSet::new()))
            .unwrap();
        assert!([360, 480, 720, 1440].contains(&outcome.tau));
        assert_eq!(outcome.diagnostics.history.len(), 4);
    }

    #[test]
    fn fixed_values_are_kept() {
        let records = outbreak("2020-01-01", 20, 1_000_000);
        let fixed = ParamSet::new().with("rho", 0.01).with("theta", 0.1);
        let outcome = DifferenceEstimator::default()
            .estimate(&job(records, Some(720), fixed))
            .unwrap();
        assert_eq!(outcome.params.get("rho"), Some(0.01));
        assert_eq!(outcome.params.get("theta"), Some(0.1));
    }

    #[test]
    fn unrecorded_rates_must_be_fixed() {
        let records = outbreak("2020-01-01", 20, 1_000_000);
        let mut free = job(records, Some(1440), ParamSet::new());
        free.model = Arc::new(SewirF);
        let err = DifferenceEstimator::default().estimate(&free).unwrap_err();
        assert!(matches!(err, AnalysisError::Estimation { ref reason, .. } if reason.contains("rho2")));

        let fixed = EstimationJob {
            fixed: ParamSet::new().with("rho2", 0.3).with("rho3", 0.3),
            ..free
        };
        let outcome = DifferenceEstimator::default().estimate(&fixed).unwrap();
        assert_eq!(outcome.params.get("rho2"), Some(0.3));
        assert!(outcome.params.is_complete_for(&SewirF));
        assert!(outcome.diagnostics.score.is_finite());
    }

    #[test]
    fn too_few_records_fail_for_the_phase() {
        let records = outbreak("2020-01-01", 2, 1_000_000);
        let err = DifferenceEstimator::default()
            .estimate(&job(records, None, ParamSet::new()))
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Estimation { ref phase, .. } if phase == "1st"));
    }

    #[test]
    fn rejects_invalid_candidates() {
        let config = DifferenceEstimatorConfig {
            tau_candidates: vec![1000],
            ..Default::default()
        };
        assert!(DifferenceEstimator::new(config).is_err());
    }
}
