use crate::estimation::{EstimationJob, EstimationOutcome, Estimator, WorkerPool};
use crate::math::Metric;
use crate::ode::{OdeModel, ParamSet};
use crate::phase::{ordinal, PhaseSeries, PhaseSetting, PhaseSummary, PhaseUnit};
use crate::prelude::{
    ensure_population, ensure_tau, tomorrow, AnalysisError, AnalysisResult,
};
use crate::records::{RecordFrame, Variable};
use crate::telemetry::{BatchRecorder, BatchStats};
use crate::tracker::trajectory::{Snapshot, Trajectory};
use crate::trend::{ChangeFinder, TrendOptions};
use chrono::{Duration, NaiveDate};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Options of one `estimate` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimateOptions {
    /// Phases to fit; all enabled unestimated phases when `None`.
    pub phases: Option<Vec<String>>,
    /// Worker count, -1 for every available core.
    pub n_jobs: i32,
    /// Values held constant in every fit.
    pub fixed: ParamSet,
}

impl Default for EstimateOptions {
    fn default() -> Self {
        Self {
            phases: None,
            n_jobs: -1,
            fixed: ParamSet::new(),
        }
    }
}

/// Result of one `estimate` call.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimationReport {
    /// Tau of the tracker after the call.
    pub tau: Option<u32>,
    /// Names of the phases that were fitted.
    pub estimated: Vec<String>,
    /// One `Estimation` error per phase whose fit failed.
    pub failures: Vec<AnalysisError>,
    pub stats: BatchStats,
}

/// Phase series bound to observed records, an area and a shared tau.
#[derive(Debug, Clone)]
pub struct ParamTracker {
    records: Arc<RecordFrame>,
    area: String,
    tau: Option<u32>,
    series: PhaseSeries,
}

impl ParamTracker {
    pub fn new(
        records: Arc<RecordFrame>,
        area: impl Into<String>,
        population: u64,
        tau: Option<u32>,
        first_date: NaiveDate,
        last_date: NaiveDate,
    ) -> AnalysisResult<Self> {
        ensure_population(population)?;
        let tau = tau.map(ensure_tau).transpose()?;
        for date in [first_date, last_date] {
            if !records.contains(date) {
                return Err(AnalysisError::Range(format!(
                    "{} is outside of the records ({} - {})",
                    date,
                    records.first_date(),
                    records.last_date()
                )));
            }
        }
        Ok(Self {
            records,
            area: area.into(),
            tau,
            series: PhaseSeries::new(first_date, last_date, population)?,
        })
    }

    pub fn records(&self) -> &Arc<RecordFrame> {
        &self.records
    }

    pub fn area(&self) -> &str {
        &self.area
    }

    pub fn tau(&self) -> Option<u32> {
        self.tau
    }

    pub fn series(&self) -> &PhaseSeries {
        &self.series
    }

    pub fn first_date(&self) -> NaiveDate {
        self.series.first_date()
    }

    pub fn last_date(&self) -> NaiveDate {
        self.series.last_date()
    }

    pub fn population(&self) -> u64 {
        self.series.init_population()
    }

    pub fn add(&mut self, end_date: Option<NaiveDate>, days: Option<u32>, setting: &PhaseSetting) -> AnalysisResult<()> {
        self.series.add(end_date, days, setting)?;
        self.sync_tau();
        Ok(())
    }

    pub fn delete(&mut self, phases: &[&str]) -> AnalysisResult<()> {
        self.series.delete(phases)
    }

    pub fn disable(&mut self, phases: &[&str]) -> AnalysisResult<()> {
        self.series.disable(phases)
    }

    pub fn enable(&mut self, phases: &[&str]) -> AnalysisResult<()> {
        self.series.enable(phases)
    }

    pub fn combine(&mut self, phases: &[&str], setting: &PhaseSetting) -> AnalysisResult<()> {
        self.series.combine(phases, setting)?;
        self.sync_tau();
        Ok(())
    }

    pub fn separate(&mut self, date: NaiveDate, setting: &PhaseSetting) -> AnalysisResult<()> {
        self.series.separate(date, setting)?;
        self.sync_tau();
        Ok(())
    }

    pub fn clear(&mut self, include_past: bool) {
        self.series.clear(include_past);
    }

    /// Resets to one unestimated phase over the whole date range.
    pub fn delete_all(&mut self) -> AnalysisResult<()> {
        self.series.reset()?;
        self.sync_tau();
        Ok(())
    }

    pub fn find_phase(&self, date: NaiveDate) -> AnalysisResult<(String, &PhaseUnit)> {
        self.series.find(date)
    }

    pub fn change_dates(&self) -> Vec<NaiveDate> {
        self.series.change_dates()
    }

    pub fn future_phases(&self) -> (Vec<String>, Vec<String>) {
        self.series.future_phases()
    }

    pub fn summary(&self) -> Vec<PhaseSummary> {
        self.series.summary()
    }

    /// Assigns a model and parameter values to one phase by hand.
    pub fn set_ode(&mut self, phase: &str, model: Arc<dyn OdeModel>, params: ParamSet) -> AnalysisResult<()> {
        let index = self.series.index_of(phase)?;
        self.series.units_mut()[index].set_ode(Some(model), params)
    }

    /// Rebuilds phases from change points detected in the records.
    ///
    /// With `force`, every phase is replaced. Otherwise phases up to the last
    /// estimated one are kept and only the dates after them are segmented.
    pub fn trend(&mut self, finder: &dyn ChangeFinder, force: bool, options: &TrendOptions) -> AnalysisResult<()> {
        if let Some(n_points) = options.n_points {
            return Err(AnalysisError::ArgumentConflict(format!(
                "the number of change points is derived from the records, but {} was requested",
                n_points
            )));
        }
        let mut units: Vec<PhaseUnit> = if force {
            Vec::new()
        } else {
            let keep = self
                .series
                .units()
                .iter()
                .rposition(PhaseUnit::is_estimated)
                .map_or(0, |i| i + 1);
            self.series.units()[..keep].to_vec()
        };
        let start = match units.last() {
            Some(unit) => tomorrow(unit.end_date())?,
            None => self.first_date(),
        };
        if start > self.last_date() {
            debug!("{}: every date has been estimated, trend analysis skipped", self.area);
            return Ok(());
        }
        let population = units.last().map_or(self.population(), PhaseUnit::population);
        let data = self.records.slice(start, self.last_date())?;
        let mut points: Vec<NaiveDate> = finder
            .find(&data, population, options)?
            .into_iter()
            .filter(|date| *date > start && *date <= self.last_date())
            .collect();
        points.sort_unstable();
        points.dedup();

        let mut begin = start;
        for end in points.iter().map(|p| *p - Duration::days(1)).chain([self.last_date()]) {
            let unit = PhaseUnit::inherit(begin, end, units.last(), &PhaseSetting::new(), self.population())?;
            units.push(unit);
            begin = tomorrow(end)?;
        }
        self.series.replace_all(units)?;
        self.sync_tau();
        info!(
            "{}: trend analysis registered {} phases ({} change points)",
            self.area,
            self.series.len(),
            points.len()
        );
        Ok(())
    }

    /// Fits `model` to the selected phases.
    ///
    /// When the tracker has no tau yet, the last selected phase is fitted first
    /// to choose it (moving backwards while fits fail); the remaining phases are
    /// then fitted in parallel with that tau. Failures are reported per phase
    /// and do not affect the other phases.
    pub fn estimate(
        &mut self,
        estimator: Arc<dyn Estimator>,
        model: Arc<dyn OdeModel>,
        options: &EstimateOptions,
    ) -> AnalysisResult<EstimationReport> {
        let pool = WorkerPool::new(options.n_jobs)?;
        options.fixed.validate_for(model.as_ref())?;
        let mut pending = self.selected_for_estimation(options.phases.as_deref())?;
        if pending.is_empty() {
            return Err(AnalysisError::Precondition(
                "no enabled phases need estimation; register phases or select them explicitly".into(),
            ));
        }
        info!(
            "{}: estimating {} phases with {} model ({} workers)",
            self.area,
            pending.len(),
            model.name(),
            pool.workers()
        );
        let recorder = BatchRecorder::new();
        let mut estimated = Vec::new();
        let mut failures = Vec::new();

        while self.tau.is_none() {
            let Some(index) = pending.pop() else {
                break;
            };
            let job = self.job(index, &model, None, &options.fixed)?;
            let (phase, result) = pool
                .run(Arc::clone(&estimator), vec![job])?
                .pop()
                .unwrap_or_else(|| (ordinal(index), Err(missing_result(index))));
            match result {
                Ok(outcome) => {
                    info!("{}: tau was set to {} min with {} phase", self.area, outcome.tau, phase);
                    self.tau = Some(ensure_tau(outcome.tau).map_err(|e| phase_failure(&phase, e))?);
                    self.sync_tau();
                    self.series.units_mut()[index].record_estimation(Arc::clone(&model), outcome);
                    recorder.record_fitted();
                    estimated.push(phase);
                }
                Err(err) => {
                    let err = phase_failure(&phase, err);
                    warn!("{}: {}", self.area, err);
                    recorder.record_failed();
                    failures.push(err);
                }
            }
        }

        if let Some(tau) = self.tau {
            let jobs = pending
                .iter()
                .map(|index| self.job(*index, &model, Some(tau), &options.fixed))
                .collect::<AnalysisResult<Vec<_>>>()?;
            let results = pool.run(Arc::clone(&estimator), jobs)?;
            for (index, (phase, result)) in pending.iter().zip(results) {
                match result.and_then(|outcome| check_tau(outcome, tau)) {
                    Ok(outcome) => {
                        self.series.units_mut()[*index].record_estimation(Arc::clone(&model), outcome);
                        recorder.record_fitted();
                        estimated.push(phase);
                    }
                    Err(err) => {
                        let err = phase_failure(&phase, err);
                        warn!("{}: {}", self.area, err);
                        recorder.record_failed();
                        failures.push(err);
                    }
                }
            }
        }

        let stats = recorder.snapshot();
        info!(
            "{}: estimation finished ({} fitted, {} failed, {:.2} sec)",
            self.area, stats.fitted, stats.failed, stats.elapsed_secs
        );
        Ok(EstimationReport {
            tau: self.tau,
            estimated,
            failures,
            stats,
        })
    }

    /// Simulates every enabled phase in order, each starting from the end of the previous one.
    ///
    /// The first phase starts from the records on its start date, with `y0`
    /// replacing individual values.
    pub fn simulate(&self, y0: Option<&BTreeMap<Variable, f64>>) -> AnalysisResult<Trajectory> {
        let phases: Vec<(String, &PhaseUnit)> = self.series.enabled().collect();
        let Some((_, head)) = phases.first() else {
            return Err(AnalysisError::Precondition(
                "no enabled phases have been registered".into(),
            ));
        };
        let tau = self.tau.ok_or_else(|| {
            AnalysisError::Precondition("tau has not been set; estimate the phases first".into())
        })?;
        let initial = self.records.last_known(head.start_date())?;
        let mut carry: BTreeMap<Variable, f64> = Variable::ALL
            .into_iter()
            .map(|v| (v, initial.value(v)))
            .collect();
        carry.insert(Variable::Susceptible, head.population() as f64 - initial.confirmed);
        if let Some(y0) = y0 {
            carry.extend(y0.iter().map(|(k, v)| (*k, *v)));
        }

        let mut snapshots = Vec::new();
        let mut population = head.population();
        for (name, unit) in &phases {
            let model = unit.model().ok_or_else(|| {
                AnalysisError::Precondition(format!("ODE model of {} phase has not been set", name))
            })?;
            let values = unit.params().values_for(model.as_ref())?;
            if unit.population() != population {
                let shift = unit.population() as f64 - population as f64;
                if let Some(s) = carry.get_mut(&Variable::Susceptible) {
                    *s = (*s + shift).max(0.0);
                }
                population = unit.population();
            }
            let state: ndarray::Array1<f64> = model
                .variables()
                .iter()
                .map(|v| carry.get(v).copied().unwrap_or(0.0))
                .collect();
            let states = model.advance_days(state.view(), &values, population as f64, tau, unit.days());
            for (offset, state) in states.iter().take(unit.days()).enumerate() {
                snapshots.push(Snapshot {
                    date: unit.start_date() + Duration::days(offset as i64),
                    phase: name.clone(),
                    values: snapshot_values(model.variables(), state.as_slice().unwrap_or(&[])),
                });
            }
            if let Some(terminal) = states.last() {
                carry.extend(snapshot_values(model.variables(), terminal.as_slice().unwrap_or(&[])));
            }
        }
        Ok(Trajectory::new(snapshots))
    }

    /// Compares simulated and observed values.
    ///
    /// `phases` and `past_days` select the dates to compare and cannot be
    /// combined. Variables default to Infected, Fatal and Recovered where the
    /// models produce them.
    pub fn score(
        &self,
        metric: Metric,
        variables: Option<&[Variable]>,
        phases: Option<&[&str]>,
        past_days: Option<u32>,
    ) -> AnalysisResult<f64> {
        let (trajectory, dates) = match (phases, past_days) {
            (Some(_), Some(_)) => {
                return Err(AnalysisError::ArgumentConflict(
                    "phases and past_days cannot be applied at the same time".into(),
                ))
            }
            (None, Some(days)) => {
                if days == 0 {
                    return Err(AnalysisError::InvalidInput("past_days must be a natural number".into()));
                }
                let exceeded = || {
                    AnalysisError::Range(format!(
                        "{} days exceed the date range ({} - {})",
                        days,
                        self.first_date(),
                        self.last_date()
                    ))
                };
                let boundary = self
                    .last_date()
                    .checked_sub_signed(Duration::days(i64::from(days) - 1))
                    .ok_or_else(exceeded)?;
                if boundary < self.first_date() {
                    return Err(exceeded());
                }
                let mut tracker = self.clone();
                tracker.separate(boundary, &PhaseSetting::new())?;
                let trajectory = tracker.simulate(None)?;
                (trajectory, (boundary, self.last_date()))
            }
            (Some(names), None) => {
                let mut selected = Vec::with_capacity(names.len());
                for name in names {
                    let unit = self.series.unit(name)?;
                    if unit.is_enabled() {
                        selected.push((unit.start_date(), unit.end_date()));
                    }
                }
                if selected.is_empty() {
                    return Err(AnalysisError::NotFound("no enabled phases were selected to score".into()));
                }
                return self.score_ranges(metric, variables, &self.simulate(None)?, &selected);
            }
            (None, None) => (self.simulate(None)?, (self.first_date(), self.last_date())),
        };
        self.score_ranges(metric, variables, &trajectory, &[dates])
    }

    fn score_ranges(
        &self,
        metric: Metric,
        variables: Option<&[Variable]>,
        trajectory: &Trajectory,
        ranges: &[(NaiveDate, NaiveDate)],
    ) -> AnalysisResult<f64> {
        let simulated = trajectory.variables();
        let variables: Vec<Variable> = match variables {
            Some(requested) => {
                if let Some(missing) = requested.iter().find(|v| !simulated.contains(v)) {
                    return Err(AnalysisError::InvalidInput(format!(
                        "{} is not simulated by the registered models",
                        missing
                    )));
                }
                if let Some(hidden) = requested.iter().find(|v| !v.is_observed()) {
                    return Err(AnalysisError::InvalidInput(format!(
                        "{} is not recorded and cannot be scored",
                        hidden
                    )));
                }
                requested.to_vec()
            }
            None => Variable::SCORED
                .into_iter()
                .filter(|v| simulated.contains(v))
                .collect(),
        };
        let mut pairs = Vec::new();
        for snapshot in trajectory.snapshots() {
            if !ranges.iter().any(|(start, end)| *start <= snapshot.date && snapshot.date <= *end) {
                continue;
            }
            let Ok(record) = self.records.get(snapshot.date) else {
                continue;
            };
            for variable in &variables {
                if let Some(predicted) = snapshot.value(*variable) {
                    pairs.push((predicted, record.value(*variable)));
                }
            }
        }
        metric.evaluate(&pairs)
    }

    fn selected_for_estimation(&self, phases: Option<&[String]>) -> AnalysisResult<Vec<usize>> {
        let mut indices: Vec<usize> = match phases {
            Some(names) => names
                .iter()
                .map(|name| self.series.index_of(name))
                .collect::<AnalysisResult<Vec<_>>>()?
                .into_iter()
                .filter(|i| self.series.units()[*i].is_enabled())
                .collect(),
            None => self
                .series
                .units()
                .iter()
                .enumerate()
                .filter(|(_, unit)| unit.is_enabled() && !unit.is_estimated())
                .map(|(i, _)| i)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        Ok(indices)
    }

    fn job(
        &self,
        index: usize,
        model: &Arc<dyn OdeModel>,
        tau: Option<u32>,
        fixed: &ParamSet,
    ) -> AnalysisResult<EstimationJob> {
        let unit = &self.series.units()[index];
        Ok(EstimationJob {
            phase: ordinal(index),
            model: Arc::clone(model),
            records: self.records.slice(unit.start_date(), unit.end_date())?,
            population: unit.population(),
            tau,
            fixed: fixed.clone(),
        })
    }

    fn sync_tau(&mut self) {
        self.series.set_tau(self.tau);
    }
}

fn snapshot_values(variables: &[Variable], state: &[f64]) -> BTreeMap<Variable, f64> {
    let mut values: BTreeMap<Variable, f64> = variables.iter().copied().zip(state.iter().copied()).collect();
    if let (Some(f), Some(r)) = (values.get(&Variable::Fatal), values.get(&Variable::Recovered)) {
        let removed = f + r;
        values.insert(Variable::FatalOrRecovered, removed);
    }
    if let (Some(i), Some(removed)) = (
        values.get(&Variable::Infected),
        values.get(&Variable::FatalOrRecovered),
    ) {
        let confirmed = i + removed;
        values.insert(Variable::Confirmed, confirmed);
    }
    values
}

fn check_tau(outcome: EstimationOutcome, tau: u32) -> AnalysisResult<EstimationOutcome> {
    if outcome.tau != tau {
        return Err(AnalysisError::InvalidInput(format!(
            "estimator returned tau {} instead of the fixed tau {}",
            outcome.tau, tau
        )));
    }
    Ok(outcome)
}

fn missing_result(index: usize) -> AnalysisError {
    AnalysisError::Estimation {
        phase: ordinal(index),
        reason: "no result was returned".into(),
    }
}

fn phase_failure(phase: &str, err: AnalysisError) -> AnalysisError {
    match err {
        err @ AnalysisError::Estimation { .. } => err,
        other => AnalysisError::Estimation {
            phase: phase.to_string(),
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
pub(crate) mod stubs {
    use super::*;
    use crate::estimation::{EstimationDiagnostics, TauTrial};
    use std::sync::Mutex;

    /// Returns preset values; fails for the listed phases.
    pub struct ScriptedEstimator {
        pub tau: u32,
        pub failing: Vec<String>,
        pub seen_taus: Mutex<Vec<(String, Option<u32>)>>,
    }

    impl ScriptedEstimator {
        pub fn new(tau: u32, failing: &[&str]) -> Self {
            Self {
                tau,
                failing: failing.iter().map(|s| s.to_string()).collect(),
                seen_taus: Mutex::new(Vec::new()),
            }
        }
    }

    impl Estimator for ScriptedEstimator {
        fn estimate(&self, job: &EstimationJob) -> AnalysisResult<EstimationOutcome> {
            self.seen_taus.lock().unwrap().push((job.phase.clone(), job.tau));
            if self.failing.contains(&job.phase) {
                return Err(AnalysisError::Estimation {
                    phase: job.phase.clone(),
                    reason: "scripted failure".into(),
                });
            }
            let tau = job.tau.unwrap_or(self.tau);
            let values: Vec<f64> = job
                .model
                .parameters()
                .iter()
                .map(|name| match *name {
                    "theta" => 0.0,
                    "kappa" => 0.001,
                    "rho" => 0.05,
                    _ => 0.02,
                })
                .collect();
            let mut params = ParamSet::from_values(job.model.as_ref(), &values);
            for (name, value) in job.fixed.iter() {
                params.insert(name, value);
            }
            Ok(EstimationOutcome {
                tau,
                params,
                diagnostics: EstimationDiagnostics {
                    metric: Metric::Rmsle,
                    score: 0.1,
                    trials: 1,
                    runtime_secs: 0.0,
                    history: vec![TauTrial { tau, score: 0.1 }],
                },
            })
        }
    }
}
