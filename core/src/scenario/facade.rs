use crate::estimation::{DifferenceEstimator, Estimator};
use crate::math::Metric;
use crate::ode::{OdeModel, ParamSet};
use crate::phase::PhaseSetting;
use crate::prelude::{ensure_population, AnalysisError, AnalysisResult, MAIN};
use crate::records::{RecordFrame, Variable};
use crate::scenario::report::{to_table, RenderHints, ReportSink};
use crate::scenario::tables::{
    DescribeRow, HistoryRow, HistoryTable, HistoryTarget, SummaryRow, TrackRow,
};
use crate::tracker::{EstimateOptions, EstimationReport, ParamTracker, Trajectory};
use crate::trend::{ChangeFinder, SrChangeFinder, TrendOptions};
use chrono::NaiveDate;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Options of `retrospective`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrospectiveOptions {
    /// Parameter values of the target's new phase; the other values are estimated.
    pub overrides: ParamSet,
    pub n_jobs: Option<i32>,
    pub trend: TrendOptions,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetrospectiveReport {
    pub control: EstimationReport,
    pub target: EstimationReport,
}

/// Named scenario branches over one set of records.
///
/// "Main" always exists. Writing to an unknown name creates a branch by
/// copying a template tracker; afterwards the branches share nothing but the
/// read-only records.
pub struct Scenario {
    records: Arc<RecordFrame>,
    area: String,
    population: u64,
    tau: Option<u32>,
    first_date: NaiveDate,
    last_date: NaiveDate,
    trackers: BTreeMap<String, ParamTracker>,
    estimator: Arc<dyn Estimator>,
    change_finder: Arc<dyn ChangeFinder>,
}

impl Scenario {
    /// Population defaults to the last record's value.
    pub fn new(
        records: RecordFrame,
        area: impl Into<String>,
        population: Option<u64>,
        tau: Option<u32>,
    ) -> AnalysisResult<Self> {
        let records = Arc::new(records);
        let population = ensure_population(population.unwrap_or_else(|| records.population()))?;
        let (first_date, last_date) = (records.first_date(), records.last_date());
        let area = area.into();
        let main = ParamTracker::new(Arc::clone(&records), area.clone(), population, tau, first_date, last_date)?;
        Ok(Self {
            records,
            area,
            population,
            tau,
            first_date,
            last_date,
            trackers: BTreeMap::from([(MAIN.to_string(), main)]),
            estimator: Arc::new(DifferenceEstimator::default()),
            change_finder: Arc::new(SrChangeFinder),
        })
    }

    pub fn with_estimator(mut self, estimator: Arc<dyn Estimator>) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn with_change_finder(mut self, change_finder: Arc<dyn ChangeFinder>) -> Self {
        self.change_finder = change_finder;
        self
    }

    pub fn area(&self) -> &str {
        &self.area
    }

    pub fn population(&self) -> u64 {
        self.population
    }

    pub fn records(&self) -> &RecordFrame {
        &self.records
    }

    pub fn first_date(&self) -> NaiveDate {
        self.first_date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.last_date
    }

    /// Scenario names, "Main" first.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.trackers.keys().map(String::as_str).collect();
        names.sort_by_key(|name| (*name != MAIN, *name));
        names
    }

    pub fn tracker(&self, name: &str) -> AnalysisResult<&ParamTracker> {
        self.trackers
            .get(name)
            .ok_or_else(|| AnalysisError::NotFound(format!("{} scenario is not registered", name)))
    }

    /// Applies an edit to `name`, which is copied from `template` first when new.
    ///
    /// A new scenario is only registered when the edit succeeds.
    fn edit<R>(
        &mut self,
        name: &str,
        template: &str,
        edit: impl FnOnce(&mut ParamTracker) -> AnalysisResult<R>,
    ) -> AnalysisResult<R> {
        if let Some(tracker) = self.trackers.get_mut(name) {
            return edit(tracker);
        }
        let mut copy = self.tracker(template)?.clone();
        let out = edit(&mut copy)?;
        info!("{}: {} scenario was created from {}", self.area, name, template);
        self.trackers.insert(name.to_string(), copy);
        Ok(out)
    }

    pub fn set_first_date(&mut self, date: NaiveDate) -> AnalysisResult<&mut Self> {
        self.set_range(date, self.last_date)
    }

    pub fn set_last_date(&mut self, date: NaiveDate) -> AnalysisResult<&mut Self> {
        self.set_range(self.first_date, date)
    }

    /// Changes the date range, which resets every scenario to one unestimated phase.
    pub fn set_range(&mut self, first_date: NaiveDate, last_date: NaiveDate) -> AnalysisResult<&mut Self> {
        let mut rebuilt = BTreeMap::new();
        for (name, tracker) in &self.trackers {
            let mut fresh = ParamTracker::new(
                Arc::clone(&self.records),
                self.area.clone(),
                self.population,
                tracker.tau().or(self.tau),
                first_date,
                last_date,
            )?;
            fresh.delete_all()?;
            rebuilt.insert(name.clone(), fresh);
        }
        self.trackers = rebuilt;
        self.first_date = first_date;
        self.last_date = last_date;
        info!("{}: date range was changed to {} - {}", self.area, first_date, last_date);
        Ok(self)
    }

    pub fn add(
        &mut self,
        name: &str,
        end_date: Option<NaiveDate>,
        days: Option<u32>,
        setting: &PhaseSetting,
    ) -> AnalysisResult<&mut Self> {
        self.edit(name, MAIN, |t| t.add(end_date, days, setting))?;
        Ok(self)
    }

    /// Deletes phases, or the whole scenario when `phases` is `None`.
    ///
    /// Deleting phases of a new scenario copies "Main" first. "Main" cannot be
    /// removed; it is reset to one phase instead.
    pub fn delete(&mut self, name: &str, phases: Option<&[&str]>) -> AnalysisResult<&mut Self> {
        match phases {
            Some(phases) => {
                self.edit(name, MAIN, |t| t.delete(phases))?;
            }
            None if name == MAIN => {
                self.tracker_mut_existing(name)?.delete_all()?;
            }
            None => {
                self.trackers
                    .remove(name)
                    .ok_or_else(|| AnalysisError::NotFound(format!("{} scenario is not registered", name)))?;
                info!("{}: {} scenario was deleted", self.area, name);
            }
        }
        Ok(self)
    }

    pub fn disable(&mut self, name: &str, phases: &[&str]) -> AnalysisResult<&mut Self> {
        self.edit(name, MAIN, |t| t.disable(phases))?;
        Ok(self)
    }

    pub fn enable(&mut self, name: &str, phases: &[&str]) -> AnalysisResult<&mut Self> {
        self.edit(name, MAIN, |t| t.enable(phases))?;
        Ok(self)
    }

    pub fn combine(&mut self, name: &str, phases: &[&str], setting: &PhaseSetting) -> AnalysisResult<&mut Self> {
        self.edit(name, MAIN, |t| t.combine(phases, setting))?;
        Ok(self)
    }

    pub fn separate(&mut self, name: &str, date: NaiveDate, setting: &PhaseSetting) -> AnalysisResult<&mut Self> {
        self.edit(name, MAIN, |t| t.separate(date, setting))?;
        Ok(self)
    }

    /// Removes future phases (or every phase) of a scenario created from `template` if new.
    pub fn clear(&mut self, name: &str, include_past: bool, template: &str) -> AnalysisResult<&mut Self> {
        self.edit(name, template, |t| {
            t.clear(include_past);
            Ok(())
        })?;
        Ok(self)
    }

    pub fn trend(&mut self, name: &str, force: bool, options: &TrendOptions) -> AnalysisResult<&mut Self> {
        let finder = Arc::clone(&self.change_finder);
        self.edit(name, MAIN, |t| t.trend(finder.as_ref(), force, options))?;
        Ok(self)
    }

    pub fn estimate(
        &mut self,
        name: &str,
        model: Arc<dyn OdeModel>,
        options: &EstimateOptions,
    ) -> AnalysisResult<EstimationReport> {
        let estimator = Arc::clone(&self.estimator);
        self.edit(name, MAIN, |t| t.estimate(estimator, model, options))
    }

    pub fn simulate(&self, name: &str, y0: Option<&BTreeMap<Variable, f64>>) -> AnalysisResult<Trajectory> {
        self.tracker(name)?.simulate(y0)
    }

    pub fn score(
        &self,
        name: &str,
        metric: Metric,
        variables: Option<&[Variable]>,
        phases: Option<&[&str]>,
        past_days: Option<u32>,
    ) -> AnalysisResult<f64> {
        self.tracker(name)?.score(metric, variables, phases, past_days)
    }

    pub fn change_dates(&self, name: &str) -> AnalysisResult<Vec<NaiveDate>> {
        Ok(self.tracker(name)?.change_dates())
    }

    pub fn future_phases(&self, name: &str) -> AnalysisResult<(Vec<String>, Vec<String>)> {
        Ok(self.tracker(name)?.future_phases())
    }

    /// Phase summary of one scenario, or of every scenario when `name` is `None`.
    pub fn summary(&self, name: Option<&str>) -> AnalysisResult<Vec<SummaryRow>> {
        let names = match name {
            Some(name) => {
                self.tracker(name)?;
                vec![name]
            }
            None => self.names(),
        };
        let mut rows = Vec::new();
        for name in names {
            let tracker = self.tracker(name)?;
            rows.extend(tracker.summary().into_iter().map(|phase| SummaryRow {
                scenario: name.to_string(),
                phase,
            }));
        }
        Ok(rows)
    }

    /// Simulation of every scenario with the parameter values in effect on each date.
    pub fn track(&self) -> AnalysisResult<Vec<TrackRow>> {
        let mut rows = Vec::new();
        for name in self.names() {
            let tracker = self.tracker(name)?;
            let trajectory = tracker.simulate(None)?;
            for snapshot in trajectory.snapshots() {
                let unit = tracker.series().unit(&snapshot.phase)?;
                rows.push(TrackRow {
                    scenario: name.to_string(),
                    date: snapshot.date,
                    phase: snapshot.phase.clone(),
                    values: snapshot.values.clone(),
                    params: unit.params().clone(),
                    rt: unit.reproduction_number(),
                });
            }
        }
        Ok(rows)
    }

    /// One column per scenario for a variable, a parameter or Rt.
    ///
    /// With `with_actual`, variables get an "Actual" column from the records.
    pub fn history(&self, target: &HistoryTarget, with_actual: bool) -> AnalysisResult<HistoryTable> {
        let mut columns: BTreeMap<NaiveDate, BTreeMap<String, Option<f64>>> = BTreeMap::new();
        for row in self.track()? {
            let value = match target {
                HistoryTarget::Variable(variable) => row.values.get(variable).copied(),
                HistoryTarget::Parameter(name) => row.params.get(name),
                HistoryTarget::Rt => row.rt,
            };
            columns.entry(row.date).or_default().insert(row.scenario, value);
        }
        if let (HistoryTarget::Variable(variable), true) = (target, with_actual) {
            for (date, values) in columns.iter_mut() {
                let actual = self.records.get(*date).ok().map(|record| record.value(*variable));
                values.insert("Actual".to_string(), actual);
            }
        }
        Ok(HistoryTable {
            target: target.to_string(),
            rows: columns
                .into_iter()
                .map(|(date, values)| HistoryRow { date, values })
                .collect(),
        })
    }

    /// Peak of infected cases and last values of every scenario.
    pub fn describe(&self) -> AnalysisResult<Vec<DescribeRow>> {
        let mut rows = Vec::new();
        for name in self.names() {
            let tracker = self.tracker(name)?;
            let trajectory = tracker.simulate(None)?;
            let (max_infected_date, max_infected) = trajectory.peak(Variable::Infected).ok_or_else(|| {
                AnalysisError::Precondition(format!("infected cases of {} scenario were not simulated", name))
            })?;
            let last = trajectory
                .last()
                .ok_or_else(|| AnalysisError::Precondition(format!("{} scenario has no simulated dates", name)))?;
            let rt = tracker
                .series()
                .enabled()
                .last()
                .and_then(|(_, unit)| unit.reproduction_number());
            rows.push(DescribeRow {
                scenario: name.to_string(),
                max_infected,
                max_infected_date,
                last_date: last.date,
                confirmed: last.value(Variable::Confirmed),
                infected: last.value(Variable::Infected),
                fatal: last.value(Variable::Fatal),
                rt,
            });
        }
        Ok(rows)
    }

    /// Compares the actual history with a hypothetical one from `beginning_date`.
    ///
    /// `control` is rebuilt from trend analysis, separated on `beginning_date`
    /// and estimated. `target` becomes a copy of `control` whose phases from
    /// `beginning_date` are replaced by one phase with the overridden values;
    /// only the remaining parameters of that phase are estimated.
    pub fn retrospective(
        &mut self,
        beginning_date: NaiveDate,
        model: Arc<dyn OdeModel>,
        control: &str,
        target: &str,
        options: &RetrospectiveOptions,
    ) -> AnalysisResult<RetrospectiveReport> {
        if control == target {
            return Err(AnalysisError::ArgumentConflict(format!(
                "control and target must be different scenarios, but {} was applied to both",
                control
            )));
        }
        if beginning_date <= self.first_date || beginning_date > self.last_date {
            return Err(AnalysisError::Range(format!(
                "beginning date {} must be in ({}, {}]",
                beginning_date, self.first_date, self.last_date
            )));
        }
        options.overrides.validate_for(model.as_ref())?;
        let n_jobs = options.n_jobs.unwrap_or(-1);
        let estimator = Arc::clone(&self.estimator);
        let finder = Arc::clone(&self.change_finder);

        let mut control_tracker = self.tracker(MAIN)?.clone();
        if let Some(existing) = self.trackers.get(control) {
            control_tracker = existing.clone();
        }
        control_tracker.clear(true);
        control_tracker.trend(finder.as_ref(), true, &options.trend)?;
        control_tracker.separate(beginning_date, &PhaseSetting::new())?;
        let control_report = control_tracker.estimate(
            Arc::clone(&estimator),
            Arc::clone(&model),
            &EstimateOptions {
                n_jobs,
                ..EstimateOptions::default()
            },
        )?;

        let mut target_tracker = control_tracker.clone();
        let stripped: Vec<String> = target_tracker
            .series()
            .named()
            .filter(|(_, unit)| unit.start_date() >= beginning_date)
            .map(|(name, _)| name)
            .collect();
        let stripped: Vec<&str> = stripped.iter().map(String::as_str).collect();
        target_tracker.delete(&stripped)?;
        let setting = PhaseSetting::new().model(Arc::clone(&model)).params(options.overrides.clone());
        target_tracker.add(None, None, &setting)?;
        let new_phase = target_tracker
            .series()
            .named()
            .last()
            .map(|(name, _)| name)
            .ok_or_else(|| AnalysisError::Precondition("target scenario has no phases".into()))?;
        let target_report = target_tracker.estimate(
            estimator,
            model,
            &EstimateOptions {
                phases: Some(vec![new_phase]),
                n_jobs,
                fixed: options.overrides.clone(),
            },
        )?;

        self.trackers.insert(control.to_string(), control_tracker);
        self.trackers.insert(target.to_string(), target_tracker);
        info!(
            "{}: retrospective analysis from {} stored in {} and {} scenarios",
            self.area, beginning_date, control, target
        );
        Ok(RetrospectiveReport {
            control: control_report,
            target: target_report,
        })
    }

    /// Hands a table to a report sink.
    pub fn publish<T: Serialize + ?Sized>(
        &self,
        sink: &dyn ReportSink,
        hints: &RenderHints,
        table: &T,
    ) -> AnalysisResult<()> {
        sink.render(hints, &to_table(table)?)
    }

    fn tracker_mut_existing(&mut self, name: &str) -> AnalysisResult<&mut ParamTracker> {
        self.trackers
            .get_mut(name)
            .ok_or_else(|| AnalysisError::NotFound(format!("{} scenario is not registered", name)))
    }
}

impl std::fmt::Debug for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario")
            .field("area", &self.area)
            .field("population", &self.population)
            .field("first_date", &self.first_date)
            .field("last_date", &self.last_date)
            .field("names", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ode::SirF;
    use crate::phase::PhaseUnit;
    use crate::prelude::date;
    use crate::records::frame::fixtures::outbreak;
    use crate::tracker::param_tracker::stubs::ScriptedEstimator;
    use std::sync::Mutex;

    fn scenario() -> Scenario {
        Scenario::new(outbreak("2020-01-01", 121, 1_000_000), "Japan", None, None)
            .unwrap()
            .with_estimator(Arc::new(ScriptedEstimator::new(1440, &[])))
    }

    fn with_three_phases() -> Scenario {
        let mut scenario = scenario();
        scenario
            .add(MAIN, Some(date("2020-02-15")), None, &PhaseSetting::new())
            .unwrap()
            .add(MAIN, Some(date("2020-03-10")), None, &PhaseSetting::new())
            .unwrap()
            .add(MAIN, None, None, &PhaseSetting::new())
            .unwrap();
        scenario
    }

    fn sirf() -> Arc<dyn OdeModel> {
        Arc::new(SirF)
    }

    #[test]
    fn three_adds_cover_the_window() {
        let scenario = with_three_phases();
        let units = scenario.tracker(MAIN).unwrap().series().units();
        assert_eq!(units.len(), 3);
        assert_eq!(units[0].start_date(), date("2020-01-01"));
        assert_eq!(units[1].start_date(), date("2020-02-16"));
        assert_eq!(units[2].start_date(), date("2020-03-11"));
        assert_eq!(units[2].end_date(), date("2020-04-30"));
    }

    #[test]
    fn branches_are_isolated() {
        let mut scenario = with_three_phases();
        scenario.estimate(MAIN, sirf(), &EstimateOptions::default()).unwrap();
        scenario
            .separate("Lockdown", date("2020-02-20"), &PhaseSetting::new())
            .unwrap()
            .combine("Lockdown", &["2nd", "3rd"], &PhaseSetting::new().param("rho", 0.01))
            .unwrap();
        let main = scenario.tracker(MAIN).unwrap().series();
        assert_eq!(main.len(), 3);
        assert!(main.units().iter().all(PhaseUnit::is_estimated));
        let branch = scenario.tracker("Lockdown").unwrap().series();
        assert_eq!(branch.len(), 3);
        assert_eq!(branch.units()[2].params().get("rho"), Some(0.01));
        assert!(!branch.units()[2].is_estimated());
        assert_eq!(main.units()[1].params().get("rho"), Some(0.05));

        scenario.delete(MAIN, Some(&["1st"][..])).unwrap();
        assert_eq!(scenario.tracker("Lockdown").unwrap().series().len(), 3);
    }

    #[test]
    fn reading_unknown_scenarios_fails() {
        let scenario = with_three_phases();
        assert!(matches!(scenario.simulate("Other", None), Err(AnalysisError::NotFound(_))));
        assert!(matches!(scenario.summary(Some("Other")), Err(AnalysisError::NotFound(_))));
        assert!(matches!(
            scenario.score("Other", Metric::Rmsle, None, None, None),
            Err(AnalysisError::NotFound(_))
        ));
        assert_eq!(scenario.names(), [MAIN]);
    }

    #[test]
    fn clear_creates_branch_from_template() {
        let mut scenario = with_three_phases();
        let options = EstimateOptions {
            phases: Some(vec!["0th".into()]),
            ..Default::default()
        };
        scenario.estimate(MAIN, sirf(), &options).unwrap();
        scenario.clear("Forecast", false, MAIN).unwrap();
        assert_eq!(scenario.tracker("Forecast").unwrap().series().len(), 1);
        assert_eq!(scenario.tracker(MAIN).unwrap().series().len(), 3);
        assert!(matches!(scenario.clear("X", true, "Missing"), Err(AnalysisError::NotFound(_))));
    }

    #[test]
    fn deleting_scenarios() {
        let mut scenario = with_three_phases();
        scenario.disable("Branch", &["1st"]).unwrap();
        assert_eq!(scenario.names(), [MAIN, "Branch"]);
        scenario.delete("Branch", None).unwrap();
        assert_eq!(scenario.names(), [MAIN]);
        assert!(matches!(scenario.delete("Branch", None), Err(AnalysisError::NotFound(_))));

        scenario.delete("Short", Some(&["2nd"][..])).unwrap();
        assert_eq!(scenario.names(), [MAIN, "Short"]);
        assert_eq!(scenario.tracker("Short").unwrap().series().len(), 2);
        assert_eq!(scenario.tracker(MAIN).unwrap().series().len(), 3);
        assert!(scenario.delete("Other", Some(&["9th"][..])).is_err());
        assert_eq!(scenario.names(), [MAIN, "Short"]);

        scenario.delete(MAIN, None).unwrap();
        let main = scenario.tracker(MAIN).unwrap().series();
        assert_eq!(main.len(), 1);
        assert_eq!(main.units()[0].end_date(), date("2020-04-30"));
    }

    #[test]
    fn changing_the_range_resets_every_branch() {
        let mut scenario = with_three_phases();
        scenario.estimate(MAIN, sirf(), &EstimateOptions::default()).unwrap();
        scenario.enable("Copy", &["0th"]).unwrap();
        scenario.set_last_date(date("2020-03-31")).unwrap();
        for name in [MAIN, "Copy"] {
            let tracker = scenario.tracker(name).unwrap();
            assert_eq!(tracker.series().len(), 1);
            assert_eq!(tracker.last_date(), date("2020-03-31"));
            assert!(!tracker.series().units()[0].is_estimated());
            assert_eq!(tracker.tau(), Some(1440));
        }
        assert!(matches!(scenario.set_first_date(date("2019-12-01")), Err(AnalysisError::Range(_))));
        assert_eq!(scenario.first_date(), date("2020-01-01"));
    }

    #[test]
    fn aggregation_covers_every_scenario() {
        let mut scenario = with_three_phases();
        scenario.estimate(MAIN, sirf(), &EstimateOptions::default()).unwrap();
        scenario
            .separate("Slow", date("2020-04-01"), &PhaseSetting::new().param("rho", 0.01))
            .unwrap();

        let summary = scenario.summary(None).unwrap();
        assert_eq!(summary.iter().filter(|row| row.scenario == MAIN).count(), 3);
        assert_eq!(summary.iter().filter(|row| row.scenario == "Slow").count(), 4);

        let track = scenario.track().unwrap();
        assert_eq!(track.len(), 2 * 121);

        let history = scenario.history(&HistoryTarget::Variable(Variable::Infected), true).unwrap();
        assert_eq!(history.rows.len(), 121);
        assert!(history.column("Actual").iter().all(Option::is_some));
        assert!(history.column("Slow").iter().all(Option::is_some));

        let rho = scenario.history(&"rho".parse().unwrap(), true).unwrap();
        assert_eq!(rho.column("Slow").last().copied().flatten(), Some(0.01));
        assert!(rho.column("Actual").iter().all(Option::is_none));

        let described = scenario.describe().unwrap();
        assert_eq!(described.len(), 2);
        assert_eq!(described[0].scenario, MAIN);
        assert!(described[1].infected.unwrap() < described[0].infected.unwrap());
    }

    #[test]
    fn retrospective_builds_control_and_target() {
        let mut scenario = scenario();
        let options = RetrospectiveOptions {
            overrides: ParamSet::new().with("rho", 0.01),
            ..Default::default()
        };
        let report = scenario
            .retrospective(date("2020-03-15"), sirf(), "Control", "Target", &options)
            .unwrap();
        assert!(report.control.failures.is_empty());
        assert_eq!(report.target.estimated.len(), 1);

        let control = scenario.tracker("Control").unwrap();
        assert!(control.change_dates().contains(&date("2020-03-15")));
        let target = scenario.tracker("Target").unwrap();
        let last = target.series().unit("last").unwrap();
        assert_eq!(last.start_date(), date("2020-03-15"));
        assert_eq!(last.end_date(), date("2020-04-30"));
        assert_eq!(last.params().get("rho"), Some(0.01));
        assert!(last.is_estimated());
        assert!(scenario.tracker(MAIN).unwrap().series().is_empty());
    }

    #[test]
    fn retrospective_rejects_bad_arguments() {
        let mut scenario = scenario();
        let options = RetrospectiveOptions::default();
        assert!(matches!(
            scenario.retrospective(date("2020-03-15"), sirf(), "A", "A", &options),
            Err(AnalysisError::ArgumentConflict(_))
        ));
        assert!(matches!(
            scenario.retrospective(date("2020-01-01"), sirf(), "A", "B", &options),
            Err(AnalysisError::Range(_))
        ));
    }

    struct Collecting(Mutex<Vec<(String, serde_json::Value)>>);

    impl ReportSink for Collecting {
        fn render(&self, hints: &RenderHints, table: &serde_json::Value) -> AnalysisResult<()> {
            self.0.lock().unwrap().push((hints.title.clone(), table.clone()));
            Ok(())
        }
    }

    #[test]
    fn publish_forwards_tables() {
        let mut scenario = with_three_phases();
        scenario.estimate(MAIN, sirf(), &EstimateOptions::default()).unwrap();
        let sink = Collecting(Mutex::new(Vec::new()));
        let summary = scenario.summary(None).unwrap();
        scenario.publish(&sink, &RenderHints::titled("summary"), &summary).unwrap();
        let published = sink.0.lock().unwrap();
        assert_eq!(published[0].0, "summary");
        assert_eq!(published[0].1.as_array().unwrap().len(), 3);
    }
}
