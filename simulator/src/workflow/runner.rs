use crate::workflow::config::{ScenarioPlan, Step, WorkflowConfig};
use anyhow::Context;
use chrono::NaiveDate;
use log::{info, warn};
use phasecore::ode::{model_by_name, OdeModel, ParamSet};
use phasecore::phase::PhaseSetting;
use phasecore::records::RecordFrame;
use phasecore::scenario::{
    DescribeRow, RenderHints, ReportSink, RetrospectiveOptions, SummaryRow, TrackRow,
};
use phasecore::tracker::EstimateOptions;
use phasecore::{Scenario, MAIN};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Outcome of one estimate call of a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimationNote {
    pub scenario: String,
    pub tau: Option<u32>,
    pub estimated: Vec<String>,
    pub failures: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowResult {
    pub area: String,
    pub scenarios: Vec<String>,
    pub change_dates: BTreeMap<String, Vec<NaiveDate>>,
    pub summary: Vec<SummaryRow>,
    pub describe: Vec<DescribeRow>,
    pub track: Vec<TrackRow>,
    pub estimations: Vec<EstimationNote>,
    /// Reasons why tables could not be produced.
    pub notes: Vec<String>,
}

impl WorkflowResult {
    pub fn failure_count(&self) -> usize {
        self.estimations.iter().map(|note| note.failures.len()).sum()
    }
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Applies every scenario plan to the records and collects the report tables.
    ///
    /// Tables are also handed to `sink` when one is given.
    pub fn execute(&self, records: RecordFrame, sink: Option<&dyn ReportSink>) -> anyhow::Result<WorkflowResult> {
        let config = &self.config;
        let mut scenario = Scenario::new(records, config.area.clone(), config.population, config.tau)
            .context("creating scenario")?;
        if config.first_date.is_some() || config.last_date.is_some() {
            let first = config.first_date.unwrap_or(scenario.first_date());
            let last = config.last_date.unwrap_or(scenario.last_date());
            scenario.set_range(first, last).context("applying date range")?;
        }
        let default_model = model_by_name(&config.model).context("resolving default model")?;

        let mut estimations = Vec::new();
        for plan in &config.scenarios {
            for (index, step) in plan.steps.iter().enumerate() {
                self.apply(&mut scenario, plan, step, &default_model, &mut estimations)
                    .with_context(|| format!("{} step #{} of {} scenario", step.kind(), index, plan.name))?;
            }
        }

        let scenarios: Vec<String> = scenario.names().into_iter().map(str::to_string).collect();
        let mut change_dates = BTreeMap::new();
        for name in &scenarios {
            change_dates.insert(name.clone(), scenario.change_dates(name)?);
        }
        let summary = scenario.summary(None).context("summarizing scenarios")?;
        let mut notes = Vec::new();
        let describe = scenario.describe().unwrap_or_else(|err| {
            warn!("describe table skipped: {}", err);
            notes.push(format!("describe: {}", err));
            Vec::new()
        });
        let track = scenario.track().unwrap_or_else(|err| {
            warn!("track table skipped: {}", err);
            notes.push(format!("track: {}", err));
            Vec::new()
        });

        if let Some(sink) = sink {
            let main_dates = change_dates.get(MAIN).cloned().unwrap_or_default();
            let hints = |title: &str| RenderHints {
                title: format!("{}: {}", config.area, title),
                change_dates: main_dates.clone(),
                filename: Some(format!("{}.json", title).into()),
                ..RenderHints::default()
            };
            scenario.publish(sink, &hints("summary"), &summary).context("publishing summary")?;
            scenario.publish(sink, &hints("describe"), &describe).context("publishing describe")?;
            scenario.publish(sink, &hints("track"), &track).context("publishing track")?;
        }

        info!(
            "{}: workflow finished with {} scenarios and {} summary rows",
            config.area,
            scenarios.len(),
            summary.len()
        );
        Ok(WorkflowResult {
            area: config.area.clone(),
            scenarios,
            change_dates,
            summary,
            describe,
            track,
            estimations,
            notes,
        })
    }

    fn apply(
        &self,
        scenario: &mut Scenario,
        plan: &ScenarioPlan,
        step: &Step,
        default_model: &Arc<dyn OdeModel>,
        estimations: &mut Vec<EstimationNote>,
    ) -> anyhow::Result<()> {
        let name = plan.name.as_str();
        match step {
            Step::Trend { force, options } => {
                scenario.trend(name, *force, options)?;
            }
            Step::Add {
                end_date,
                days,
                population,
                model,
                params,
            } => {
                let setting = phase_setting(*population, model.as_deref(), params)?;
                scenario.add(name, *end_date, *days, &setting)?;
            }
            Step::Separate {
                date,
                population,
                model,
                params,
            } => {
                let setting = phase_setting(*population, model.as_deref(), params)?;
                scenario.separate(name, *date, &setting)?;
            }
            Step::Combine {
                phases,
                population,
                model,
                params,
            } => {
                let setting = phase_setting(*population, model.as_deref(), params)?;
                scenario.combine(name, &as_strs(phases), &setting)?;
            }
            Step::Delete { phases } => {
                let phases = phases.as_ref().map(as_strs);
                scenario.delete(name, phases.as_deref())?;
            }
            Step::Disable { phases } => {
                scenario.disable(name, &as_strs(phases))?;
            }
            Step::Enable { phases } => {
                scenario.enable(name, &as_strs(phases))?;
            }
            Step::Clear { include_past, template } => {
                scenario.clear(name, *include_past, template.as_deref().unwrap_or(MAIN))?;
            }
            Step::Estimate { model, phases, fixed } => {
                let model = resolve_model(model.as_deref(), default_model)?;
                let options = EstimateOptions {
                    phases: phases.clone(),
                    n_jobs: self.config.n_jobs,
                    fixed: fixed.clone(),
                };
                let report = scenario.estimate(name, model, &options)?;
                estimations.push(EstimationNote {
                    scenario: name.to_string(),
                    tau: report.tau,
                    estimated: report.estimated,
                    failures: report.failures.iter().map(ToString::to_string).collect(),
                });
            }
            Step::Retrospective {
                beginning_date,
                control,
                model,
                overrides,
            } => {
                let model = resolve_model(model.as_deref(), default_model)?;
                let options = RetrospectiveOptions {
                    overrides: overrides.clone(),
                    n_jobs: Some(self.config.n_jobs),
                    ..RetrospectiveOptions::default()
                };
                let report = scenario.retrospective(*beginning_date, model, control, name, &options)?;
                for (scenario_name, report) in [(control.as_str(), report.control), (name, report.target)] {
                    estimations.push(EstimationNote {
                        scenario: scenario_name.to_string(),
                        tau: report.tau,
                        estimated: report.estimated,
                        failures: report.failures.iter().map(ToString::to_string).collect(),
                    });
                }
            }
        }
        Ok(())
    }
}

fn as_strs(names: &Vec<String>) -> Vec<&str> {
    names.iter().map(String::as_str).collect()
}

fn resolve_model(name: Option<&str>, default_model: &Arc<dyn OdeModel>) -> anyhow::Result<Arc<dyn OdeModel>> {
    match name {
        Some(name) => Ok(model_by_name(name)?),
        None => Ok(Arc::clone(default_model)),
    }
}

fn phase_setting(population: Option<u64>, model: Option<&str>, params: &ParamSet) -> anyhow::Result<PhaseSetting> {
    let mut setting = PhaseSetting::new().params(params.clone());
    if let Some(population) = population {
        setting = setting.population(population);
    }
    if let Some(model) = model {
        setting = setting.model(model_by_name(model)?);
    }
    Ok(setting)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::profile::build_records;
    use crate::workflow::config::ScenarioPlan;
    use phasecore::AnalysisResult;
    use std::sync::Mutex;

    struct Titles(Mutex<Vec<String>>);

    impl ReportSink for Titles {
        fn render(&self, hints: &RenderHints, _table: &serde_json::Value) -> AnalysisResult<()> {
            self.0.lock().unwrap().push(hints.title.clone());
            Ok(())
        }
    }

    fn date(text: &str) -> NaiveDate {
        NaiveDate::parse_from_str(text, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn runner_executes_default_workflow() {
        let cfg = WorkflowConfig::from_args(Some(2));
        let records = build_records(&cfg.generator).unwrap();
        let runner = Runner::new(cfg);
        let sink = Titles(Mutex::new(Vec::new()));
        let result = runner.execute(records, Some(&sink as &dyn ReportSink)).unwrap();
        assert_eq!(result.scenarios, [MAIN]);
        assert!(!result.summary.is_empty());
        assert_eq!(result.estimations.len(), 1);
        assert!(result.estimations[0].tau.is_some());
        assert_eq!(sink.0.lock().unwrap().len(), 3);
    }

    #[test]
    fn runner_applies_manual_plans() {
        let mut cfg = WorkflowConfig::from_args(Some(1));
        cfg.scenarios = vec![
            ScenarioPlan {
                name: MAIN.into(),
                steps: vec![
                    Step::Add {
                        end_date: Some(date("2020-02-09")),
                        days: None,
                        population: None,
                        model: None,
                        params: ParamSet::new(),
                    },
                    Step::Add {
                        end_date: None,
                        days: Some(40),
                        population: None,
                        model: None,
                        params: ParamSet::new(),
                    },
                    Step::Add {
                        end_date: None,
                        days: None,
                        population: None,
                        model: None,
                        params: ParamSet::new(),
                    },
                ],
            },
            ScenarioPlan {
                name: "Merged".into(),
                steps: vec![
                    Step::Combine {
                        phases: vec!["1st".into(), "2nd".into()],
                        population: None,
                        model: Some("SIR-F".into()),
                        params: ParamSet::new().with("rho", 0.1),
                    },
                    Step::Disable {
                        phases: vec!["0th".into()],
                    },
                ],
            },
        ];
        let records = build_records(&cfg.generator).unwrap();
        let result = Runner::new(cfg).execute(records, None).unwrap();
        assert_eq!(result.scenarios, [MAIN, "Merged"]);
        assert_eq!(result.change_dates[MAIN], [date("2020-02-10"), date("2020-03-21")]);
        assert_eq!(result.change_dates["Merged"], [date("2020-02-10")]);
        let merged: Vec<_> = result.summary.iter().filter(|row| row.scenario == "Merged").collect();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].phase.model.as_deref(), Some("SIR-F"));
        assert!(result.describe.is_empty());
        assert!(!result.notes.is_empty());
    }

    #[test]
    fn failing_steps_name_their_scenario() {
        let mut cfg = WorkflowConfig::from_args(Some(1));
        cfg.scenarios = vec![ScenarioPlan {
            name: "Broken".into(),
            steps: vec![Step::Separate {
                date: date("2021-01-01"),
                population: None,
                model: None,
                params: ParamSet::new(),
            }],
        }];
        let records = build_records(&cfg.generator).unwrap();
        let err = Runner::new(cfg).execute(records, None).unwrap_err();
        assert!(format!("{:#}", err).contains("Broken"));
    }
}
