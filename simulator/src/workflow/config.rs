use crate::generator::profile::GeneratorConfig;
use anyhow::Context;
use chrono::NaiveDate;
use phasecore::ode::ParamSet;
use phasecore::records::{Record, RecordFrame};
use phasecore::trend::TrendOptions;
use phasecore::MAIN;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub area: String,
    /// Defaults to the population of the last record.
    pub population: Option<u64>,
    pub tau: Option<u32>,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    /// Model used by steps that do not name one.
    pub model: String,
    pub n_jobs: i32,
    pub generator: GeneratorConfig,
    pub scenarios: Vec<ScenarioPlan>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            area: "Synthetic".into(),
            population: None,
            tau: None,
            first_date: None,
            last_date: None,
            model: "SIR-F".into(),
            n_jobs: -1,
            generator: GeneratorConfig::default(),
            scenarios: Vec::new(),
        }
    }
}

/// Steps applied to one scenario name, in order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScenarioPlan {
    pub name: String,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    Trend {
        #[serde(default)]
        force: bool,
        #[serde(default)]
        options: TrendOptions,
    },
    Add {
        end_date: Option<NaiveDate>,
        days: Option<u32>,
        population: Option<u64>,
        model: Option<String>,
        #[serde(default)]
        params: ParamSet,
    },
    Separate {
        date: NaiveDate,
        population: Option<u64>,
        model: Option<String>,
        #[serde(default)]
        params: ParamSet,
    },
    Combine {
        phases: Vec<String>,
        population: Option<u64>,
        model: Option<String>,
        #[serde(default)]
        params: ParamSet,
    },
    /// Deletes the listed phases, or the scenario itself without a list.
    Delete { phases: Option<Vec<String>> },
    Disable { phases: Vec<String> },
    Enable { phases: Vec<String> },
    Clear {
        #[serde(default)]
        include_past: bool,
        template: Option<String>,
    },
    Estimate {
        model: Option<String>,
        phases: Option<Vec<String>>,
        #[serde(default)]
        fixed: ParamSet,
    },
    /// Rebuilds `control` and makes this scenario its hypothetical counterpart.
    Retrospective {
        beginning_date: NaiveDate,
        #[serde(default = "main_scenario")]
        control: String,
        model: Option<String>,
        #[serde(default)]
        overrides: ParamSet,
    },
}

fn main_scenario() -> String {
    MAIN.to_string()
}

impl Step {
    pub fn kind(&self) -> &'static str {
        match self {
            Step::Trend { .. } => "trend",
            Step::Add { .. } => "add",
            Step::Separate { .. } => "separate",
            Step::Combine { .. } => "combine",
            Step::Delete { .. } => "delete",
            Step::Disable { .. } => "disable",
            Step::Enable { .. } => "enable",
            Step::Clear { .. } => "clear",
            Step::Estimate { .. } => "estimate",
            Step::Retrospective { .. } => "retrospective",
        }
    }
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    /// Trend analysis and estimation of "Main" on generated records.
    pub fn from_args(n_jobs: Option<i32>) -> Self {
        let mut config = Self {
            scenarios: vec![ScenarioPlan {
                name: MAIN.to_string(),
                steps: vec![
                    Step::Trend {
                        force: true,
                        options: TrendOptions::default(),
                    },
                    Step::Estimate {
                        model: None,
                        phases: None,
                        fixed: ParamSet::new(),
                    },
                ],
            }],
            ..Self::default()
        };
        if let Some(n_jobs) = n_jobs {
            config.n_jobs = n_jobs;
        }
        config
    }
}

/// Reads records from a JSON array of daily rows.
pub fn load_records<P: AsRef<Path>>(path: P) -> anyhow::Result<RecordFrame> {
    let path_ref = path.as_ref();
    let contents = fs::read_to_string(path_ref)
        .with_context(|| format!("reading records {}", path_ref.display()))?;
    let records: Vec<Record> = serde_json::from_str(&contents)
        .with_context(|| format!("parsing records {}", path_ref.display()))?;
    RecordFrame::new(records).with_context(|| format!("validating records {}", path_ref.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn config_from_args_plans_main() {
        let cfg = WorkflowConfig::from_args(Some(2));
        assert_eq!(cfg.n_jobs, 2);
        assert_eq!(cfg.scenarios[0].name, MAIN);
        assert_eq!(cfg.scenarios[0].steps.len(), 2);
    }

    #[test]
    fn config_load_reads_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            b"area: Japan
population: 126500000
n_jobs: 2
scenarios:
  - name: Main
    steps:
      - step: add
        end_date: 2020-02-15
      - step: add
        days: 30
        params:
          rho: 0.1
      - step: separate
        date: 2020-02-01
      - step: estimate
  - name: Lockdown
    steps:
      - step: clear
      - step: add
        model: SIR-F
        params:
          rho: 0.01
      - step: retrospective
        beginning_date: 2020-03-01
",
        )
        .unwrap();
        let path = temp.into_temp_path();
        let cfg = WorkflowConfig::load(&path).unwrap();
        assert_eq!(cfg.area, "Japan");
        assert_eq!(cfg.population, Some(126_500_000));
        assert_eq!(cfg.model, "SIR-F");
        assert_eq!(cfg.scenarios.len(), 2);
        assert!(matches!(cfg.scenarios[0].steps[1], Step::Add { days: Some(30), .. }));
        match &cfg.scenarios[1].steps[2] {
            Step::Retrospective { control, .. } => assert_eq!(control, MAIN),
            other => panic!("unexpected step {:?}", other),
        }
        assert_eq!(cfg.scenarios[1].steps[0].kind(), "clear");
    }

    #[test]
    fn records_load_from_json() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            br#"[
  {"date": "2020-03-01", "confirmed": 10.0, "infected": 8.0, "fatal": 1.0, "recovered": 1.0, "population": 1000},
  {"date": "2020-03-02", "confirmed": 14.0, "infected": 11.0, "fatal": 1.0, "recovered": 2.0, "population": 1000}
]"#,
        )
        .unwrap();
        let path = temp.into_temp_path();
        let records = load_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records.population(), 1000);
    }

    #[test]
    fn records_with_gaps_are_rejected() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            br#"[
  {"date": "2020-03-01", "confirmed": 10.0, "infected": 8.0, "fatal": 1.0, "recovered": 1.0, "population": 1000},
  {"date": "2020-03-05", "confirmed": 14.0, "infected": 11.0, "fatal": 1.0, "recovered": 2.0, "population": 1000}
]"#,
        )
        .unwrap();
        let path = temp.into_temp_path();
        assert!(load_records(&path).is_err());
    }
}
