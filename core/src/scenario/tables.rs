use crate::ode::ParamSet;
use crate::phase::PhaseSummary;
use crate::prelude::AnalysisError;
use crate::records::Variable;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Phase summary row tagged with its scenario name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    #[serde(rename = "Scenario")]
    pub scenario: String,
    #[serde(flatten)]
    pub phase: PhaseSummary,
}

/// Simulated values of one date with the parameters in effect.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackRow {
    #[serde(rename = "Scenario")]
    pub scenario: String,
    pub date: NaiveDate,
    pub phase: String,
    pub values: BTreeMap<Variable, f64>,
    pub params: ParamSet,
    pub rt: Option<f64>,
}

/// Column of `history`.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryTarget {
    Variable(Variable),
    Parameter(String),
    Rt,
}

impl fmt::Display for HistoryTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryTarget::Variable(v) => write!(f, "{}", v),
            HistoryTarget::Parameter(name) => f.write_str(name),
            HistoryTarget::Rt => f.write_str("Rt"),
        }
    }
}

impl FromStr for HistoryTarget {
    type Err = AnalysisError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AnalysisError::InvalidInput("history target must not be empty".into()));
        }
        if text == "Rt" {
            return Ok(HistoryTarget::Rt);
        }
        Ok(Variable::from_name(text)
            .map(HistoryTarget::Variable)
            .unwrap_or_else(|| HistoryTarget::Parameter(text.to_string())))
    }
}

/// One date of `history`: a value per scenario, plus "Actual" when requested.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryRow {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub values: BTreeMap<String, Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryTable {
    pub target: String,
    pub rows: Vec<HistoryRow>,
}

impl HistoryTable {
    pub fn column(&self, name: &str) -> Vec<Option<f64>> {
        self.rows
            .iter()
            .map(|row| row.values.get(name).copied().flatten())
            .collect()
    }
}

/// Key figures of one scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescribeRow {
    #[serde(rename = "Scenario")]
    pub scenario: String,
    pub max_infected: f64,
    pub max_infected_date: NaiveDate,
    pub last_date: NaiveDate,
    pub confirmed: Option<f64>,
    pub infected: Option<f64>,
    pub fatal: Option<f64>,
    /// Reproduction number of the last phase.
    pub rt: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_parse_by_name() {
        assert_eq!("Rt".parse::<HistoryTarget>().unwrap(), HistoryTarget::Rt);
        assert_eq!(
            "Infected".parse::<HistoryTarget>().unwrap(),
            HistoryTarget::Variable(Variable::Infected)
        );
        assert_eq!(
            "rho".parse::<HistoryTarget>().unwrap(),
            HistoryTarget::Parameter("rho".into())
        );
        assert!("  ".parse::<HistoryTarget>().is_err());
    }

    #[test]
    fn summary_rows_flatten_phase_columns() {
        let row = SummaryRow {
            scenario: "Main".into(),
            phase: PhaseSummary {
                phase: "0th".into(),
                start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2020, 1, 31).unwrap(),
                population: 1000,
                model: None,
                tau: None,
                params: ParamSet::new(),
                rt: None,
                day_params: BTreeMap::new(),
                score: None,
                trials: None,
                runtime_secs: None,
            },
        };
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["Scenario"], "Main");
        assert_eq!(value["phase"], "0th");
        assert_eq!(value["start"], "2020-01-01");
    }
}
