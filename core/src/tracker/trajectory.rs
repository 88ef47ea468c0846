use crate::prelude::{AnalysisError, AnalysisResult};
use crate::records::Variable;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// Simulated values of one date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub date: NaiveDate,
    /// Phase that produced the values.
    pub phase: String,
    pub values: BTreeMap<Variable, f64>,
}

impl Snapshot {
    pub fn value(&self, variable: Variable) -> Option<f64> {
        self.values.get(&variable).copied()
    }
}

/// Chained simulation of every enabled phase, one snapshot per date.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Trajectory {
    snapshots: Vec<Snapshot>,
}

impl Trajectory {
    pub(crate) fn new(snapshots: Vec<Snapshot>) -> Self {
        Self { snapshots }
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn get(&self, date: NaiveDate) -> Option<&Snapshot> {
        self.snapshots
            .binary_search_by_key(&date, |snapshot| snapshot.date)
            .ok()
            .map(|idx| &self.snapshots[idx])
    }

    pub fn last(&self) -> Option<&Snapshot> {
        self.snapshots.last()
    }

    /// Variables present on every date.
    pub fn variables(&self) -> Vec<Variable> {
        Variable::ALL
            .into_iter()
            .filter(|v| !self.snapshots.is_empty() && self.snapshots.iter().all(|s| s.values.contains_key(v)))
            .collect()
    }

    /// Time series of one variable.
    pub fn series(&self, variable: Variable) -> AnalysisResult<Vec<(NaiveDate, f64)>> {
        self.snapshots
            .iter()
            .map(|snapshot| {
                snapshot.value(variable).map(|v| (snapshot.date, v)).ok_or_else(|| {
                    AnalysisError::NotFound(format!(
                        "{} was not simulated on {} ({} phase)",
                        variable, snapshot.date, snapshot.phase
                    ))
                })
            })
            .collect()
    }

    /// Date and value of the maximum of a variable.
    pub fn peak(&self, variable: Variable) -> Option<(NaiveDate, f64)> {
        self.snapshots
            .iter()
            .filter_map(|s| s.value(variable).map(|v| (s.date, v)))
            .fold(None, |best, (date, value)| match best {
                Some((_, top)) if top >= value => best,
                _ => Some((date, value)),
            })
    }
}
