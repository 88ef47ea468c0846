use crate::prelude::AnalysisResult;
use crate::records::RecordFrame;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Options of change-point detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendOptions {
    /// Minimum length of a detected segment [day].
    pub min_size: usize,
    /// Share of a segment's total sum of squares a split must remove.
    pub penalty: f64,
    /// Explicit number of change points. Detection derives it from the data,
    /// so requests setting it are rejected.
    pub n_points: Option<usize>,
}

impl Default for TrendOptions {
    fn default() -> Self {
        Self {
            min_size: 7,
            penalty: 0.05,
            n_points: None,
        }
    }
}

/// Proposes phase boundaries from observed records.
pub trait ChangeFinder: Send + Sync {
    /// Ordered start dates of the segments following the first one.
    fn find(
        &self,
        records: &RecordFrame,
        population: u64,
        options: &TrendOptions,
    ) -> AnalysisResult<Vec<NaiveDate>>;
}
