use crate::prelude::{AnalysisError, AnalysisResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Display hints handed to a report sink with a table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderHints {
    pub title: String,
    pub ylabel: Option<String>,
    /// Dates to mark on a time axis.
    pub change_dates: Vec<NaiveDate>,
    pub filename: Option<PathBuf>,
}

impl RenderHints {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Receives finished tables; nothing is read back.
pub trait ReportSink: Send + Sync {
    fn render(&self, hints: &RenderHints, table: &serde_json::Value) -> AnalysisResult<()>;
}

/// Serializes a table for a sink.
pub(crate) fn to_table<T: Serialize + ?Sized>(table: &T) -> AnalysisResult<serde_json::Value> {
    serde_json::to_value(table)
        .map_err(|e| AnalysisError::Report(format!("table cannot be serialized: {}", e)))
}
