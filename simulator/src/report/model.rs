use crate::workflow::runner::WorkflowResult;
use serde::Serialize;
use std::collections::BTreeMap;

/// Latest state served by the report bridge.
#[derive(Debug, Clone, Serialize, Default)]
pub struct ReportModel {
    pub status: String,
    pub result: Option<WorkflowResult>,
    /// Tables published through the sink, keyed by title.
    pub tables: BTreeMap<String, serde_json::Value>,
}

impl ReportModel {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            ..Self::default()
        }
    }
}
