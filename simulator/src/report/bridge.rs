use crate::generator::profile::build_records;
use crate::report::model::ReportModel;
use crate::workflow::config::WorkflowConfig;
use crate::workflow::runner::{Runner, WorkflowResult};
use log::{error, info};
use phasecore::records::RecordFrame;
use phasecore::scenario::{RenderHints, ReportSink};
use phasecore::AnalysisResult;
use serde_json::json;
use std::{
    net::SocketAddr,
    sync::{Arc, PoisonError, RwLock},
    thread,
};
use tokio::runtime::Builder;
use warp::{http::StatusCode, Filter};

pub fn bridge_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9000))
}

#[derive(Debug)]
struct WarpError;

impl warp::reject::Reject for WarpError {}

/// Holds the latest report and serves it over HTTP.
///
/// `GET /report` returns the report; `POST /run` runs a posted workflow on the
/// bridge's records (or on records generated from the posted config).
#[derive(Clone)]
pub struct ReportBridge {
    state: Arc<RwLock<ReportModel>>,
    records: Option<Arc<RecordFrame>>,
}

impl ReportBridge {
    pub fn new(records: Option<Arc<RecordFrame>>) -> Self {
        Self {
            state: Arc::new(RwLock::new(ReportModel::new("idle"))),
            records,
        }
    }

    /// Starts the HTTP endpoint on its own thread.
    pub fn serve(&self, address: SocketAddr) {
        let bridge = self.clone();
        let bridge_filter = warp::any().map(move || bridge.clone());

        let get_route = warp::path("report")
            .and(warp::get())
            .and(bridge_filter.clone())
            .map(|bridge: ReportBridge| warp::reply::json(&bridge.snapshot()));

        let post_route = warp::path("run")
            .and(warp::post())
            .and(warp::body::json())
            .and(bridge_filter)
            .and_then(|config: WorkflowConfig, bridge: ReportBridge| async move {
                let worker = bridge.clone();
                let outcome = tokio::task::spawn_blocking(move || worker.run(config)).await;
                match outcome {
                    Ok(Ok(result)) => Ok::<_, warp::Rejection>(warp::reply::with_status(
                        warp::reply::json(&json!({
                            "status": "ok",
                            "scenarios": result.scenarios,
                            "failures": result.failure_count(),
                        })),
                        StatusCode::OK,
                    )),
                    Ok(Err(err)) => {
                        error!("workflow run failed: {:#}", err);
                        bridge.publish_status(&format!("workflow run failed: {}", err));
                        Err(warp::reject::custom(WarpError))
                    }
                    Err(err) => {
                        error!("workflow task aborted: {}", err);
                        Err(warp::reject::custom(WarpError))
                    }
                }
            });

        thread::spawn(move || {
            let routes = get_route.or(post_route);
            let runtime = match Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime,
                Err(err) => {
                    error!("report bridge runtime could not be built: {}", err);
                    return;
                }
            };
            runtime.block_on(async move {
                warp::serve(routes).run(address).await;
            });
        });
        info!("report bridge listening on http://{}", address);
    }

    /// Runs a workflow and publishes its result.
    pub fn run(&self, config: WorkflowConfig) -> anyhow::Result<WorkflowResult> {
        let records = match &self.records {
            Some(records) => records.as_ref().clone(),
            None => build_records(&config.generator)?,
        };
        self.publish_status(&format!("running workflow for {}", config.area));
        let result = Runner::new(config).execute(records, Some(self as &dyn ReportSink))?;
        self.publish(&result);
        Ok(result)
    }

    pub fn publish(&self, result: &WorkflowResult) {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        guard.result = Some(result.clone());
        guard.status = format!(
            "{} scenarios, {} estimation failures",
            result.scenarios.len(),
            result.failure_count()
        );
        info!("[bridge] {}", guard.status);
    }

    pub fn publish_status(&self, message: &str) {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        guard.status = message.to_string();
        info!("[bridge] {}", message);
    }

    pub fn snapshot(&self) -> ReportModel {
        self.state.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl ReportSink for ReportBridge {
    fn render(&self, hints: &RenderHints, table: &serde_json::Value) -> AnalysisResult<()> {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        guard.tables.insert(hints.title.clone(), table.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bridge_runs_workflows_and_keeps_tables() {
        let bridge = ReportBridge::new(None);
        let mut config = WorkflowConfig::from_args(Some(2));
        config.area = "Test".into();
        let result = bridge.run(config).unwrap();
        let snapshot = bridge.snapshot();
        assert_eq!(snapshot.result.unwrap().scenarios, result.scenarios);
        assert!(snapshot.tables.contains_key("Test: summary"));
        assert!(snapshot.status.contains("scenarios"));
    }

    #[test]
    fn status_updates_are_visible() {
        let bridge = ReportBridge::new(None);
        bridge.publish_status("ready");
        assert_eq!(bridge.snapshot().status, "ready");
        assert!(bridge.snapshot().result.is_none());
    }
}
