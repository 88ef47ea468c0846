use anyhow::Context;
use clap::Parser;
use generator::profile::build_records;
use phasecore::scenario::ReportSink;
use report::bridge::{bridge_bind_address, ReportBridge};
use report::file::JsonFileSink;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::{load_records, WorkflowConfig};
use workflow::runner::Runner;

mod generator;
mod report;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Phase and scenario workflow driver")]
struct Args {
    /// Run the workflow once and write the report tables
    #[arg(long, default_value_t = false)]
    offline: bool,
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    /// JSON records to analyze instead of generated ones
    #[arg(long)]
    records: Option<PathBuf>,
    /// Directory of the offline report tables
    #[arg(long, default_value = "tools/data/reports")]
    report: PathBuf,
    /// Estimation workers, -1 for every core
    #[arg(long, allow_negative_numbers = true)]
    n_jobs: Option<i32>,
    /// Keep the report bridge alive for posted workflows
    #[arg(long, default_value_t = false)]
    serve: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut workflow_config = if let Some(path) = &args.workflow {
        WorkflowConfig::load(path)?
    } else {
        WorkflowConfig::from_args(args.n_jobs)
    };
    if let Some(n_jobs) = args.n_jobs {
        workflow_config.n_jobs = n_jobs;
    }

    let records = match &args.records {
        Some(path) => Some(Arc::new(load_records(path)?)),
        None => None,
    };
    let bridge = ReportBridge::new(records.clone());

    if args.offline {
        let records = match &records {
            Some(records) => records.as_ref().clone(),
            None => build_records(&workflow_config.generator).context("generating records")?,
        };
        let sink = JsonFileSink::new(&args.report)?;
        let runner = Runner::new(workflow_config.clone());
        let result = runner.execute(records, Some(&sink as &dyn ReportSink))?;

        println!(
            "Offline run -> scenarios {}, phases {}, estimation failures {}",
            result.scenarios.len(),
            result.summary.len(),
            result.failure_count()
        );
        for note in &result.notes {
            println!("  skipped {}", note);
        }
        bridge.publish(&result);
    }
    if args.serve {
        bridge.serve(bridge_bind_address());
        bridge.publish_status("HTTP bridge running (Ctrl+C to stop)...");
        let runtime = TokioBuilder::new_current_thread()
            .enable_all()
            .build()
            .context("creating runtime for signal handling")?;
        runtime.block_on(async {
            signal::ctrl_c().await.context("awaiting Ctrl+C to exit")?;
            Ok::<(), anyhow::Error>(())
        })?;
    }

    Ok(())
}
