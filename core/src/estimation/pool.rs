use crate::estimation::{EstimationJob, EstimationOutcome, Estimator};
use crate::prelude::{AnalysisError, AnalysisResult};
use log::debug;
use std::sync::Arc;
use std::thread;
use tokio::runtime::Builder;

/// Bounded fan-out/fan-in of independent phase fits.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    /// `n_jobs` of -1 uses every available core.
    pub fn new(n_jobs: i32) -> AnalysisResult<Self> {
        let workers = match n_jobs {
            -1 => thread::available_parallelism().map_or(1, |n| n.get()),
            n if n >= 1 => n as usize,
            n => {
                return Err(AnalysisError::InvalidInput(format!(
                    "n_jobs must be a natural number or -1, but {} was applied",
                    n
                )))
            }
        };
        Ok(Self { workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Runs every job and returns the results in job order once all have finished.
    pub fn run(
        &self,
        estimator: Arc<dyn Estimator>,
        jobs: Vec<EstimationJob>,
    ) -> AnalysisResult<Vec<(String, AnalysisResult<EstimationOutcome>)>> {
        if jobs.is_empty() {
            return Ok(Vec::new());
        }
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(self.workers)
            .thread_name("phase-estimator")
            .build()
            .map_err(|e| AnalysisError::Precondition(format!("creating estimation workers: {}", e)))?;
        debug!("estimating {} phases with {} workers", jobs.len(), self.workers);

        let handles: Vec<_> = jobs
            .into_iter()
            .map(|job| {
                let estimator = Arc::clone(&estimator);
                let phase = job.phase.clone();
                (phase, runtime.spawn_blocking(move || estimator.estimate(&job)))
            })
            .collect();
        let results = runtime.block_on(async move {
            let mut results = Vec::with_capacity(handles.len());
            for (phase, handle) in handles {
                let result = match handle.await {
                    Ok(result) => result,
                    Err(err) => Err(AnalysisError::Estimation {
                        phase: phase.clone(),
                        reason: format!("estimation task did not complete: {}", err),
                    }),
                };
                results.push((phase, result));
            }
            results
        });
        Ok(results)
    }
}
