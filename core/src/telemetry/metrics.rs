use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Instant;

/// Counts of one estimation batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchStats {
    pub fitted: usize,
    pub failed: usize,
    pub elapsed_secs: f64,
}

pub struct BatchRecorder {
    started: Instant,
    inner: Mutex<Counts>,
}

#[derive(Default)]
struct Counts {
    fitted: usize,
    failed: usize,
}

impl BatchRecorder {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            inner: Mutex::new(Counts::default()),
        }
    }

    pub fn record_fitted(&self) {
        if let Ok(mut counts) = self.inner.lock() {
            counts.fitted += 1;
        }
    }

    pub fn record_failed(&self) {
        if let Ok(mut counts) = self.inner.lock() {
            counts.failed += 1;
        }
    }

    pub fn snapshot(&self) -> BatchStats {
        let elapsed_secs = self.started.elapsed().as_secs_f64();
        match self.inner.lock() {
            Ok(counts) => BatchStats {
                fitted: counts.fitted,
                failed: counts.failed,
                elapsed_secs,
            },
            Err(_) => BatchStats {
                elapsed_secs,
                ..BatchStats::default()
            },
        }
    }
}

impl Default for BatchRecorder {
    fn default() -> Self {
        Self::new()
    }
}
