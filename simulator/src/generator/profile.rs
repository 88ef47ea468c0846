use anyhow::Context;
use chrono::{Duration, NaiveDate};
use phasecore::ode::{OdeModel, ParamSet, SirF};
use phasecore::records::{Record, RecordFrame};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// One phase of generated records with its SIR-F values per day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedPhase {
    pub days: usize,
    pub params: ParamSet,
}

/// Configuration for generating synthetic case records.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub start_date: NaiveDate,
    pub population: u64,
    pub initial_infected: f64,
    pub phases: Vec<GeneratedPhase>,
    /// Relative jitter applied to each value, in [0, 1).
    pub noise: f64,
    pub seed: u64,
}

fn sirf(theta: f64, kappa: f64, rho: f64, sigma: f64) -> ParamSet {
    ParamSet::new()
        .with("theta", theta)
        .with("kappa", kappa)
        .with("rho", rho)
        .with("sigma", sigma)
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            start_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or(NaiveDate::MIN),
            population: 1_000_000,
            initial_infected: 50.0,
            phases: vec![
                GeneratedPhase {
                    days: 40,
                    params: sirf(0.002, 0.005, 0.2, 0.075),
                },
                GeneratedPhase {
                    days: 40,
                    params: sirf(0.002, 0.005, 0.09, 0.075),
                },
                GeneratedPhase {
                    days: 41,
                    params: sirf(0.002, 0.003, 0.12, 0.08),
                },
            ],
            noise: 0.02,
            seed: 0,
        }
    }
}

/// Chains SIR-F over the configured phases and samples one record per day.
pub fn build_records(config: &GeneratorConfig) -> anyhow::Result<RecordFrame> {
    anyhow::ensure!(!config.phases.is_empty(), "generator needs at least one phase");
    anyhow::ensure!(
        (0.0..1.0).contains(&config.noise),
        "generator noise must be in [0, 1), but {} was applied",
        config.noise
    );
    let population = config.population as f64;
    anyhow::ensure!(
        config.initial_infected > 0.0 && config.initial_infected < population,
        "initial infected cases must be between 0 and the population"
    );

    let model = SirF;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut state = ndarray::array![population - config.initial_infected, config.initial_infected, 0.0, 0.0];
    let mut records = Vec::new();
    for (index, phase) in config.phases.iter().enumerate() {
        let values = phase
            .params
            .values_for(&model)
            .with_context(|| format!("parameter values of generated phase {}", index))?;
        let states = model.advance_days(state.view(), &values, population, 1440, phase.days);
        for simulated in states.iter().take(phase.days) {
            let mut jitter = || 1.0 + rng.gen_range(-config.noise..=config.noise);
            let infected = simulated[1] * jitter();
            let recovered = simulated[2] * jitter();
            let fatal = simulated[3] * jitter();
            records.push(Record::new(
                config.start_date + Duration::days(records.len() as i64),
                infected + fatal + recovered,
                infected,
                fatal,
                recovered,
                config.population,
            ));
        }
        if let Some(last) = states.last() {
            state = last.clone();
        }
    }
    RecordFrame::new(records).context("validating generated records")
}
