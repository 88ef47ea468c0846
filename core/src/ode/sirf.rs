use crate::ode::model::{days_per_transition, per_tau};
use crate::ode::OdeModel;
use crate::records::Variable;
use ndarray::{array, Array1, ArrayView1};

/// SIR-F model: a fraction `theta` of new cases dies before confirmation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SirF;

const VARIABLES: [Variable; 4] = [
    Variable::Susceptible,
    Variable::Infected,
    Variable::Recovered,
    Variable::Fatal,
];

impl OdeModel for SirF {
    fn name(&self) -> &'static str {
        "SIR-F"
    }

    fn variables(&self) -> &'static [Variable] {
        &VARIABLES
    }

    fn parameters(&self) -> &'static [&'static str] {
        &["theta", "kappa", "rho", "sigma"]
    }

    fn day_parameters(&self) -> &'static [&'static str] {
        &["alpha1 [-]", "1/alpha2 [day]", "1/beta [day]", "1/gamma [day]"]
    }

    fn derivatives(&self, state: ArrayView1<f64>, values: &[f64], population: f64) -> Array1<f64> {
        let (theta, kappa, rho, sigma) = (values[0], values[1], values[2], values[3]);
        let (s, i) = (state[0], state[1].max(0.0));
        let infection = rho * s * i / population;
        array![
            -infection,
            (1.0 - theta) * infection - (sigma + kappa) * i,
            sigma * i,
            theta * infection + kappa * i
        ]
    }

    fn reproduction_number(&self, values: &[f64]) -> Option<f64> {
        let (theta, kappa, rho, sigma) = (values[0], values[1], values[2], values[3]);
        (sigma + kappa > 0.0).then(|| rho * (1.0 - theta) / (sigma + kappa))
    }

    fn day_values(&self, values: &[f64], tau: u32) -> Vec<f64> {
        vec![
            (values[0] * 1000.0).round() / 1000.0,
            days_per_transition(values[1], tau),
            days_per_transition(values[2], tau),
            days_per_transition(values[3], tau),
        ]
    }

    fn rate_sample(
        &self,
        state: ArrayView1<f64>,
        daily_change: ArrayView1<f64>,
        population: f64,
        tau: u32,
        fixed: &[Option<f64>],
    ) -> Vec<f64> {
        let (s, i) = (state[0], state[1]);
        let theta = fixed[0].unwrap_or(0.0);
        let rho_day = match fixed[2] {
            Some(rho) => rho * 1440.0 / tau as f64,
            None => -daily_change[0] * population / (s * i),
        };
        let kappa_day = ((daily_change[3] - theta * rho_day * s * i / population) / i).max(0.0);
        let sigma_day = daily_change[2] / i;
        vec![
            theta,
            fixed[1].unwrap_or(per_tau(kappa_day, tau)),
            fixed[2].unwrap_or(per_tau(rho_day, tau)),
            fixed[3].unwrap_or(per_tau(sigma_day, tau)),
        ]
    }

    fn upper_bound(&self, parameter: &str) -> Option<f64> {
        (parameter == "theta").then_some(1.0)
    }
}
