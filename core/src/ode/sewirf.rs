use crate::ode::model::{days_per_transition, per_tau};
use crate::ode::OdeModel;
use crate::records::Variable;
use ndarray::{array, Array1, ArrayView1};

/// SEWIR-F model: new cases pass through Exposed and Waiting before they are
/// confirmed as Infected.
///
/// Exposed and Waiting are never recorded, so `rho2` and `rho3` cannot be
/// sampled from records and have to be fixed before estimation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SewirF;

const VARIABLES: [Variable; 6] = [
    Variable::Susceptible,
    Variable::Infected,
    Variable::Recovered,
    Variable::Fatal,
    Variable::Exposed,
    Variable::Waiting,
];

impl OdeModel for SewirF {
    fn name(&self) -> &'static str {
        "SEWIR-F"
    }

    fn variables(&self) -> &'static [Variable] {
        &VARIABLES
    }

    fn parameters(&self) -> &'static [&'static str] {
        &["theta", "kappa", "rho1", "rho2", "rho3", "sigma"]
    }

    fn day_parameters(&self) -> &'static [&'static str] {
        &[
            "alpha1 [-]",
            "1/alpha2 [day]",
            "1/beta1 [day]",
            "1/beta2 [day]",
            "1/beta3 [day]",
            "1/gamma [day]",
        ]
    }

    fn derivatives(&self, state: ArrayView1<f64>, values: &[f64], population: f64) -> Array1<f64> {
        let (theta, kappa, rho1, rho2, rho3, sigma) =
            (values[0], values[1], values[2], values[3], values[4], values[5]);
        let s = state[0];
        let (i, e, w) = (state[1].max(0.0), state[4].max(0.0), state[5].max(0.0));
        let exposure = rho1 * s * (w + i) / population;
        let onset = rho3 * w;
        array![
            -exposure,
            (1.0 - theta) * onset - (sigma + kappa) * i,
            sigma * i,
            theta * onset + kappa * i,
            exposure - rho2 * e,
            rho2 * e - onset
        ]
    }

    fn reproduction_number(&self, values: &[f64]) -> Option<f64> {
        let (theta, kappa, rho1, rho2, rho3, sigma) =
            (values[0], values[1], values[2], values[3], values[4], values[5]);
        (rho2 > 0.0 && sigma + kappa > 0.0).then(|| rho1 / rho2 * rho3 * (1.0 - theta) / (sigma + kappa))
    }

    fn day_values(&self, values: &[f64], tau: u32) -> Vec<f64> {
        let mut days = vec![(values[0] * 1000.0).round() / 1000.0];
        days.extend(values[1..].iter().map(|rate| days_per_transition(*rate, tau)));
        days
    }

    /// `rho1` is sampled as if only Infected cases were contagious; `rho2`
    /// and `rho3` are NaN unless fixed.
    fn rate_sample(
        &self,
        state: ArrayView1<f64>,
        daily_change: ArrayView1<f64>,
        population: f64,
        tau: u32,
        fixed: &[Option<f64>],
    ) -> Vec<f64> {
        let (s, i) = (state[0], state[1]);
        let rho1_day = -daily_change[0] * population / (s * i);
        let kappa_day = (daily_change[3] / i).max(0.0);
        let sigma_day = daily_change[2] / i;
        vec![
            fixed[0].unwrap_or(0.0),
            fixed[1].unwrap_or(per_tau(kappa_day, tau)),
            fixed[2].unwrap_or(per_tau(rho1_day, tau)),
            fixed[3].unwrap_or(f64::NAN),
            fixed[4].unwrap_or(f64::NAN),
            fixed[5].unwrap_or(per_tau(sigma_day, tau)),
        ]
    }

    fn upper_bound(&self, parameter: &str) -> Option<f64> {
        (parameter == "theta").then_some(1.0)
    }
}
