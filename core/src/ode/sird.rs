use crate::ode::model::{days_per_transition, per_tau};
use crate::ode::OdeModel;
use crate::records::Variable;
use ndarray::{array, Array1, ArrayView1};

/// SIR-D model: infected cases either recover or die.
#[derive(Debug, Clone, Copy, Default)]
pub struct SirD;

const VARIABLES: [Variable; 4] = [
    Variable::Susceptible,
    Variable::Infected,
    Variable::Recovered,
    Variable::Fatal,
];

impl OdeModel for SirD {
    fn name(&self) -> &'static str {
        "SIR-D"
    }

    fn variables(&self) -> &'static [Variable] {
        &VARIABLES
    }

    fn parameters(&self) -> &'static [&'static str] {
        &["kappa", "rho", "sigma"]
    }

    fn day_parameters(&self) -> &'static [&'static str] {
        &["1/alpha2 [day]", "1/beta [day]", "1/gamma [day]"]
    }

    fn derivatives(&self, state: ArrayView1<f64>, values: &[f64], population: f64) -> Array1<f64> {
        let (kappa, rho, sigma) = (values[0], values[1], values[2]);
        let (s, i) = (state[0], state[1].max(0.0));
        let infection = rho * s * i / population;
        array![
            -infection,
            infection - (sigma + kappa) * i,
            sigma * i,
            kappa * i
        ]
    }

    fn reproduction_number(&self, values: &[f64]) -> Option<f64> {
        let (kappa, rho, sigma) = (values[0], values[1], values[2]);
        (sigma + kappa > 0.0).then(|| rho / (sigma + kappa))
    }

    fn day_values(&self, values: &[f64], tau: u32) -> Vec<f64> {
        values
            .iter()
            .map(|rate| days_per_transition(*rate, tau))
            .collect()
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
        let kappa = per_tau(daily_change[3] / i, tau);
        let rho = per_tau(-daily_change[0] * population / (s * i), tau);
        let sigma = per_tau(daily_change[2] / i, tau);
        vec![
            fixed[0].unwrap_or(kappa),
            fixed[1].unwrap_or(rho),
            fixed[2].unwrap_or(sigma),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removed_cases_split_into_recovered_and_fatal() {
        let state = array![900.0, 100.0, 0.0, 0.0];
        let next = SirD.step(state.view(), &[0.01, 0.1, 0.05], 1000.0);
        assert!(next[2] > next[3]);
        assert!((next.sum() - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn day_values_follow_tau() {
        assert_eq!(SirD.day_values(&[0.0, 0.5, 0.1], 1440), vec![0.0, 2.0, 10.0]);
    }
}
