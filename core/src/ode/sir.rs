use crate::ode::model::{days_per_transition, per_tau};
use crate::ode::OdeModel;
use crate::records::Variable;
use ndarray::{array, Array1, ArrayView1};

/// SIR model with fatal and recovered cases merged into one compartment.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sir;

const VARIABLES: [Variable; 3] = [
    Variable::Susceptible,
    Variable::Infected,
    Variable::FatalOrRecovered,
];

impl OdeModel for Sir {
    fn name(&self) -> &'static str {
        "SIR"
    }

    fn variables(&self) -> &'static [Variable] {
        &VARIABLES
    }

    fn parameters(&self) -> &'static [&'static str] {
        &["rho", "sigma"]
    }

    fn day_parameters(&self) -> &'static [&'static str] {
        &["1/beta [day]", "1/gamma [day]"]
    }

    fn derivatives(&self, state: ArrayView1<f64>, values: &[f64], population: f64) -> Array1<f64> {
        let (rho, sigma) = (values[0], values[1]);
        let (s, i) = (state[0], state[1].max(0.0));
        let infection = rho * s * i / population;
        let removal = sigma * i;
        array![-infection, infection - removal, removal]
    }

    fn reproduction_number(&self, values: &[f64]) -> Option<f64> {
        let (rho, sigma) = (values[0], values[1]);
        (sigma > 0.0).then(|| rho / sigma)
    }

    fn day_values(&self, values: &[f64], tau: u32) -> Vec<f64> {
        vec![
            days_per_transition(values[0], tau),
            days_per_transition(values[1], tau),
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
        let rho = per_tau(-daily_change[0] * population / (s * i), tau);
        let sigma = per_tau(daily_change[2] / i, tau);
        vec![fixed[0].unwrap_or(rho), fixed[1].unwrap_or(sigma)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn population_is_conserved() {
        let state = array![990.0, 10.0, 0.0];
        let next = Sir.step(state.view(), &[0.2, 0.05], 1000.0);
        assert!((next.sum() - 1000.0).abs() < 1e-9);
        assert!(next[0] < 990.0);
    }

    #[test]
    fn reproduction_number_is_rho_over_sigma() {
        assert_eq!(Sir.reproduction_number(&[0.2, 0.05]), Some(4.0));
        assert_eq!(Sir.reproduction_number(&[0.2, 0.0]), None);
    }
}
