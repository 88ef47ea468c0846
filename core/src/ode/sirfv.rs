use crate::ode::model::days_per_transition;
use crate::ode::{OdeModel, SirF};
use crate::prelude::MINUTES_PER_DAY;
use crate::records::Variable;
use ndarray::{array, s, Array1, ArrayView1};

/// SIR-F model with vaccination: `omega` of the population moves from
/// Susceptible to Vaccinated every tau unit.
#[derive(Debug, Clone, Copy, Default)]
pub struct SirFv;

const VARIABLES: [Variable; 5] = [
    Variable::Susceptible,
    Variable::Infected,
    Variable::Recovered,
    Variable::Fatal,
    Variable::Vaccinated,
];

impl OdeModel for SirFv {
    fn name(&self) -> &'static str {
        "SIR-FV"
    }

    fn variables(&self) -> &'static [Variable] {
        &VARIABLES
    }

    fn parameters(&self) -> &'static [&'static str] {
        &["theta", "kappa", "rho", "sigma", "omega"]
    }

    fn day_parameters(&self) -> &'static [&'static str] {
        &[
            "alpha1 [-]",
            "1/alpha2 [day]",
            "1/beta [day]",
            "1/gamma [day]",
            "Vaccinated [-/day]",
        ]
    }

    fn derivatives(&self, state: ArrayView1<f64>, values: &[f64], population: f64) -> Array1<f64> {
        let (theta, kappa, rho, sigma, omega) = (values[0], values[1], values[2], values[3], values[4]);
        let (s, i) = (state[0].max(0.0), state[1].max(0.0));
        let infection = rho * s * i / population;
        let vaccination = (omega * population).min(s);
        array![
            -infection - vaccination,
            (1.0 - theta) * infection - (sigma + kappa) * i,
            sigma * i,
            theta * infection + kappa * i,
            vaccination
        ]
    }

    fn reproduction_number(&self, values: &[f64]) -> Option<f64> {
        SirF.reproduction_number(&values[..4])
    }

    fn day_values(&self, values: &[f64], tau: u32) -> Vec<f64> {
        let per_day = values[4] * MINUTES_PER_DAY as f64 / tau as f64;
        vec![
            (values[0] * 1000.0).round() / 1000.0,
            days_per_transition(values[1], tau),
            days_per_transition(values[2], tau),
            days_per_transition(values[3], tau),
            (per_day * 1e6).round() / 1e6,
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
        let mut sample = SirF.rate_sample(
            state.slice(s![..4]),
            daily_change.slice(s![..4]),
            population,
            tau,
            &fixed[..4],
        );
        let omega = fixed[4].unwrap_or_else(|| {
            let leaving = -daily_change.slice(s![..4]).sum() / population;
            (leaving * tau as f64 / MINUTES_PER_DAY as f64).max(0.0)
        });
        sample.push(omega);
        sample
    }

    fn upper_bound(&self, parameter: &str) -> Option<f64> {
        matches!(parameter, "theta" | "omega").then_some(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vaccination_moves_susceptible_cases_only() {
        let state = array![900.0, 100.0, 0.0, 0.0, 0.0];
        let change = SirFv.derivatives(state.view(), &[0.0, 0.0, 0.0, 0.0, 0.01], 1000.0);
        assert_eq!(change, array![-10.0, 0.0, 0.0, 0.0, 10.0]);
        assert!(change.sum().abs() < 1e-12);
    }

    #[test]
    fn vaccination_stops_at_zero_susceptible() {
        let state = array![5.0, 0.0, 0.0, 0.0, 995.0];
        let change = SirFv.derivatives(state.view(), &[0.0, 0.0, 0.2, 0.1, 0.5], 1000.0);
        assert_eq!(change[0], -5.0);
        assert_eq!(change[4], 5.0);
    }

    #[test]
    fn reproduction_number_ignores_omega() {
        let with = SirFv.reproduction_number(&[0.5, 0.01, 0.2, 0.09, 0.3]);
        assert_eq!(with, SirF.reproduction_number(&[0.5, 0.01, 0.2, 0.09]));
    }

    #[test]
    fn omega_is_zero_when_recorded_totals_are_constant() {
        let state = array![900.0, 100.0, 0.0, 0.0, 0.0];
        let change = array![-18.0, 5.0, 10.0, 3.0, 0.0];
        let sample = SirFv.rate_sample(state.view(), change.view(), 1000.0, 1440, &[None; 5]);
        assert_eq!(sample.len(), 5);
        assert_eq!(sample[4], 0.0);
        let fixed = SirFv.rate_sample(
            state.view(),
            change.view(),
            1000.0,
            1440,
            &[None, None, None, None, Some(0.002)],
        );
        assert_eq!(fixed[4], 0.002);
    }
}
