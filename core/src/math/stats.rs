use crate::prelude::{AnalysisError, AnalysisResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Goodness-of-fit statistic between simulated and observed values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Metric {
    Mae,
    Mse,
    Msle,
    Rmse,
    #[default]
    Rmsle,
}

impl Metric {
    pub const fn as_str(self) -> &'static str {
        match self {
            Metric::Mae => "MAE",
            Metric::Mse => "MSE",
            Metric::Msle => "MSLE",
            Metric::Rmse => "RMSE",
            Metric::Rmsle => "RMSLE",
        }
    }

    /// Scores paired (predicted, observed) values. Log metrics clamp negatives to zero.
    pub fn evaluate(self, pairs: &[(f64, f64)]) -> AnalysisResult<f64> {
        if pairs.is_empty() {
            return Err(AnalysisError::InvalidInput(
                "no values are available for scoring".into(),
            ));
        }
        let value = match self {
            Metric::Mae => StatsHelper::mean(pairs.iter().map(|(p, o)| (p - o).abs())),
            Metric::Mse => StatsHelper::mean(pairs.iter().map(|(p, o)| (p - o).powi(2))),
            Metric::Msle => StatsHelper::mean(pairs.iter().map(|(p, o)| log_diff(*p, *o).powi(2))),
            Metric::Rmse => StatsHelper::rms(pairs.iter().map(|(p, o)| p - o)),
            Metric::Rmsle => StatsHelper::rms(pairs.iter().map(|(p, o)| log_diff(*p, *o))),
        };
        Ok(value)
    }
}

fn log_diff(predicted: f64, observed: f64) -> f64 {
    predicted.max(0.0).ln_1p() - observed.max(0.0).ln_1p()
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MAE" => Ok(Metric::Mae),
            "MSE" => Ok(Metric::Mse),
            "MSLE" => Ok(Metric::Msle),
            "RMSE" => Ok(Metric::Rmse),
            "RMSLE" => Ok(Metric::Rmsle),
            other => Err(AnalysisError::InvalidInput(format!(
                "metric must be one of MAE, MSE, MSLE, RMSE, RMSLE, but {} was applied",
                other
            ))),
        }
    }
}

pub struct StatsHelper;

impl StatsHelper {
    pub fn mean<I: IntoIterator<Item = f64>>(values: I) -> f64 {
        let (sum, count) = values
            .into_iter()
            .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
        if count == 0 {
            return 0.0;
        }
        sum / count as f64
    }

    pub fn rms<I: IntoIterator<Item = f64>>(values: I) -> f64 {
        Self::mean(values.into_iter().map(|v| v * v)).sqrt()
    }

    /// Median of the finite values, `None` when there are none.
    pub fn median(values: &[f64]) -> Option<f64> {
        let mut finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return None;
        }
        finite.sort_by(|a, b| a.total_cmp(b));
        let mid = finite.len() / 2;
        if finite.len() % 2 == 0 {
            Some((finite[mid - 1] + finite[mid]) / 2.0)
        } else {
            Some(finite[mid])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rms_zero_sequence_yields_zero() {
        assert_eq!(StatsHelper::rms(Vec::new()), 0.0);
        assert_eq!(StatsHelper::rms(vec![0.0, 0.0]), 0.0);
    }

    #[test]
    fn median_skips_non_finite_values() {
        assert_eq!(StatsHelper::median(&[3.0, f64::NAN, 1.0, 2.0]), Some(2.0));
        assert_eq!(StatsHelper::median(&[4.0, 1.0]), Some(2.5));
        assert_eq!(StatsHelper::median(&[f64::INFINITY]), None);
    }

    #[test]
    fn metrics_match_hand_computed_values() {
        let pairs = [(3.0, 1.0), (1.0, 1.0)];
        assert_eq!(Metric::Mae.evaluate(&pairs).unwrap(), 1.0);
        assert_eq!(Metric::Mse.evaluate(&pairs).unwrap(), 2.0);
        assert!((Metric::Rmse.evaluate(&pairs).unwrap() - 2.0_f64.sqrt()).abs() < 1e-12);
        assert_eq!(Metric::Rmsle.evaluate(&[(5.0, 5.0)]).unwrap(), 0.0);
        assert!(Metric::Msle.evaluate(&[]).is_err());
    }

    #[test]
    fn metric_names_parse_case_insensitively() {
        assert_eq!("rmsle".parse::<Metric>().unwrap(), Metric::Rmsle);
        assert_eq!("MAE".parse::<Metric>().unwrap(), Metric::Mae);
        assert!("R2".parse::<Metric>().is_err());
    }
}
