use crate::ode::OdeModel;
use crate::prelude::{AnalysisError, AnalysisResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named parameter values of an ODE model.
///
/// Entries are only checked against a model when the set is assigned to a
/// phase or handed to an estimator, so one set can carry overrides for several
/// models before a model is chosen.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamSet(BTreeMap<String, f64>);

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.0.insert(name.into(), value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Copy of `self` with the entries of `overrides` applied on top.
    pub fn merged(&self, overrides: &ParamSet) -> ParamSet {
        let mut merged = self.clone();
        for (name, value) in overrides.iter() {
            merged.insert(name, value);
        }
        merged
    }

    /// Entries whose names the model declares.
    pub fn restricted_to(&self, model: &dyn OdeModel) -> ParamSet {
        ParamSet(
            self.0
                .iter()
                .filter(|(name, _)| model.parameters().contains(&name.as_str()))
                .map(|(name, value)| (name.clone(), *value))
                .collect(),
        )
    }

    /// Checks names and values against the model's declared parameters.
    pub fn validate_for(&self, model: &dyn OdeModel) -> AnalysisResult<()> {
        for (name, value) in self.iter() {
            if !model.parameters().contains(&name) {
                return Err(AnalysisError::InvalidInput(format!(
                    "{} is not a parameter of {} model (parameters: {})",
                    name,
                    model.name(),
                    model.parameters().join(", ")
                )));
            }
            if !value.is_finite() || value < 0.0 {
                return Err(AnalysisError::InvalidInput(format!(
                    "{} must be a non-negative finite value, but {} was applied",
                    name, value
                )));
            }
            if let Some(upper) = model.upper_bound(name) {
                if value > upper {
                    return Err(AnalysisError::InvalidInput(format!(
                        "{} must be {} or lower, but {} was applied",
                        name, upper, value
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn is_complete_for(&self, model: &dyn OdeModel) -> bool {
        model.parameters().iter().all(|name| self.contains(name))
    }

    /// Values ordered as `model.parameters()`.
    pub fn values_for(&self, model: &dyn OdeModel) -> AnalysisResult<Vec<f64>> {
        self.validate_for(model)?;
        model
            .parameters()
            .iter()
            .map(|name| {
                self.get(name).ok_or_else(|| {
                    AnalysisError::Precondition(format!(
                        "value of {} has not been set for {} model",
                        name,
                        model.name()
                    ))
                })
            })
            .collect()
    }

    pub fn from_values(model: &dyn OdeModel, values: &[f64]) -> ParamSet {
        ParamSet(
            model
                .parameters()
                .iter()
                .zip(values)
                .map(|(name, value)| (name.to_string(), *value))
                .collect(),
        )
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for ParamSet {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        ParamSet(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
