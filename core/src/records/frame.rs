use crate::prelude::{AnalysisError, AnalysisResult};
use crate::records::Variable;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One day of observed case counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub date: NaiveDate,
    pub confirmed: f64,
    pub infected: f64,
    pub fatal: f64,
    pub recovered: f64,
    pub population: u64,
}

impl Record {
    pub fn new(
        date: NaiveDate,
        confirmed: f64,
        infected: f64,
        fatal: f64,
        recovered: f64,
        population: u64,
    ) -> Self {
        Self {
            date,
            confirmed,
            infected,
            fatal,
            recovered,
            population,
        }
    }

    pub fn susceptible(&self) -> f64 {
        self.population as f64 - self.confirmed
    }

    pub fn value(&self, variable: Variable) -> f64 {
        match variable {
            Variable::Susceptible => self.susceptible(),
            Variable::Confirmed => self.confirmed,
            Variable::Infected => self.infected,
            Variable::Fatal => self.fatal,
            Variable::Recovered => self.recovered,
            Variable::FatalOrRecovered => self.fatal + self.recovered,
            Variable::Vaccinated | Variable::Exposed | Variable::Waiting => 0.0,
        }
    }
}

/// Read-only, daily-indexed table of records.
///
/// Dates are consecutive, so positional lookup by date is constant time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordFrame {
    records: Vec<Record>,
}

impl RecordFrame {
    pub fn new(records: Vec<Record>) -> AnalysisResult<Self> {
        if records.is_empty() {
            return Err(AnalysisError::InvalidInput("records must not be empty".into()));
        }
        for pair in records.windows(2) {
            if pair[0].date.succ_opt() != Some(pair[1].date) {
                return Err(AnalysisError::InvalidInput(format!(
                    "records must have consecutive daily dates, but {} is followed by {}",
                    pair[0].date, pair[1].date
                )));
            }
        }
        if let Some(bad) = records.iter().find(|r| {
            [r.confirmed, r.infected, r.fatal, r.recovered]
                .iter()
                .any(|v| !v.is_finite() || *v < 0.0)
        }) {
            return Err(AnalysisError::InvalidInput(format!(
                "records on {} have negative or non-finite values",
                bad.date
            )));
        }
        if records.iter().any(|r| r.population == 0) {
            return Err(AnalysisError::InvalidInput(
                "population of records must be a natural number".into(),
            ));
        }
        Ok(Self { records })
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.records[0].date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.records[self.records.len() - 1].date
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.first_date() <= date && date <= self.last_date()
    }

    fn position(&self, date: NaiveDate) -> Option<usize> {
        if !self.contains(date) {
            return None;
        }
        usize::try_from((date - self.first_date()).num_days()).ok()
    }

    pub fn get(&self, date: NaiveDate) -> AnalysisResult<&Record> {
        self.position(date)
            .and_then(|idx| self.records.get(idx))
            .ok_or_else(|| AnalysisError::NotFound(format!("records on {} are not registered", date)))
    }

    /// Latest record at or before the date.
    pub fn last_known(&self, date: NaiveDate) -> AnalysisResult<&Record> {
        if date < self.first_date() {
            return Err(AnalysisError::NotFound(format!(
                "no records were registered on or before {}",
                date
            )));
        }
        self.get(date.min(self.last_date()))
    }

    pub fn value(&self, date: NaiveDate, variable: Variable) -> AnalysisResult<f64> {
        self.get(date).map(|record| record.value(variable))
    }

    /// Population value of the last record.
    pub fn population(&self) -> u64 {
        self.records[self.records.len() - 1].population
    }

    /// Owned copy of the records from `start` to `end` (both inclusive).
    pub fn slice(&self, start: NaiveDate, end: NaiveDate) -> AnalysisResult<RecordFrame> {
        if start > end {
            return Err(AnalysisError::Range(format!(
                "start date {} must not be later than end date {}",
                start, end
            )));
        }
        let (Some(from), Some(to)) = (self.position(start), self.position(end)) else {
            return Err(AnalysisError::Range(format!(
                "{} - {} is outside of the records ({} - {})",
                start,
                end,
                self.first_date(),
                self.last_date()
            )));
        };
        Ok(Self {
            records: self.records[from..=to].to_vec(),
        })
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::prelude::date;

    /// Smooth synthetic outbreak: infected grow then shrink, cumulative counts increase.
    pub fn outbreak(start: &str, days: usize, population: u64) -> RecordFrame {
        let first = date(start);
        let records = (0..days)
            .map(|i| {
                let t = i as f64;
                let confirmed = 100.0 + 40.0 * t + 2.0 * t * t;
                let fatal = 1.0 + 0.02 * confirmed;
                let recovered = 0.4 * confirmed * (t / (t + 10.0));
                let infected = confirmed - fatal - recovered;
                Record::new(
                    first + chrono::Duration::days(i as i64),
                    confirmed,
                    infected,
                    fatal,
                    recovered,
                    population,
                )
            })
            .collect();
        RecordFrame::new(records).unwrap()
    }
}
