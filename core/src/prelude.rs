use chrono::NaiveDate;

/// Name of the default scenario. It always exists and serves as the branch template.
pub const MAIN: &str = "Main";

/// Minutes in one day; tau values must divide it.
pub const MINUTES_PER_DAY: u32 = 1440;

/// Common error type for phase, tracker and scenario operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid range: {0}")]
    Range(String),
    #[error("precondition not met: {0}")]
    Precondition(String),
    #[error("conflicting arguments: {0}")]
    ArgumentConflict(String),
    #[error("estimation of {phase} phase failed: {reason}")]
    Estimation { phase: String, reason: String },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("report could not be rendered: {0}")]
    Report(String),
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Validates a tau value [min].
pub fn ensure_tau(tau: u32) -> AnalysisResult<u32> {
    if tau == 0 || MINUTES_PER_DAY % tau != 0 {
        return Err(AnalysisError::InvalidInput(format!(
            "tau must be a divisor of {}, but {} was applied",
            MINUTES_PER_DAY, tau
        )));
    }
    Ok(tau)
}

pub fn ensure_population(population: u64) -> AnalysisResult<u64> {
    if population == 0 {
        return Err(AnalysisError::InvalidInput(
            "population must be a natural number".into(),
        ));
    }
    Ok(population)
}

/// Inclusive number of days between two dates.
pub fn days_between(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

pub fn tomorrow(date: NaiveDate) -> AnalysisResult<NaiveDate> {
    date.succ_opt()
        .ok_or_else(|| AnalysisError::Range(format!("no date follows {}", date)))
}

pub fn yesterday(date: NaiveDate) -> AnalysisResult<NaiveDate> {
    date.pred_opt()
        .ok_or_else(|| AnalysisError::Range(format!("no date precedes {}", date)))
}

#[cfg(test)]
pub(crate) fn date(text: &str) -> NaiveDate {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tau_must_divide_one_day() {
        assert_eq!(ensure_tau(720), Ok(720));
        assert_eq!(ensure_tau(1440), Ok(1440));
        assert!(matches!(ensure_tau(1000), Err(AnalysisError::InvalidInput(_))));
        assert!(matches!(ensure_tau(0), Err(AnalysisError::InvalidInput(_))));
    }

    #[test]
    fn days_between_is_inclusive() {
        assert_eq!(days_between(date("2020-01-01"), date("2020-01-01")), 1);
        assert_eq!(days_between(date("2020-01-01"), date("2020-01-31")), 31);
    }
}
