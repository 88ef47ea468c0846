use crate::phase::ordinal::{ordinal, parse_phase_name, LAST};
use crate::phase::unit::{PhaseSetting, PhaseSummary, PhaseUnit};
use crate::prelude::{ensure_population, tomorrow, yesterday, AnalysisError, AnalysisResult};
use chrono::{Duration, NaiveDate};
use log::debug;

/// Chronologically ordered phases of one timeline.
///
/// Registered phases, enabled or not, tile `[first_date, end of the last phase]`
/// without gaps or overlaps. Disabled phases keep their dates so they can be
/// re-enabled, but they are skipped by summaries, simulation and estimation.
/// Phase names are positional ("0th", "1st", ...) and change after every
/// structural edit.
#[derive(Debug, Clone)]
pub struct PhaseSeries {
    first_date: NaiveDate,
    last_date: NaiveDate,
    init_population: u64,
    units: Vec<PhaseUnit>,
}

impl PhaseSeries {
    /// Empty series bounded by `first_date` and `last_date`.
    pub fn new(first_date: NaiveDate, last_date: NaiveDate, population: u64) -> AnalysisResult<Self> {
        if first_date > last_date {
            return Err(AnalysisError::Range(format!(
                "last date ({}) must not be earlier than first date ({})",
                last_date, first_date
            )));
        }
        Ok(Self {
            first_date,
            last_date,
            init_population: ensure_population(population)?,
            units: Vec::new(),
        })
    }

    pub fn first_date(&self) -> NaiveDate {
        self.first_date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.last_date
    }

    pub fn init_population(&self) -> u64 {
        self.init_population
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn units(&self) -> &[PhaseUnit] {
        &self.units
    }

    pub(crate) fn units_mut(&mut self) -> &mut [PhaseUnit] {
        &mut self.units
    }

    /// Every registered phase with its positional name.
    pub fn named(&self) -> impl Iterator<Item = (String, &PhaseUnit)> {
        self.units.iter().enumerate().map(|(i, unit)| (ordinal(i), unit))
    }

    pub fn enabled(&self) -> impl Iterator<Item = (String, &PhaseUnit)> {
        self.named().filter(|(_, unit)| unit.is_enabled())
    }

    /// Index of a phase name or of the "last" selector.
    pub fn index_of(&self, name: &str) -> AnalysisResult<usize> {
        let index = if name == LAST {
            self.units
                .len()
                .checked_sub(1)
                .ok_or_else(|| AnalysisError::NotFound("no phases have been registered".into()))?
        } else {
            parse_phase_name(name)?
        };
        if index >= self.units.len() {
            return Err(AnalysisError::NotFound(format!(
                "{} phase is not registered ({} phases exist)",
                name,
                self.units.len()
            )));
        }
        Ok(index)
    }

    pub fn unit(&self, name: &str) -> AnalysisResult<&PhaseUnit> {
        Ok(&self.units[self.index_of(name)?])
    }

    /// Registered phase that contains the date.
    pub fn find(&self, date: NaiveDate) -> AnalysisResult<(String, &PhaseUnit)> {
        self.named()
            .find(|(_, unit)| unit.contains(date))
            .ok_or_else(|| AnalysisError::NotFound(format!("phase on {} is not registered", date)))
    }

    /// Appends a phase after the last registered one.
    ///
    /// `end_date` wins over `days`; with neither, the phase runs to the last date.
    pub fn add(&mut self, end_date: Option<NaiveDate>, days: Option<u32>, setting: &PhaseSetting) -> AnalysisResult<()> {
        let start = match self.units.last() {
            Some(unit) => tomorrow(unit.end_date())?,
            None => self.first_date,
        };
        if start > self.last_date {
            return Err(AnalysisError::Range(format!(
                "all dates up to the last date ({}) have been registered",
                self.last_date
            )));
        }
        let end = match (end_date, days) {
            (Some(end), _) => end,
            (None, Some(0)) => {
                return Err(AnalysisError::Range("days must be a natural number".into()));
            }
            (None, Some(days)) => start
                .checked_add_signed(Duration::days(i64::from(days) - 1))
                .ok_or_else(|| {
                    AnalysisError::Range(format!(
                        "{} days from {} exceed the last date ({})",
                        days, start, self.last_date
                    ))
                })?,
            (None, None) => self.last_date,
        };
        if end < start {
            return Err(AnalysisError::Range(format!(
                "end date ({}) of the new phase must not be earlier than its start date ({})",
                end, start
            )));
        }
        if end > self.last_date {
            return Err(AnalysisError::Range(format!(
                "end date ({}) of the new phase must not exceed the last date ({})",
                end, self.last_date
            )));
        }
        let unit = PhaseUnit::inherit(start, end, self.units.last(), setting, self.init_population)?;
        debug!("adding {} phase: {} - {}", ordinal(self.units.len()), start, end);
        self.units.push(unit);
        Ok(())
    }

    /// Deletes phases by name.
    ///
    /// The range of a deleted last phase becomes unregistered; any other deleted
    /// range is absorbed by the phase right before it. The 0th phase is disabled
    /// instead of deleted.
    ///
    /// The dates of an enabled phase are never absorbed by a disabled phase that
    /// stays registered; such a request fails with `Range`.
    pub fn delete(&mut self, names: &[&str]) -> AnalysisResult<()> {
        let mut indices = self.indices(names)?;
        indices.sort_unstable_by(|a, b| b.cmp(a));
        indices.dedup();
        let mut units = self.units.clone();
        for &index in &indices {
            if index == 0 {
                units[0].disable();
                continue;
            }
            let removed = units.remove(index);
            if index < units.len() {
                let previous = &mut units[index - 1];
                if removed.is_enabled() && !previous.is_enabled() && !indices.contains(&(index - 1)) {
                    return Err(AnalysisError::Range(format!(
                        "{} phase cannot be deleted because {} phase before it is disabled",
                        ordinal(index),
                        ordinal(index - 1)
                    )));
                }
                let start = previous.start_date();
                previous.set_dates(start, removed.end_date())?;
            }
        }
        self.commit(units)
    }

    pub fn disable(&mut self, names: &[&str]) -> AnalysisResult<()> {
        let indices = self.indices(names)?;
        for index in indices {
            self.units[index].disable();
        }
        Ok(())
    }

    pub fn enable(&mut self, names: &[&str]) -> AnalysisResult<()> {
        let indices = self.indices(names)?;
        let mut units = self.units.clone();
        for index in indices {
            units[index].enable();
        }
        self.commit(units)
    }

    /// Merges chronologically adjacent enabled phases into one unestimated phase.
    pub fn combine(&mut self, names: &[&str], setting: &PhaseSetting) -> AnalysisResult<()> {
        let mut indices: Vec<usize> = self
            .indices(names)?
            .into_iter()
            .filter(|i| self.units[*i].is_enabled())
            .collect();
        indices.sort_unstable();
        indices.dedup();
        let (Some(&head), Some(&tail)) = (indices.first(), indices.last()) else {
            return Err(AnalysisError::NotFound(
                "no enabled phases were selected to combine".into(),
            ));
        };
        if tail - head + 1 != indices.len() {
            return Err(AnalysisError::Range(format!(
                "phases to combine must be contiguous, but {} were selected",
                indices.iter().map(|i| ordinal(*i)).collect::<Vec<_>>().join(", ")
            )));
        }
        let first = &self.units[head];
        let merged = PhaseUnit::inherit(
            first.start_date(),
            self.units[tail].end_date(),
            Some(first),
            setting,
            self.init_population,
        )?;
        let mut units = self.units.clone();
        units.splice(head..=tail, [merged]);
        debug!("combined {} - {} phases", ordinal(head), ordinal(tail));
        self.commit(units)
    }

    /// Splits the enabled phase containing `date` so that `date` starts a new phase.
    ///
    /// Separating at an existing start date is a no-op. Overrides apply to the
    /// new (later) phase only.
    pub fn separate(&mut self, date: NaiveDate, setting: &PhaseSetting) -> AnalysisResult<()> {
        let index = self
            .units
            .iter()
            .position(|unit| unit.contains(date))
            .ok_or_else(|| {
                AnalysisError::Range(format!("{} is not included in any registered phase", date))
            })?;
        let parent = &self.units[index];
        if !parent.is_enabled() {
            return Err(AnalysisError::Range(format!(
                "{} is included in the disabled {} phase",
                date,
                ordinal(index)
            )));
        }
        if parent.start_date() == date {
            return Ok(());
        }
        let mut former = parent.clone();
        former.set_dates(parent.start_date(), yesterday(date)?)?;
        let latter = PhaseUnit::inherit(date, parent.end_date(), Some(parent), setting, self.init_population)?;
        let mut units = self.units.clone();
        units.splice(index..=index, [former, latter]);
        debug!("separated {} phase on {}", ordinal(index), date);
        self.commit(units)
    }

    /// Start dates of every phase after the first one, i.e. the change points.
    pub fn change_dates(&self) -> Vec<NaiveDate> {
        self.units.iter().skip(1).map(|unit| unit.start_date()).collect()
    }

    /// One row per enabled phase.
    pub fn summary(&self) -> Vec<PhaseSummary> {
        self.enabled().map(|(name, unit)| unit.summary(&name)).collect()
    }

    /// Index of the first phase after the last estimated one.
    fn future_start(&self) -> usize {
        self.units
            .iter()
            .rposition(PhaseUnit::is_estimated)
            .map_or(0, |i| i + 1)
    }

    /// (enabled, disabled) names of phases that start after the last estimated phase.
    pub fn future_phases(&self) -> (Vec<String>, Vec<String>) {
        let (enabled, disabled): (Vec<_>, Vec<_>) = self
            .named()
            .skip(self.future_start())
            .partition(|(_, unit)| unit.is_enabled());
        let names = |named: Vec<(String, &PhaseUnit)>| -> Vec<String> {
            named.into_iter().map(|(name, _)| name).collect()
        };
        (names(enabled), names(disabled))
    }

    /// Removes every phase, or only the future ones when `include_past` is false.
    pub fn clear(&mut self, include_past: bool) {
        if include_past {
            self.units.clear();
        } else {
            let keep = self.future_start();
            self.units.truncate(keep);
        }
    }

    /// Replaces every phase with one unestimated phase over the full range.
    pub fn reset(&mut self) -> AnalysisResult<()> {
        let unit = PhaseUnit::new(self.first_date, self.last_date, self.init_population)?;
        self.units = vec![unit];
        Ok(())
    }

    pub fn replace_all(&mut self, units: Vec<PhaseUnit>) -> AnalysisResult<()> {
        self.commit(units)
    }

    pub(crate) fn set_tau(&mut self, tau: Option<u32>) {
        for unit in &mut self.units {
            unit.set_tau(tau);
        }
    }

    fn indices(&self, names: &[&str]) -> AnalysisResult<Vec<usize>> {
        if names.is_empty() {
            return Err(AnalysisError::InvalidInput("phase names must not be empty".into()));
        }
        names.iter().map(|name| self.index_of(name)).collect()
    }

    /// Validates the tiling of `units` and stores them.
    fn commit(&mut self, units: Vec<PhaseUnit>) -> AnalysisResult<()> {
        let mut expected = self.first_date;
        for (i, unit) in units.iter().enumerate() {
            if unit.start_date() != expected {
                return Err(AnalysisError::Range(format!(
                    "{} phase must start on {}, but starts on {}",
                    ordinal(i),
                    expected,
                    unit.start_date()
                )));
            }
            if unit.end_date() > self.last_date {
                return Err(AnalysisError::Range(format!(
                    "{} phase ends on {}, after the last date ({})",
                    ordinal(i),
                    unit.end_date(),
                    self.last_date
                )));
            }
            expected = tomorrow(unit.end_date())?;
        }
        self.units = units;
        Ok(())
    }
}
