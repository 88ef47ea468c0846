use crate::prelude::{AnalysisError, AnalysisResult};
use crate::records::RecordFrame;
use crate::trend::{ChangeFinder, TrendOptions};
use chrono::NaiveDate;
use log::debug;

/// S-R trend change finder.
///
/// log10(Susceptible) is linear in Recovered while parameters stay constant,
/// so segments are found by binary segmentation of a piecewise-linear fit.
#[derive(Debug, Clone, Copy, Default)]
pub struct SrChangeFinder;

/// Points of one S-R curve.
struct SrCurve {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl SrCurve {
    /// Residual and total sums of squares of a least-squares line over `[start, end)`.
    fn sums(&self, start: usize, end: usize) -> (f64, f64) {
        let n = (end - start) as f64;
        if n < 2.0 {
            return (0.0, 0.0);
        }
        let xs = &self.x[start..end];
        let ys = &self.y[start..end];
        let mean_x = xs.iter().sum::<f64>() / n;
        let mean_y = ys.iter().sum::<f64>() / n;
        let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
        for (x, y) in xs.iter().zip(ys) {
            let (dx, dy) = (x - mean_x, y - mean_y);
            sxx += dx * dx;
            sxy += dx * dy;
            syy += dy * dy;
        }
        let rss = if sxx > 0.0 { (syy - sxy * sxy / sxx).max(0.0) } else { syy };
        (rss, syy)
    }

    fn split(&self, start: usize, end: usize, options: &TrendOptions, points: &mut Vec<usize>) {
        let min_size = options.min_size.max(2);
        if end - start < 2 * min_size {
            return;
        }
        let (rss, tss) = self.sums(start, end);
        if tss <= 0.0 {
            return;
        }
        let mut best: Option<(usize, f64)> = None;
        for k in (start + min_size)..=(end - min_size) {
            let gain = rss - self.sums(start, k).0 - self.sums(k, end).0;
            if best.map_or(true, |(_, current)| gain > current) {
                best = Some((k, gain));
            }
        }
        if let Some((k, gain)) = best {
            if gain > options.penalty * tss {
                self.split(start, k, options, points);
                points.push(k);
                self.split(k, end, options, points);
            }
        }
    }
}

impl ChangeFinder for SrChangeFinder {
    fn find(
        &self,
        records: &RecordFrame,
        population: u64,
        options: &TrendOptions,
    ) -> AnalysisResult<Vec<NaiveDate>> {
        if options.penalty.is_nan() || options.penalty < 0.0 {
            return Err(AnalysisError::InvalidInput(format!(
                "penalty must be a non-negative number, but {} was applied",
                options.penalty
            )));
        }
        let mut curve = SrCurve {
            x: Vec::with_capacity(records.len()),
            y: Vec::with_capacity(records.len()),
        };
        for record in records.records() {
            let susceptible = population as f64 - record.confirmed;
            if susceptible <= 0.0 {
                return Err(AnalysisError::InvalidInput(format!(
                    "susceptible population is exhausted on {}",
                    record.date
                )));
            }
            curve.x.push(record.recovered);
            curve.y.push(susceptible.log10());
        }
        let mut points = Vec::new();
        curve.split(0, records.len(), options, &mut points);
        let dates: Vec<NaiveDate> = points
            .into_iter()
            .map(|k| records.records()[k].date)
            .collect();
        debug!("S-R trend found {} change points", dates.len());
        Ok(dates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::date;
    use crate::records::Record;

    const POPULATION: u64 = 10_000_000;

    /// log10(S) falls with slope -1e-5 per recovered case, then -4e-5 from `kink`.
    fn kinked(days: usize, kink: usize) -> RecordFrame {
        let first = date("2020-04-01");
        let records = (0..days)
            .map(|t| {
                let recovered = 1000.0 * t as f64;
                let bend = 1000.0 * kink as f64;
                let log_s = if t < kink {
                    7.0 - 1e-5 * recovered
                } else {
                    7.0 - 1e-5 * bend - 4e-5 * (recovered - bend)
                };
                let confirmed = POPULATION as f64 - 10f64.powf(log_s);
                Record::new(
                    first + chrono::Duration::days(t as i64),
                    confirmed,
                    confirmed - recovered,
                    0.0,
                    recovered,
                    POPULATION,
                )
            })
            .collect();
        RecordFrame::new(records).unwrap()
    }

    #[test]
    fn detects_the_slope_change() {
        let records = kinked(60, 30);
        let dates = SrChangeFinder.find(&records, POPULATION, &TrendOptions::default()).unwrap();
        assert_eq!(dates.len(), 1);
        let offset = (dates[0] - date("2020-05-01")).num_days().abs();
        assert!(offset <= 2, "detected {}", dates[0]);
    }

    #[test]
    fn straight_curve_has_no_change() {
        let records = kinked(40, 100);
        let dates = SrChangeFinder.find(&records, POPULATION, &TrendOptions::default()).unwrap();
        assert!(dates.is_empty());
    }

    #[test]
    fn short_series_cannot_be_split() {
        let records = kinked(12, 6);
        let dates = SrChangeFinder.find(&records, POPULATION, &TrendOptions::default()).unwrap();
        assert!(dates.is_empty());
    }

    #[test]
    fn min_size_bounds_segments() {
        let records = kinked(60, 30);
        let options = TrendOptions {
            min_size: 35,
            ..Default::default()
        };
        assert!(SrChangeFinder.find(&records, POPULATION, &options).unwrap().is_empty());
    }
}
