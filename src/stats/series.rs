//! Series Calculator Module
//! Day-over-day deltas and trailing moving averages for a filtered series.

use crate::data::{DateRange, DerivedRow, TimeSeriesRow, SMA_WINDOW};
use statrs::statistics::Statistics;

/// Derives "new" metrics from cumulative series.
pub struct SeriesCalculator;

impl SeriesCalculator {
    /// First difference of a cumulative series. The first value is zero.
    pub fn first_difference(cumulative: &[i64]) -> Vec<i64> {
        let mut out = Vec::with_capacity(cumulative.len());
        if let Some(&first) = cumulative.first() {
            out.push(0);
            let mut previous = first;
            for &value in &cumulative[1..] {
                out.push(value - previous);
                previous = value;
            }
        }
        out
    }

    /// Trailing mean over `window` points; `None` until a full window is available.
    pub fn trailing_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
        if window == 0 {
            return vec![None; values.len()];
        }

        (0..values.len())
            .map(|i| {
                if i + 1 < window {
                    None
                } else {
                    Some(values[i + 1 - window..=i].iter().mean())
                }
            })
            .collect()
    }

    /// Extend a date-sorted series with deltas and 7-point moving averages.
    pub fn derive(rows: Vec<TimeSeriesRow>) -> Vec<DerivedRow> {
        let confirmed: Vec<i64> = rows.iter().map(|r| r.cumulative_confirmed).collect();
        let deaths: Vec<i64> = rows.iter().map(|r| r.cumulative_deaths).collect();

        let new_confirmed = Self::first_difference(&confirmed);
        let new_deaths = Self::first_difference(&deaths);
        let confirmed_sma = Self::trailing_mean(&Self::as_f64(&new_confirmed), SMA_WINDOW);
        let deaths_sma = Self::trailing_mean(&Self::as_f64(&new_deaths), SMA_WINDOW);

        rows.into_iter()
            .enumerate()
            .map(|(i, row)| DerivedRow {
                row,
                new_confirmed: new_confirmed[i],
                new_deaths: new_deaths[i],
                new_confirmed_sma7: confirmed_sma[i],
                new_deaths_sma7: deaths_sma[i],
            })
            .collect()
    }

    /// Keep rows inside the date range. Applied after `derive` so that
    /// deltas and averages at the range start see the preceding days.
    pub fn clip(rows: Vec<DerivedRow>, range: DateRange) -> Vec<DerivedRow> {
        rows.into_iter()
            .filter(|r| range.contains(r.row.date))
            .collect()
    }

    fn as_f64(values: &[i64]) -> Vec<f64> {
        values.iter().map(|&v| v as f64).collect()
    }
}
