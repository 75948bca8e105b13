//! Region Filter Module
//! Slices the merged table down to one country/state series.

use crate::data::model::{columns, TimeSeriesRow, ALL_PROVINCES};
use crate::data::table::{rows_from_frame, MergedTable, TableError};
use chrono::NaiveDate;
use polars::prelude::*;

/// Inclusive date range selected in the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// First day covered by the source data.
    pub fn first_report_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, 22).unwrap_or_default()
    }

    /// The full selectable range, [2020-01-22, today].
    pub fn full(today: NaiveDate) -> Self {
        Self {
            start: Self::first_report_date(),
            end: today.max(Self::first_report_date()),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

pub struct RegionFilter;

impl RegionFilter {
    /// Rows for `country` and `state`, sorted by date.
    ///
    /// With `state == "<all>"` every province of the country is summed per
    /// date and the coordinates take the median across provinces.
    pub fn series(
        table: &MergedTable,
        country: &str,
        state: &str,
    ) -> Result<Vec<TimeSeriesRow>, TableError> {
        let country_rows = table
            .dataframe()
            .clone()
            .lazy()
            .filter(col(columns::COUNTRY).eq(lit(country)));

        let selected = if state == ALL_PROVINCES {
            country_rows
                .group_by([col(columns::DATE)])
                .agg([
                    col(columns::CONFIRMED).sum(),
                    col(columns::DEATHS).sum(),
                    col(columns::LAT).median(),
                    col(columns::LONG).median(),
                ])
                .with_columns([
                    lit(country).alias(columns::COUNTRY),
                    lit(ALL_PROVINCES).alias(columns::PROVINCE),
                ])
        } else {
            country_rows.filter(col(columns::PROVINCE).eq(lit(state)))
        };

        let df = selected
            .sort([columns::DATE], SortMultipleOptions::default())
            .collect()?;

        rows_from_frame(&df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::table::tests::sample_table;

    #[test]
    fn all_provinces_are_summed_per_date() {
        let rows = RegionFilter::series(&sample_table(), "Canada", ALL_PROVINCES).unwrap();

        let confirmed: Vec<i64> = rows.iter().map(|r| r.cumulative_confirmed).collect();
        assert_eq!(confirmed, vec![15, 35]);
        let deaths: Vec<i64> = rows.iter().map(|r| r.cumulative_deaths).collect();
        assert_eq!(deaths, vec![1, 3]);
        assert!(rows.iter().all(|r| r.province == ALL_PROVINCES && r.country == "Canada"));
        assert!(rows.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn all_includes_the_country_wide_row() {
        let rows = RegionFilter::series(&sample_table(), "France", ALL_PROVINCES).unwrap();
        let confirmed: Vec<i64> = rows.iter().map(|r| r.cumulative_confirmed).collect();
        assert_eq!(confirmed, vec![103, 134]);
    }

    #[test]
    fn single_province_is_passed_through() {
        let rows = RegionFilter::series(&sample_table(), "Canada", "Quebec").unwrap();
        let confirmed: Vec<i64> = rows.iter().map(|r| r.cumulative_confirmed).collect();
        assert_eq!(confirmed, vec![5, 15]);
        assert!((rows[0].latitude - 1.5).abs() < 1e-9);
    }

    #[test]
    fn unknown_region_is_empty() {
        let rows = RegionFilter::series(&sample_table(), "Canada", "Yukon").unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn full_range_is_bounded_below_by_first_report() {
        let range = DateRange::full(NaiveDate::from_ymd_opt(2021, 6, 1).unwrap());
        assert!(range.contains(NaiveDate::from_ymd_opt(2020, 1, 22).unwrap()));
        assert!(!range.contains(NaiveDate::from_ymd_opt(2020, 1, 21).unwrap()));
        assert!(!range.contains(NaiveDate::from_ymd_opt(2021, 6, 2).unwrap()));
    }
}
