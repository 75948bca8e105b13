//! Merged Table Module
//! The combined long table served to requests, plus conversions to and from rows.

use crate::data::model::{columns, date_from_days, days_from_date, TimeSeriesRow, ALL_PROVINCES};
use chrono::{DateTime, Utc};
use polars::prelude::*;
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TableError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Null value in column '{column}' at row {row}")]
    NullValue { column: &'static str, row: usize },
    #[error("Date value {0} is out of range")]
    InvalidDate(i32),
}

/// State selector choices for one country.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateOptions {
    /// Provinces plus `<all>`, sorted.
    pub options: Vec<String>,
    /// Default selection, always `<all>`.
    pub selected: String,
}

/// The merged confirmed/deaths table with the time it was fetched.
#[derive(Debug, Clone)]
pub struct MergedTable {
    df: DataFrame,
    fetched_at: DateTime<Utc>,
}

impl MergedTable {
    pub fn new(df: DataFrame, fetched_at: DateTime<Utc>) -> Self {
        Self { df, fetched_at }
    }

    /// Rebuild a table from persisted rows.
    pub fn from_rows(rows: &[TimeSeriesRow], fetched_at: DateTime<Utc>) -> Result<Self, TableError> {
        let df = DataFrame::new(vec![
            Column::new(
                columns::COUNTRY.into(),
                rows.iter().map(|r| r.country.as_str()).collect::<Vec<_>>(),
            ),
            Column::new(
                columns::PROVINCE.into(),
                rows.iter().map(|r| r.province.as_str()).collect::<Vec<_>>(),
            ),
            Column::new(
                columns::LAT.into(),
                rows.iter().map(|r| r.latitude).collect::<Vec<f64>>(),
            ),
            Column::new(
                columns::LONG.into(),
                rows.iter().map(|r| r.longitude).collect::<Vec<f64>>(),
            ),
            Column::new(
                columns::DATE.into(),
                rows.iter().map(|r| days_from_date(r.date)).collect::<Vec<i32>>(),
            )
            .cast(&DataType::Date)?,
            Column::new(
                columns::CONFIRMED.into(),
                rows.iter().map(|r| r.cumulative_confirmed).collect::<Vec<i64>>(),
            ),
            Column::new(
                columns::DEATHS.into(),
                rows.iter().map(|r| r.cumulative_deaths).collect::<Vec<i64>>(),
            ),
        ])?;

        Ok(Self { df, fetched_at })
    }

    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// Get the number of rows in the table.
    pub fn row_count(&self) -> usize {
        self.df.height()
    }

    pub fn to_rows(&self) -> Result<Vec<TimeSeriesRow>, TableError> {
        rows_from_frame(&self.df)
    }

    /// Sorted unique country names.
    pub fn countries(&self) -> Vec<String> {
        self.df
            .column(columns::COUNTRY)
            .ok()
            .and_then(|c| c.str().ok())
            .map(|ca| {
                ca.into_iter()
                    .flatten()
                    .map(|s| s.to_string())
                    .collect::<BTreeSet<String>>()
                    .into_iter()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Province choices for a country: its provinces plus `<all>`, sorted,
    /// with `<all>` selected.
    pub fn state_options(&self, country: &str) -> StateOptions {
        let mut options: BTreeSet<String> = self
            .df
            .clone()
            .lazy()
            .filter(col(columns::COUNTRY).eq(lit(country)))
            .select([col(columns::PROVINCE)])
            .collect()
            .ok()
            .and_then(|df| df.column(columns::PROVINCE).ok().cloned())
            .map(|column| {
                column
                    .str()
                    .ok()
                    .map(|ca| ca.into_iter().flatten().map(|s| s.to_string()).collect())
                    .unwrap_or_default()
            })
            .unwrap_or_default();
        options.insert(ALL_PROVINCES.to_string());

        StateOptions {
            options: options.into_iter().collect(),
            selected: ALL_PROVINCES.to_string(),
        }
    }
}

/// Read rows out of a frame with the merged-table column layout.
pub fn rows_from_frame(df: &DataFrame) -> Result<Vec<TimeSeriesRow>, TableError> {
    let countries = df.column(columns::COUNTRY)?.str()?;
    let provinces = df.column(columns::PROVINCE)?.str()?;
    let lats = df.column(columns::LAT)?.cast(&DataType::Float64)?;
    let longs = df.column(columns::LONG)?.cast(&DataType::Float64)?;
    let dates = df.column(columns::DATE)?.cast(&DataType::Int32)?;
    let confirmed = df.column(columns::CONFIRMED)?.cast(&DataType::Int64)?;
    let deaths = df.column(columns::DEATHS)?.cast(&DataType::Int64)?;

    let (lats, longs, dates) = (lats.f64()?, longs.f64()?, dates.i32()?);
    let (confirmed, deaths) = (confirmed.i64()?, deaths.i64()?);

    (0..df.height())
        .map(|row| {
            let days = dates.get(row).ok_or(TableError::NullValue {
                column: columns::DATE,
                row,
            })?;

            Ok(TimeSeriesRow {
                country: countries
                    .get(row)
                    .ok_or(TableError::NullValue {
                        column: columns::COUNTRY,
                        row,
                    })?
                    .to_string(),
                province: provinces.get(row).unwrap_or(ALL_PROVINCES).to_string(),
                // Regions without published coordinates carry NaN.
                latitude: lats.get(row).unwrap_or(f64::NAN),
                longitude: longs.get(row).unwrap_or(f64::NAN),
                date: date_from_days(days).ok_or(TableError::InvalidDate(days))?,
                // Metric nulls were summed as zero when reshaping.
                cumulative_confirmed: confirmed.get(row).unwrap_or(0),
                cumulative_deaths: deaths.get(row).unwrap_or(0),
            })
        })
        .collect()
}
