//! Reshaper Module
//! Turns a wide time-series table (one column per date) into a long table
//! with one row per (country, province, date).

use crate::data::model::{columns, days_from_date, Metric, Scope, ALL_PROVINCES};
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::HashMap;
use thiserror::Error;

/// Header format of the per-date columns, e.g. `1/22/20`.
pub const DATE_HEADER_FORMAT: &str = "%m/%d/%y";

/// Internal key column used between the unpivot and the region join.
const REGION_ID: &str = "region_id";

#[derive(Error, Debug)]
pub enum ReshapeError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Missing required column '{0}'")]
    MissingColumn(String),
    #[error("Table has no date columns")]
    NoDateColumns,
}

/// Converts wide source tables to long format.
pub struct Reshaper;

impl Reshaper {
    /// Parse a date column header. Metadata headers (`UID`, `Population`, ...) yield `None`.
    pub fn parse_date_header(name: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(name.trim(), DATE_HEADER_FORMAT).ok()
    }

    /// Date columns of a wide table, in header order.
    pub fn date_columns(df: &DataFrame) -> Vec<(String, NaiveDate)> {
        df.get_column_names()
            .iter()
            .filter_map(|name| {
                Self::parse_date_header(name.as_str()).map(|date| (name.to_string(), date))
            })
            .collect()
    }

    /// Unpivot a wide table into long format (stack operation), then collapse
    /// rows sharing a (country, province) key.
    ///
    /// Output columns: [country, province, lat, long, date, <metric column>]
    ///
    /// The metric is summed within a key, coordinates take the group median.
    /// Rows without a province get the `<all>` sentinel. Every non-date
    /// metadata column, `Population` included, stays off the date axis.
    pub fn wide_to_long(
        df: &DataFrame,
        scope: Scope,
        metric: Metric,
    ) -> Result<DataFrame, ReshapeError> {
        let layout = scope.layout();
        let countries = Self::text_values(df, layout.country)?;
        let provinces = Self::text_values(df, layout.province)?;
        let lats = Self::float_values(df, layout.lat)?;
        let longs = Self::float_values(df, layout.long)?;

        let date_cols = Self::date_columns(df);
        if date_cols.is_empty() {
            return Err(ReshapeError::NoDateColumns);
        }

        // One id per (country, province) key; the per-cell rows carry only the id.
        let mut region_index: HashMap<(&str, &str), u32> = HashMap::new();
        let mut region_country: Vec<&str> = Vec::new();
        let mut region_province: Vec<&str> = Vec::new();
        let row_regions: Vec<Option<u32>> = countries
            .iter()
            .zip(&provinces)
            .map(|(country, province)| {
                let country = country.as_deref()?;
                let province = match province.as_deref() {
                    Some(p) if !p.trim().is_empty() => p,
                    _ => ALL_PROVINCES,
                };
                let id = *region_index.entry((country, province)).or_insert_with(|| {
                    region_country.push(country);
                    region_province.push(province);
                    region_country.len() as u32 - 1
                });
                Some(id)
            })
            .collect();

        let capacity = df.height() * date_cols.len();
        let mut out_region: Vec<u32> = Vec::with_capacity(capacity);
        let mut out_lat: Vec<Option<f64>> = Vec::with_capacity(capacity);
        let mut out_long: Vec<Option<f64>> = Vec::with_capacity(capacity);
        let mut out_date: Vec<i32> = Vec::with_capacity(capacity);
        let mut out_value: Vec<Option<i64>> = Vec::with_capacity(capacity);

        for (name, date) in &date_cols {
            let values = df.column(name)?.cast(&DataType::Int64)?;
            let values = values.i64()?;
            let days = days_from_date(*date);

            for (i, value) in values.into_iter().enumerate() {
                let Some(region) = row_regions[i] else {
                    continue;
                };
                out_region.push(region);
                out_lat.push(lats[i]);
                out_long.push(longs[i]);
                out_date.push(days);
                out_value.push(value);
            }
        }

        let regions = DataFrame::new(vec![
            Column::new(REGION_ID.into(), (0..region_country.len() as u32).collect::<Vec<u32>>()),
            Column::new(columns::COUNTRY.into(), region_country),
            Column::new(columns::PROVINCE.into(), region_province),
        ])?;

        let long = DataFrame::new(vec![
            Column::new(REGION_ID.into(), out_region),
            Column::new(columns::LAT.into(), out_lat),
            Column::new(columns::LONG.into(), out_long),
            Column::new(columns::DATE.into(), out_date).cast(&DataType::Date)?,
            Column::new(metric.column().into(), out_value),
        ])?;

        let grouped = long
            .lazy()
            .group_by([col(REGION_ID), col(columns::DATE)])
            .agg([
                col(metric.column()).sum(),
                col(columns::LAT).median(),
                col(columns::LONG).median(),
            ])
            .join(
                regions.lazy(),
                [col(REGION_ID)],
                [col(REGION_ID)],
                JoinArgs::new(JoinType::Inner),
            )
            .select([
                col(columns::COUNTRY),
                col(columns::PROVINCE),
                col(columns::LAT),
                col(columns::LONG),
                col(columns::DATE),
                col(metric.column()),
            ])
            .sort(
                [columns::COUNTRY, columns::PROVINCE, columns::DATE],
                SortMultipleOptions::default(),
            )
            .collect()?;

        Ok(grouped)
    }

    fn required<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column, ReshapeError> {
        df.column(name)
            .map_err(|_| ReshapeError::MissingColumn(name.to_string()))
    }

    fn text_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, ReshapeError> {
        let column = Self::required(df, name)?.cast(&DataType::String)?;
        Ok(column
            .str()?
            .into_iter()
            .map(|v| v.map(|s| s.to_string()))
            .collect())
    }

    fn float_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, ReshapeError> {
        let column = Self::required(df, name)?.cast(&DataType::Float64)?;
        Ok(column.f64()?.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::CsvLoader;
    use crate::data::model::date_from_days;
    use assert_matches::assert_matches;
    use std::collections::BTreeMap;

    const US_DEATHS: &str = "\
UID,iso2,iso3,code3,FIPS,Admin2,Province_State,Country_Region,Lat,Long_,Combined_Key,Population,1/22/20,1/23/20,1/24/20
84001001,US,USA,840,1001,Autauga,Alabama,US,32.5,-86.6,\"Autauga, Alabama, US\",55869,0,1,2
84001003,US,USA,840,1003,Baldwin,Alabama,US,30.7,-87.7,\"Baldwin, Alabama, US\",223234,1,1,3
84001005,US,USA,840,1005,Barbour,Alabama,US,31.8,-85.3,\"Barbour, Alabama, US\",24686,0,2,2
84002013,US,USA,840,2013,Aleutians East,Alaska,US,55.3,-161.9,\"Aleutians East, Alaska, US\",3337,0,0,1
";

    const GLOBAL_CONFIRMED: &str = "\
Province/State,Country/Region,Lat,Long,1/22/20,1/23/20
,Afghanistan,33.9,67.7,0,4
Australian Capital Territory,Australia,-35.5,149.0,1,2
New South Wales,Australia,-33.9,151.2,3,5
";

    fn load(csv: &str) -> DataFrame {
        CsvLoader::parse_bytes(csv.as_bytes().to_vec()).unwrap()
    }

    /// (country, province) -> date -> value
    fn pivot_back(long: &DataFrame, metric: Metric) -> BTreeMap<(String, String), BTreeMap<i32, i64>> {
        let countries = long.column(columns::COUNTRY).unwrap().str().unwrap().clone();
        let provinces = long.column(columns::PROVINCE).unwrap().str().unwrap().clone();
        let dates = long.column(columns::DATE).unwrap().cast(&DataType::Int32).unwrap();
        let values = long.column(metric.column()).unwrap().i64().unwrap().clone();

        let mut out: BTreeMap<(String, String), BTreeMap<i32, i64>> = BTreeMap::new();
        for i in 0..long.height() {
            let key = (
                countries.get(i).unwrap().to_string(),
                provinces.get(i).unwrap().to_string(),
            );
            let date = dates.i32().unwrap().get(i).unwrap();
            *out.entry(key).or_default().entry(date).or_default() += values.get(i).unwrap_or(0);
        }
        out
    }

    #[test]
    fn population_and_metadata_columns_are_not_dates() {
        let df = load(US_DEATHS);
        let dates: Vec<String> = Reshaper::date_columns(&df).into_iter().map(|(n, _)| n).collect();
        assert_eq!(dates, vec!["1/22/20", "1/23/20", "1/24/20"]);
        assert_eq!(Reshaper::parse_date_header("Population"), None);
        assert_eq!(
            Reshaper::parse_date_header("12/31/21"),
            NaiveDate::from_ymd_opt(2021, 12, 31)
        );
    }

    #[test]
    fn us_counties_roll_up_to_states() {
        let long = Reshaper::wide_to_long(&load(US_DEATHS), Scope::Us, Metric::Deaths).unwrap();

        // 2 states x 3 dates
        assert_eq!(long.height(), 6);
        let pivot = pivot_back(&long, Metric::Deaths);
        let alabama: Vec<i64> = pivot[&("US".to_string(), "Alabama".to_string())]
            .values()
            .copied()
            .collect();
        assert_eq!(alabama, vec![1, 4, 7]);
    }

    #[test]
    fn interleaved_rows_of_one_key_collapse_together() {
        let csv = "\
Province/State,Country/Region,Lat,Long,1/22/20,1/23/20
Ontario,Canada,50.0,-85.0,1,2
,Italy,41.9,12.6,5,6
Ontario,Canada,52.0,-87.0,10,20
";
        let long = Reshaper::wide_to_long(&load(csv), Scope::Global, Metric::Confirmed).unwrap();

        assert_eq!(long.height(), 4);
        assert_eq!(long.width(), 6);
        let pivot = pivot_back(&long, Metric::Confirmed);
        let ontario: Vec<i64> = pivot[&("Canada".to_string(), "Ontario".to_string())]
            .values()
            .copied()
            .collect();
        assert_eq!(ontario, vec![11, 22]);
        let italy: Vec<i64> = pivot[&("Italy".to_string(), ALL_PROVINCES.to_string())]
            .values()
            .copied()
            .collect();
        assert_eq!(italy, vec![5, 6]);
    }

    #[test]
    fn pivot_back_reproduces_region_totals() {
        let wide = load(US_DEATHS);
        let long = Reshaper::wide_to_long(&wide, Scope::Us, Metric::Deaths).unwrap();
        let pivot = pivot_back(&long, Metric::Deaths);

        for (name, date) in Reshaper::date_columns(&wide) {
            let column = wide.column(&name).unwrap().cast(&DataType::Int64).unwrap();
            let wide_total: i64 = column.i64().unwrap().into_iter().flatten().sum();
            let long_total: i64 = pivot
                .values()
                .map(|series| series[&days_from_date(date)])
                .sum();
            assert_eq!(wide_total, long_total, "totals differ on {}", name);
        }
    }

    #[test]
    fn coordinates_take_the_group_median() {
        let long = Reshaper::wide_to_long(&load(US_DEATHS), Scope::Us, Metric::Deaths).unwrap();
        let alabama = long
            .lazy()
            .filter(col(columns::PROVINCE).eq(lit("Alabama")))
            .collect()
            .unwrap();

        let lats = alabama.column(columns::LAT).unwrap().f64().unwrap().clone();
        let longs = alabama.column(columns::LONG).unwrap().f64().unwrap().clone();
        assert!(lats.into_iter().all(|v| (v.unwrap() - 31.8).abs() < 1e-9));
        assert!(longs.into_iter().all(|v| (v.unwrap() + 86.6).abs() < 1e-9));
    }

    #[test]
    fn global_rows_without_province_get_the_sentinel() {
        let long = Reshaper::wide_to_long(
            &load(GLOBAL_CONFIRMED),
            Scope::Global,
            Metric::Confirmed,
        )
        .unwrap();

        let pivot = pivot_back(&long, Metric::Confirmed);
        let keys: Vec<(String, String)> = pivot.keys().cloned().collect();
        assert_eq!(
            keys,
            vec![
                ("Afghanistan".to_string(), ALL_PROVINCES.to_string()),
                ("Australia".to_string(), "Australian Capital Territory".to_string()),
                ("Australia".to_string(), "New South Wales".to_string()),
            ]
        );

        let first_date = long
            .column(columns::DATE)
            .unwrap()
            .cast(&DataType::Int32)
            .unwrap()
            .i32()
            .unwrap()
            .get(0)
            .and_then(date_from_days);
        assert_eq!(first_date, NaiveDate::from_ymd_opt(2020, 1, 22));
    }

    #[test]
    fn unparseable_counts_become_null() {
        let csv = "Province/State,Country/Region,Lat,Long,1/22/20\n,Chad,15.4,18.7,n/a\n";
        let long = Reshaper::wide_to_long(&load(csv), Scope::Global, Metric::Confirmed).unwrap();
        assert_eq!(long.height(), 1);
        // sum over an all-null group
        let value = long.column(columns::CONFIRMED).unwrap().i64().unwrap().get(0);
        assert_eq!(value.unwrap_or(0), 0);
    }

    #[test]
    fn missing_layout_column_is_reported() {
        let csv = "Province/State,Country/Region,Lat,1/22/20\n,Chad,15.4,1\n";
        assert_matches!(
            Reshaper::wide_to_long(&load(csv), Scope::Global, Metric::Confirmed),
            Err(ReshapeError::MissingColumn(name)) if name == "Long"
        );
    }

    #[test]
    fn table_without_dates_is_rejected() {
        let csv = "Province/State,Country/Region,Lat,Long\n,Chad,15.4,18.7\n";
        assert_matches!(
            Reshaper::wide_to_long(&load(csv), Scope::Global, Metric::Confirmed),
            Err(ReshapeError::NoDateColumns)
        );
    }
}
