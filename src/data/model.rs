//! Row types and column names shared by the pipeline.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Province value for country-wide rows and for the "all provinces" selector.
pub const ALL_PROVINCES: &str = "<all>";

/// Window length of the trailing moving average.
pub const SMA_WINDOW: usize = 7;

/// Long-format column names.
pub mod columns {
    pub const COUNTRY: &str = "country";
    pub const PROVINCE: &str = "province";
    pub const LAT: &str = "lat";
    pub const LONG: &str = "long";
    pub const DATE: &str = "date";
    pub const CONFIRMED: &str = "cumulative_confirmed";
    pub const DEATHS: &str = "cumulative_deaths";
}

/// Days between 0001-01-01 and 1970-01-01; polars stores dates relative to the latter.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Convert a date to the polars `Date` physical value.
pub fn days_from_date(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

/// Convert a polars `Date` physical value back to a date.
pub fn date_from_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_DAYS_FROM_CE)
}

/// Selectable metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Metric {
    Confirmed,
    Deaths,
}

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::Confirmed, Metric::Deaths];

    pub fn label(self) -> &'static str {
        match self {
            Metric::Confirmed => "Confirmed",
            Metric::Deaths => "Deaths",
        }
    }

    /// Name of the cumulative column in the merged table.
    pub fn column(self) -> &'static str {
        match self {
            Metric::Confirmed => columns::CONFIRMED,
            Metric::Deaths => columns::DEATHS,
        }
    }
}

/// Geographic scope of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Global,
    Us,
}

/// Header names of the identifying columns of a wide source table.
#[derive(Debug, Clone, Copy)]
pub struct ScopeLayout {
    pub country: &'static str,
    pub province: &'static str,
    pub lat: &'static str,
    pub long: &'static str,
}

impl Scope {
    pub fn layout(self) -> ScopeLayout {
        match self {
            Scope::Global => ScopeLayout {
                country: "Country/Region",
                province: "Province/State",
                lat: "Lat",
                long: "Long",
            },
            Scope::Us => ScopeLayout {
                country: "Country_Region",
                province: "Province_State",
                lat: "Lat",
                long: "Long_",
            },
        }
    }
}

/// One of the four remote time-series files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceFile {
    pub scope: Scope,
    pub metric: Metric,
}

impl SourceFile {
    pub const ALL: [SourceFile; 4] = [
        SourceFile { scope: Scope::Us, metric: Metric::Confirmed },
        SourceFile { scope: Scope::Us, metric: Metric::Deaths },
        SourceFile { scope: Scope::Global, metric: Metric::Confirmed },
        SourceFile { scope: Scope::Global, metric: Metric::Deaths },
    ];

    pub fn file_name(self) -> &'static str {
        match (self.scope, self.metric) {
            (Scope::Global, Metric::Confirmed) => "time_series_covid19_confirmed_global.csv",
            (Scope::Global, Metric::Deaths) => "time_series_covid19_deaths_global.csv",
            (Scope::Us, Metric::Confirmed) => "time_series_covid19_confirmed_US.csv",
            (Scope::Us, Metric::Deaths) => "time_series_covid19_deaths_US.csv",
        }
    }
}

/// One observation of the merged table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesRow {
    pub country: String,
    pub province: String,
    pub latitude: f64,
    pub longitude: f64,
    pub date: NaiveDate,
    pub cumulative_confirmed: i64,
    pub cumulative_deaths: i64,
}

impl TimeSeriesRow {
    pub fn cumulative(&self, metric: Metric) -> i64 {
        match metric {
            Metric::Confirmed => self.cumulative_confirmed,
            Metric::Deaths => self.cumulative_deaths,
        }
    }
}

/// A row of a filtered series with day-over-day deltas and smoothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedRow {
    #[serde(flatten)]
    pub row: TimeSeriesRow,
    pub new_confirmed: i64,
    pub new_deaths: i64,
    pub new_confirmed_sma7: Option<f64>,
    pub new_deaths_sma7: Option<f64>,
}

impl DerivedRow {
    pub fn new_cases(&self, metric: Metric) -> i64 {
        match metric {
            Metric::Confirmed => self.new_confirmed,
            Metric::Deaths => self.new_deaths,
        }
    }

    pub fn moving_average(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Confirmed => self.new_confirmed_sma7,
            Metric::Deaths => self.new_deaths_sma7,
        }
    }
}
