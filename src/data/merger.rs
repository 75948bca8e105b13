//! Merger Module
//! Joins the per-metric long tables and unions the US and global scopes.

use crate::data::model::columns;
use polars::prelude::*;
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MergeError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error(
        "Confirmed and death tables disagree on keys: {only_confirmed} only in confirmed, \
         {only_deaths} only in deaths (e.g. {example})"
    )]
    KeyMismatch {
        only_confirmed: usize,
        only_deaths: usize,
        example: String,
    },
    #[error("{count} region(s) appear in both US and global scope (e.g. {example})")]
    OverlappingScopes { count: usize, example: String },
}

type RegionKey = (String, String);
type ObservationKey = (String, String, i32);

/// Handles joining and concatenation of long tables.
pub struct Merger;

impl Merger {
    /// Inner join on (country, province, date). Rows present in only one
    /// table are dropped; coordinates come from the confirmed table.
    ///
    /// Output columns: [country, province, lat, long, date, cumulative_confirmed, cumulative_deaths]
    pub fn inner_join(confirmed: &DataFrame, deaths: &DataFrame) -> Result<DataFrame, MergeError> {
        let keys = [col(columns::COUNTRY), col(columns::PROVINCE), col(columns::DATE)];

        let deaths = deaths.clone().lazy().select([
            col(columns::COUNTRY),
            col(columns::PROVINCE),
            col(columns::DATE),
            col(columns::DEATHS),
        ]);

        let joined = confirmed
            .clone()
            .lazy()
            .join(deaths, keys.clone(), keys, JoinArgs::new(JoinType::Inner))
            .select([
                col(columns::COUNTRY),
                col(columns::PROVINCE),
                col(columns::LAT),
                col(columns::LONG),
                col(columns::DATE),
                col(columns::CONFIRMED),
                col(columns::DEATHS),
            ])
            .sort(
                [columns::COUNTRY, columns::PROVINCE, columns::DATE],
                SortMultipleOptions::default(),
            )
            .collect()?;

        Ok(joined)
    }

    /// Inner join that first verifies both tables carry the same key set.
    pub fn merge_checked(confirmed: &DataFrame, deaths: &DataFrame) -> Result<DataFrame, MergeError> {
        let confirmed_keys = Self::observation_keys(confirmed)?;
        let death_keys = Self::observation_keys(deaths)?;

        if confirmed_keys != death_keys {
            let only_confirmed: Vec<&ObservationKey> =
                confirmed_keys.difference(&death_keys).collect();
            let only_deaths: Vec<&ObservationKey> =
                death_keys.difference(&confirmed_keys).collect();
            let example = only_confirmed
                .first()
                .or_else(|| only_deaths.first())
                .map(|(country, province, _)| format!("{country} / {province}"))
                .unwrap_or_default();

            return Err(MergeError::KeyMismatch {
                only_confirmed: only_confirmed.len(),
                only_deaths: only_deaths.len(),
                example,
            });
        }

        Self::inner_join(confirmed, deaths)
    }

    /// Union of the US and global results. The two scopes must not share a
    /// (country, province) key.
    ///
    /// Global rows of a country the US scope covers are dropped: the US file
    /// already breaks that country down by state, so keeping its national
    /// row would count it twice under `<all>`.
    pub fn concat_scopes(us: &DataFrame, global: &DataFrame) -> Result<DataFrame, MergeError> {
        let us_regions = Self::region_keys(us)?;
        let global_regions = Self::region_keys(global)?;
        let overlap: Vec<&RegionKey> = us_regions.intersection(&global_regions).collect();

        if let Some((country, province)) = overlap.first() {
            return Err(MergeError::OverlappingScopes {
                count: overlap.len(),
                example: format!("{country} / {province}"),
            });
        }

        let us_countries: BTreeSet<&str> =
            us_regions.iter().map(|(country, _)| country.as_str()).collect();
        let keep: BooleanChunked = global
            .column(columns::COUNTRY)?
            .str()?
            .into_iter()
            .map(|country| !country.is_some_and(|c| us_countries.contains(c)))
            .collect();
        let global = global.filter(&keep)?;

        let superseded = global_regions
            .iter()
            .filter(|(country, _)| us_countries.contains(country.as_str()))
            .count();
        if superseded > 0 {
            tracing::debug!(superseded, "Dropped global regions covered by the US scope");
        }

        let mut combined = us.clone();
        combined.vstack_mut(&global)?;
        Ok(combined)
    }

    fn region_keys(df: &DataFrame) -> Result<BTreeSet<RegionKey>, MergeError> {
        let countries = df.column(columns::COUNTRY)?.str()?;
        let provinces = df.column(columns::PROVINCE)?.str()?;

        Ok(countries
            .into_iter()
            .zip(provinces)
            .filter_map(|(c, p)| Some((c?.to_string(), p?.to_string())))
            .collect())
    }

    fn observation_keys(df: &DataFrame) -> Result<BTreeSet<ObservationKey>, MergeError> {
        let countries = df.column(columns::COUNTRY)?.str()?;
        let provinces = df.column(columns::PROVINCE)?.str()?;
        let dates = df.column(columns::DATE)?.cast(&DataType::Int32)?;

        Ok(countries
            .into_iter()
            .zip(provinces)
            .zip(dates.i32()?)
            .filter_map(|((c, p), d)| Some((c?.to_string(), p?.to_string(), d?)))
            .collect())
    }
}
