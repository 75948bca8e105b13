//! Refresh pipeline: fetch, parse, reshape, merge.

use crate::data::fetcher::{fetch_all, CsvSource};
use crate::data::loader::CsvLoader;
use crate::data::merger::Merger;
use crate::data::model::{Metric, Scope, SourceFile};
use crate::data::reshaper::Reshaper;
use crate::data::table::MergedTable;
use crate::data::DataError;
use chrono::Utc;
use polars::prelude::DataFrame;
use rayon::prelude::*;
use std::collections::HashMap;

/// Build the merged table from the four source files.
pub fn build_table(source: &dyn CsvSource) -> Result<MergedTable, DataError> {
    let raw = fetch_all(source)?;

    let mut long: HashMap<SourceFile, DataFrame> = raw
        .into_par_iter()
        .map(|(file, bytes)| -> Result<_, DataError> {
            let wide = CsvLoader::parse_bytes(bytes)?;
            let reshaped = Reshaper::wide_to_long(&wide, file.scope, file.metric)?;
            tracing::debug!(
                file = file.file_name(),
                regions = wide.height(),
                rows = reshaped.height(),
                "Reshaped time series"
            );
            Ok((file, reshaped))
        })
        .collect::<Result<_, _>>()?;

    let us = merge_scope(&mut long, Scope::Us)?;
    let global = merge_scope(&mut long, Scope::Global)?;
    let combined = Merger::concat_scopes(&us, &global)?;

    Ok(MergedTable::new(combined, Utc::now()))
}

fn merge_scope(
    long: &mut HashMap<SourceFile, DataFrame>,
    scope: Scope,
) -> Result<DataFrame, DataError> {
    let mut take = |metric| {
        long.remove(&SourceFile { scope, metric })
            .unwrap_or_default()
    };
    let confirmed = take(Metric::Confirmed);
    let deaths = take(Metric::Deaths);
    Ok(Merger::merge_checked(&confirmed, &deaths)?)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::data::fetcher::FetchError;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub const US_CONFIRMED: &str = "\
UID,iso2,iso3,code3,FIPS,Admin2,Province_State,Country_Region,Lat,Long_,Combined_Key,1/22/20,1/23/20,1/24/20
84039001,US,USA,840,39001,Adams,Ohio,US,38.8,-83.4,\"Adams, Ohio, US\",1,2,4
84039003,US,USA,840,39003,Allen,Ohio,US,40.7,-84.1,\"Allen, Ohio, US\",0,3,3
84048001,US,USA,840,48001,Anderson,Texas,US,31.8,-95.6,\"Anderson, Texas, US\",2,2,5
";

    pub const US_DEATHS: &str = "\
UID,iso2,iso3,code3,FIPS,Admin2,Province_State,Country_Region,Lat,Long_,Combined_Key,Population,1/22/20,1/23/20,1/24/20
84039001,US,USA,840,39001,Adams,Ohio,US,38.8,-83.4,\"Adams, Ohio, US\",27698,0,0,1
84039003,US,USA,840,39003,Allen,Ohio,US,40.7,-84.1,\"Allen, Ohio, US\",102351,0,1,1
84048001,US,USA,840,48001,Anderson,Texas,US,31.8,-95.6,\"Anderson, Texas, US\",57735,0,0,0
";

    pub const GLOBAL_CONFIRMED: &str = "\
Province/State,Country/Region,Lat,Long,1/22/20,1/23/20,1/24/20
,Italy,41.9,12.6,0,2,5
Ontario,Canada,51.3,-85.3,1,1,4
Quebec,Canada,52.9,-73.5,0,2,3
";

    pub const GLOBAL_DEATHS: &str = "\
Province/State,Country/Region,Lat,Long,1/22/20,1/23/20,1/24/20
,Italy,41.9,12.6,0,0,1
Ontario,Canada,51.3,-85.3,0,0,0
Quebec,Canada,52.9,-73.5,0,0,1
";

    /// In-memory source that counts fetches.
    pub struct StaticSource {
        files: HashMap<SourceFile, &'static str>,
        fetches: AtomicUsize,
    }

    impl StaticSource {
        pub fn new(files: HashMap<SourceFile, &'static str>) -> Self {
            Self {
                files,
                fetches: AtomicUsize::new(0),
            }
        }

        pub fn sample() -> Self {
            let contents = [US_CONFIRMED, US_DEATHS, GLOBAL_CONFIRMED, GLOBAL_DEATHS];
            Self::new(SourceFile::ALL.into_iter().zip(contents).collect())
        }

        pub fn empty() -> Self {
            Self::new(HashMap::new())
        }

        pub fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    impl CsvSource for StaticSource {
        fn fetch(&self, file: SourceFile) -> Result<Vec<u8>, FetchError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.files
                .get(&file)
                .map(|csv| csv.as_bytes().to_vec())
                .ok_or_else(|| FetchError::Io {
                    path: PathBuf::from(file.file_name()),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                })
        }

        fn describe(&self) -> String {
            "static fixtures".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::data::filter::RegionFilter;
    use crate::data::merger::MergeError;
    use crate::data::ALL_PROVINCES;
    use assert_matches::assert_matches;

    #[test]
    fn builds_both_scopes_into_one_table() {
        let table = build_table(&StaticSource::sample()).unwrap();

        assert_eq!(table.countries(), vec!["Canada", "Italy", "US"]);
        // 5 regions x 3 days
        assert_eq!(table.row_count(), 15);
        assert_eq!(table.state_options("US").options, vec!["<all>", "Ohio", "Texas"]);
        assert_eq!(table.state_options("Italy").options, vec!["<all>"]);
    }

    #[test]
    fn counties_and_provinces_aggregate_end_to_end() {
        let table = build_table(&StaticSource::sample()).unwrap();

        let ohio = RegionFilter::series(&table, "US", "Ohio").unwrap();
        let confirmed: Vec<i64> = ohio.iter().map(|r| r.cumulative_confirmed).collect();
        let deaths: Vec<i64> = ohio.iter().map(|r| r.cumulative_deaths).collect();
        assert_eq!(confirmed, vec![1, 5, 7]);
        assert_eq!(deaths, vec![0, 1, 2]);

        let canada = RegionFilter::series(&table, "Canada", ALL_PROVINCES).unwrap();
        let confirmed: Vec<i64> = canada.iter().map(|r| r.cumulative_confirmed).collect();
        assert_eq!(confirmed, vec![1, 3, 7]);
    }

    #[test]
    fn us_national_row_does_not_double_count() {
        let contents = [
            US_CONFIRMED,
            US_DEATHS,
            "Province/State,Country/Region,Lat,Long,1/22/20,1/23/20,1/24/20\n\
             ,US,40.0,-100.0,3,7,11\n\
             ,Italy,41.9,12.6,0,2,5\n",
            "Province/State,Country/Region,Lat,Long,1/22/20,1/23/20,1/24/20\n\
             ,US,40.0,-100.0,0,1,2\n\
             ,Italy,41.9,12.6,0,0,1\n",
        ];
        let files: HashMap<SourceFile, &'static str> =
            SourceFile::ALL.into_iter().zip(contents).collect();
        let table = build_table(&StaticSource::new(files)).unwrap();

        let us = RegionFilter::series(&table, "US", ALL_PROVINCES).unwrap();
        let confirmed: Vec<i64> = us.iter().map(|r| r.cumulative_confirmed).collect();
        let deaths: Vec<i64> = us.iter().map(|r| r.cumulative_deaths).collect();
        // Ohio + Texas counties only
        assert_eq!(confirmed, vec![3, 7, 12]);
        assert_eq!(deaths, vec![0, 1, 2]);
        assert_eq!(table.state_options("US").options, vec!["<all>", "Ohio", "Texas"]);
        assert_eq!(table.countries(), vec!["Italy", "US"]);
    }

    #[test]
    fn mismatched_metric_tables_are_an_integrity_error() {
        let contents = [US_CONFIRMED, US_DEATHS, GLOBAL_CONFIRMED, GLOBAL_DEATHS];
        let mut files: HashMap<SourceFile, &'static str> =
            SourceFile::ALL.into_iter().zip(contents).collect();
        files.insert(
            SourceFile {
                scope: Scope::Global,
                metric: Metric::Deaths,
            },
            "Province/State,Country/Region,Lat,Long,1/22/20,1/23/20,1/24/20\n,Italy,41.9,12.6,0,0,1\n",
        );

        assert_matches!(
            build_table(&StaticSource::new(files)),
            Err(DataError::Merge(MergeError::KeyMismatch { .. }))
        );
    }

    #[test]
    fn fetch_failure_propagates() {
        assert_matches!(build_table(&StaticSource::empty()), Err(DataError::Fetch(_)));
    }
}
