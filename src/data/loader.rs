//! CSV Data Loader Module
//! Parses raw CSV into Polars DataFrames with every column kept as text.

use polars::prelude::*;
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("CSV has no data rows")]
    NoData,
}

/// Reads CSV with Polars. Schema inference is disabled so that every column
/// arrives as `String` and typing is decided by the reshaper.
pub struct CsvLoader;

impl CsvLoader {
    /// Parse an in-memory CSV document.
    pub fn parse_bytes(bytes: Vec<u8>) -> Result<DataFrame, LoaderError> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .into_reader_with_file_handle(Cursor::new(bytes))
            .finish()?;

        Self::non_empty(df)
    }

    /// Load a CSV file from disk.
    pub fn load_file(path: &Path) -> Result<DataFrame, LoaderError> {
        let df = LazyCsvReader::new(path)
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .finish()?
            .collect()?;

        Self::non_empty(df)
    }

    /// Get list of column names of a DataFrame.
    pub fn column_names(df: &DataFrame) -> Vec<String> {
        df.get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn non_empty(df: DataFrame) -> Result<DataFrame, LoaderError> {
        if df.height() == 0 {
            return Err(LoaderError::NoData);
        }
        Ok(df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn parses_every_column_as_text() {
        let csv = "Province/State,Country/Region,Lat,Long,1/22/20,1/23/20\n\
                   ,Afghanistan,33.9,67.7,0,1\n";
        let df = CsvLoader::parse_bytes(csv.as_bytes().to_vec()).unwrap();

        assert_eq!(df.height(), 1);
        assert_eq!(
            CsvLoader::column_names(&df),
            vec!["Province/State", "Country/Region", "Lat", "Long", "1/22/20", "1/23/20"]
        );
        assert!(df
            .get_columns()
            .iter()
            .all(|c| c.dtype() == &DataType::String));
    }

    #[test]
    fn header_only_document_is_rejected() {
        let csv = "Province/State,Country/Region,Lat,Long,1/22/20\n";
        assert_matches!(
            CsvLoader::parse_bytes(csv.as_bytes().to_vec()),
            Err(LoaderError::NoData)
        );
    }

    #[test]
    fn loads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.csv");
        std::fs::write(&path, "state,mask_start\nOhio,2020-07-23\n").unwrap();

        let df = CsvLoader::load_file(&path).unwrap();
        assert_eq!(df.height(), 1);
        assert_eq!(CsvLoader::column_names(&df), vec!["state", "mask_start"]);
    }
}
