//! CSV Fetcher Module
//! Retrieves the raw time-series files, either over HTTP or from a local mirror.

use crate::data::model::SourceFile;
use rayon::prelude::*;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request for {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where raw CSV bytes come from.
pub trait CsvSource: Send + Sync {
    /// Fetch the complete contents of one source file.
    fn fetch(&self, file: SourceFile) -> Result<Vec<u8>, FetchError>;

    /// Human readable origin, used in logs.
    fn describe(&self) -> String;
}

/// Downloads files from a base URL with a blocking HTTP client.
pub struct HttpCsvSource {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpCsvSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let base_url = base_url.into();
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| FetchError::Http {
                url: base_url.clone(),
                source,
            })?;

        Ok(Self { client, base_url })
    }

    /// Full URL of a source file.
    pub fn url_for(&self, file: SourceFile) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), file.file_name())
    }
}

impl CsvSource for HttpCsvSource {
    fn fetch(&self, file: SourceFile) -> Result<Vec<u8>, FetchError> {
        let url = self.url_for(file);
        tracing::debug!(%url, "Downloading time series");

        let to_error = |source| FetchError::Http {
            url: url.clone(),
            source,
        };

        let response = self
            .client
            .get(&url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(to_error)?;
        let bytes = response.bytes().map_err(to_error)?;

        tracing::debug!(%url, bytes = bytes.len(), "Download complete");
        Ok(bytes.to_vec())
    }

    fn describe(&self) -> String {
        self.base_url.clone()
    }
}

/// Reads the same file names from a local directory.
pub struct DirectoryCsvSource {
    dir: PathBuf,
}

impl DirectoryCsvSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl CsvSource for DirectoryCsvSource {
    fn fetch(&self, file: SourceFile) -> Result<Vec<u8>, FetchError> {
        let path = self.dir.join(file.file_name());
        tracing::debug!(path = %path.display(), "Reading time series");
        std::fs::read(&path).map_err(|source| FetchError::Io { path, source })
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}

/// Fetch all four source files in parallel, in `SourceFile::ALL` order.
pub fn fetch_all(source: &dyn CsvSource) -> Result<Vec<(SourceFile, Vec<u8>)>, FetchError> {
    SourceFile::ALL
        .par_iter()
        .map(|&file| source.fetch(file).map(|bytes| (file, bytes)))
        .collect()
}
