//! Snapshot Cache Module
//! Persists the merged table with its fetch time and decides when to refetch.

use crate::data::fetcher::CsvSource;
use crate::data::model::TimeSeriesRow;
use crate::data::pipeline::build_table;
use crate::data::table::MergedTable;
use crate::data::DataError;
use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Snapshot encoding failed: {0}")]
    Encoding(#[from] bincode::Error),
}

/// Persisted form of the merged table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub fetched_at: DateTime<Utc>,
    pub rows: Vec<TimeSeriesRow>,
}

/// Gzip-compressed bincode snapshot on disk.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the snapshot, `None` if there is none yet.
    pub fn read(&self) -> Result<Option<Snapshot>, CacheError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let reader = BufReader::new(GzDecoder::new(file));
        let snapshot: Snapshot = bincode::deserialize_from(reader)?;
        Ok(Some(snapshot))
    }

    /// Write the snapshot to a temporary file next to the target, then
    /// rename it into place. Readers never observe a partial file.
    pub fn write(&self, snapshot: &Snapshot) -> Result<(), CacheError> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let tmp = NamedTempFile::new_in(dir)?;

        let encoder = GzEncoder::new(tmp.as_file(), Compression::default());
        let mut writer = BufWriter::new(encoder);
        bincode::serialize_into(&mut writer, snapshot)?;
        let encoder = writer.into_inner().map_err(|e| e.into_error())?;
        encoder.finish()?;

        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// When a snapshot is too old to serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub max_age: Duration,
}

impl CachePolicy {
    pub fn new(max_age: Duration) -> Self {
        Self { max_age }
    }

    /// A snapshot from the future (clock skew) counts as fresh.
    pub fn is_stale(&self, fetched_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        (now - fetched_at)
            .to_std()
            .map(|age| age > self.max_age)
            .unwrap_or(false)
    }
}

/// Serves the merged table from the snapshot, refetching when it is
/// missing or stale.
pub struct DataCache {
    source: Arc<dyn CsvSource>,
    store: SnapshotStore,
    policy: CachePolicy,
}

impl DataCache {
    pub fn new(source: Arc<dyn CsvSource>, store: SnapshotStore, policy: CachePolicy) -> Self {
        Self {
            source,
            store,
            policy,
        }
    }

    /// The table for a data request.
    pub fn load(&self) -> Result<MergedTable, DataError> {
        match self.store.read()? {
            Some(snapshot) if !self.policy.is_stale(snapshot.fetched_at, Utc::now()) => {
                tracing::debug!(
                    path = %self.store.path().display(),
                    fetched_at = %snapshot.fetched_at,
                    rows = snapshot.rows.len(),
                    "Serving snapshot"
                );
                Ok(MergedTable::from_rows(&snapshot.rows, snapshot.fetched_at)?)
            }
            Some(snapshot) => {
                tracing::info!(fetched_at = %snapshot.fetched_at, "Snapshot is stale, refreshing");
                self.refresh()
            }
            None => {
                tracing::info!(path = %self.store.path().display(), "No snapshot, refreshing");
                self.refresh()
            }
        }
    }

    /// Unconditional refetch that overwrites the snapshot.
    pub fn refresh(&self) -> Result<MergedTable, DataError> {
        let started = Instant::now();
        tracing::info!(source = %self.source.describe(), "Refreshing time series");

        let table = build_table(self.source.as_ref())?;
        let snapshot = Snapshot {
            fetched_at: table.fetched_at(),
            rows: table.to_rows()?,
        };
        self.store.write(&snapshot)?;

        tracing::info!(
            rows = table.row_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            path = %self.store.path().display(),
            "Snapshot written"
        );
        Ok(table)
    }
}
