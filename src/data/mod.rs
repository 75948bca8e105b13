//! Data module - fetching, reshaping, merging, caching and filtering

mod cache;
mod events;
mod fetcher;
mod filter;
mod loader;
mod merger;
mod model;
mod pipeline;
mod reshaper;
pub(crate) mod table;

pub use cache::{CacheError, CachePolicy, DataCache, SnapshotStore};
pub use events::{holidays, EventKind, EventMarker, PolicyEvents};
pub use fetcher::{CsvSource, DirectoryCsvSource, FetchError, HttpCsvSource};
pub use filter::{DateRange, RegionFilter};
pub use loader::LoaderError;
pub use merger::MergeError;
pub use model::{
    date_from_days, days_from_date, DerivedRow, Metric, TimeSeriesRow, ALL_PROVINCES, SMA_WINDOW,
};
pub use reshaper::ReshapeError;
pub use table::{MergedTable, StateOptions, TableError};

use thiserror::Error;

/// Any failure while producing the merged table.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Loader(#[from] LoaderError),
    #[error("Reshape failed: {0}")]
    Reshape(#[from] ReshapeError),
    #[error("Data integrity: {0}")]
    Merge(#[from] MergeError),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}
