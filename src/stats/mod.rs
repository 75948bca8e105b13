//! Stats module - series derivation

mod series;

pub use series::SeriesCalculator;
