//! Data module - indicator loading, slicing and merging

mod loader;
mod processor;

#[cfg(test)]
pub(crate) mod fixtures;

pub use loader::{IndicatorData, IndicatorLoader, LoaderError};
pub use processor::{suffixed, DataProcessor, ProcessorError, LEFT_SUFFIX, RIGHT_SUFFIX};

/// Key column of every country-keyed table.
pub const COUNTRY_COLUMN: &str = "Country Name";

/// Key column of every year-keyed table.
pub const YEARS_COLUMN: &str = "Years";
