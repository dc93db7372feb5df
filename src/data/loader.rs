//! Indicator Loader Module
//! Reads World Bank wide-format exports with Polars and reshapes them into a
//! country-keyed table and a year-keyed table.

use super::{COUNTRY_COLUMN, YEARS_COLUMN};
use crate::config::LoaderConfig;
use polars::prelude::*;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("Column '{column}' not found in {path}")]
    MissingColumn { column: String, path: PathBuf },
    #[error("Column '{0}' is not a year label")]
    InvalidYear(String),
}

/// Both shapes of one indicator.
#[derive(Debug, Clone)]
pub struct IndicatorData {
    /// `Country Name` followed by one Float64 column per retained year.
    pub by_country: DataFrame,
    /// One Float64 column per country followed by the Int64 `Years` key.
    pub by_year: DataFrame,
}

/// Loads indicator files, keeping the configured countries and years.
pub struct IndicatorLoader {
    config: LoaderConfig,
}

impl Default for IndicatorLoader {
    fn default() -> Self {
        Self::new(LoaderConfig::default())
    }
}

impl IndicatorLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    /// Read a wide CSV, skipping the metadata lines above the header.
    pub fn read_wide_csv(&self, path: &Path) -> Result<DataFrame, LoaderError> {
        let text = fs::read_to_string(path).map_err(|source| LoaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let body = text
            .lines()
            .skip(self.config.metadata_rows)
            .collect::<Vec<_>>()
            .join("\n");

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(10000))
            .with_ignore_errors(true)
            .into_reader_with_file_handle(Cursor::new(body.into_bytes()))
            .finish()?;

        debug!(
            "read {}: {} rows x {} columns",
            path.display(),
            df.height(),
            df.width()
        );
        Ok(df)
    }

    /// Load one indicator file into its country-keyed and year-keyed shapes.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<IndicatorData, LoaderError> {
        let path = path.as_ref();
        let raw = self.read_wide_csv(path)?;
        let by_country = self.restrict(raw, path)?;
        let by_year = Self::transpose_to_years(&by_country)?;

        info!(
            "loaded {}: {} countries x {} years",
            path.display(),
            by_country.height(),
            by_year.height()
        );
        Ok(IndicatorData {
            by_country,
            by_year,
        })
    }

    /// Filter to the configured countries and drop every column outside the
    /// retained year span.
    fn restrict(&self, df: DataFrame, path: &Path) -> Result<DataFrame, LoaderError> {
        let missing = |column: &str| LoaderError::MissingColumn {
            column: column.to_string(),
            path: path.to_path_buf(),
        };

        if df.get_column_index(COUNTRY_COLUMN).is_none() {
            return Err(missing(COUNTRY_COLUMN));
        }

        let keep: Vec<bool> = df
            .column(COUNTRY_COLUMN)?
            .str()?
            .into_iter()
            .map(|name| name.is_some_and(|n| self.config.countries.iter().any(|c| c == n)))
            .collect();
        let mut df = df.filter(&BooleanChunked::new("keep".into(), keep))?;

        for column in &self.config.dropped_columns {
            if df.get_column_index(column).is_none() {
                return Err(missing(column));
            }
            df = df.drop(column)?;
        }

        let unlabeled: Vec<String> = df
            .get_column_names()
            .into_iter()
            .filter(|name| is_unlabeled(name.as_str()))
            .map(|name| name.to_string())
            .collect();
        for column in &unlabeled {
            df = df.drop(column)?;
        }

        for column in year_columns(&df) {
            let values = df.column(&column)?.cast(&DataType::Float64)?;
            df.with_column(values)?;
        }

        Ok(df)
    }

    /// Transpose a country-keyed table: each country row becomes a column and
    /// each year column becomes a row tagged with its numeric `Years` value.
    pub fn transpose_to_years(by_country: &DataFrame) -> Result<DataFrame, LoaderError> {
        let countries: Vec<String> = by_country
            .column(COUNTRY_COLUMN)?
            .str()?
            .into_iter()
            .map(|name| name.unwrap_or_default().to_string())
            .collect();

        let labels = year_columns(by_country);
        let years = labels
            .iter()
            .map(|label| {
                label
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| LoaderError::InvalidYear(label.clone()))
            })
            .collect::<Result<Vec<i64>, _>>()?;

        let mut per_country: Vec<Vec<Option<f64>>> =
            vec![Vec::with_capacity(labels.len()); countries.len()];
        for label in &labels {
            let values = by_country.column(label)?.cast(&DataType::Float64)?;
            for (row, value) in values.f64()?.into_iter().enumerate() {
                per_country[row].push(value);
            }
        }

        let mut columns: Vec<Column> = countries
            .iter()
            .zip(per_country)
            .map(|(country, values)| Column::new(country.as_str().into(), values))
            .collect();
        columns.push(Column::new(YEARS_COLUMN.into(), years));

        Ok(DataFrame::new(columns)?)
    }
}

/// Every column except the country key, in table order.
fn year_columns(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .filter(|name| name.as_str() != COUNTRY_COLUMN)
        .map(|name| name.to_string())
        .collect()
}

/// Header of the empty trailing column produced by the export's trailing
/// comma, under the names different readers give it.
fn is_unlabeled(name: &str) -> bool {
    let name = name.trim();
    name.is_empty()
        || name.starts_with("Unnamed:")
        || name
            .strip_prefix("column_")
            .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}
