//! Analysis Configuration
//! Named constants for the fixed country set and year span, plus an optional
//! JSON configuration that overrides them.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Countries retained from every indicator file.
pub const COUNTRIES: [&str; 7] = [
    "India", "France", "Georgia", "Spain", "Germany", "Morocco", "Nigeria",
];

/// Lines of metadata preceding the header row in a World Bank export.
pub const METADATA_ROWS: usize = 4;

/// Non-year columns removed by the loader.
pub const DROPPED_ID_COLUMNS: [&str; 3] = ["Country Code", "Indicator Name", "Indicator Code"];

/// Year columns removed by the loader (everything outside 1990..=1997).
pub const DROPPED_YEAR_COLUMNS: [&str; 55] = [
    "1960", "1961", "1962", "1963", "1964", "1965", "1966", "1967", "1968", "1969", "1970",
    "1971", "1972", "1973", "1974", "1975", "1976", "1977", "1978", "1979", "1980", "1981",
    "1982", "1983", "1984", "1985", "1986", "1987", "1988", "1989", "1998", "1999", "2000",
    "2001", "2002", "2003", "2004", "2005", "2006", "2007", "2008", "2009", "2010", "2011",
    "2012", "2013", "2014", "2015", "2016", "2017", "2018", "2019", "2020", "2021", "2022",
];

/// Year used when slicing a single column out of each indicator.
pub const SLICE_YEAR: &str = "1997";

/// Years kept after the year-keyed merge.
pub const YEAR_WINDOW: RangeInclusive<i64> = 1990..=1997;

pub const EMISSIONS_FILE: &str = "API_EN.ATM.GHGT.KT.CE_DS2_en_csv_v2_5995567.csv";
pub const POPULATION_FILE: &str = "API_SP.POP.TOTL_DS2_en_csv_v2_6011311.csv";
pub const URBAN_FILE: &str = "API_SP.URB.TOTL_DS2_en_csv_v2_5996761.csv";
pub const AGRICULTURE_FILE: &str = "API_AG.LND.AGRI.ZS_DS2_en_csv_v2_5995314.csv";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Year window is empty: {start}..={end}")]
    EmptyWindow { start: i64, end: i64 },
}

/// Settings consumed by the loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub countries: Vec<String>,
    pub metadata_rows: usize,
    pub dropped_columns: Vec<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            countries: COUNTRIES.iter().map(|c| c.to_string()).collect(),
            metadata_rows: METADATA_ROWS,
            dropped_columns: DROPPED_ID_COLUMNS
                .iter()
                .chain(DROPPED_YEAR_COLUMNS.iter())
                .map(|c| c.to_string())
                .collect(),
        }
    }
}

/// File names of the four indicator exports, relative to `data_dir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorFiles {
    pub emissions: String,
    pub population: String,
    pub urban: String,
    pub agriculture: String,
}

impl Default for IndicatorFiles {
    fn default() -> Self {
        Self {
            emissions: EMISSIONS_FILE.to_string(),
            population: POPULATION_FILE.to_string(),
            urban: URBAN_FILE.to_string(),
            agriculture: AGRICULTURE_FILE.to_string(),
        }
    }
}

/// Complete configuration of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub data_dir: PathBuf,
    pub files: IndicatorFiles,
    pub loader: LoaderConfig,
    pub slice_year: String,
    pub window_start: i64,
    pub window_end: i64,
    pub output_dir: PathBuf,
    pub render_charts: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            files: IndicatorFiles::default(),
            loader: LoaderConfig::default(),
            slice_year: SLICE_YEAR.to_string(),
            window_start: *YEAR_WINDOW.start(),
            window_end: *YEAR_WINDOW.end(),
            output_dir: PathBuf::from("charts"),
            render_charts: true,
        }
    }
}

impl AnalysisConfig {
    /// Read a JSON config; missing fields fall back to the defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.year_window()?;
        Ok(config)
    }

    pub fn year_window(&self) -> Result<RangeInclusive<i64>, ConfigError> {
        if self.window_start > self.window_end {
            return Err(ConfigError::EmptyWindow {
                start: self.window_start,
                end: self.window_end,
            });
        }
        Ok(self.window_start..=self.window_end)
    }

    pub fn emissions_path(&self) -> PathBuf {
        self.data_dir.join(&self.files.emissions)
    }

    pub fn population_path(&self) -> PathBuf {
        self.data_dir.join(&self.files.population)
    }

    pub fn urban_path(&self) -> PathBuf {
        self.data_dir.join(&self.files.urban)
    }

    pub fn agriculture_path(&self) -> PathBuf {
        self.data_dir.join(&self.files.agriculture)
    }
}
