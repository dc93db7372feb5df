//! Indicator Lens - World Bank indicator analysis
//!
//! Loads World Bank CSV exports, reshapes and joins them, computes summary
//! statistics and renders static PNG charts.

pub mod charts;
pub mod config;
pub mod data;
pub mod pipeline;
pub mod stats;

pub use config::AnalysisConfig;
pub use pipeline::{run, AnalysisReport, PipelineError};
