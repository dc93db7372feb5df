//! Statistics module - correlation, moments and descriptive summaries

mod calculator;

pub use calculator::{ColumnSummary, CorrelationMatrix, StatsCalculator};
