//! Statistics Calculator Module
//! Handles correlation, skewness/kurtosis and descriptive statistics over the
//! numeric columns of a table.

use crate::data::{DataProcessor, ProcessorError};
use polars::prelude::*;
use statrs::statistics::Statistics;

/// Descriptive statistics for a single column.
#[derive(Debug, Clone)]
pub struct ColumnSummary {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
    pub max: f64,
}

impl Default for ColumnSummary {
    fn default() -> Self {
        Self {
            column: String::new(),
            count: 0,
            mean: f64::NAN,
            std: f64::NAN,
            min: f64::NAN,
            p25: f64::NAN,
            median: f64::NAN,
            p75: f64::NAN,
            max: f64::NAN,
        }
    }
}

/// Pairwise correlation between the numeric columns of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub labels: Vec<String>,
    /// Row-major, `labels.len()` x `labels.len()`.
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn get(&self, row: &str, col: &str) -> Option<f64> {
        let i = self.labels.iter().position(|l| l == row)?;
        let j = self.labels.iter().position(|l| l == col)?;
        Some(self.values[i][j])
    }
}

/// Handles statistical calculations.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Compute descriptive statistics for an array of values.
    pub fn compute_descriptive_stats(values: &[f64]) -> ColumnSummary {
        let n = values.len();
        if n == 0 {
            return ColumnSummary::default();
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        ColumnSummary {
            column: String::new(),
            count: n,
            mean: values.iter().mean(),
            // Sample standard deviation; NaN for a single value.
            std: values.iter().std_dev(),
            min: sorted[0],
            p25: Self::percentile(&sorted, 25.0),
            median: Self::percentile(&sorted, 50.0),
            p75: Self::percentile(&sorted, 75.0),
            max: sorted[n - 1],
        }
    }

    /// Calculate percentile using linear interpolation (NumPy compatible).
    pub fn percentile(sorted_values: &[f64], p: f64) -> f64 {
        let n = sorted_values.len();
        if n == 0 {
            return f64::NAN;
        }
        if n == 1 {
            return sorted_values[0];
        }

        let rank = (p / 100.0) * (n - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = (rank.ceil() as usize).min(n - 1);
        let frac = rank - lower as f64;

        if lower == upper {
            sorted_values[lower]
        } else {
            sorted_values[lower] * (1.0 - frac) + sorted_values[upper] * frac
        }
    }

    /// Pearson correlation over the rows where both values are present.
    pub fn pearson(x: &[Option<f64>], y: &[Option<f64>]) -> f64 {
        let (xs, ys): (Vec<f64>, Vec<f64>) = x
            .iter()
            .zip(y.iter())
            .filter_map(|pair| match pair {
                (Some(a), Some(b)) if !a.is_nan() && !b.is_nan() => Some((*a, *b)),
                _ => None,
            })
            .unzip();

        if xs.len() < 2 {
            return f64::NAN;
        }

        let x_mean = xs.iter().mean();
        let y_mean = ys.iter().mean();

        let numerator: f64 = xs
            .iter()
            .zip(ys.iter())
            .map(|(a, b)| (a - x_mean) * (b - y_mean))
            .sum();
        let x_variance: f64 = xs.iter().map(|a| (a - x_mean).powi(2)).sum();
        let y_variance: f64 = ys.iter().map(|b| (b - y_mean).powi(2)).sum();

        let denominator = (x_variance * y_variance).sqrt();
        if denominator == 0.0 {
            f64::NAN
        } else {
            (numerator / denominator).clamp(-1.0, 1.0)
        }
    }

    /// Bias-corrected sample skewness (G1). NaN below three values.
    pub fn skewness(values: &[f64]) -> f64 {
        let n = values.len() as f64;
        if values.len() < 3 {
            return f64::NAN;
        }

        let mean = values.iter().mean();
        let m2: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
        let m3: f64 = values.iter().map(|v| (v - mean).powi(3)).sum();
        if m2 == 0.0 {
            return 0.0;
        }

        (n * (n - 1.0).sqrt() / (n - 2.0)) * (m3 / m2.powf(1.5))
    }

    /// Bias-corrected excess kurtosis (G2). NaN below four values.
    pub fn kurtosis(values: &[f64]) -> f64 {
        let n = values.len() as f64;
        if values.len() < 4 {
            return f64::NAN;
        }

        let mean = values.iter().mean();
        let m2: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
        let m4: f64 = values.iter().map(|v| (v - mean).powi(4)).sum();

        let denominator = (n - 2.0) * (n - 3.0) * m2.powi(2);
        if denominator == 0.0 {
            return 0.0;
        }
        let numerator = n * (n + 1.0) * (n - 1.0) * m4;
        let adjustment = 3.0 * (n - 1.0).powi(2) / ((n - 2.0) * (n - 3.0));

        numerator / denominator - adjustment
    }

    /// Present values of a numeric column, nulls and NaN removed.
    fn present_values(df: &DataFrame, column: &str) -> Result<Vec<f64>, ProcessorError> {
        Ok(DataProcessor::column_values(df, column)?
            .into_iter()
            .flatten()
            .filter(|v| !v.is_nan())
            .collect())
    }

    /// Correlation matrix across the numeric columns of `df`.
    pub fn correlation_matrix(df: &DataFrame) -> Result<CorrelationMatrix, ProcessorError> {
        let labels = DataProcessor::numeric_columns(df);
        let columns = labels
            .iter()
            .map(|name| DataProcessor::column_values(df, name))
            .collect::<Result<Vec<_>, _>>()?;

        let values: Vec<Vec<f64>> = columns
            .iter()
            .map(|x| columns.iter().map(|y| Self::pearson(x, y)).collect())
            .collect();

        Ok(CorrelationMatrix { labels, values })
    }

    /// Skewness of every numeric column, in column order.
    pub fn column_skewness(df: &DataFrame) -> Result<Vec<(String, f64)>, ProcessorError> {
        Self::per_column(df, Self::skewness)
    }

    /// Excess kurtosis of every numeric column, in column order.
    pub fn column_kurtosis(df: &DataFrame) -> Result<Vec<(String, f64)>, ProcessorError> {
        Self::per_column(df, Self::kurtosis)
    }

    /// Descriptive summary of every numeric column.
    pub fn describe(df: &DataFrame) -> Result<Vec<ColumnSummary>, ProcessorError> {
        DataProcessor::numeric_columns(df)
            .into_iter()
            .map(|name| -> Result<ColumnSummary, ProcessorError> {
                let mut summary = Self::compute_descriptive_stats(&Self::present_values(df, &name)?);
                summary.column = name;
                Ok(summary)
            })
            .collect()
    }

    fn per_column(
        df: &DataFrame,
        statistic: fn(&[f64]) -> f64,
    ) -> Result<Vec<(String, f64)>, ProcessorError> {
        DataProcessor::numeric_columns(df)
            .into_iter()
            .map(|name| -> Result<(String, f64), ProcessorError> {
                let value = statistic(&Self::present_values(df, &name)?);
                Ok((name, value))
            })
            .collect()
    }
}
