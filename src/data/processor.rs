//! Data Processor Module
//! Slicing single years out of indicator tables and joining tables on the
//! country or year key.

use super::{COUNTRY_COLUMN, YEARS_COLUMN};
use polars::prelude::*;
use std::collections::HashSet;
use std::ops::RangeInclusive;
use thiserror::Error;
use tracing::debug;

/// Appended to a colliding column name coming from the left input of a join.
pub const LEFT_SUFFIX: &str = "_x";
/// Appended to a colliding column name coming from the right input of a join.
pub const RIGHT_SUFFIX: &str = "_y";

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Column '{0}' not found")]
    MissingColumn(String),
    #[error("No tables to merge")]
    NothingToMerge,
}

/// Name a colliding column receives after a join, e.g. `India_x`.
pub fn suffixed(name: &str, suffix: &str) -> String {
    format!("{name}{suffix}")
}

/// Handles slicing, joining and column extraction.
pub struct DataProcessor;

impl DataProcessor {
    /// Keep `Country Name` and a single year column, renamed to `rename_to`.
    pub fn slice_year(
        df: &DataFrame,
        year: &str,
        rename_to: &str,
    ) -> Result<DataFrame, ProcessorError> {
        Self::require_column(df, COUNTRY_COLUMN)?;
        Self::require_column(df, year)?;

        let mut sliced = df.select([COUNTRY_COLUMN, year])?;
        sliced.rename(year, rename_to.into())?;
        Ok(sliced)
    }

    /// Outer-join tables on `Country Name`, folding left to right.
    ///
    /// Every country present in any input gets a row; a country missing from
    /// an input is null in that input's columns. Rows are ordered by country.
    pub fn merge_on_country(tables: &[DataFrame]) -> Result<DataFrame, ProcessorError> {
        let (first, rest) = tables.split_first().ok_or(ProcessorError::NothingToMerge)?;
        Self::require_column(first, COUNTRY_COLUMN)?;

        let mut merged = first.clone();
        for table in rest {
            Self::require_column(table, COUNTRY_COLUMN)?;
            merged = Self::full_join(&merged, table, COUNTRY_COLUMN)?.collect()?;
        }

        let merged = merged.sort([COUNTRY_COLUMN], SortMultipleOptions::default())?;
        debug!(
            "merged {} tables on {}: {} rows x {} columns",
            tables.len(),
            COUNTRY_COLUMN,
            merged.height(),
            merged.width()
        );
        Ok(merged)
    }

    /// Outer-join two year-keyed tables on `Years` and keep only the years in
    /// `window`.
    ///
    /// Country columns present in both inputs come out as `<country>_x`
    /// (from `left`) and `<country>_y` (from `right`).
    pub fn merge_on_years(
        left: &DataFrame,
        right: &DataFrame,
        window: &RangeInclusive<i64>,
    ) -> Result<DataFrame, ProcessorError> {
        Self::require_column(left, YEARS_COLUMN)?;
        Self::require_column(right, YEARS_COLUMN)?;

        let merged = Self::full_join(left, right, YEARS_COLUMN)?
            .filter(
                col(YEARS_COLUMN)
                    .gt_eq(lit(*window.start()))
                    .and(col(YEARS_COLUMN).lt_eq(lit(*window.end()))),
            )
            .sort([YEARS_COLUMN], SortMultipleOptions::default())
            .collect()?;

        debug!(
            "merged on {} within {}..={}: {} rows x {} columns",
            YEARS_COLUMN,
            window.start(),
            window.end(),
            merged.height(),
            merged.width()
        );
        Ok(merged)
    }

    /// Full outer join with a coalesced key. Non-key names present on both
    /// sides are suffixed before joining so the result never collides.
    fn full_join(
        left: &DataFrame,
        right: &DataFrame,
        key: &str,
    ) -> Result<LazyFrame, ProcessorError> {
        let right_names: HashSet<&str> = right
            .get_column_names()
            .into_iter()
            .map(|name| name.as_str())
            .collect();
        let colliding: Vec<String> = left
            .get_column_names()
            .into_iter()
            .map(|name| name.as_str())
            .filter(|name| *name != key && right_names.contains(name))
            .map(str::to_string)
            .collect();

        let mut left = left.clone();
        let mut right = right.clone();
        for name in &colliding {
            left.rename(name, suffixed(name, LEFT_SUFFIX).into())?;
            right.rename(name, suffixed(name, RIGHT_SUFFIX).into())?;
        }
        if !colliding.is_empty() {
            debug!("suffixed {} colliding columns on {}", colliding.len(), key);
        }

        Ok(left.lazy().join(
            right.lazy(),
            [col(key)],
            [col(key)],
            JoinArgs::new(JoinType::Full).with_coalesce(JoinCoalesce::CoalesceColumns),
        ))
    }

    /// Replace negative and missing values of `column` with zero.
    pub fn clamp_non_negative(df: &DataFrame, column: &str) -> Result<DataFrame, ProcessorError> {
        let clamped = Self::clamp_values(&Self::column_values(df, column)?);
        let mut out = df.clone();
        out.with_column(Column::new(column.into(), clamped))?;
        Ok(out)
    }

    pub fn clamp_values(values: &[Option<f64>]) -> Vec<f64> {
        values
            .iter()
            .map(|v| match v {
                Some(x) if *x > 0.0 => *x,
                _ => 0.0,
            })
            .collect()
    }

    /// Get list of numeric column names.
    pub fn numeric_columns(df: &DataFrame) -> Vec<String> {
        df.get_columns()
            .iter()
            .filter(|col| {
                matches!(
                    col.dtype(),
                    DataType::Float32
                        | DataType::Float64
                        | DataType::Int8
                        | DataType::Int16
                        | DataType::Int32
                        | DataType::Int64
                        | DataType::UInt8
                        | DataType::UInt16
                        | DataType::UInt32
                        | DataType::UInt64
                )
            })
            .map(|col| col.name().to_string())
            .collect()
    }

    /// Values of a column as optional floats.
    pub fn column_values(df: &DataFrame, column: &str) -> Result<Vec<Option<f64>>, ProcessorError> {
        Self::require_column(df, column)?;
        let values = df.column(column)?.cast(&DataType::Float64)?;
        Ok(values.f64()?.into_iter().collect())
    }

    /// Values of a column rendered as labels; nulls become empty strings.
    pub fn label_values(df: &DataFrame, column: &str) -> Result<Vec<String>, ProcessorError> {
        Self::require_column(df, column)?;
        let labels = df.column(column)?.cast(&DataType::String)?;
        Ok(labels
            .str()?
            .into_iter()
            .map(|v| v.unwrap_or_default().to_string())
            .collect())
    }

    fn require_column(df: &DataFrame, column: &str) -> Result<(), ProcessorError> {
        if df.get_column_index(column).is_none() {
            return Err(ProcessorError::MissingColumn(column.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn indicator(values: &[(&str, f64)], name: &str) -> Result<DataFrame> {
        let countries: Vec<&str> = values.iter().map(|(c, _)| *c).collect();
        let numbers: Vec<f64> = values.iter().map(|(_, v)| *v).collect();
        Ok(DataFrame::new(vec![
            Column::new(COUNTRY_COLUMN.into(), countries),
            Column::new(name.into(), numbers),
        ])?)
    }

    fn year_table(countries: &[&str], years: std::ops::RangeInclusive<i64>) -> Result<DataFrame> {
        let years: Vec<i64> = years.collect();
        let mut columns: Vec<Column> = countries
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let values: Vec<f64> = years.iter().map(|y| (*y as f64) + i as f64).collect();
                Column::new((*c).into(), values)
            })
            .collect();
        columns.push(Column::new(YEARS_COLUMN.into(), years));
        Ok(DataFrame::new(columns)?)
    }

    #[test]
    fn slice_selects_and_renames() -> Result<()> {
        let df = df!(
            COUNTRY_COLUMN => ["France", "Spain"],
            "1996" => [1.0, 2.0],
            "1997" => [3.0, 4.0],
        )?;
        let sliced = DataProcessor::slice_year(&df, "1997", "population_total")?;

        let names: Vec<String> = sliced
            .get_column_names()
            .into_iter()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(names, vec![COUNTRY_COLUMN, "population_total"]);
        assert_eq!(
            DataProcessor::column_values(&sliced, "population_total")?,
            vec![Some(3.0), Some(4.0)]
        );
        Ok(())
    }

    #[test]
    fn slice_without_year_fails() -> Result<()> {
        let df = df!(COUNTRY_COLUMN => ["France"], "1996" => [1.0])?;
        let err = DataProcessor::slice_year(&df, "1997", "x").unwrap_err();
        assert!(matches!(err, ProcessorError::MissingColumn(ref c) if c == "1997"));
        Ok(())
    }

    #[test]
    fn four_way_merge_keeps_union_of_countries() -> Result<()> {
        let a = indicator(&[("France", 1.0), ("Spain", 2.0), ("India", 3.0)], "a")?;
        let b = indicator(&[("France", 10.0), ("Spain", 20.0), ("Georgia", 30.0)], "b")?;
        let c = indicator(&[("France", 100.0), ("India", 300.0), ("Georgia", 400.0)], "c")?;
        let d = indicator(&[("Spain", 2000.0), ("India", 3000.0), ("Georgia", 4000.0)], "d")?;

        let merged = DataProcessor::merge_on_country(&[a, b, c, d])?;
        assert_eq!(merged.height(), 4);
        assert_eq!(merged.width(), 5);

        let countries = DataProcessor::label_values(&merged, COUNTRY_COLUMN)?;
        assert_eq!(countries, vec!["France", "Georgia", "India", "Spain"]);

        // France is missing only from `d`.
        let france = countries.iter().position(|c| c == "France").unwrap();
        assert_eq!(DataProcessor::column_values(&merged, "a")?[france], Some(1.0));
        assert_eq!(DataProcessor::column_values(&merged, "b")?[france], Some(10.0));
        assert_eq!(DataProcessor::column_values(&merged, "c")?[france], Some(100.0));
        assert_eq!(DataProcessor::column_values(&merged, "d")?[france], None);

        // Georgia is missing only from `a`.
        let georgia = countries.iter().position(|c| c == "Georgia").unwrap();
        assert_eq!(DataProcessor::column_values(&merged, "a")?[georgia], None);
        assert_eq!(DataProcessor::column_values(&merged, "d")?[georgia], Some(4000.0));
        Ok(())
    }

    #[test]
    fn merging_nothing_is_an_error() {
        assert!(matches!(
            DataProcessor::merge_on_country(&[]),
            Err(ProcessorError::NothingToMerge)
        ));
    }

    #[test]
    fn year_merge_filters_window_and_suffixes() -> Result<()> {
        let left = year_table(&["India", "France"], 1985..=2000)?;
        let right = year_table(&["India", "Spain"], 1988..=1999)?;

        let merged = DataProcessor::merge_on_years(&left, &right, &(1990..=1997))?;
        assert_eq!(merged.height(), 8);

        let years: Vec<i64> = merged.column(YEARS_COLUMN)?.i64()?.into_iter().flatten().collect();
        assert_eq!(years, (1990..=1997).collect::<Vec<_>>());

        let mut names: Vec<String> = merged
            .get_column_names()
            .into_iter()
            .map(|n| n.to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["France", "India_x", "India_y", "Spain", "Years"]);

        // India is column 0 on both sides; Spain is column 1 on the right.
        assert_eq!(DataProcessor::column_values(&merged, "India_x")?[0], Some(1990.0));
        assert_eq!(DataProcessor::column_values(&merged, "Spain")?[0], Some(1991.0));
        Ok(())
    }

    #[test]
    fn year_merge_keeps_years_missing_from_one_side() -> Result<()> {
        let left = year_table(&["India"], 1990..=1997)?;
        let right = year_table(&["India"], 1993..=1997)?;

        let merged = DataProcessor::merge_on_years(&left, &right, &(1990..=1997))?;
        assert_eq!(merged.height(), 8);
        let right_india = DataProcessor::column_values(&merged, "India_y")?;
        assert_eq!(right_india[0], None);
        assert_eq!(right_india[3], Some(1993.0));
        Ok(())
    }

    #[test]
    fn clamping_removes_negatives_and_keeps_sum() -> Result<()> {
        let df = df!(
            COUNTRY_COLUMN => ["France", "Spain", "India", "Georgia"],
            "1997" => [Some(5.0), Some(-3.0), None, Some(2.5)],
        )?;

        let clamped = DataProcessor::clamp_non_negative(&df, "1997")?;
        let values: Vec<f64> = DataProcessor::column_values(&clamped, "1997")?
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(values.len(), 4);
        assert!(values.iter().all(|v| *v >= 0.0));
        assert_eq!(values.iter().sum::<f64>(), 7.5);
        Ok(())
    }

    #[test]
    fn numeric_columns_skip_labels() -> Result<()> {
        let df = df!(
            COUNTRY_COLUMN => ["France"],
            "a" => [1.0],
            "b" => [2i64],
        )?;
        assert_eq!(DataProcessor::numeric_columns(&df), vec!["a", "b"]);
        Ok(())
    }
}
