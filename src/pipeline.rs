//! Analysis Pipeline
//! Load → slice → merge → describe → plot → moments, as one callable run.

use crate::charts::{BarChartSpec, ChartError, ChartPlotter};
use crate::config::{AnalysisConfig, ConfigError};
use crate::data::{
    suffixed, DataProcessor, IndicatorData, IndicatorLoader, LoaderError, ProcessorError,
    LEFT_SUFFIX, RIGHT_SUFFIX, YEARS_COLUMN,
};
use crate::stats::{ColumnSummary, CorrelationMatrix, StatsCalculator};
use polars::prelude::DataFrame;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

pub const EMISSIONS_COLUMN: &str = "Total_greenhouse_gas_emission";
pub const POPULATION_COLUMN: &str = "population_total";
pub const URBAN_COLUMN: &str = "urbanpopulation";
pub const AGRICULTURE_COLUMN: &str = "agriculturalland";

/// Countries shown in the grouped bar charts.
pub const BAR_COUNTRIES: [&str; 6] = ["India", "France", "Spain", "Germany", "Morocco", "Nigeria"];
pub const BAR_COLORS: [&str; 6] = ["black", "red", "darkgreen", "brown", "darkorange", "navy"];

const PIE_FONT_SIZE: f64 = 14.0;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Loader(#[from] LoaderError),
    #[error(transparent)]
    Processor(#[from] ProcessorError),
    #[error(transparent)]
    Chart(#[from] ChartError),
}

/// The four loaded indicators.
#[derive(Debug, Clone)]
pub struct Indicators {
    pub emissions: IndicatorData,
    pub population: IndicatorData,
    pub urban: IndicatorData,
    pub agriculture: IndicatorData,
}

/// Everything a run produces besides the chart files themselves.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    /// Country-keyed merge of the four indicators at the slice year.
    pub by_country: DataFrame,
    /// Year-keyed merge of agricultural land (`_x`) and emissions (`_y`).
    pub by_year: DataFrame,
    pub summary: Vec<ColumnSummary>,
    pub correlation: CorrelationMatrix,
    pub population_skewness: Vec<(String, f64)>,
    pub population_kurtosis: Vec<(String, f64)>,
    pub charts: Vec<PathBuf>,
}

impl AnalysisReport {
    /// Print the descriptive summary and the moment tables to stdout.
    pub fn print(&self) {
        println!(
            "{:<32} {:>6} {:>14} {:>14} {:>14} {:>14} {:>14} {:>14} {:>14}",
            "column", "count", "mean", "std", "min", "25%", "50%", "75%", "max"
        );
        for s in &self.summary {
            println!(
                "{:<32} {:>6} {:>14.3} {:>14.3} {:>14.3} {:>14.3} {:>14.3} {:>14.3} {:>14.3}",
                s.column, s.count, s.mean, s.std, s.min, s.p25, s.median, s.p75, s.max
            );
        }

        println!("Skew1:");
        for (column, value) in &self.population_skewness {
            println!("{column:<12} {value:>12.6}");
        }
        println!("Kurt1:");
        for (column, value) in &self.population_kurtosis {
            println!("{column:<12} {value:>12.6}");
        }
    }
}

pub fn load_indicators(config: &AnalysisConfig) -> Result<Indicators, PipelineError> {
    let loader = IndicatorLoader::new(config.loader.clone());
    Ok(Indicators {
        emissions: loader.load(config.emissions_path())?,
        population: loader.load(config.population_path())?,
        urban: loader.load(config.urban_path())?,
        agriculture: loader.load(config.agriculture_path())?,
    })
}

/// Slice every indicator at `year` and merge the slices on country.
pub fn merge_year_slices(indicators: &Indicators, year: &str) -> Result<DataFrame, PipelineError> {
    let slices = [
        DataProcessor::slice_year(&indicators.emissions.by_country, year, EMISSIONS_COLUMN)?,
        DataProcessor::slice_year(&indicators.population.by_country, year, POPULATION_COLUMN)?,
        DataProcessor::slice_year(&indicators.urban.by_country, year, URBAN_COLUMN)?,
        DataProcessor::slice_year(&indicators.agriculture.by_country, year, AGRICULTURE_COLUMN)?,
    ];
    Ok(DataProcessor::merge_on_country(&slices)?)
}

/// Bar chart columns for the bar countries from one side of a year merge.
pub fn bar_columns(suffix: &str) -> Vec<String> {
    BAR_COUNTRIES.iter().map(|c| suffixed(c, suffix)).collect()
}

/// Run the full analysis described by `config`.
pub fn run(config: &AnalysisConfig) -> Result<AnalysisReport, PipelineError> {
    let window = config.year_window()?;
    let indicators = load_indicators(config)?;

    let by_country = merge_year_slices(&indicators, &config.slice_year)?;
    let summary = StatsCalculator::describe(&by_country)?;
    let correlation = StatsCalculator::correlation_matrix(&by_country)?;
    info!(
        "merged indicators at {}: {} rows x {} columns",
        config.slice_year,
        by_country.height(),
        by_country.width()
    );

    // Agricultural land is the left input (`_x`) and emissions the right (`_y`),
    // matching the titles of the two bar charts drawn from this table.
    let by_year = DataProcessor::merge_on_years(
        &indicators.agriculture.by_year,
        &indicators.emissions.by_year,
        &window,
    )?;

    let population_skewness = StatsCalculator::column_skewness(&indicators.population.by_year)?;
    let population_kurtosis = StatsCalculator::column_kurtosis(&indicators.population.by_year)?;

    let charts = if config.render_charts {
        render_charts(config, &indicators, &by_year, &correlation)?
    } else {
        info!("chart rendering disabled");
        Vec::new()
    };

    Ok(AnalysisReport {
        by_country,
        by_year,
        summary,
        correlation,
        population_skewness,
        population_kurtosis,
        charts,
    })
}

fn render_charts(
    config: &AnalysisConfig,
    indicators: &Indicators,
    by_year: &DataFrame,
    correlation: &CorrelationMatrix,
) -> Result<Vec<PathBuf>, PipelineError> {
    let plotter = ChartPlotter::new(&config.output_dir)?;
    let mut charts = vec![plotter.heatmap(correlation)?];

    let land = BarChartSpec::new(
        YEARS_COLUMN,
        bar_columns(LEFT_SUFFIX),
        "Agricultural land",
        "Years",
        "% of land area",
        &BAR_COLORS,
    );
    let emissions = BarChartSpec::new(
        YEARS_COLUMN,
        bar_columns(RIGHT_SUFFIX),
        "Total greenhouse gas emission",
        "Years",
        "kilotons",
        &BAR_COLORS,
    );
    charts.push(plotter.grouped_bar(by_year, &land)?);
    charts.push(plotter.grouped_bar(by_year, &emissions)?);

    charts.push(plotter.line_chart(&indicators.urban.by_year, "% of land area", "Urban population")?);
    charts.push(plotter.line_chart(&indicators.population.by_year, "annual %", "Total population")?);

    charts.push(plotter.box_plot(&indicators.agriculture.by_year, &config.loader.countries)?);
    charts.push(plotter.pie_chart(
        &indicators.population.by_country,
        &config.slice_year,
        PIE_FONT_SIZE,
    )?);

    info!("{} charts written to {}", charts.len(), plotter.output_dir().display());
    Ok(charts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::{full_rows, linear, write_world_bank_csv};
    use crate::data::COUNTRY_COLUMN;
    use anyhow::Result;
    use tempfile::tempdir;

    fn fixture_config(dir: &std::path::Path) -> AnalysisConfig {
        let config = AnalysisConfig {
            data_dir: dir.to_path_buf(),
            output_dir: dir.join("charts"),
            render_charts: false,
            ..AnalysisConfig::default()
        };
        write_world_bank_csv(dir, &config.files.emissions, "GHG", &full_rows(10.0));
        write_world_bank_csv(dir, &config.files.population, "Population", &full_rows(1e5));
        write_world_bank_csv(dir, &config.files.urban, "Urban", &full_rows(5e4));
        write_world_bank_csv(dir, &config.files.agriculture, "Agri", &full_rows(0.5));
        config
    }

    #[test]
    fn end_to_end_merge_has_seven_rows_and_five_columns() -> Result<()> {
        let dir = tempdir()?;
        let report = run(&fixture_config(dir.path()))?;

        assert_eq!(report.by_country.height(), 7);
        assert_eq!(report.by_country.width(), 5);
        let names: Vec<String> = report
            .by_country
            .get_column_names()
            .into_iter()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                COUNTRY_COLUMN,
                EMISSIONS_COLUMN,
                POPULATION_COLUMN,
                URBAN_COLUMN,
                AGRICULTURE_COLUMN
            ]
        );
        assert!(report.charts.is_empty());
        Ok(())
    }

    #[test]
    fn year_merge_exposes_suffixed_bar_columns() -> Result<()> {
        let dir = tempdir()?;
        let report = run(&fixture_config(dir.path()))?;

        assert_eq!(report.by_year.height(), 8);
        for column in bar_columns(LEFT_SUFFIX).iter().chain(bar_columns(RIGHT_SUFFIX).iter()) {
            assert!(report.by_year.get_column_index(column).is_some(), "{column}");
        }
        // Spain agricultural land in 1990: 0.5 * 40 + 0.3 * 30.
        let spain = DataProcessor::column_values(&report.by_year, "Spain_x")?;
        assert!((spain[0].unwrap() - 29.0).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn statistics_cover_every_column() -> Result<()> {
        let dir = tempdir()?;
        let report = run(&fixture_config(dir.path()))?;

        assert_eq!(report.summary.len(), 4);
        assert!(report.summary.iter().all(|s| s.count == 7));
        assert_eq!(report.correlation.labels.len(), 4);

        // Seven countries plus the Years key.
        assert_eq!(report.population_skewness.len(), 8);
        assert_eq!(report.population_kurtosis.len(), 8);
        // Linear growth has no skew.
        let (_, india_skew) = report
            .population_skewness
            .iter()
            .find(|(c, _)| c == "India")
            .unwrap();
        assert!(india_skew.abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn country_missing_from_one_file_is_null_there() -> Result<()> {
        let dir = tempdir()?;
        let config = fixture_config(dir.path());
        let rows: Vec<_> = full_rows(0.5)
            .into_iter()
            .filter(|(c, _)| *c != "Morocco")
            .chain(std::iter::once(("Kenya", linear(1.0, 1.0))))
            .collect();
        write_world_bank_csv(dir.path(), &config.files.agriculture, "Agri", &rows);

        let indicators = load_indicators(&config)?;
        let merged = merge_year_slices(&indicators, "1997")?;
        assert_eq!(merged.height(), 7);

        let countries = DataProcessor::label_values(&merged, COUNTRY_COLUMN)?;
        let morocco = countries.iter().position(|c| c == "Morocco").unwrap();
        assert_eq!(DataProcessor::column_values(&merged, AGRICULTURE_COLUMN)?[morocco], None);
        assert!(DataProcessor::column_values(&merged, URBAN_COLUMN)?[morocco].is_some());
        Ok(())
    }

    #[test]
    fn rendering_writes_every_chart() -> Result<()> {
        let dir = tempdir()?;
        let config = AnalysisConfig {
            render_charts: true,
            ..fixture_config(dir.path())
        };
        let report = run(&config)?;

        assert_eq!(report.charts.len(), 7);
        let mut names = Vec::new();
        for chart in &report.charts {
            assert!(chart.starts_with(&config.output_dir), "{}", chart.display());
            assert!(std::fs::metadata(chart)?.len() > 0, "{}", chart.display());
            names.push(chart.file_name().map(|n| n.to_string_lossy().to_string()));
        }
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 7);
        assert!(config.output_dir.join("agricultural_land.png").exists());
        assert!(config.output_dir.join("total_greenhouse_gas_emission.png").exists());
        Ok(())
    }

    #[test]
    fn missing_file_propagates() {
        let dir = tempdir().unwrap();
        let config = AnalysisConfig {
            data_dir: dir.path().to_path_buf(),
            render_charts: false,
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            run(&config),
            Err(PipelineError::Loader(LoaderError::Io { .. }))
        ));
    }
}
