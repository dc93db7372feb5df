//! Chart Plotter Module
//! Renders the indicator charts to PNG files with plotters.

use super::renderer::{
    centered, chart_file_name, diverging_color, draw_legend, ensure_output_dir, figure_pixels,
    named_color, pie_wedges, polar, wedge_outline, BoxStats, ChartError, FONT_FAMILY, PALETTE,
};
use crate::data::{DataProcessor, COUNTRY_COLUMN, YEARS_COLUMN};
use crate::stats::CorrelationMatrix;
use polars::prelude::DataFrame;
use plotters::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const HEATMAP_TITLE: &str = "Correlation matrix of Indicators";
pub const BOX_PLOT_TITLE: &str = "Agricultural Land Area Distribution";
pub const BOX_PLOT_Y_LABEL: &str = "Agricultural Land Area Output";

/// Extra width on the right of a figure for its legend.
const LEGEND_WIDTH: u32 = 220;
/// Sized so the plotting area left after labels and margins is square.
const HEATMAP_SIZE: (u32, u32) = (800, 700);
const HEATMAP_TITLE_HEIGHT: u32 = 40;
const COLOR_BAR_WIDTH: u32 = 120;

/// Half widths of a box and of its whisker caps, in category units.
const BOX_HALF_WIDTH: f64 = 0.25;
const BOX_CAP_HALF_WIDTH: f64 = 0.125;

/// Share of the radius by which the first pie wedge is pulled out.
const PIE_EXPLODE: f64 = 0.1;
const PIE_START_ANGLE: f64 = 180.0;

/// Settings for a grouped bar chart.
#[derive(Debug, Clone)]
pub struct BarChartSpec {
    pub x_column: String,
    pub y_columns: Vec<String>,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub colors: Vec<String>,
    /// Inches, rendered at 100 DPI.
    pub figsize: (f64, f64),
    pub font_size: f64,
}

impl BarChartSpec {
    pub fn new(
        x_column: &str,
        y_columns: Vec<String>,
        title: &str,
        x_label: &str,
        y_label: &str,
        colors: &[&str],
    ) -> Self {
        Self {
            x_column: x_column.to_string(),
            y_columns,
            title: title.to_string(),
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            colors: colors.iter().map(|c| c.to_string()).collect(),
            figsize: (8.0, 6.0),
            font_size: 12.0,
        }
    }
}

/// Writes charts into a single output directory.
pub struct ChartPlotter {
    output_dir: PathBuf,
}

impl ChartPlotter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self, ChartError> {
        let output_dir = output_dir.into();
        ensure_output_dir(&output_dir)?;
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Annotated correlation heatmap on a diverging scale centred at 0.
    pub fn heatmap(&self, matrix: &CorrelationMatrix) -> Result<PathBuf, ChartError> {
        if matrix.labels.is_empty() {
            return Err(ChartError::Empty(HEATMAP_TITLE.to_string()));
        }
        let path = self.output_dir.join(chart_file_name(HEATMAP_TITLE));
        Self::draw_heatmap(&path, matrix)?;
        info!("heatmap → {}", path.display());
        Ok(path)
    }

    fn draw_heatmap(path: &Path, matrix: &CorrelationMatrix) -> Result<(), ChartError> {
        let n = matrix.labels.len() as i32;
        let labels = &matrix.labels;

        let root = BitMapBackend::new(path, HEATMAP_SIZE).into_drawing_area();
        root.fill(&WHITE)?;
        let (title_area, body) = root.split_vertically(HEATMAP_TITLE_HEIGHT);
        title_area.draw(&Text::new(
            HEATMAP_TITLE,
            ((HEATMAP_SIZE.0 / 2) as i32, (HEATMAP_TITLE_HEIGHT / 2) as i32),
            centered(16.0, BLACK),
        ))?;
        let (plot_area, bar_area) = body.split_horizontally(HEATMAP_SIZE.0 - COLOR_BAR_WIDTH);

        let mut chart = ChartBuilder::on(&plot_area)
            .margin(10)
            .x_label_area_size(200)
            .y_label_area_size(220)
            .build_cartesian_2d(0i32..n, n..0i32)?;

        let (plot_w, plot_h) = chart.plotting_area().dim_in_pixel();
        let cell_w = plot_w as i32 / n;
        let cell_h = plot_h as i32 / n;

        let label_at = |v: &i32| labels.get(*v as usize).cloned().unwrap_or_default();
        chart
            .configure_mesh()
            .disable_x_mesh()
            .disable_y_mesh()
            .x_labels(n as usize + 1)
            .y_labels(n as usize + 1)
            .x_label_offset(cell_w / 2)
            .y_label_offset(cell_h / 2)
            .x_label_formatter(&label_at)
            .y_label_formatter(&label_at)
            .x_label_style(
                (FONT_FAMILY, 12.0)
                    .into_font()
                    .transform(FontTransform::Rotate90),
            )
            .label_style((FONT_FAMILY, 12.0))
            .draw()?;

        let cells: Vec<(i32, i32, f64)> = matrix
            .values
            .iter()
            .enumerate()
            .flat_map(|(y, row)| {
                row.iter()
                    .enumerate()
                    .map(move |(x, v)| (x as i32, y as i32, *v))
            })
            .collect();

        chart.draw_series(cells.iter().map(|&(x, y, v)| {
            Rectangle::new([(x, y), (x + 1, y + 1)], diverging_color(v).filled())
        }))?;
        chart.draw_series(cells.iter().map(|&(x, y, _)| {
            Rectangle::new([(x, y), (x + 1, y + 1)], WHITE.stroke_width(1))
        }))?;
        chart.draw_series(cells.iter().map(|&(x, y, v)| {
            EmptyElement::at((x, y))
                + Text::new(
                    format!("{v:.2}"),
                    (cell_w / 2, cell_h / 2),
                    centered(14.0, BLACK),
                )
        }))?;

        let mut bar = ChartBuilder::on(&bar_area)
            .margin_top(10)
            .margin_bottom(210)
            .margin_right(50)
            .y_label_area_size(40)
            .build_cartesian_2d(0i32..1i32, -100i32..100i32)?;
        bar.configure_mesh()
            .disable_mesh()
            .disable_x_axis()
            .y_labels(5)
            .y_label_formatter(&|v| format!("{:.1}", *v as f64 / 100.0))
            .draw()?;
        bar.draw_series((-100..100).map(|k| {
            Rectangle::new(
                [(0, k), (1, k + 1)],
                diverging_color(k as f64 / 100.0).filled(),
            )
        }))?;

        root.present()?;
        Ok(())
    }

    /// Vertical grouped bars, one group per x value and one bar per y column.
    pub fn grouped_bar(&self, df: &DataFrame, spec: &BarChartSpec) -> Result<PathBuf, ChartError> {
        let path = self.output_dir.join(chart_file_name(&spec.title));
        Self::draw_grouped_bar(&path, df, spec)?;
        info!("bar chart '{}' → {}", spec.title, path.display());
        Ok(path)
    }

    fn draw_grouped_bar(path: &Path, df: &DataFrame, spec: &BarChartSpec) -> Result<(), ChartError> {
        let categories = DataProcessor::label_values(df, &spec.x_column)?;
        let series = spec
            .y_columns
            .iter()
            .map(|c| DataProcessor::column_values(df, c))
            .collect::<Result<Vec<_>, _>>()?;
        let colors = series_colors(&spec.colors, series.len())?;

        let (y_min, y_max) = value_range(series.iter().flatten().flatten().copied(), true)
            .ok_or_else(|| ChartError::Empty(spec.title.clone()))?;
        if categories.is_empty() {
            return Err(ChartError::Empty(spec.title.clone()));
        }

        let (width, height) = figure_pixels(spec.figsize);
        let root = BitMapBackend::new(path, (width + LEGEND_WIDTH, height)).into_drawing_area();
        root.fill(&WHITE)?;
        let (plot_area, legend_area) = root.split_horizontally(width);

        let n = categories.len();
        let mut chart = ChartBuilder::on(&plot_area)
            .caption(&spec.title, (FONT_FAMILY, spec.font_size + 2.0))
            .margin(10)
            .x_label_area_size(50)
            .y_label_area_size(90)
            .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), y_min..y_max)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(n)
            .x_label_formatter(&|x| category_label(&categories, *x))
            .x_desc(spec.x_label.as_str())
            .y_desc(spec.y_label.as_str())
            .axis_desc_style((FONT_FAMILY, spec.font_size))
            .draw()?;

        // Each group spans one unit, shared by its bars.
        let bar_width = 1.0 / series.len().max(1) as f64;
        for (s, (values, color)) in series.iter().zip(colors.iter()).enumerate() {
            let offset = s as f64 * bar_width - 0.5;
            chart.draw_series(values.iter().enumerate().filter_map(|(i, v)| {
                v.map(|v| {
                    let left = i as f64 + offset;
                    Rectangle::new([(left, 0.0), (left + bar_width, v)], color.filled())
                })
            }))?;
        }

        let entries: Vec<(String, RGBColor)> = spec
            .y_columns
            .iter()
            .cloned()
            .zip(colors.iter().copied())
            .collect();
        draw_legend(&legend_area, &entries, spec.font_size)?;

        root.present()?;
        Ok(())
    }

    /// One line per country column against `Years`.
    pub fn line_chart(&self, df: &DataFrame, y_label: &str, title: &str) -> Result<PathBuf, ChartError> {
        let path = self.output_dir.join(chart_file_name(title));
        Self::draw_line_chart(&path, df, y_label, title)?;
        info!("line chart '{}' → {}", title, path.display());
        Ok(path)
    }

    fn draw_line_chart(path: &Path, df: &DataFrame, y_label: &str, title: &str) -> Result<(), ChartError> {
        let font_size = 12.0;
        let years = DataProcessor::column_values(df, YEARS_COLUMN)?;
        let columns: Vec<String> = DataProcessor::numeric_columns(df)
            .into_iter()
            .filter(|c| c != YEARS_COLUMN)
            .collect();
        let series = columns
            .iter()
            .map(|c| DataProcessor::column_values(df, c))
            .collect::<Result<Vec<_>, _>>()?;

        let (x_min, x_max) = value_range(years.iter().flatten().copied(), false)
            .ok_or_else(|| ChartError::Empty(title.to_string()))?;
        let (y_min, y_max) = value_range(series.iter().flatten().flatten().copied(), false)
            .ok_or_else(|| ChartError::Empty(title.to_string()))?;

        let (width, height) = figure_pixels((8.0, 6.0));
        let root = BitMapBackend::new(path, (width + LEGEND_WIDTH, height)).into_drawing_area();
        root.fill(&WHITE)?;
        let (plot_area, legend_area) = root.split_horizontally(width);

        let mut chart = ChartBuilder::on(&plot_area)
            .caption(title, (FONT_FAMILY, font_size + 2.0))
            .margin(10)
            .x_label_area_size(50)
            .y_label_area_size(90)
            .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

        chart
            .configure_mesh()
            .x_label_formatter(&|x| format!("{x:.0}"))
            .x_desc(YEARS_COLUMN)
            .y_desc(y_label)
            .axis_desc_style((FONT_FAMILY, font_size))
            .draw()?;

        let mut entries = Vec::with_capacity(columns.len());
        for (i, (name, values)) in columns.iter().zip(series.iter()).enumerate() {
            let color = PALETTE[i % PALETTE.len()];
            let points: Vec<(f64, f64)> = years
                .iter()
                .zip(values.iter())
                .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
                .collect();
            chart.draw_series(LineSeries::new(points, color.stroke_width(2)))?;
            entries.push((name.clone(), color));
        }
        draw_legend(&legend_area, &entries, font_size)?;

        root.present()?;
        Ok(())
    }

    /// One box per country over all years in the table.
    pub fn box_plot(&self, df: &DataFrame, countries: &[String]) -> Result<PathBuf, ChartError> {
        let path = self.output_dir.join(chart_file_name(BOX_PLOT_TITLE));
        Self::draw_box_plot(&path, df, countries)?;
        info!("box plot → {}", path.display());
        Ok(path)
    }

    fn draw_box_plot(path: &Path, df: &DataFrame, countries: &[String]) -> Result<(), ChartError> {
        let mut boxes = Vec::with_capacity(countries.len());
        let mut all_values = Vec::new();
        for (i, country) in countries.iter().enumerate() {
            let values: Vec<f64> = DataProcessor::column_values(df, country)?
                .into_iter()
                .flatten()
                .collect();
            match BoxStats::from_values(&values) {
                Some(stats) => {
                    all_values.extend(values);
                    boxes.push((i as f64, stats));
                }
                None => warn!("no values for {country}; box skipped"),
            }
        }

        let (y_min, y_max) = value_range(all_values.into_iter(), false)
            .ok_or_else(|| ChartError::Empty(BOX_PLOT_TITLE.to_string()))?;

        let (width, height) = figure_pixels((10.0, 5.0));
        let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
        root.fill(&WHITE)?;

        let n = countries.len();
        let mut chart = ChartBuilder::on(&root)
            .caption(BOX_PLOT_TITLE, (FONT_FAMILY, 16.0))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(90)
            .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), y_min..y_max)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(n)
            .x_label_formatter(&|x| category_label(countries, *x))
            .y_desc(BOX_PLOT_Y_LABEL)
            .draw()?;

        let style = PALETTE[0].stroke_width(2);
        for (x, stats) in &boxes {
            let x = *x;
            let (left, right) = (x - BOX_HALF_WIDTH, x + BOX_HALF_WIDTH);
            let (cap_left, cap_right) = (x - BOX_CAP_HALF_WIDTH, x + BOX_CAP_HALF_WIDTH);

            chart.draw_series(std::iter::once(Rectangle::new(
                [(left, stats.q1), (right, stats.q3)],
                style,
            )))?;
            chart.draw_series([
                PathElement::new(vec![(left, stats.median), (right, stats.median)], style),
                PathElement::new(vec![(x, stats.q3), (x, stats.whisker_high)], style),
                PathElement::new(vec![(x, stats.q1), (x, stats.whisker_low)], style),
                PathElement::new(
                    vec![(cap_left, stats.whisker_high), (cap_right, stats.whisker_high)],
                    style,
                ),
                PathElement::new(
                    vec![(cap_left, stats.whisker_low), (cap_right, stats.whisker_low)],
                    style,
                ),
            ])?;
            chart.draw_series(
                stats
                    .outliers
                    .iter()
                    .map(|v| Circle::new((x, *v), 4, BLACK.stroke_width(1))),
            )?;
        }

        root.present()?;
        Ok(())
    }

    /// Pie of one year column with negative values clamped to zero.
    pub fn pie_chart(&self, df: &DataFrame, year: &str, font_size: f64) -> Result<PathBuf, ChartError> {
        let title = format!("Total Population in {year}");
        let path = self.output_dir.join(chart_file_name(&title));
        Self::draw_pie_chart(&path, df, year, &title, font_size)?;
        info!("pie chart → {}", path.display());
        Ok(path)
    }

    fn draw_pie_chart(
        path: &Path,
        df: &DataFrame,
        year: &str,
        title: &str,
        font_size: f64,
    ) -> Result<(), ChartError> {
        let clamped = DataProcessor::clamp_non_negative(df, year)?;
        let values: Vec<f64> = DataProcessor::column_values(&clamped, year)?
            .into_iter()
            .map(|v| v.unwrap_or(0.0))
            .collect();
        let labels = DataProcessor::label_values(df, COUNTRY_COLUMN)?;
        if values.iter().sum::<f64>() <= 0.0 {
            return Err(ChartError::Empty(title.to_string()));
        }

        let (width, height) = figure_pixels((6.0, 6.0));
        let root = BitMapBackend::new(path, (width + LEGEND_WIDTH, height)).into_drawing_area();
        root.fill(&WHITE)?;
        let (plot_area, legend_area) = root.split_horizontally(width);

        plot_area.draw(&Text::new(
            title.to_string(),
            ((width / 2) as i32, 24),
            centered(font_size + 2.0, BLACK),
        ))?;

        let center = (width as f64 / 2.0, height as f64 / 2.0 + 20.0);
        let radius = width.min(height) as f64 * 0.35;
        let wedges = pie_wedges(&values, PIE_START_ANGLE);

        let mut entries = Vec::with_capacity(wedges.len());
        for (i, wedge) in wedges.iter().enumerate() {
            let color = PALETTE[i % PALETTE.len()];
            entries.push((labels.get(i).cloned().unwrap_or_default(), color));
            if wedge.fraction <= 0.0 {
                continue;
            }

            let shift = if i == 0 { PIE_EXPLODE * radius } else { 0.0 };
            let (sx, sy) = polar((0.0, 0.0), shift, wedge.mid_angle());
            let origin = (center.0 + sx as f64, center.1 + sy as f64);

            let outline = wedge_outline(origin, radius, wedge);
            plot_area.draw(&Polygon::new(outline.clone(), color.filled()))?;
            let mut edge = outline;
            edge.push(edge[0]);
            // Strokes are whole pixels; 1 px is the thinnest edge.
            plot_area.draw(&PathElement::new(edge, BLACK.stroke_width(1)))?;

            plot_area.draw(&Text::new(
                format!("{:.1}%", wedge.fraction * 100.0),
                polar(origin, radius * 0.6, wedge.mid_angle()),
                centered(font_size, BLACK),
            ))?;
            plot_area.draw(&Text::new(
                labels.get(i).cloned().unwrap_or_default(),
                polar(origin, radius * 1.15, wedge.mid_angle()),
                centered(font_size, BLACK),
            ))?;
        }
        draw_legend(&legend_area, &entries, font_size)?;

        root.present()?;
        Ok(())
    }
}

/// Colours for `count` series: the named colours when given, else the palette.
fn series_colors(names: &[String], count: usize) -> Result<Vec<RGBColor>, ChartError> {
    if names.is_empty() {
        return Ok((0..count).map(|i| PALETTE[i % PALETTE.len()]).collect());
    }
    let resolved = names
        .iter()
        .map(|n| named_color(n))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((0..count).map(|i| resolved[i % resolved.len()]).collect())
}

/// Axis range covering `values` with 5% headroom; optionally anchored at 0.
fn value_range(values: impl Iterator<Item = f64>, include_zero: bool) -> Option<(f64, f64)> {
    let (min, max) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if min > max {
        return None;
    }

    let (min, max) = if include_zero {
        (min.min(0.0), max.max(0.0))
    } else {
        (min, max)
    };
    let pad = if max > min {
        (max - min) * 0.05
    } else {
        max.abs().max(1.0) * 0.05
    };
    let low = if include_zero && min == 0.0 { 0.0 } else { min - pad };
    let high = if include_zero && max == 0.0 { 0.0 } else { max + pad };
    Some((low, high))
}

/// Label of the category at an integer tick; blank between ticks.
fn category_label(categories: &[String], x: f64) -> String {
    let i = x.round();
    if (x - i).abs() > 1e-6 || i < 0.0 {
        return String::new();
    }
    categories.get(i as usize).cloned().unwrap_or_default()
}
