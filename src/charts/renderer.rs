//! Static Chart Renderer
//! Shared drawing pieces for the PNG charts: colours, the diverging colour
//! scale, pie geometry and the legend pane placed beside each plot.

use crate::stats::StatsCalculator;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Drawing failed: {0}")]
    Drawing(String),
    #[error("Data error: {0}")]
    Data(#[from] crate::data::ProcessorError),
    #[error("Failed to create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Unknown colour '{0}'")]
    UnknownColor(String),
    #[error("Nothing to plot: {0}")]
    Empty(String),
}

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for ChartError {
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        ChartError::Drawing(err.to_string())
    }
}

/// Pixels per inch; figure sizes are given in inches.
pub const DPI: f64 = 100.0;

pub const FONT_FAMILY: &str = "sans-serif";

/// Colour palette for series without an explicit colour.
pub const PALETTE: [RGBColor; 10] = [
    RGBColor(31, 119, 180),  // Blue
    RGBColor(255, 127, 14),  // Orange
    RGBColor(44, 160, 44),   // Green
    RGBColor(214, 39, 40),   // Red
    RGBColor(148, 103, 189), // Purple
    RGBColor(140, 86, 75),   // Brown
    RGBColor(227, 119, 194), // Pink
    RGBColor(127, 127, 127), // Grey
    RGBColor(188, 189, 34),  // Olive
    RGBColor(23, 190, 207),  // Cyan
];

const DIVERGING_LOW: RGBColor = RGBColor(59, 76, 192);
const DIVERGING_MID: RGBColor = RGBColor(247, 247, 247);
const DIVERGING_HIGH: RGBColor = RGBColor(180, 4, 38);
const MISSING: RGBColor = RGBColor(200, 200, 200);

/// Resolve a named colour as used by the chart configuration.
pub fn named_color(name: &str) -> Result<RGBColor, ChartError> {
    let color = match name.trim().to_ascii_lowercase().as_str() {
        "black" => RGBColor(0, 0, 0),
        "white" => RGBColor(255, 255, 255),
        "red" => RGBColor(255, 0, 0),
        "green" => RGBColor(0, 128, 0),
        "darkgreen" => RGBColor(0, 100, 0),
        "blue" => RGBColor(0, 0, 255),
        "navy" => RGBColor(0, 0, 128),
        "brown" => RGBColor(165, 42, 42),
        "orange" => RGBColor(255, 165, 0),
        "darkorange" => RGBColor(255, 140, 0),
        "purple" => RGBColor(128, 0, 128),
        "grey" | "gray" => RGBColor(128, 128, 128),
        hex if hex.len() == 7 && hex.starts_with('#') => {
            let channel = |i: usize| {
                u8::from_str_radix(&hex[i..i + 2], 16)
                    .map_err(|_| ChartError::UnknownColor(name.to_string()))
            };
            RGBColor(channel(1)?, channel(3)?, channel(5)?)
        }
        _ => return Err(ChartError::UnknownColor(name.to_string())),
    };
    Ok(color)
}

/// Map a correlation in [-1, 1] onto a blue-white-red scale centred at 0.
pub fn diverging_color(value: f64) -> RGBColor {
    if value.is_nan() {
        return MISSING;
    }
    let v = value.clamp(-1.0, 1.0);
    let (from, to, t) = if v < 0.0 {
        (DIVERGING_MID, DIVERGING_LOW, -v)
    } else {
        (DIVERGING_MID, DIVERGING_HIGH, v)
    };
    let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    RGBColor(mix(from.0, to.0), mix(from.1, to.1), mix(from.2, to.2))
}

/// Pixel size of a figure given in inches.
pub fn figure_pixels(figsize: (f64, f64)) -> (u32, u32) {
    ((figsize.0 * DPI).round() as u32, (figsize.1 * DPI).round() as u32)
}

/// File name for a chart: lowercase title, non-alphanumerics collapsed to `_`.
pub fn chart_file_name(title: &str) -> String {
    let mut slug = String::new();
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }
    let slug = slug.trim_matches('_');
    if slug.is_empty() {
        "chart.png".to_string()
    } else {
        format!("{slug}.png")
    }
}

pub fn ensure_output_dir(dir: &Path) -> Result<(), ChartError> {
    std::fs::create_dir_all(dir).map_err(|source| ChartError::OutputDir {
        path: dir.to_path_buf(),
        source,
    })
}

/// Centred text style.
pub fn centered(size: f64, color: RGBColor) -> TextStyle<'static> {
    (FONT_FAMILY, size)
        .into_font()
        .color(&color)
        .pos(Pos::new(HPos::Center, VPos::Center))
}

/// Draw a legend in `area` with its upper-left corner at (`x`, half height),
/// to the right of the plot it describes.
pub fn draw_legend<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    entries: &[(String, RGBColor)],
    font_size: f64,
) -> Result<(), ChartError> {
    let (_, height) = area.dim_in_pixel();
    let swatch = font_size.round() as i32;
    let line = (font_size * 1.5).round() as i32;
    let x = 10;
    let mut y = (height / 2) as i32;

    for (label, color) in entries {
        area.draw(&Rectangle::new(
            [(x, y), (x + swatch, y + swatch)],
            color.filled(),
        ))?;
        area.draw(&Rectangle::new(
            [(x, y), (x + swatch, y + swatch)],
            BLACK.stroke_width(1),
        ))?;
        area.draw(&Text::new(
            label.clone(),
            (x + swatch + 6, y),
            (FONT_FAMILY, font_size).into_font(),
        ))?;
        y += line;
    }
    Ok(())
}

/// Whisker reach in multiples of the interquartile range.
const WHISKER_IQR: f64 = 1.5;

/// Box and whisker positions for one group. Whiskers end at the furthest
/// data point within 1.5 IQR of the box; points beyond are outliers.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub whisker_low: f64,
    pub whisker_high: f64,
    pub outliers: Vec<f64>,
}

impl BoxStats {
    /// `None` when `values` holds no finite value.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(|a, b| a.total_cmp(b));

        let q1 = StatsCalculator::percentile(&sorted, 25.0);
        let median = StatsCalculator::percentile(&sorted, 50.0);
        let q3 = StatsCalculator::percentile(&sorted, 75.0);
        let iqr = q3 - q1;
        let low_fence = q1 - WHISKER_IQR * iqr;
        let high_fence = q3 + WHISKER_IQR * iqr;

        // A whisker never reaches back inside the box.
        let whisker_low = sorted
            .iter()
            .copied()
            .find(|v| *v >= low_fence)
            .map_or(q1, |v| v.min(q1));
        let whisker_high = sorted
            .iter()
            .rev()
            .copied()
            .find(|v| *v <= high_fence)
            .map_or(q3, |v| v.max(q3));
        let outliers = sorted
            .iter()
            .copied()
            .filter(|v| *v < low_fence || *v > high_fence)
            .collect();

        Some(Self {
            q1,
            median,
            q3,
            whisker_low,
            whisker_high,
            outliers,
        })
    }
}

/// One pie wedge; angles in degrees, counter-clockwise from the positive x axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wedge {
    pub value: f64,
    pub fraction: f64,
    pub start: f64,
    pub end: f64,
}

impl Wedge {
    pub fn mid_angle(&self) -> f64 {
        (self.start + self.end) / 2.0
    }
}

/// Split a full circle among `values` (already non-negative) starting at
/// `start_angle` and sweeping counter-clockwise.
pub fn pie_wedges(values: &[f64], start_angle: f64) -> Vec<Wedge> {
    let total: f64 = values.iter().sum();
    let mut angle = start_angle;
    values
        .iter()
        .map(|&value| {
            let fraction = if total > 0.0 { value / total } else { 0.0 };
            let wedge = Wedge {
                value,
                fraction,
                start: angle,
                end: angle + fraction * 360.0,
            };
            angle = wedge.end;
            wedge
        })
        .collect()
}

/// Point on a circle in pixel space (y grows downwards).
pub fn polar(center: (f64, f64), radius: f64, degrees: f64) -> (i32, i32) {
    let rad = degrees.to_radians();
    (
        (center.0 + radius * rad.cos()).round() as i32,
        (center.1 - radius * rad.sin()).round() as i32,
    )
}

/// Outline of a wedge: centre followed by the arc, one point per degree.
pub fn wedge_outline(center: (f64, f64), radius: f64, wedge: &Wedge) -> Vec<(i32, i32)> {
    let steps = ((wedge.end - wedge.start).abs().ceil() as usize).max(1);
    let mut points = Vec::with_capacity(steps + 2);
    points.push((center.0.round() as i32, center.1.round() as i32));
    for i in 0..=steps {
        let angle = wedge.start + (wedge.end - wedge.start) * i as f64 / steps as f64;
        points.push(polar(center, radius, angle));
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_bar_chart_colours() -> Result<(), ChartError> {
        for name in ["black", "red", "darkgreen", "brown", "darkorange", "navy"] {
            named_color(name)?;
        }
        assert_eq!(named_color("#1f77b4")?, RGBColor(31, 119, 180));
        assert!(matches!(
            named_color("octarine"),
            Err(ChartError::UnknownColor(_))
        ));
        Ok(())
    }

    #[test]
    fn diverging_scale_is_centred_at_zero() {
        assert_eq!(diverging_color(0.0), DIVERGING_MID);
        assert_eq!(diverging_color(1.0), DIVERGING_HIGH);
        assert_eq!(diverging_color(-1.0), DIVERGING_LOW);
        assert_eq!(diverging_color(5.0), DIVERGING_HIGH);
        assert_eq!(diverging_color(f64::NAN), MISSING);
    }

    #[test]
    fn wedges_cover_the_circle() {
        let wedges = pie_wedges(&[1.0, 0.0, 3.0], 180.0);
        assert_eq!(wedges.len(), 3);
        assert_eq!(wedges[0].start, 180.0);
        assert_eq!(wedges[0].end, 270.0);
        assert_eq!(wedges[1].start, wedges[1].end);
        assert!((wedges[2].end - 540.0).abs() < 1e-9);

        let sum: f64 = wedges.iter().map(|w| w.value).sum();
        assert_eq!(sum, 4.0);
        let fractions: f64 = wedges.iter().map(|w| w.fraction).sum();
        assert!((fractions - 1.0).abs() < 1e-12);
    }

    #[test]
    fn whiskers_stop_at_data_within_fences() {
        let stats = BoxStats::from_values(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]).unwrap();
        assert_eq!(stats.q1, 2.75);
        assert_eq!(stats.median, 4.5);
        assert_eq!(stats.q3, 6.25);
        assert_eq!(stats.whisker_low, 1.0);
        assert_eq!(stats.whisker_high, 8.0);
        assert!(stats.outliers.is_empty());
    }

    #[test]
    fn points_beyond_fences_are_outliers() {
        // q1 = 2, q3 = 4, fences at -1 and 7.
        let stats = BoxStats::from_values(&[100.0, 1.0, 2.0, 3.0, 4.0, f64::NAN]).unwrap();
        assert_eq!(stats.whisker_low, 1.0);
        assert_eq!(stats.whisker_high, 4.0);
        assert_eq!(stats.outliers, vec![100.0]);
    }

    #[test]
    fn degenerate_boxes() {
        let single = BoxStats::from_values(&[5.0]).unwrap();
        assert_eq!(
            (single.whisker_low, single.q1, single.q3, single.whisker_high),
            (5.0, 5.0, 5.0, 5.0)
        );
        assert_eq!(BoxStats::from_values(&[f64::NAN]), None);
        assert_eq!(BoxStats::from_values(&[]), None);
    }

    #[test]
    fn outline_starts_at_centre() {
        let wedge = pie_wedges(&[1.0, 1.0], 0.0)[0];
        let outline = wedge_outline((100.0, 100.0), 50.0, &wedge);
        assert_eq!(outline[0], (100, 100));
        assert_eq!(outline[1], (150, 100));
        assert_eq!(*outline.last().unwrap(), (50, 100));
    }

    #[test]
    fn file_names_are_slugs() {
        assert_eq!(
            chart_file_name("Total greenhouse gas emission"),
            "total_greenhouse_gas_emission.png"
        );
        assert_eq!(chart_file_name("Total Population in 1997"), "total_population_in_1997.png");
        assert_eq!(chart_file_name("  "), "chart.png");
        assert_eq!(figure_pixels((8.0, 6.0)), (800, 600));
    }
}
