//! Charts module - PNG chart rendering

mod plotter;
mod renderer;

pub use plotter::{BarChartSpec, ChartPlotter, BOX_PLOT_TITLE, HEATMAP_TITLE};
pub use renderer::{named_color, pie_wedges, BoxStats, ChartError, Wedge};
