//! Charts module - dashboard datasets and chart rendering

mod plotter;
mod renderer;
mod summary;

pub use plotter::ChartPlotter;
pub use renderer::StaticChartRenderer;
pub use summary::{ChartKind, DashboardSummary};
