//! Charts module - Interactive plots and static PNG rendering

mod plotter;
mod renderer;
mod view;

pub use plotter::ChartPlotter;
pub use renderer::StaticChartRenderer;
pub use view::{date_label, ChartKind, ChartView};
