//! Chart Plotter Module
//! Draws the interactive case charts using egui_plot.

use crate::charts::view::{
    date_label, event_rgb, metric_rgb, x_of, ChartKind, ChartView, DATE_LABEL_FORMAT,
};
use crate::data::{EventKind, Metric};
use egui::{Color32, RichText};
use egui_plot::{Bar, BarChart, Legend, Line, Plot, PlotPoints, VLine};

pub fn metric_color(metric: Metric) -> Color32 {
    let (r, g, b) = metric_rgb(metric);
    Color32::from_rgb(r, g, b)
}

pub fn event_color(kind: EventKind) -> Color32 {
    let (r, g, b) = event_rgb(kind);
    Color32::from_rgb(r, g, b)
}

/// Creates the dashboard charts using egui_plot.
pub struct ChartPlotter;

impl ChartPlotter {
    /// Grouped bars per day, trend lines and vertical event markers.
    pub fn draw_chart(ui: &mut egui::Ui, view: &ChartView, kind: ChartKind, height: f32) {
        ui.label(RichText::new(kind.y_axis_title()).strong().size(15.0));

        let mut plot = Plot::new(kind.id())
            .height(height)
            .legend(Legend::default())
            .allow_scroll(false)
            .include_y(0.0)
            .x_axis_label("Date")
            .y_axis_label(kind.y_axis_title())
            .x_axis_formatter(|mark, _range| date_label(mark.value))
            .label_formatter(|name, value| {
                let date = date_label(value.x.round());
                if name.is_empty() {
                    date
                } else {
                    format!("{}\n{}: {:.0}", date, name, value.y)
                }
            });
        if let Some((min, max)) = view.x_range() {
            plot = plot.include_x(min).include_x(max);
        }

        plot.show(ui, |plot_ui| {
            if view.is_empty() {
                return;
            }

            for &metric in &view.metrics {
                let color = metric_color(metric);
                let offset = view.bar_offset(metric);
                let bars: Vec<Bar> = view
                    .bars(kind, metric)
                    .into_iter()
                    .map(|(x, y)| Bar::new(x + offset, y).width(view.bar_width()))
                    .collect();
                plot_ui.bar_chart(BarChart::new(bars).color(color).name(metric.label()));

                if view.has_trend(kind) {
                    let points: PlotPoints = view
                        .trend(metric)
                        .into_iter()
                        .map(|(x, y)| [x, y])
                        .collect();
                    plot_ui.line(
                        Line::new(points)
                            .color(color.gamma_multiply(0.6))
                            .width(2.0)
                            .name(format!("{} (7-day avg)", metric.label())),
                    );
                }
            }

            for marker in view.visible_markers() {
                plot_ui.vline(
                    VLine::new(x_of(marker.date))
                        .color(event_color(marker.kind))
                        .width(1.5)
                        .name(&marker.label),
                );
            }
        });
    }

    /// Latest values of the selected region.
    pub fn draw_summary(ui: &mut egui::Ui, view: &ChartView) {
        let Some(last) = view.rows.last() else {
            return;
        };

        egui::Grid::new("summary_grid")
            .striped(true)
            .spacing([20.0, 4.0])
            .show(ui, |ui| {
                ui.label(RichText::new("Metric").strong());
                ui.label(RichText::new("Cumulated").strong());
                ui.label(RichText::new("New").strong());
                ui.label(RichText::new("7-day avg").strong());
                ui.end_row();

                for &metric in &view.metrics {
                    ui.label(RichText::new(metric.label()).color(metric_color(metric)));
                    ui.label(last.row.cumulative(metric).to_string());
                    ui.label(last.new_cases(metric).to_string());
                    ui.label(
                        last.moving_average(metric)
                            .map(|v| format!("{:.1}", v))
                            .unwrap_or_else(|| "-".to_string()),
                    );
                    ui.end_row();
                }
            });
        ui.label(
            RichText::new(format!("as of {}", last.row.date.format(DATE_LABEL_FORMAT)))
                .small()
                .color(Color32::GRAY),
        );
    }
}
