//! Chart Viewer Widget
//! Central scrollable panel with the new-cases and cumulated-cases charts.

use crate::charts::{ChartKind, ChartPlotter, ChartView};
use egui::{Color32, RichText, ScrollArea};

const CHART_SPACING: f32 = 15.0;
const MIN_CHART_HEIGHT: f32 = 260.0;

/// Display area for the current selection.
#[derive(Default)]
pub struct ChartViewer {
    pub view: Option<ChartView>,
}

impl ChartViewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_view(&mut self, view: ChartView) {
        self.view = Some(view);
    }

    pub fn clear(&mut self) {
        self.view = None;
    }

    pub fn show(&self, ui: &mut egui::Ui) {
        let Some(view) = &self.view else {
            ui.centered_and_justified(|ui| {
                ui.label(RichText::new("No Data").size(20.0));
            });
            return;
        };

        ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                egui::Frame::none()
                    .rounding(8.0)
                    .fill(ui.visuals().widgets.noninteractive.bg_fill)
                    .inner_margin(12.0)
                    .show(ui, |ui| {
                        ui.label(
                            RichText::new(&view.title)
                                .size(18.0)
                                .strong()
                                .color(Color32::from_rgb(100, 149, 237)),
                        );
                        ui.add_space(8.0);
                        if view.is_empty() {
                            ui.label(
                                RichText::new("No rows for this selection")
                                    .color(Color32::GRAY),
                            );
                        } else {
                            ChartPlotter::draw_summary(ui, view);
                        }
                    });

                ui.add_space(CHART_SPACING);

                let height = ((ui.available_height() - 3.0 * CHART_SPACING) / 2.0)
                    .max(MIN_CHART_HEIGHT);
                for kind in ChartKind::ALL {
                    ChartPlotter::draw_chart(ui, view, kind, height);
                    ui.add_space(CHART_SPACING);
                }
            });
    }
}
