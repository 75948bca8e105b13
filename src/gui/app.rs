//! COVID-19 Dashboard Main Application
//! Main window with control panel and chart viewer.

use crate::charts::{ChartView, StaticChartRenderer};
use crate::data::{
    holidays, DataCache, DataError, MergedTable, PolicyEvents, RegionFilter, ALL_PROVINCES,
};
use crate::gui::control_panel::UserSettings;
use crate::gui::{ChartViewer, ControlPanel, ControlPanelAction};
use crate::stats::SeriesCalculator;
use anyhow::Context;
use chrono::Local;
use egui::SidePanel;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Table loading result from background thread
enum LoadResult {
    Progress(f32, String),
    Complete(MergedTable),
    Error(String),
}

/// Main application window.
pub struct DashboardApp {
    cache: Arc<DataCache>,
    events: PolicyEvents,
    table: Option<MergedTable>,
    control_panel: ControlPanel,
    chart_viewer: ChartViewer,

    // Async loading
    load_rx: Option<Receiver<LoadResult>>,
    is_loading: bool,

    refresh_interval: Duration,
    next_refresh: Instant,
}

impl DashboardApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        cache: Arc<DataCache>,
        events: PolicyEvents,
        default_country: &str,
        refresh_interval: Duration,
    ) -> Self {
        let mut app = Self {
            cache,
            events,
            table: None,
            control_panel: ControlPanel::new(default_country, Local::now().date_naive()),
            chart_viewer: ChartViewer::new(),
            load_rx: None,
            is_loading: false,
            refresh_interval,
            next_refresh: Instant::now() + refresh_interval,
        };
        app.start_load(false);
        app
    }

    /// Load the table in a background thread. `force` skips the snapshot.
    fn start_load(&mut self, force: bool) {
        if self.is_loading {
            return;
        }

        let (tx, rx) = channel();
        self.load_rx = Some(rx);
        self.is_loading = true;
        self.control_panel.loading = true;
        self.control_panel.set_progress(5.0, "Loading data...");

        let cache = Arc::clone(&self.cache);
        thread::spawn(move || Self::run_load(tx, cache, force));
    }

    /// Run loading (called from background thread)
    fn run_load(tx: Sender<LoadResult>, cache: Arc<DataCache>, force: bool) {
        let status = if force {
            "Refreshing from source..."
        } else {
            "Reading snapshot..."
        };
        let _ = tx.send(LoadResult::Progress(20.0, status.to_string()));

        let result = if force { cache.refresh() } else { cache.load() };
        let message = match result {
            Ok(table) => LoadResult::Complete(table),
            Err(e) => {
                tracing::error!(error = %e, force, "Loading data failed");
                LoadResult::Error(e.to_string())
            }
        };
        let _ = tx.send(message);
    }

    /// Check for loading results
    fn check_load_results(&mut self) {
        let Some(rx) = self.load_rx.take() else {
            return;
        };
        let mut should_keep_receiver = true;

        while let Ok(result) = rx.try_recv() {
            match result {
                LoadResult::Progress(progress, status) => {
                    self.control_panel.set_progress(progress, &status);
                }
                LoadResult::Complete(table) => {
                    let status = format!(
                        "Complete! {} rows, fetched {}",
                        table.row_count(),
                        table.fetched_at().with_timezone(&Local).format("%b %d, %Y %H:%M")
                    );
                    self.install_table(table);
                    self.control_panel.set_progress(100.0, &status);
                    self.finish_load();
                    should_keep_receiver = false;
                }
                LoadResult::Error(error) => {
                    // The previous table stays usable
                    self.control_panel
                        .set_progress(0.0, &format!("Error: {}", error));
                    self.finish_load();
                    should_keep_receiver = false;
                }
            }
        }

        if should_keep_receiver {
            self.load_rx = Some(rx);
        }
    }

    fn finish_load(&mut self) {
        self.is_loading = false;
        self.control_panel.loading = false;
        self.next_refresh = Instant::now() + self.refresh_interval;
    }

    fn install_table(&mut self, table: MergedTable) {
        self.control_panel.advance_today(Local::now().date_naive());
        self.control_panel.update_countries(table.countries());
        let selected_state = self.control_panel.settings.state.clone();
        let options = table.state_options(&self.control_panel.settings.country);
        let keep_state = options.options.contains(&selected_state);
        self.control_panel.update_states(options);
        if keep_state {
            self.control_panel.settings.state = selected_state;
        }
        self.table = Some(table);
        self.recompute();
    }

    /// Handle country change - repopulate states
    fn handle_country_changed(&mut self) {
        if let Some(table) = &self.table {
            let options = table.state_options(&self.control_panel.settings.country);
            self.control_panel.update_states(options);
        }
        self.recompute();
    }

    /// Rebuild the chart view for the current selection.
    fn recompute(&mut self) {
        let Some(table) = &self.table else {
            self.chart_viewer.clear();
            return;
        };

        match build_view(table, &self.events, &self.control_panel.settings) {
            Ok(view) => self.chart_viewer.set_view(view),
            Err(e) => {
                tracing::error!(error = %e, "Building chart view failed");
                self.control_panel
                    .set_progress(0.0, &format!("Error: {}", e));
                self.chart_viewer.clear();
            }
        }
    }

    fn handle_export_png(&mut self) {
        let Some(view) = self.chart_viewer.view.clone() else {
            self.control_panel.set_progress(0.0, "No chart to export");
            return;
        };
        let Some(path) = rfd::FileDialog::new()
            .add_filter("PNG Image", &["png"])
            .set_file_name(format!("{}.png", file_stem(&view.title)))
            .save_file()
        else {
            return;
        };

        match StaticChartRenderer::save_png(&view, &path) {
            Ok(()) => {
                self.control_panel
                    .set_progress(100.0, &format!("Complete! Saved {}", path.display()));
                if let Err(e) = open::that(&path) {
                    tracing::warn!(error = %e, path = %path.display(), "Could not open exported image");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "PNG export failed");
                self.control_panel
                    .set_progress(0.0, &format!("Error: {}", e));
            }
        }
    }

    fn handle_export_json(&mut self) {
        let Some(view) = &self.chart_viewer.view else {
            self.control_panel.set_progress(0.0, "No series to export");
            return;
        };
        let Some(path) = rfd::FileDialog::new()
            .add_filter("JSON", &["json"])
            .set_file_name(format!("{}.json", file_stem(&view.title)))
            .save_file()
        else {
            return;
        };

        match export_json(view, &path) {
            Ok(()) => {
                tracing::info!(path = %path.display(), rows = view.rows.len(), "Series exported");
                self.control_panel
                    .set_progress(100.0, &format!("Complete! Saved {}", path.display()));
            }
            Err(e) => {
                tracing::error!(error = %e, "JSON export failed");
                self.control_panel
                    .set_progress(0.0, &format!("Error: {:#}", e));
            }
        }
    }
}

/// Filter, derive and clip the selected series and collect its markers.
pub fn build_view(
    table: &MergedTable,
    events: &PolicyEvents,
    settings: &UserSettings,
) -> Result<ChartView, DataError> {
    let rows = RegionFilter::series(table, &settings.country, &settings.state)?;
    let derived = SeriesCalculator::derive(rows);
    let rows = SeriesCalculator::clip(derived, settings.range);

    let markers = match (settings.show_markers, settings.show_holidays) {
        (true, include_holidays) => events.markers_for(&settings.state, include_holidays),
        (false, true) => holidays(),
        (false, false) => Vec::new(),
    };

    let title = if settings.state == ALL_PROVINCES {
        settings.country.clone()
    } else {
        format!("{}, {}", settings.state, settings.country)
    };

    Ok(ChartView {
        title,
        rows,
        metrics: settings.metrics(),
        markers,
        show_trend: settings.show_trend,
    })
}

/// Write the visible derived rows as pretty JSON.
pub fn export_json(view: &ChartView, path: &Path) -> anyhow::Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &view.rows)
        .context("Failed to write series")?;
    Ok(())
}

fn file_stem(title: &str) -> String {
    let stem: String = title
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    format!("covid_{}", stem.trim_matches('_'))
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Check for background results
        self.check_load_results();

        // Scheduled refresh
        let now = Instant::now();
        if !self.is_loading && now >= self.next_refresh {
            tracing::info!("Scheduled refresh");
            self.start_load(true);
        }

        if self.is_loading {
            ctx.request_repaint();
        } else {
            ctx.request_repaint_after(self.next_refresh.saturating_duration_since(now));
        }

        // Left panel - Control Panel
        SidePanel::left("control_panel")
            .min_width(300.0)
            .max_width(350.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    let action = self.control_panel.show(ui);

                    match action {
                        ControlPanelAction::CountryChanged => self.handle_country_changed(),
                        ControlPanelAction::SelectionChanged => self.recompute(),
                        ControlPanelAction::Refresh => self.start_load(true),
                        ControlPanelAction::ExportPng => self.handle_export_png(),
                        ControlPanelAction::ExportJson => self.handle_export_json(),
                        ControlPanelAction::None => {}
                    }
                });
            });

        // Central panel - Chart Viewer
        egui::CentralPanel::default().show(ctx, |ui| {
            self.chart_viewer.show(ui);
        });
    }
}
