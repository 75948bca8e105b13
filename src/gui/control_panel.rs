//! Control Panel Widget
//! Left side panel with region, metric, date and display controls.

use crate::charts::date_label;
use crate::data::{days_from_date, date_from_days, DateRange, Metric, StateOptions, ALL_PROVINCES};
use chrono::NaiveDate;
use egui::{Color32, ComboBox, RichText};

/// Current user selection.
#[derive(Debug, Clone, PartialEq)]
pub struct UserSettings {
    pub country: String,
    pub state: String,
    pub show_confirmed: bool,
    pub show_deaths: bool,
    pub range: DateRange,
    pub show_trend: bool,
    pub show_markers: bool,
    pub show_holidays: bool,
}

impl UserSettings {
    pub fn new(country: &str, today: NaiveDate) -> Self {
        Self {
            country: country.to_string(),
            state: ALL_PROVINCES.to_string(),
            show_confirmed: true,
            show_deaths: true,
            range: DateRange::full(today),
            show_trend: true,
            show_markers: true,
            show_holidays: false,
        }
    }

    /// Selected metrics in display order.
    pub fn metrics(&self) -> Vec<Metric> {
        Metric::ALL
            .into_iter()
            .filter(|m| match m {
                Metric::Confirmed => self.show_confirmed,
                Metric::Deaths => self.show_deaths,
            })
            .collect()
    }
}

/// Left side control panel.
pub struct ControlPanel {
    pub settings: UserSettings,
    pub countries: Vec<String>,
    pub states: Vec<String>,
    /// Upper bound of the date sliders.
    pub today: NaiveDate,
    pub progress: f32,
    pub status: String,
    pub loading: bool,
    pub has_data: bool,
}

impl ControlPanel {
    pub fn new(default_country: &str, today: NaiveDate) -> Self {
        Self {
            settings: UserSettings::new(default_country, today),
            countries: Vec::new(),
            states: vec![ALL_PROVINCES.to_string()],
            today,
            progress: 0.0,
            status: "Ready".to_string(),
            loading: false,
            has_data: false,
        }
    }

    /// Update available countries after a table load. The current country
    /// is kept when it still exists.
    pub fn update_countries(&mut self, countries: Vec<String>) {
        self.countries = countries;
        if !self.countries.contains(&self.settings.country) {
            if let Some(first) = self.countries.first() {
                self.settings.country = first.clone();
            }
        }
        self.has_data = !self.countries.is_empty();
    }

    /// Update states of the selected country, selecting the default.
    pub fn update_states(&mut self, options: StateOptions) {
        self.states = options.options;
        self.settings.state = options.selected;
    }

    /// Draw the control panel
    pub fn show(&mut self, ui: &mut egui::Ui) -> ControlPanelAction {
        let mut action = ControlPanelAction::None;

        // Title
        ui.vertical_centered(|ui| {
            ui.add_space(5.0);
            ui.label(
                RichText::new("🦠 COVID-19 Dashboard")
                    .size(22.0)
                    .color(Color32::from_rgb(100, 149, 237)),
            );
            ui.label(
                RichText::new("JHU CSSE time series")
                    .size(11.0)
                    .color(Color32::GRAY),
            );
        });
        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        // ===== Region Section =====
        ui.label(RichText::new("🌍 Region").size(14.0).strong());
        ui.add_space(5.0);

        let label_width = 70.0;
        let combo_width = 170.0;

        ui.add_enabled_ui(self.has_data, |ui| {
            ui.horizontal(|ui| {
                ui.add_sized([label_width, 20.0], egui::Label::new("Country:"));
                ComboBox::from_id_salt("country")
                    .width(combo_width)
                    .selected_text(&self.settings.country)
                    .height(400.0)
                    .show_ui(ui, |ui| {
                        for country in &self.countries {
                            if ui
                                .selectable_label(self.settings.country == *country, country)
                                .clicked()
                                && self.settings.country != *country
                            {
                                self.settings.country = country.clone();
                                action = ControlPanelAction::CountryChanged;
                            }
                        }
                    });
            });

            ui.add_space(5.0);

            ui.horizontal(|ui| {
                ui.add_sized([label_width, 20.0], egui::Label::new("State:"));
                ComboBox::from_id_salt("state")
                    .width(combo_width)
                    .selected_text(&self.settings.state)
                    .height(400.0)
                    .show_ui(ui, |ui| {
                        for state in &self.states {
                            if ui
                                .selectable_label(self.settings.state == *state, state)
                                .clicked()
                                && self.settings.state != *state
                            {
                                self.settings.state = state.clone();
                                action = ControlPanelAction::SelectionChanged;
                            }
                        }
                    });
            });
        });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Metrics Section =====
        ui.label(RichText::new("📈 Metrics").size(14.0).strong());
        ui.add_space(5.0);

        ui.horizontal(|ui| {
            let confirmed = ui.checkbox(&mut self.settings.show_confirmed, Metric::Confirmed.label());
            let deaths = ui.checkbox(&mut self.settings.show_deaths, Metric::Deaths.label());
            if confirmed.changed() || deaths.changed() {
                action = ControlPanelAction::SelectionChanged;
            }
        });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Date Range Section =====
        ui.label(RichText::new("📅 Date Range").size(14.0).strong());
        ui.add_space(5.0);

        if self.show_date_sliders(ui) {
            action = ControlPanelAction::SelectionChanged;
        }

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Display Section =====
        ui.label(RichText::new("⚙️ Display").size(14.0).strong());
        ui.add_space(5.0);

        let toggles = [
            ui.checkbox(&mut self.settings.show_trend, "7-day trend lines"),
            ui.checkbox(&mut self.settings.show_markers, "Policy event markers"),
            ui.checkbox(&mut self.settings.show_holidays, "Holidays"),
        ];
        if toggles.iter().any(|r| r.changed()) {
            action = ControlPanelAction::SelectionChanged;
        }

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Action Buttons =====
        ui.vertical_centered(|ui| {
            ui.add_enabled_ui(!self.loading, |ui| {
                let button = egui::Button::new(RichText::new("🔄 Refresh now").size(16.0))
                    .min_size(egui::vec2(200.0, 35.0));
                if ui.add(button).clicked() {
                    action = ControlPanelAction::Refresh;
                }
            });

            ui.add_space(8.0);

            ui.add_enabled_ui(self.has_data, |ui| {
                ui.horizontal(|ui| {
                    let png = egui::Button::new(RichText::new("🖼 Export PNG").size(14.0))
                        .min_size(egui::vec2(110.0, 30.0));
                    if ui.add(png).clicked() {
                        action = ControlPanelAction::ExportPng;
                    }
                    let json = egui::Button::new(RichText::new("📄 Export JSON").size(14.0))
                        .min_size(egui::vec2(110.0, 30.0));
                    if ui.add(json).clicked() {
                        action = ControlPanelAction::ExportJson;
                    }
                });
            });
        });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Progress Section =====
        ui.label(RichText::new("📊 Status").size(14.0).strong());
        ui.add_space(5.0);

        ui.add(
            egui::ProgressBar::new(self.progress / 100.0)
                .show_percentage()
                .animate(self.loading),
        );

        ui.add_space(5.0);

        let status_color = if self.status.contains("Error") {
            Color32::from_rgb(220, 53, 69)
        } else if self.status.contains("Complete") {
            Color32::from_rgb(40, 167, 69)
        } else {
            Color32::GRAY
        };
        ui.label(RichText::new(&self.status).size(11.0).color(status_color));

        action
    }

    /// Two day sliders; returns true when the range changed.
    fn show_date_sliders(&mut self, ui: &mut egui::Ui) -> bool {
        let first = days_from_date(DateRange::first_report_date());
        let last = days_from_date(self.today).max(first);
        let mut start = days_from_date(self.settings.range.start).clamp(first, last);
        let mut end = days_from_date(self.settings.range.end).clamp(first, last);

        let mut changed = false;
        for (label, value) in [("From:", &mut start), ("To:", &mut end)] {
            ui.horizontal(|ui| {
                ui.add_sized([40.0, 20.0], egui::Label::new(label));
                let slider = egui::Slider::new(value, first..=last)
                    .custom_formatter(|v, _| date_label(v))
                    .show_value(true);
                changed |= ui.add(slider).changed();
            });
        }

        if changed {
            self.set_range(start, end);
        }
        changed
    }

    /// Move the slider upper bound to `today`. A range that ended at the
    /// old bound follows it so newly fetched days stay visible.
    pub fn advance_today(&mut self, today: NaiveDate) {
        if today <= self.today {
            return;
        }
        if self.settings.range.end >= self.today {
            self.settings.range.end = today;
        }
        self.today = today;
    }

    /// Store a slider range, keeping start on or before end.
    pub fn set_range(&mut self, start: i32, end: i32) {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        if let (Some(start), Some(end)) = (date_from_days(start), date_from_days(end)) {
            self.settings.range = DateRange { start, end };
        }
    }

    /// Set progress and status
    pub fn set_progress(&mut self, progress: f32, status: &str) {
        self.progress = progress;
        self.status = status.to_string();
    }
}

/// Actions triggered by control panel
#[derive(Debug, Clone, PartialEq)]
pub enum ControlPanelAction {
    None,
    CountryChanged,
    SelectionChanged,
    Refresh,
    ExportPng,
    ExportJson,
}
