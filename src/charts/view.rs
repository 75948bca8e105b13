//! Chart view model shared by the interactive plots and the PNG export.

use crate::data::{date_from_days, days_from_date, DerivedRow, EventKind, EventMarker, Metric};
use chrono::NaiveDate;

/// x-axis tick label format, e.g. `Mar 01, 2020`.
pub const DATE_LABEL_FORMAT: &str = "%b %d, %Y";

/// Width of one day slot that the grouped bars share.
const GROUP_WIDTH: f64 = 0.8;

/// The two charts of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    NewCases,
    Cumulative,
}

impl ChartKind {
    pub const ALL: [ChartKind; 2] = [ChartKind::NewCases, ChartKind::Cumulative];

    pub fn y_axis_title(self) -> &'static str {
        match self {
            ChartKind::NewCases => "New Cases per Day",
            ChartKind::Cumulative => "Cumulated Cases",
        }
    }

    pub fn id(self) -> &'static str {
        match self {
            ChartKind::NewCases => "plot_new_metrics",
            ChartKind::Cumulative => "plot_cum_metrics",
        }
    }

    fn value(self, row: &DerivedRow, metric: Metric) -> f64 {
        match self {
            ChartKind::NewCases => row.new_cases(metric) as f64,
            ChartKind::Cumulative => row.row.cumulative(metric) as f64,
        }
    }
}

/// Bar and trend color of a metric.
pub fn metric_rgb(metric: Metric) -> (u8, u8, u8) {
    match metric {
        Metric::Confirmed => (100, 140, 240),
        Metric::Deaths => (200, 30, 30),
    }
}

/// Marker color of an event kind.
pub fn event_rgb(kind: EventKind) -> (u8, u8, u8) {
    match kind {
        EventKind::MaskMandate => (40, 167, 69),
        EventKind::VaccineRollout => (155, 89, 182),
        EventKind::StayHome => (243, 156, 18),
        EventKind::Reopening => (26, 188, 156),
        EventKind::Holiday => (120, 120, 120),
    }
}

pub fn x_of(date: NaiveDate) -> f64 {
    days_from_date(date) as f64
}

/// Tick label for an x value, empty between days.
pub fn date_label(x: f64) -> String {
    let rounded = x.round();
    if (x - rounded).abs() > 1e-6 || !rounded.is_finite() {
        return String::new();
    }
    date_from_days(rounded as i32)
        .map(|d| d.format(DATE_LABEL_FORMAT).to_string())
        .unwrap_or_default()
}

/// Everything needed to draw both charts for one selection.
#[derive(Debug, Clone, Default)]
pub struct ChartView {
    pub title: String,
    pub rows: Vec<DerivedRow>,
    pub metrics: Vec<Metric>,
    pub markers: Vec<EventMarker>,
    pub show_trend: bool,
}

impl ChartView {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.metrics.is_empty()
    }

    /// Bar x offset of a metric within its day slot.
    pub fn bar_offset(&self, metric: Metric) -> f64 {
        let index = self.metrics.iter().position(|&m| m == metric).unwrap_or(0) as f64;
        -GROUP_WIDTH / 2.0 + self.bar_width() * (index + 0.5)
    }

    pub fn bar_width(&self) -> f64 {
        GROUP_WIDTH / self.metrics.len().max(1) as f64
    }

    /// (x, value) per day for one metric.
    pub fn bars(&self, kind: ChartKind, metric: Metric) -> Vec<(f64, f64)> {
        self.rows
            .iter()
            .map(|r| (x_of(r.row.date), kind.value(r, metric)))
            .collect()
    }

    /// 7-day average points; days without a defined average are skipped.
    pub fn trend(&self, metric: Metric) -> Vec<(f64, f64)> {
        self.rows
            .iter()
            .filter_map(|r| r.moving_average(metric).map(|v| (x_of(r.row.date), v)))
            .collect()
    }

    /// Trend lines are drawn on the new-cases chart only.
    pub fn has_trend(&self, kind: ChartKind) -> bool {
        self.show_trend && kind == ChartKind::NewCases
    }

    pub fn x_range(&self) -> Option<(f64, f64)> {
        let first = self.rows.first()?;
        let last = self.rows.last()?;
        Some((x_of(first.row.date) - 1.0, x_of(last.row.date) + 1.0))
    }

    /// Largest plotted value over the selected metrics, at least 1.
    pub fn y_max(&self, kind: ChartKind) -> f64 {
        self.metrics
            .iter()
            .flat_map(|&m| self.bars(kind, m).into_iter().map(|(_, y)| y))
            .fold(1.0, f64::max)
    }

    /// Markers that fall inside the displayed days.
    pub fn visible_markers(&self) -> Vec<&EventMarker> {
        let (Some(first), Some(last)) = (self.rows.first(), self.rows.last()) else {
            return Vec::new();
        };
        self.markers
            .iter()
            .filter(|m| first.row.date <= m.date && m.date <= last.row.date)
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::{TimeSeriesRow, ALL_PROVINCES};

    fn derived(day: u32, cumulative: i64, new: i64, sma: Option<f64>) -> DerivedRow {
        DerivedRow {
            row: TimeSeriesRow {
                country: "Chad".to_string(),
                province: ALL_PROVINCES.to_string(),
                latitude: 0.0,
                longitude: 0.0,
                date: NaiveDate::from_ymd_opt(2020, 3, day).unwrap(),
                cumulative_confirmed: cumulative,
                cumulative_deaths: cumulative / 10,
            },
            new_confirmed: new,
            new_deaths: new / 10,
            new_confirmed_sma7: sma,
            new_deaths_sma7: None,
        }
    }

    /// Three days of "Chad" with one marker in range and one after it.
    pub(crate) fn view(metrics: Vec<Metric>) -> ChartView {
        ChartView {
            title: "Chad".to_string(),
            rows: vec![
                derived(1, 10, 0, None),
                derived(2, 40, 30, None),
                derived(3, 45, 5, Some(12.0)),
            ],
            metrics,
            markers: vec![
                EventMarker {
                    kind: EventKind::StayHome,
                    date: NaiveDate::from_ymd_opt(2020, 3, 2).unwrap(),
                    label: "Stay-home order".to_string(),
                },
                EventMarker {
                    kind: EventKind::Holiday,
                    date: NaiveDate::from_ymd_opt(2020, 12, 25).unwrap(),
                    label: "Christmas".to_string(),
                },
            ],
            show_trend: true,
        }
    }

    #[test]
    fn labels_use_month_day_year() {
        let x = x_of(NaiveDate::from_ymd_opt(2020, 3, 1).unwrap());
        assert_eq!(date_label(x), "Mar 01, 2020");
        assert_eq!(date_label(x + 0.5), "");
    }

    #[test]
    fn grouped_bars_share_the_day_slot() {
        let both = view(vec![Metric::Confirmed, Metric::Deaths]);
        assert!((both.bar_width() - 0.4).abs() < 1e-9);
        assert!((both.bar_offset(Metric::Confirmed) + 0.2).abs() < 1e-9);
        assert!((both.bar_offset(Metric::Deaths) - 0.2).abs() < 1e-9);

        let single = view(vec![Metric::Deaths]);
        assert!(single.bar_offset(Metric::Deaths).abs() < 1e-9);
    }

    #[test]
    fn series_follow_the_chart_kind() {
        let view = view(vec![Metric::Confirmed]);
        let new: Vec<f64> = view.bars(ChartKind::NewCases, Metric::Confirmed).iter().map(|p| p.1).collect();
        let cum: Vec<f64> = view.bars(ChartKind::Cumulative, Metric::Confirmed).iter().map(|p| p.1).collect();
        assert_eq!(new, vec![0.0, 30.0, 5.0]);
        assert_eq!(cum, vec![10.0, 40.0, 45.0]);
        assert_eq!(view.y_max(ChartKind::Cumulative), 45.0);
        assert_eq!(view.trend(Metric::Confirmed).len(), 1);
        assert!(view.has_trend(ChartKind::NewCases));
        assert!(!view.has_trend(ChartKind::Cumulative));
    }

    #[test]
    fn empty_metric_selection_is_an_empty_chart() {
        let view = view(Vec::new());
        assert!(view.is_empty());
        assert_eq!(view.y_max(ChartKind::NewCases), 1.0);
    }

    #[test]
    fn only_markers_inside_the_series_are_visible() {
        let view = view(vec![Metric::Confirmed]);
        let visible = view.visible_markers();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].kind, EventKind::StayHome);
    }
}
