//! Policy Events Module
//! Per-state policy dates (mask mandate, vaccine rollout, stay-home order,
//! reopening) and fixed holiday markers.

use crate::data::loader::{CsvLoader, LoaderError};
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Accepted date formats in the events file.
const EVENT_DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%y", "%m/%d/%Y"];

/// state, mask_start, vaccine_start, stay_home_start, reopen
const EVENT_COLUMN_COUNT: usize = 5;

#[derive(Error, Debug)]
pub enum EventsError {
    #[error(transparent)]
    Loader(#[from] LoaderError),
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Events file needs {EVENT_COLUMN_COUNT} columns, found {found}")]
    TooFewColumns { found: usize },
    #[error("Invalid date '{value}' for state '{state}'")]
    InvalidDate { state: String, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    MaskMandate,
    VaccineRollout,
    StayHome,
    Reopening,
    Holiday,
}

impl EventKind {
    pub fn label(self) -> &'static str {
        match self {
            EventKind::MaskMandate => "Mask mandate",
            EventKind::VaccineRollout => "Vaccine rollout",
            EventKind::StayHome => "Stay-home order",
            EventKind::Reopening => "Reopening",
            EventKind::Holiday => "Holiday",
        }
    }
}

/// Policy dates of one state. Missing cells are `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventDates {
    pub mask_start: Option<NaiveDate>,
    pub vaccine_start: Option<NaiveDate>,
    pub stay_home_start: Option<NaiveDate>,
    pub reopen: Option<NaiveDate>,
}

impl EventDates {
    fn entries(&self) -> [(EventKind, Option<NaiveDate>); 4] {
        [
            (EventKind::StayHome, self.stay_home_start),
            (EventKind::Reopening, self.reopen),
            (EventKind::MaskMandate, self.mask_start),
            (EventKind::VaccineRollout, self.vaccine_start),
        ]
    }
}

/// A vertical marker drawn on the charts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMarker {
    pub kind: EventKind,
    pub date: NaiveDate,
    pub label: String,
}

/// Fixed US holidays of the first pandemic year.
pub fn holidays() -> Vec<EventMarker> {
    [
        (2020, 5, 25, "Memorial Day"),
        (2020, 7, 4, "Independence Day"),
        (2020, 9, 7, "Labor Day"),
        (2020, 11, 26, "Thanksgiving"),
        (2020, 12, 25, "Christmas"),
        (2021, 1, 1, "New Year"),
    ]
    .into_iter()
    .filter_map(|(y, m, d, label)| {
        NaiveDate::from_ymd_opt(y, m, d).map(|date| EventMarker {
            kind: EventKind::Holiday,
            date,
            label: label.to_string(),
        })
    })
    .collect()
}

/// Lookup table of policy dates keyed by state name.
#[derive(Debug, Clone, Default)]
pub struct PolicyEvents {
    by_state: HashMap<String, EventDates>,
}

impl PolicyEvents {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the events CSV. Columns are read by position.
    pub fn load(path: &Path) -> Result<Self, EventsError> {
        let df = CsvLoader::load_file(path)?;
        let events = Self::from_frame(&df)?;
        tracing::info!(path = %path.display(), states = events.len(), "Loaded policy events");
        Ok(events)
    }

    pub fn from_frame(df: &DataFrame) -> Result<Self, EventsError> {
        let cols = df.get_columns();
        if cols.len() < EVENT_COLUMN_COUNT {
            return Err(EventsError::TooFewColumns { found: cols.len() });
        }

        let text: Vec<Vec<Option<String>>> = cols[..EVENT_COLUMN_COUNT]
            .iter()
            .map(|c| -> Result<_, EventsError> {
                let c = c.cast(&DataType::String)?;
                Ok(c.str()?.into_iter().map(|v| v.map(str::to_string)).collect())
            })
            .collect::<Result<_, _>>()?;

        let mut by_state = HashMap::new();
        for row in 0..df.height() {
            let Some(state) = text[0][row].as_deref().map(str::trim).filter(|s| !s.is_empty())
            else {
                continue;
            };

            let date = |col: usize| Self::parse_cell(state, text[col][row].as_deref());
            let dates = EventDates {
                mask_start: date(1)?,
                vaccine_start: date(2)?,
                stay_home_start: date(3)?,
                reopen: date(4)?,
            };
            by_state.insert(state.to_string(), dates);
        }

        Ok(Self { by_state })
    }

    pub fn len(&self) -> usize {
        self.by_state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_state.is_empty()
    }

    /// Event dates of a state, or `None` when the state is not listed.
    pub fn lookup(&self, state: &str) -> Option<EventDates> {
        self.by_state.get(state.trim()).copied()
    }

    /// Markers for the selected state, sorted by date.
    pub fn markers_for(&self, state: &str, include_holidays: bool) -> Vec<EventMarker> {
        let mut markers: Vec<EventMarker> = self
            .lookup(state)
            .map(|dates| {
                dates
                    .entries()
                    .into_iter()
                    .filter_map(|(kind, date)| {
                        date.map(|date| EventMarker {
                            kind,
                            date,
                            label: kind.label().to_string(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        if include_holidays {
            markers.extend(holidays());
        }
        markers.sort_by_key(|m| m.date);
        markers
    }

    fn parse_cell(state: &str, value: Option<&str>) -> Result<Option<NaiveDate>, EventsError> {
        let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return Ok(None);
        };

        EVENT_DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
            .map(Some)
            .ok_or_else(|| EventsError::InvalidDate {
                state: state.to_string(),
                value: value.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const EVENTS: &str = "\
state,mask_start,vaccine_start,stay_home_start,reopen
Ohio,2020-07-23,12/14/2020,3/23/20,2020-05-04
Texas,7/3/2020,,2020-04-02,
";

    fn events() -> PolicyEvents {
        let df = CsvLoader::parse_bytes(EVENTS.as_bytes().to_vec()).unwrap();
        PolicyEvents::from_frame(&df).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn columns_are_read_by_position_in_any_date_format() {
        let ohio = events().lookup("Ohio").unwrap();
        assert_eq!(ohio.mask_start, Some(date(2020, 7, 23)));
        assert_eq!(ohio.vaccine_start, Some(date(2020, 12, 14)));
        assert_eq!(ohio.stay_home_start, Some(date(2020, 3, 23)));
        assert_eq!(ohio.reopen, Some(date(2020, 5, 4)));

        let texas = events().lookup("Texas").unwrap();
        assert_eq!(texas.vaccine_start, None);
        assert_eq!(texas.reopen, None);
    }

    #[test]
    fn lookups_are_independent_of_earlier_calls() {
        let events = events();
        let first_ohio = events.lookup("Ohio");
        let _ = events.lookup("Texas");
        let _ = events.markers_for("Texas", true);
        assert_eq!(events.lookup("Ohio"), first_ohio);
        assert_eq!(events.markers_for("Ohio", false).len(), 4);
        assert_eq!(events.markers_for("Ohio", false).len(), 4);
    }

    #[test]
    fn unknown_state_has_no_policy_markers() {
        let events = events();
        assert_eq!(events.lookup("<all>"), None);
        assert!(events.markers_for("Atlantis", false).is_empty());
        assert_eq!(events.markers_for("Atlantis", true), holidays());
    }

    #[test]
    fn empty_events_only_offer_holidays() {
        let none = PolicyEvents::empty();
        assert!(none.is_empty());
        assert!(!events().is_empty());
        assert!(none.markers_for("Ohio", false).is_empty());
        assert_eq!(none.markers_for("Ohio", true), holidays());
    }

    #[test]
    fn markers_are_sorted_by_date() {
        let markers = events().markers_for("Texas", true);
        assert!(markers.windows(2).all(|w| w[0].date <= w[1].date));
        assert_eq!(markers[0].kind, EventKind::StayHome);
        assert_eq!(markers.len(), 2 + holidays().len());
    }

    #[test]
    fn malformed_date_is_an_error() {
        let csv = "state,a,b,c,d\nOhio,someday,,,\n";
        let df = CsvLoader::parse_bytes(csv.as_bytes().to_vec()).unwrap();
        assert_matches!(
            PolicyEvents::from_frame(&df),
            Err(EventsError::InvalidDate { value, .. }) if value == "someday"
        );
    }

    #[test]
    fn narrow_file_is_rejected() {
        let csv = "state,mask_start\nOhio,2020-07-23\n";
        let df = CsvLoader::parse_bytes(csv.as_bytes().to_vec()).unwrap();
        assert_matches!(
            PolicyEvents::from_frame(&df),
            Err(EventsError::TooFewColumns { found: 2 })
        );
    }
}
