//! ICS export of one stored calendar.
//!
//! # Invariants
//! - Descriptions are re-rendered in the `Key: value` convention, so
//!   importing an export yields the same taxonomy and durations.
//! - Timed events carry the calendar's `TZID`; calendars without a stored
//!   timezone are written in UTC.
//! - All-day events are written as `VALUE=DATE`.

use crate::db::Store;
use crate::logging::sanitize_message;
use crate::repo::calendar_repo::{CalendarRecord, CalendarRepository, SqliteCalendarRepository};
use crate::repo::event_repo::{EventRepository, SqliteEventRepository, StoredEvent};
use crate::repo::RepoError;
use chrono::{NaiveDateTime, Utc};
use icalendar::{Calendar, Component, Event, Property};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

const ICS_DATE_FORMAT: &str = "%Y%m%d";
const ICS_LOCAL_DATETIME_FORMAT: &str = "%Y%m%dT%H%M%S";
const ICS_UTC_DATETIME_FORMAT: &str = "%Y%m%dT%H%M%SZ";

pub type ExportResult<T> = Result<T, ExportError>;

#[derive(Debug)]
pub enum ExportError {
    CalendarNotFound(String),
    Repo(RepoError),
}

impl Display for ExportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CalendarNotFound(name) => write!(f, "calendar not found: `{name}`"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ExportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::CalendarNotFound(_) => None,
        }
    }
}

impl From<RepoError> for ExportError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Renders the stored calendar `name` as an iCalendar document.
pub fn export_calendar(store: &Store, name: &str) -> ExportResult<String> {
    let conn = store.connection();
    let calendar = SqliteCalendarRepository::new(conn)
        .find_by_name(name)?
        .ok_or_else(|| ExportError::CalendarNotFound(name.to_string()))?;
    let events = SqliteEventRepository::new(conn).list_events(calendar.id)?;

    let document = render_calendar(&calendar, &events);
    info!(
        "event=export_calendar module=export status=ok calendar={} events={}",
        sanitize_message(&calendar.name, 80),
        events.len()
    );
    Ok(document)
}

fn render_calendar(calendar: &CalendarRecord, events: &[StoredEvent]) -> String {
    let mut document = Calendar::new();
    document.name(&calendar.name);
    if let Some(timezone) = calendar.timezone.as_deref() {
        document.timezone(timezone);
    }

    let stamp = Utc::now();
    for stored in events {
        let mut event = Event::new();
        event.uid(&format!("event-{}@{}", stored.id, calendar.name));
        event.summary(&stored.summary);
        event.timestamp(stamp);

        let description = render_description(stored);
        if !description.is_empty() {
            event.description(&description);
        }

        let timezone = calendar.timezone.as_deref();
        event.append_property(instant_property("DTSTART", stored.start, stored.is_all_day, timezone));
        event.append_property(instant_property("DTEND", stored.end, stored.is_all_day, timezone));
        document.push(event);
    }
    document.done().to_string()
}

fn instant_property(
    key: &str,
    value: NaiveDateTime,
    is_all_day: bool,
    timezone: Option<&str>,
) -> Property {
    if is_all_day {
        let mut property = Property::new(key, &value.format(ICS_DATE_FORMAT).to_string());
        property.add_parameter("VALUE", "DATE");
        return property;
    }
    match timezone {
        Some(tzid) if tzid != "UTC" => {
            let mut property =
                Property::new(key, &value.format(ICS_LOCAL_DATETIME_FORMAT).to_string());
            property.add_parameter("TZID", tzid);
            property
        }
        _ => Property::new(key, &value.format(ICS_UTC_DATETIME_FORMAT).to_string()),
    }
}

/// Renders the taxonomy of one event as `Key: value` lines.
pub fn render_description(event: &StoredEvent) -> String {
    let mut lines = Vec::new();
    if let Some(area) = &event.area {
        lines.push(format!("Area: {area}"));
    }
    if let Some(kind) = &event.kind {
        lines.push(format!("Type: {kind}"));
    }
    if let Some(project) = &event.project {
        lines.push(format!("Project: {project}"));
    }
    if let Some(difficulty) = event.difficulty {
        lines.push(format!("Difficulty: {}", difficulty.level()));
    }
    if !event.tags.is_empty() {
        lines.push(format!("Tags: {}", event.tags.join(", ")));
    }
    if let Some(detail) = &event.detail {
        lines.push(format!("Detail: {detail}"));
    }
    lines.join("\n")
}
