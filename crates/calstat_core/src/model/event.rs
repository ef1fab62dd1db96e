//! Raw event records produced by the extractor.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use chrono_tz::Tz;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Start or end of an event as read from the source file.
///
/// Timed instants are already converted into the calendar's timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventInstant {
    /// Date-only value of an all-day event. Never timezone-converted.
    Date(NaiveDate),
    /// Timed value in calendar-local time.
    DateTime(DateTime<Tz>),
}

impl EventInstant {
    /// Calendar-local wall clock value; all-day dates map to midnight.
    pub fn local(&self) -> NaiveDateTime {
        match self {
            Self::Date(date) => date.and_time(NaiveTime::MIN),
            Self::DateTime(value) => value.naive_local(),
        }
    }

    pub fn is_date(&self) -> bool {
        matches!(self, Self::Date(_))
    }
}

/// One `VEVENT` as extracted from a calendar file, before metadata parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub summary: String,
    /// Free-text description, unescaped; may be empty.
    pub description: String,
    pub start: EventInstant,
    pub end: EventInstant,
    /// `true` when the start value carries no time component.
    pub is_all_day: bool,
}

impl RawEvent {
    /// Event length in hours.
    ///
    /// All-day events are 0 by convention. A negative value is returned
    /// unchanged when the source has its end before its start.
    pub fn duration_hours(&self) -> f64 {
        if self.is_all_day {
            return 0.0;
        }
        match (self.start, self.end) {
            (EventInstant::DateTime(start), EventInstant::DateTime(end)) => {
                (end - start).num_seconds() as f64 / SECONDS_PER_HOUR
            }
            _ => 0.0,
        }
    }
}
