//! iCalendar event extraction.
//!
//! # Responsibility
//! - Parse the bytes of one `.ics` file into ordered [`RawEvent`] records.
//! - Resolve the calendar-level timezone and convert timed instants into it.
//!
//! # Invariants
//! - Only `VEVENT` components are emitted, in file order.
//! - An event without a usable `DTSTART` or `DTEND` is skipped and counted,
//!   never fatal to the file.
//! - Instants without an explicit timezone are read as UTC.
//! - Date-only (all-day) values are never timezone-converted.

use crate::logging::sanitize_message;
use crate::model::event::{EventInstant, RawEvent};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use icalendar::{Calendar, CalendarComponent, CalendarDateTime, Component, DatePerhapsTime};
use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ExtractResult<T> = Result<T, ExtractError>;

/// File-level extraction failure. The whole file is unusable.
#[derive(Debug)]
pub enum ExtractError {
    /// The file is not valid UTF-8 text.
    InvalidEncoding(std::str::Utf8Error),
    /// The text is not an iCalendar document.
    Malformed(String),
}

impl Display for ExtractError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidEncoding(err) => write!(f, "calendar file is not valid UTF-8: {err}"),
            Self::Malformed(message) => write!(f, "malformed calendar file: {message}"),
        }
    }
}

impl Error for ExtractError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidEncoding(err) => Some(err),
            Self::Malformed(_) => None,
        }
    }
}

/// Result of extracting one calendar file.
#[derive(Debug, Clone)]
pub struct ExtractedCalendar {
    /// Declared calendar timezone, or the fallback that was applied.
    pub timezone: Tz,
    /// Whether `timezone` came from the file itself.
    pub timezone_declared: bool,
    pub events: Vec<RawEvent>,
    /// `VEVENT`s dropped because start or end was missing or unreadable.
    pub skipped: usize,
}

/// Extracts all events from the bytes of one calendar file.
///
/// `fallback_timezone` applies when the file declares none; UTC otherwise.
pub fn extract_events(bytes: &[u8], fallback_timezone: Option<Tz>) -> ExtractResult<ExtractedCalendar> {
    let text = std::str::from_utf8(bytes).map_err(ExtractError::InvalidEncoding)?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    if !text.trim_start().starts_with("BEGIN:VCALENDAR") {
        return Err(ExtractError::Malformed(
            "missing BEGIN:VCALENDAR header".to_string(),
        ));
    }

    let calendar: Calendar = text
        .parse()
        .map_err(|err| ExtractError::Malformed(format!("{err}")))?;

    let declared = calendar.get_timezone().and_then(parse_timezone);
    let timezone = declared.or(fallback_timezone).unwrap_or(chrono_tz::UTC);

    let mut events = Vec::new();
    let mut skipped = 0;
    for (index, component) in calendar.components.iter().enumerate() {
        let CalendarComponent::Event(event) = component else {
            continue;
        };

        let summary = event.get_summary().unwrap_or_default().to_string();
        let (Some(start), Some(end)) = (event.get_start(), event.get_end()) else {
            warn!(
                "event=extract_event module=extract status=skipped component_index={} reason=missing_start_or_end summary={}",
                index,
                sanitize_message(&summary, 80)
            );
            skipped += 1;
            continue;
        };

        let start = to_instant(start, timezone);
        let end = to_instant(end, timezone);
        events.push(RawEvent {
            summary,
            description: event.get_description().unwrap_or_default().to_string(),
            is_all_day: start.is_date(),
            start,
            end,
        });
    }

    Ok(ExtractedCalendar {
        timezone,
        timezone_declared: declared.is_some(),
        events,
        skipped,
    })
}

/// Parses an IANA timezone name; unknown names yield `None`.
pub fn parse_timezone(name: &str) -> Option<Tz> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<Tz>() {
        Ok(tz) => Some(tz),
        Err(_) => {
            warn!(
                "event=extract_timezone module=extract status=skipped reason=unknown_timezone tzid={}",
                sanitize_message(trimmed, 64)
            );
            None
        }
    }
}

fn to_instant(value: DatePerhapsTime, target: Tz) -> EventInstant {
    match value {
        DatePerhapsTime::Date(date) => EventInstant::Date(date),
        DatePerhapsTime::DateTime(date_time) => {
            EventInstant::DateTime(to_utc(date_time).with_timezone(&target))
        }
    }
}

fn to_utc(value: CalendarDateTime) -> DateTime<Utc> {
    match value {
        CalendarDateTime::Utc(instant) => instant,
        CalendarDateTime::Floating(naive) => Utc.from_utc_datetime(&naive),
        CalendarDateTime::WithTimezone { date_time, tzid } => {
            local_to_utc(&date_time, parse_timezone(&tzid))
        }
    }
}

fn local_to_utc(local: &NaiveDateTime, zone: Option<Tz>) -> DateTime<Utc> {
    let Some(zone) = zone else {
        return Utc.from_utc_datetime(local);
    };
    // Ambiguous wall times take the earlier offset; times inside a DST gap
    // do not exist and are read as UTC.
    match zone.from_local_datetime(local).earliest() {
        Some(resolved) => resolved.with_timezone(&Utc),
        None => Utc.from_utc_datetime(local),
    }
}

#[cfg(test)]
mod tests {
    use super::{extract_events, ExtractError};
    use crate::model::event::EventInstant;
    use chrono::NaiveDate;

    fn ics(body: &[&str]) -> Vec<u8> {
        let mut lines = vec!["BEGIN:VCALENDAR", "VERSION:2.0", "PRODID:-//calstat//test//EN"];
        lines.extend_from_slice(body);
        lines.push("END:VCALENDAR");
        let mut text = lines.join("\r\n");
        text.push_str("\r\n");
        text.into_bytes()
    }

    #[test]
    fn extracts_timed_event_in_utc_without_declared_timezone() {
        let bytes = ics(&[
            "BEGIN:VEVENT",
            "UID:1@test",
            "DTSTART:20250101T090000Z",
            "DTEND:20250101T110000Z",
            "SUMMARY:Dev: Build feature",
            "DESCRIPTION:Area: Dev\\nTags: python\\, cli",
            "END:VEVENT",
        ]);

        let extracted = extract_events(&bytes, None).unwrap();
        assert_eq!(extracted.timezone, chrono_tz::UTC);
        assert!(!extracted.timezone_declared);
        assert_eq!(extracted.events.len(), 1);

        let event = &extracted.events[0];
        assert_eq!(event.summary, "Dev: Build feature");
        assert_eq!(event.description, "Area: Dev\nTags: python, cli");
        assert!(!event.is_all_day);
        assert_eq!(event.start.local().to_string(), "2025-01-01 09:00:00");
        assert_eq!(event.duration_hours(), 2.0);
    }

    #[test]
    fn converts_into_declared_calendar_timezone() {
        let bytes = ics(&[
            "X-WR-TIMEZONE:Asia/Tehran",
            "BEGIN:VEVENT",
            "UID:2@test",
            "DTSTART:20250101T203000Z",
            "DTEND:20250101T213000Z",
            "SUMMARY:late",
            "END:VEVENT",
        ]);

        let extracted = extract_events(&bytes, None).unwrap();
        assert!(extracted.timezone_declared);
        let event = &extracted.events[0];
        // Tehran is UTC+03:30, so the local date rolls over.
        assert_eq!(event.start.local().to_string(), "2025-01-02 00:00:00");
        assert_eq!(event.duration_hours(), 1.0);
    }

    #[test]
    fn floating_times_are_read_as_utc_and_fallback_timezone_applies() {
        let bytes = ics(&[
            "BEGIN:VEVENT",
            "UID:3@test",
            "DTSTART:20250601T100000",
            "DTEND:20250601T120000",
            "SUMMARY:floating",
            "END:VEVENT",
        ]);

        let extracted = extract_events(&bytes, Some(chrono_tz::Europe::Berlin)).unwrap();
        assert_eq!(extracted.timezone, chrono_tz::Europe::Berlin);
        assert!(!extracted.timezone_declared);
        // Berlin is UTC+2 in summer.
        assert_eq!(
            extracted.events[0].start.local().to_string(),
            "2025-06-01 12:00:00"
        );
    }

    #[test]
    fn all_day_events_are_flagged_and_not_converted() {
        let bytes = ics(&[
            "X-WR-TIMEZONE:America/New_York",
            "BEGIN:VEVENT",
            "UID:4@test",
            "DTSTART;VALUE=DATE:20250704",
            "DTEND;VALUE=DATE:20250705",
            "SUMMARY:holiday",
            "END:VEVENT",
        ]);

        let extracted = extract_events(&bytes, None).unwrap();
        let event = &extracted.events[0];
        assert!(event.is_all_day);
        assert_eq!(
            event.start,
            EventInstant::Date(NaiveDate::from_ymd_opt(2025, 7, 4).unwrap())
        );
        assert_eq!(event.duration_hours(), 0.0);
    }

    #[test]
    fn events_missing_start_or_end_are_skipped() {
        let bytes = ics(&[
            "BEGIN:VEVENT",
            "UID:5@test",
            "DTSTART:20250101T090000Z",
            "SUMMARY:no end",
            "END:VEVENT",
            "BEGIN:VEVENT",
            "UID:6@test",
            "SUMMARY:nothing",
            "END:VEVENT",
            "BEGIN:VEVENT",
            "UID:7@test",
            "DTSTART:20250101T090000Z",
            "DTEND:20250101T100000Z",
            "SUMMARY:kept",
            "END:VEVENT",
        ]);

        let extracted = extract_events(&bytes, None).unwrap();
        assert_eq!(extracted.skipped, 2);
        assert_eq!(extracted.events.len(), 1);
        assert_eq!(extracted.events[0].summary, "kept");
    }

    #[test]
    fn non_calendar_input_is_rejected() {
        let err = extract_events(b"hello world", None).unwrap_err();
        assert!(matches!(err, ExtractError::Malformed(_)));

        let err = extract_events(&[0xff, 0xfe, 0x00], None).unwrap_err();
        assert!(matches!(err, ExtractError::InvalidEncoding(_)));
    }

    #[test]
    fn text_values_are_unescaped_once() {
        let bytes = ics(&[
            "BEGIN:VEVENT",
            "UID:8@test",
            "DTSTART:20250101T090000Z",
            "DTEND:20250101T100000Z",
            "SUMMARY:Lunch\\, walk",
            "DESCRIPTION:Detail: C:\\\\new",
            "END:VEVENT",
        ]);

        let extracted = extract_events(&bytes, None).unwrap();
        let event = &extracted.events[0];
        assert_eq!(event.summary, "Lunch, walk");
        assert_eq!(event.description, r"Detail: C:\new");
        assert!(!event.description.contains('\n'));
    }
}
