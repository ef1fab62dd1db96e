//! Calendar source repository.
//!
//! # Invariants
//! - Calendar names are unique; a second insert with the same name fails with
//!   a constraint violation instead of creating a duplicate.
//! - Deleting a calendar cascades to its events and their tag links.

use crate::repo::{EntityId, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

const CALENDAR_SELECT_SQL: &str = "SELECT id, name, color, timezone FROM calendars";

/// One imported calendar file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarRecord {
    pub id: EntityId,
    pub name: String,
    pub color: String,
    /// Timezone the calendar's events were converted into.
    pub timezone: Option<String>,
}

/// Values for a new calendar row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCalendar<'a> {
    pub name: &'a str,
    pub color: &'a str,
    pub timezone: Option<&'a str>,
}

pub trait CalendarRepository {
    fn insert_calendar(&self, calendar: &NewCalendar<'_>) -> RepoResult<EntityId>;
    fn find_by_name(&self, name: &str) -> RepoResult<Option<CalendarRecord>>;
    /// All calendars ordered by name.
    fn list_calendars(&self) -> RepoResult<Vec<CalendarRecord>>;
}

pub struct SqliteCalendarRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCalendarRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl CalendarRepository for SqliteCalendarRepository<'_> {
    fn insert_calendar(&self, calendar: &NewCalendar<'_>) -> RepoResult<EntityId> {
        self.conn.execute(
            "INSERT INTO calendars (name, color, timezone) VALUES (?1, ?2, ?3);",
            params![calendar.name, calendar.color, calendar.timezone],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn find_by_name(&self, name: &str) -> RepoResult<Option<CalendarRecord>> {
        let record = self
            .conn
            .query_row(
                &format!("{CALENDAR_SELECT_SQL} WHERE name = ?1;"),
                [name],
                parse_calendar_row,
            )
            .optional()?;
        Ok(record)
    }

    fn list_calendars(&self) -> RepoResult<Vec<CalendarRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CALENDAR_SELECT_SQL} ORDER BY name ASC, id ASC;"))?;
        let calendars = stmt
            .query_map([], parse_calendar_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(calendars)
    }
}

fn parse_calendar_row(row: &Row<'_>) -> rusqlite::Result<CalendarRecord> {
    Ok(CalendarRecord {
        id: row.get("id")?,
        name: row.get("name")?,
        color: row.get("color")?,
        timezone: row.get("timezone")?,
    })
}
