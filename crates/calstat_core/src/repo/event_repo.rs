//! Event and event-tag persistence.
//!
//! # Invariants
//! - `dtstart`/`dtend` are calendar-local `YYYY-MM-DD HH:MM:SS` text; the
//!   derived `year`/`month`/`day` columns always match `dtstart`.
//! - `duration` is written from the caller's derived value and never edited.
//! - Linking the same `(event, tag)` pair twice keeps a single row.

use crate::model::taxonomy::Difficulty;
use crate::repo::{EntityId, RepoError, RepoResult};
use chrono::{Datelike, NaiveDateTime};
use rusqlite::{params, Connection, Row};

pub(crate) const DB_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Values for one new event row; taxonomy references are already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent<'a> {
    pub calendar_id: EntityId,
    pub summary: &'a str,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub duration_hours: f64,
    pub area_id: Option<EntityId>,
    pub project_id: Option<EntityId>,
    pub type_id: Option<EntityId>,
    pub difficulty_id: Option<EntityId>,
    pub detail: Option<&'a str>,
    pub is_all_day: bool,
}

/// Event read model with taxonomy names joined in.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEvent {
    pub id: EntityId,
    pub calendar_id: EntityId,
    pub summary: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub duration_hours: f64,
    pub area: Option<String>,
    pub project: Option<String>,
    pub kind: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub detail: Option<String>,
    pub is_all_day: bool,
    /// Tag names sorted ascending.
    pub tags: Vec<String>,
}

pub trait EventRepository {
    fn insert_event(&self, event: &NewEvent<'_>) -> RepoResult<EntityId>;
    /// Returns `true` when a new link row was written.
    fn link_tag(&self, event_id: EntityId, tag_id: EntityId) -> RepoResult<bool>;
    /// Events of one calendar ordered by start, then id.
    fn list_events(&self, calendar_id: EntityId) -> RepoResult<Vec<StoredEvent>>;
}

pub struct SqliteEventRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEventRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn load_tags(&self, event_id: EntityId) -> RepoResult<Vec<String>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT t.name
             FROM event_tags et
             INNER JOIN tags t ON t.id = et.tag_id
             WHERE et.event_id = ?1
             ORDER BY t.name ASC;",
        )?;
        let tags = stmt
            .query_map([event_id], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tags)
    }
}

impl EventRepository for SqliteEventRepository<'_> {
    fn insert_event(&self, event: &NewEvent<'_>) -> RepoResult<EntityId> {
        let local_date = event.start.date();
        self.conn.execute(
            "INSERT INTO events (
                calendar_id,
                summary,
                dtstart,
                dtend,
                duration,
                year,
                month,
                day,
                area_id,
                project_id,
                type_id,
                difficulty_id,
                detail,
                is_all_day
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14);",
            params![
                event.calendar_id,
                event.summary,
                event.start.format(DB_DATETIME_FORMAT).to_string(),
                event.end.format(DB_DATETIME_FORMAT).to_string(),
                event.duration_hours,
                local_date.year(),
                local_date.month(),
                local_date.day(),
                event.area_id,
                event.project_id,
                event.type_id,
                event.difficulty_id,
                event.detail,
                event.is_all_day,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn link_tag(&self, event_id: EntityId, tag_id: EntityId) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO event_tags (event_id, tag_id) VALUES (?1, ?2);",
            params![event_id, tag_id],
        )?;
        Ok(changed == 1)
    }

    fn list_events(&self, calendar_id: EntityId) -> RepoResult<Vec<StoredEvent>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                e.id,
                e.calendar_id,
                e.summary,
                e.dtstart,
                e.dtend,
                e.duration,
                a.name AS area,
                p.name AS project,
                t.name AS kind,
                d.level AS difficulty_level,
                e.detail,
                e.is_all_day
             FROM events e
             LEFT JOIN areas a ON a.id = e.area_id
             LEFT JOIN projects p ON p.id = e.project_id
             LEFT JOIN types t ON t.id = e.type_id
             LEFT JOIN difficulties d ON d.id = e.difficulty_id
             WHERE e.calendar_id = ?1
             ORDER BY e.dtstart ASC, e.id ASC;",
        )?;
        let mut rows = stmt.query([calendar_id])?;
        let mut events = Vec::new();
        while let Some(row) = rows.next()? {
            let mut event = parse_event_row(row)?;
            event.tags = self.load_tags(event.id)?;
            events.push(event);
        }
        Ok(events)
    }
}

fn parse_event_row(row: &Row<'_>) -> RepoResult<StoredEvent> {
    let difficulty = match row.get::<_, Option<i64>>("difficulty_level")? {
        Some(level) => Some(Difficulty::from_level(level).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid difficulty level `{level}`"))
        })?),
        None => None,
    };

    Ok(StoredEvent {
        id: row.get("id")?,
        calendar_id: row.get("calendar_id")?,
        summary: row.get("summary")?,
        start: parse_db_datetime(&row.get::<_, String>("dtstart")?)?,
        end: parse_db_datetime(&row.get::<_, String>("dtend")?)?,
        duration_hours: row.get("duration")?,
        area: row.get("area")?,
        project: row.get("project")?,
        kind: row.get("kind")?,
        difficulty,
        detail: row.get("detail")?,
        is_all_day: row.get("is_all_day")?,
        tags: Vec::new(),
    })
}

pub(crate) fn parse_db_datetime(value: &str) -> RepoResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, DB_DATETIME_FORMAT)
        .map_err(|_| RepoError::InvalidData(format!("invalid event datetime `{value}`")))
}
