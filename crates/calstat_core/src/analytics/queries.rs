//! SQL for the analytics engine.

use super::types::{
    DailyUsage, DimensionReport, ItemFilter, RankingScope, TimeWindow, UnclassifiedUsage,
    UsageRow, ValueOrder,
};
use crate::db::Store;
use crate::model::taxonomy::{normalize_name, Dimension};
use crate::repo::calendar_repo::{CalendarRecord, CalendarRepository, SqliteCalendarRepository};
use crate::repo::{EntityId, RepoError, RepoResult};
use chrono::NaiveDate;
use rusqlite::params_from_iter;
use rusqlite::types::Value;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Read-only query facade over one store.
pub struct AnalyticsEngine<'s> {
    store: &'s Store,
}

/// Incrementally built statement with positional bind values.
struct ScopedSql {
    sql: String,
    values: Vec<Value>,
}

impl ScopedSql {
    fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            values: Vec::new(),
        }
    }

    fn push(&mut self, fragment: &str) {
        self.sql.push_str(fragment);
    }

    fn bind(&mut self, fragment: &str, value: Value) {
        self.sql.push_str(fragment);
        self.values.push(value);
    }

    /// Joins the item's dimension table; `false` when the name is blank and
    /// nothing can match.
    fn item(&mut self, item: Option<ItemFilter<'_>>) -> bool {
        let Some(item) = item else {
            return true;
        };
        let Some(name) = normalize_name(item.name) else {
            return false;
        };
        self.bind(
            &format!(
                " INNER JOIN {table} item ON item.id = e.{column} AND item.name = ?",
                table = item.dimension.table(),
                column = item.dimension.event_column()
            ),
            Value::Text(name),
        );
        true
    }

    fn calendar(&mut self, calendar_id: Option<EntityId>) {
        if let Some(calendar_id) = calendar_id {
            self.bind(" AND e.calendar_id = ?", Value::Integer(calendar_id));
        }
    }

    fn window(&mut self, window: TimeWindow) {
        if let Some(year) = window.year {
            self.bind(" AND e.year = ?", Value::Integer(i64::from(year)));
        }
        if let Some(month) = window.month {
            self.bind(" AND e.month = ?", Value::Integer(i64::from(month)));
        }
    }

    fn limit(&mut self, limit: Option<u32>) {
        if let Some(limit) = limit {
            self.bind(" LIMIT ?", Value::Integer(i64::from(limit)));
        }
    }
}

impl<'s> AnalyticsEngine<'s> {
    pub fn new(store: &'s Store) -> Self {
        Self { store }
    }

    /// All calendars ordered by name.
    pub fn calendars(&self) -> RepoResult<Vec<CalendarRecord>> {
        SqliteCalendarRepository::new(self.store.connection()).list_calendars()
    }

    pub fn calendar_by_name(&self, name: &str) -> RepoResult<Option<CalendarRecord>> {
        SqliteCalendarRepository::new(self.store.connection()).find_by_name(name)
    }

    /// Ranks calendars, or one calendar's dimension values, by total duration
    /// descending with name ascending as tie-break.
    ///
    /// Calendars without events in the window are listed with zero totals;
    /// dimension values without events are omitted.
    pub fn usage_ranking(
        &self,
        scope: RankingScope,
        window: TimeWindow,
        limit: Option<u32>,
    ) -> RepoResult<Vec<UsageRow>> {
        let mut query = match scope {
            RankingScope::Calendars => {
                let mut query = ScopedSql::new(
                    "SELECT
                        c.id,
                        c.name,
                        c.color,
                        COALESCE(SUM(e.duration), 0.0) AS total_duration,
                        COUNT(e.id) AS total_events
                     FROM calendars c
                     LEFT JOIN events e ON e.calendar_id = c.id",
                );
                query.window(window);
                query.push(" GROUP BY c.id");
                query
            }
            RankingScope::Dimension {
                calendar_id,
                dimension,
            } => {
                let mut query = ScopedSql::new(format!(
                    "SELECT
                        d.id,
                        d.name,
                        NULL AS color,
                        COALESCE(SUM(e.duration), 0.0) AS total_duration,
                        COUNT(e.id) AS total_events
                     FROM events e
                     INNER JOIN {table} d ON d.id = e.{column}
                     WHERE 1 = 1",
                    table = dimension.table(),
                    column = dimension.event_column()
                ));
                query.calendar(Some(calendar_id));
                query.window(window);
                query.push(" GROUP BY d.id");
                query
            }
        };
        query.push(" ORDER BY total_duration DESC, name ASC");
        query.limit(limit);

        let rows = self
            .store
            .fetch_all(&query.sql, params_from_iter(query.values), |row| {
                Ok(UsageRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    color: row.get(2)?,
                    total_duration: row.get(3)?,
                    total_events: row.get(4)?,
                })
            })?;
        Ok(rows)
    }

    /// Distinct names of `dimension` used by events in the calendar and window.
    pub fn distinct_values(
        &self,
        calendar_id: EntityId,
        dimension: Dimension,
        window: TimeWindow,
        order: ValueOrder,
    ) -> RepoResult<Vec<String>> {
        let mut query = ScopedSql::new(format!(
            "SELECT d.name, SUM(e.duration) AS total_duration
             FROM events e
             INNER JOIN {table} d ON d.id = e.{column}
             WHERE 1 = 1",
            table = dimension.table(),
            column = dimension.event_column()
        ));
        query.calendar(Some(calendar_id));
        query.window(window);
        query.push(" GROUP BY d.id");
        query.push(match order {
            ValueOrder::Name => " ORDER BY d.name ASC",
            ValueOrder::TotalDuration => " ORDER BY total_duration DESC, d.name ASC",
        });

        let names = self
            .store
            .fetch_all(&query.sql, params_from_iter(query.values), |row| row.get(0))?;
        Ok(names)
    }

    /// Years with at least one event, ascending.
    pub fn distinct_years(&self, calendar_id: Option<EntityId>) -> RepoResult<Vec<i32>> {
        let mut query = ScopedSql::new("SELECT DISTINCT e.year FROM events e WHERE 1 = 1");
        query.calendar(calendar_id);
        query.push(" ORDER BY e.year ASC");
        let years = self
            .store
            .fetch_all(&query.sql, params_from_iter(query.values), |row| row.get(0))?;
        Ok(years)
    }

    /// Months (1..=12) with at least one event, ascending. Without `year`
    /// the months of every year are merged.
    pub fn distinct_months(
        &self,
        calendar_id: Option<EntityId>,
        year: Option<i32>,
    ) -> RepoResult<Vec<u32>> {
        let mut query = ScopedSql::new("SELECT DISTINCT e.month FROM events e WHERE 1 = 1");
        query.calendar(calendar_id);
        query.window(TimeWindow { year, month: None });
        query.push(" ORDER BY e.month ASC");
        let months = self
            .store
            .fetch_all(&query.sql, params_from_iter(query.values), |row| row.get(0))?;
        Ok(months)
    }

    /// Per-day totals for one month, ascending by day. Days without events
    /// are omitted.
    pub fn daily_breakdown(
        &self,
        calendar_id: EntityId,
        year: i32,
        month: u32,
        item: Option<ItemFilter<'_>>,
    ) -> RepoResult<Vec<DailyUsage>> {
        let mut query = ScopedSql::new(
            "SELECT e.day, SUM(e.duration) AS total_duration, COUNT(e.id) AS event_count
             FROM events e",
        );
        if !query.item(item) {
            return Ok(Vec::new());
        }
        query.push(" WHERE 1 = 1");
        query.calendar(Some(calendar_id));
        query.window(TimeWindow::month(year, month));
        query.push(" GROUP BY e.day ORDER BY e.day ASC");

        let days = self
            .store
            .fetch_all(&query.sql, params_from_iter(query.values), |row| {
                Ok(DailyUsage {
                    day: row.get(0)?,
                    total_duration: row.get(1)?,
                    event_count: row.get(2)?,
                })
            })?;
        Ok(days)
    }

    /// Summary statistics for a calendar, window and optional dimension value.
    pub fn report(
        &self,
        calendar_id: EntityId,
        window: TimeWindow,
        item: Option<ItemFilter<'_>>,
    ) -> RepoResult<DimensionReport> {
        let mut query = ScopedSql::new(
            "SELECT
                MIN(substr(e.dtstart, 1, 10)),
                MAX(substr(e.dtstart, 1, 10)),
                COUNT(DISTINCT substr(e.dtstart, 1, 10)),
                COUNT(e.id),
                COALESCE(SUM(e.duration), 0.0),
                COALESCE(MAX(e.duration), 0.0),
                COALESCE(MIN(e.duration), 0.0)
             FROM events e",
        );
        if !query.item(item) {
            return Ok(DimensionReport::default());
        }
        query.push(" WHERE 1 = 1");
        query.calendar(Some(calendar_id));
        query.window(window);

        let row = self
            .store
            .fetch_one(&query.sql, params_from_iter(query.values), |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, f64>(5)?,
                    row.get::<_, f64>(6)?,
                ))
            })?;
        let Some((first, last, total_days, total_events, total_hours, max, min)) = row else {
            return Ok(DimensionReport::default());
        };
        if total_events == 0 {
            return Ok(DimensionReport::default());
        }

        Ok(DimensionReport {
            first_date: first.as_deref().map(parse_date).transpose()?,
            last_date: last.as_deref().map(parse_date).transpose()?,
            total_days,
            average_day: ratio(total_hours, total_days),
            total_events,
            total_hours,
            average_duration: ratio(total_hours, total_events),
            max_duration: max,
            min_duration: min,
        })
    }

    /// Time of events in the calendar and window that have no value for
    /// `dimension`.
    pub fn unclassified_usage(
        &self,
        calendar_id: EntityId,
        dimension: Dimension,
        window: TimeWindow,
    ) -> RepoResult<UnclassifiedUsage> {
        let mut query = ScopedSql::new(format!(
            "SELECT COALESCE(SUM(e.duration), 0.0), COUNT(e.id)
             FROM events e
             WHERE e.{column} IS NULL",
            column = dimension.event_column()
        ));
        query.calendar(Some(calendar_id));
        query.window(window);

        let totals = self
            .store
            .fetch_one(&query.sql, params_from_iter(query.values), |row| {
                Ok((row.get::<_, f64>(0)?, row.get::<_, i64>(1)?))
            })?;
        let (total_duration, total_events) = totals.unwrap_or((0.0, 0));
        Ok(UnclassifiedUsage {
            dimension,
            total_duration,
            total_events,
        })
    }
}

fn ratio(total: f64, count: i64) -> f64 {
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

fn parse_date(value: &str) -> RepoResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| RepoError::InvalidData(format!("invalid event date `{value}`")))
}
