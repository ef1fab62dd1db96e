//! Query parameters and result records.

use crate::model::taxonomy::Dimension;
use crate::repo::EntityId;
use chrono::NaiveDate;
use serde::Serialize;

/// Calendar-local time window. Unset fields do not filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub year: Option<i32>,
    /// 1..=12
    pub month: Option<u32>,
}

impl TimeWindow {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn year(year: i32) -> Self {
        Self {
            year: Some(year),
            month: None,
        }
    }

    pub fn month(year: i32, month: u32) -> Self {
        Self {
            year: Some(year),
            month: Some(month),
        }
    }
}

/// What a usage ranking ranks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingScope {
    /// Every calendar, including ones without events in the window.
    Calendars,
    /// Values of one dimension inside one calendar.
    Dimension {
        calendar_id: EntityId,
        dimension: Dimension,
    },
}

/// Restricts a query to events carrying one value of one dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemFilter<'a> {
    pub dimension: Dimension,
    /// Raw name; normalized before matching.
    pub name: &'a str,
}

impl<'a> ItemFilter<'a> {
    pub fn new(dimension: Dimension, name: &'a str) -> Self {
        Self { dimension, name }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValueOrder {
    #[default]
    Name,
    /// Total duration descending, then name.
    TotalDuration,
}

/// One ranked calendar or dimension value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageRow {
    pub id: EntityId,
    pub name: String,
    /// Set for calendars only.
    pub color: Option<String>,
    pub total_duration: f64,
    pub total_events: i64,
}

/// Totals for one active day of a month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyUsage {
    /// Day of month, 1-based.
    pub day: u32,
    pub total_duration: f64,
    pub event_count: i64,
}

/// Summary statistics for one scope. All zero when nothing matched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DimensionReport {
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    /// Distinct calendar-local dates with at least one event.
    pub total_days: i64,
    /// `total_hours / total_days`.
    pub average_day: f64,
    pub total_events: i64,
    pub total_hours: f64,
    /// `total_hours / total_events`.
    pub average_duration: f64,
    pub max_duration: f64,
    pub min_duration: f64,
}

/// Time in a calendar not classified along one dimension.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnclassifiedUsage {
    pub dimension: Dimension,
    pub total_duration: f64,
    pub total_events: i64,
}
