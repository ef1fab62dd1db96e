//! Read-only analytics over the relational store.
//!
//! # Responsibility
//! - Rank calendars and taxonomy values by time spent.
//! - List the values, years and months that drive window selection.
//! - Produce daily breakdowns and summary reports for one scope.
//!
//! # Invariants
//! - Queries never write.
//! - Time windows compare the calendar-local start date, never UTC.
//! - Ranking ties break by name ascending.
//! - A scope with no matching events yields empty lists or zero-filled
//!   records, never an error.

mod queries;
mod types;

pub use queries::AnalyticsEngine;
pub use types::{
    DailyUsage, DimensionReport, ItemFilter, RankingScope, TimeWindow, UnclassifiedUsage,
    UsageRow, ValueOrder,
};
