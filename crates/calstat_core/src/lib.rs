//! Core engine for calendar event normalization and analytics.
//! This crate is the single source of truth for import and query invariants.

pub mod analytics;
pub mod config;
pub mod db;
pub mod engine;
pub mod extract;
pub mod logging;
pub mod model;
pub mod parser;
pub mod repo;
pub mod service;

pub use analytics::{
    AnalyticsEngine, DailyUsage, DimensionReport, ItemFilter, RankingScope, TimeWindow,
    UnclassifiedUsage, UsageRow, ValueOrder,
};
pub use config::{ConfigError, EngineConfig};
pub use db::{DbError, Store};
pub use engine::{Engine, EngineError, EngineResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::taxonomy::{Difficulty, Dimension, EventMetadata};
pub use repo::calendar_repo::CalendarRecord;
pub use repo::{EntityId, RepoError, RepoResult};
pub use service::export_service::{ExportError, ExportResult};
pub use service::import_service::{
    FileReport, FileStatus, ImportError, ImportMode, ImportPipeline, ImportReport, ImportSource,
    ImportState,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
