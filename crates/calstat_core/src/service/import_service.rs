//! Import pipeline: calendar files into the relational store.
//!
//! # Responsibility
//! - Drive extract -> parse -> resolve -> insert for a set of source files.
//! - Support fresh (wipe and reload) and incremental (new calendars only)
//!   runs through one code path selected by [`ImportMode`].
//! - Report per-file and aggregate counts.
//!
//! # Invariants
//! - Writes are serialized: one transaction per file, one savepoint per event.
//!   A file's writes land together or not at all.
//! - An unreadable or malformed file fails alone; the run continues.
//! - A constraint violation skips only the offending event or calendar.
//! - Any other store error aborts the run and is returned to the caller.
//! - Cancellation is observed between files only.

use crate::config::EngineConfig;
use crate::db::{DbError, Store};
use crate::extract::{extract_events, ExtractedCalendar};
use crate::logging::sanitize_message;
use crate::model::event::RawEvent;
use crate::model::taxonomy::TaxonomyKind;
use crate::parser::parse_description;
use crate::repo::calendar_repo::{CalendarRepository, NewCalendar, SqliteCalendarRepository};
use crate::repo::event_repo::{EventRepository, NewEvent, SqliteEventRepository};
use crate::repo::taxonomy_repo::{SqliteTaxonomyResolver, TaxonomyResolver};
use crate::repo::{EntityId, RepoError, RepoResult};
use log::{error, info, warn};
use rusqlite::{Connection, Transaction};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

const SOURCE_EXTENSION: &str = "ics";

/// Tables cleared by a fresh import, children first. `difficulties` is
/// seeded by migration and kept.
const FRESH_WIPE_SQL: &str = "
DELETE FROM event_tags;
DELETE FROM events;
DELETE FROM tags;
DELETE FROM calendars;
DELETE FROM projects;
DELETE FROM types;
DELETE FROM areas;
DELETE FROM sqlite_sequence
 WHERE name IN ('event_tags', 'events', 'tags', 'calendars', 'projects', 'types', 'areas');
";

pub type ImportResult<T> = Result<T, ImportError>;

/// Fatal import failure. Per-file and per-event problems never surface here.
#[derive(Debug)]
pub enum ImportError {
    Db(DbError),
    Repo(RepoError),
    /// The sources directory itself could not be listed.
    SourcesDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "import aborted: {err}"),
            Self::Repo(err) => write!(f, "import aborted: {err}"),
            Self::SourcesDir { path, source } => write!(
                f,
                "cannot list calendar sources in `{}`: {source}",
                path.display()
            ),
        }
    }
}

impl Error for ImportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::SourcesDir { source, .. } => Some(source),
        }
    }
}

impl From<DbError> for ImportError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<RepoError> for ImportError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<rusqlite::Error> for ImportError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportMode {
    /// Wipe all imported data, then import every source.
    Fresh,
    /// Import only calendars whose name is not stored yet.
    Incremental,
}

impl ImportMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fresh => "fresh",
            Self::Incremental => "incremental",
        }
    }
}

/// Pipeline progress. `Failed` is terminal and reachable from any step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportState {
    NotStarted,
    SchemaReady,
    CalendarsLoaded,
    EventsLoaded,
    Complete,
    Failed,
}

/// One calendar file to import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSource {
    /// Calendar name: the file name without extension.
    pub name: String,
    pub path: PathBuf,
}

impl ImportSource {
    /// Derives the calendar name from the file stem; `None` when the path has
    /// no extension or no usable UTF-8 stem. Dotfiles such as `.ics` are
    /// rejected.
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        path.extension()?;
        let name = path.file_stem()?.to_str()?.trim().to_string();
        if name.is_empty() || name.starts_with('.') {
            return None;
        }
        Some(Self { name, path })
    }
}

/// Lists `*.ics` files (case-insensitive extension) in `dir`, sorted by file
/// name. Subdirectories are not searched.
pub fn discover_sources(dir: &Path) -> ImportResult<Vec<ImportSource>> {
    let to_error = |source| ImportError::SourcesDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(to_error)? {
        let path = entry.map_err(to_error)?.path();
        let is_calendar = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(SOURCE_EXTENSION));
        if is_calendar && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    Ok(paths.into_iter().filter_map(ImportSource::from_path).collect())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    Imported,
    /// Incremental mode: the calendar is already stored.
    AlreadyPresent,
    /// Another source in this run already created a calendar with this name.
    DuplicateName,
    Failed { reason: String },
    /// Not reached because the run was cancelled.
    NotProcessed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub calendar: String,
    pub path: PathBuf,
    #[serde(flatten)]
    pub status: FileStatus,
    pub calendar_id: Option<EntityId>,
    /// Declared or fallback timezone the events were converted into.
    pub timezone: Option<String>,
    pub events_imported: usize,
    /// Events dropped by the extractor or rejected by a store constraint.
    pub events_skipped: usize,
}

impl FileReport {
    fn new(source: &ImportSource) -> Self {
        Self {
            calendar: source.name.clone(),
            path: source.path.clone(),
            status: FileStatus::NotProcessed,
            calendar_id: None,
            timezone: None,
            events_imported: 0,
            events_skipped: 0,
        }
    }
}

/// Outcome of one import run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportReport {
    pub run_id: Uuid,
    pub mode: ImportMode,
    /// Files whose calendar and events were written.
    pub files_processed: usize,
    pub files_failed: usize,
    /// Files skipped because their calendar already exists.
    pub files_skipped: usize,
    pub calendars_imported: usize,
    pub events_imported: usize,
    pub events_skipped: usize,
    pub cancelled: bool,
    pub files: Vec<FileReport>,
}

impl ImportReport {
    fn new(run_id: Uuid, mode: ImportMode, sources: &[ImportSource]) -> Self {
        Self {
            run_id,
            mode,
            files_processed: 0,
            files_failed: 0,
            files_skipped: 0,
            calendars_imported: 0,
            events_imported: 0,
            events_skipped: 0,
            cancelled: false,
            files: sources.iter().map(FileReport::new).collect(),
        }
    }

    fn finalize(&mut self) {
        self.files_processed = 0;
        self.files_failed = 0;
        self.files_skipped = 0;
        self.calendars_imported = 0;
        self.events_imported = 0;
        self.events_skipped = 0;
        for file in &self.files {
            match file.status {
                FileStatus::Imported => {
                    self.files_processed += 1;
                    self.calendars_imported += 1;
                }
                FileStatus::AlreadyPresent | FileStatus::DuplicateName => self.files_skipped += 1,
                FileStatus::Failed { .. } => self.files_failed += 1,
                FileStatus::NotProcessed => {}
            }
            self.events_imported += file.events_imported;
            self.events_skipped += file.events_skipped;
        }
    }
}

/// Result of the pure phase for one file.
enum Prepared {
    Ready(ExtractedCalendar),
    Skip,
}

/// Single-writer import pipeline bound to one store.
pub struct ImportPipeline<'s> {
    store: &'s mut Store,
    config: &'s EngineConfig,
    cancel: Arc<AtomicBool>,
    state: ImportState,
}

impl<'s> ImportPipeline<'s> {
    pub fn new(store: &'s mut Store, config: &'s EngineConfig) -> Self {
        Self {
            store,
            config,
            cancel: Arc::new(AtomicBool::new(false)),
            state: ImportState::NotStarted,
        }
    }

    /// Shares a flag that stops the run before the next file once set.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn state(&self) -> ImportState {
        self.state
    }

    /// Runs one import over `sources`, in the given order.
    pub fn run(&mut self, mode: ImportMode, sources: &[ImportSource]) -> ImportResult<ImportReport> {
        let run_id = Uuid::new_v4();
        let started_at = Instant::now();
        info!(
            "event=import_run module=import status=start run_id={run_id} mode={} files={}",
            mode.as_str(),
            sources.len()
        );

        let mut report = ImportReport::new(run_id, mode, sources);
        match self.run_phases(mode, sources, &mut report) {
            Ok(()) => {
                self.state = ImportState::Complete;
                report.finalize();
                info!(
                    "event=import_run module=import status=ok run_id={run_id} mode={} duration_ms={} files_processed={} files_failed={} files_skipped={} events_imported={} events_skipped={} cancelled={}",
                    mode.as_str(),
                    started_at.elapsed().as_millis(),
                    report.files_processed,
                    report.files_failed,
                    report.files_skipped,
                    report.events_imported,
                    report.events_skipped,
                    report.cancelled
                );
                Ok(report)
            }
            Err(err) => {
                self.state = ImportState::Failed;
                error!(
                    "event=import_run module=import status=error run_id={run_id} mode={} duration_ms={} error={}",
                    mode.as_str(),
                    started_at.elapsed().as_millis(),
                    sanitize_message(&err.to_string(), 200)
                );
                Err(err)
            }
        }
    }

    fn run_phases(
        &mut self,
        mode: ImportMode,
        sources: &[ImportSource],
        report: &mut ImportReport,
    ) -> ImportResult<()> {
        self.store.migrate()?;
        if mode == ImportMode::Fresh {
            self.wipe(report.run_id)?;
        }
        self.state = ImportState::SchemaReady;

        let prepared = self.prepare(mode, sources, report)?;
        self.state = ImportState::CalendarsLoaded;

        for (index, (source, prepared)) in sources.iter().zip(prepared).enumerate() {
            if self.cancel.load(Ordering::SeqCst) {
                report.cancelled = true;
                warn!(
                    "event=import_run module=import status=cancelled run_id={} remaining_files={}",
                    report.run_id,
                    sources.len() - index
                );
                break;
            }
            let Prepared::Ready(extracted) = prepared else {
                continue;
            };
            self.write_file(report.run_id, source, extracted, &mut report.files[index])?;
        }
        self.state = ImportState::EventsLoaded;
        Ok(())
    }

    fn wipe(&mut self, run_id: Uuid) -> ImportResult<()> {
        let tx = self.store.transaction()?;
        tx.execute_batch(FRESH_WIPE_SQL)?;
        tx.commit()?;
        info!("event=fresh_wipe module=import status=ok run_id={run_id}");
        Ok(())
    }

    /// Pure phase: read and extract every file; mark already-present
    /// calendars in incremental mode.
    fn prepare(
        &self,
        mode: ImportMode,
        sources: &[ImportSource],
        report: &mut ImportReport,
    ) -> ImportResult<Vec<Prepared>> {
        let calendars = SqliteCalendarRepository::new(self.store.connection());
        let fallback = self.config.fallback_tz();

        let mut prepared = Vec::with_capacity(sources.len());
        for (source, file) in sources.iter().zip(report.files.iter_mut()) {
            if mode == ImportMode::Incremental {
                if let Some(existing) = calendars.find_by_name(&source.name)? {
                    file.status = FileStatus::AlreadyPresent;
                    file.calendar_id = Some(existing.id);
                    info!(
                        "event=import_file module=import status=skipped run_id={} calendar={} reason=already_present",
                        report.run_id,
                        sanitize_message(&source.name, 80)
                    );
                    prepared.push(Prepared::Skip);
                    continue;
                }
            }

            let extracted = std::fs::read(&source.path)
                .map_err(|err| err.to_string())
                .and_then(|bytes| extract_events(&bytes, fallback).map_err(|err| err.to_string()));
            match extracted {
                Ok(extracted) => prepared.push(Prepared::Ready(extracted)),
                Err(reason) => {
                    warn!(
                        "event=import_file module=import status=error run_id={} calendar={} error_code=source_unreadable error={}",
                        report.run_id,
                        sanitize_message(&source.name, 80),
                        sanitize_message(&reason, 200)
                    );
                    file.status = FileStatus::Failed { reason };
                    prepared.push(Prepared::Skip);
                }
            }
        }
        Ok(prepared)
    }

    /// Serialized write phase for one file.
    fn write_file(
        &mut self,
        run_id: Uuid,
        source: &ImportSource,
        extracted: ExtractedCalendar,
        file: &mut FileReport,
    ) -> ImportResult<()> {
        let started_at = Instant::now();
        let timezone = extracted.timezone.name();
        file.timezone = Some(timezone.to_string());
        file.events_skipped = extracted.skipped;

        let color = self.config.color_for(&source.name).to_string();
        let mut tx = self.store.transaction()?;
        let inserted = SqliteCalendarRepository::new(&tx).insert_calendar(&NewCalendar {
            name: &source.name,
            color: &color,
            timezone: Some(timezone),
        });
        let calendar_id = match inserted {
            Ok(id) => id,
            Err(err) if err.is_constraint_violation() => {
                warn!(
                    "event=import_file module=import status=skipped run_id={run_id} calendar={} reason=duplicate_calendar_name",
                    sanitize_message(&source.name, 80)
                );
                file.status = FileStatus::DuplicateName;
                file.events_skipped = 0;
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        for (index, event) in extracted.events.iter().enumerate() {
            match import_event(&mut tx, calendar_id, event) {
                Ok(_) => file.events_imported += 1,
                Err(err) if err.is_constraint_violation() => {
                    warn!(
                        "event=import_event module=import status=skipped run_id={run_id} calendar={} event_index={index} reason=constraint_violation error={}",
                        sanitize_message(&source.name, 80),
                        sanitize_message(&err.to_string(), 200)
                    );
                    file.events_skipped += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
        tx.commit()?;

        file.status = FileStatus::Imported;
        file.calendar_id = Some(calendar_id);
        info!(
            "event=import_file module=import status=ok run_id={run_id} calendar={} calendar_id={calendar_id} timezone={timezone} duration_ms={} events_imported={} events_skipped={}",
            sanitize_message(&source.name, 80),
            started_at.elapsed().as_millis(),
            file.events_imported,
            file.events_skipped
        );
        Ok(())
    }
}

/// Writes one event and its tag links inside a savepoint.
fn import_event(
    tx: &mut Transaction<'_>,
    calendar_id: EntityId,
    event: &RawEvent,
) -> RepoResult<EntityId> {
    let savepoint = tx.savepoint()?;
    let event_id = write_event(&savepoint, calendar_id, event)?;
    savepoint.commit()?;
    Ok(event_id)
}

fn write_event(conn: &Connection, calendar_id: EntityId, event: &RawEvent) -> RepoResult<EntityId> {
    let metadata = parse_description(&event.description);
    let resolver = SqliteTaxonomyResolver::new(conn);

    let area = metadata.area.as_deref();
    let area_id = resolver.resolve(TaxonomyKind::Area, area, None)?;
    let type_id = resolver.resolve(TaxonomyKind::Type, metadata.kind.as_deref(), area)?;
    let project_id = resolver.resolve(TaxonomyKind::Project, metadata.project.as_deref(), area)?;
    let difficulty_id = match metadata.difficulty {
        Some(difficulty) => resolver.difficulty_id(difficulty)?,
        None => None,
    };

    let events = SqliteEventRepository::new(conn);
    let event_id = events.insert_event(&NewEvent {
        calendar_id,
        summary: &event.summary,
        start: event.start.local(),
        end: event.end.local(),
        duration_hours: event.duration_hours(),
        area_id,
        project_id,
        type_id,
        difficulty_id,
        detail: metadata.detail.as_deref(),
        is_all_day: event.is_all_day,
    })?;

    for tag in &metadata.tags {
        if let Some(tag_id) = resolver.resolve(TaxonomyKind::Tag, Some(tag.as_str()), None)? {
            events.link_tag(event_id, tag_id)?;
        }
    }
    Ok(event_id)
}

/// Wipes imported data and imports every source in `config.sources_dir`.
pub fn import_fresh(store: &mut Store, config: &EngineConfig) -> ImportResult<ImportReport> {
    let sources = discover_sources(&config.sources_dir)?;
    ImportPipeline::new(store, config).run(ImportMode::Fresh, &sources)
}

/// Imports sources from `config.sources_dir` whose calendar is not stored yet.
pub fn import_incremental(store: &mut Store, config: &EngineConfig) -> ImportResult<ImportReport> {
    let sources = discover_sources(&config.sources_dir)?;
    ImportPipeline::new(store, config).run(ImportMode::Incremental, &sources)
}
