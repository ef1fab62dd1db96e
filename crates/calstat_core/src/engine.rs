//! Engine facade used by front ends.
//!
//! # Responsibility
//! - Own the store handle and configuration for one process.
//! - Expose import, export and analytics entry points.
//!
//! # Invariants
//! - The store is opened once, with migrations applied, before any call.
//! - Front ends never touch SQL; every result is a plain record.

use crate::analytics::AnalyticsEngine;
use crate::config::{ConfigError, EngineConfig};
use crate::db::{DbError, Store};
use crate::logging::{init_logging, LoggingError};
use crate::repo::RepoError;
use crate::service::export_service::{export_calendar, ExportError};
use crate::service::import_service::{self, ImportError, ImportReport};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug)]
pub enum EngineError {
    Config(ConfigError),
    Logging(LoggingError),
    Db(DbError),
    Repo(RepoError),
    Import(ImportError),
    Export(ExportError),
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Logging(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Import(err) => write!(f, "{err}"),
            Self::Export(err) => write!(f, "{err}"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Logging(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Import(err) => Some(err),
            Self::Export(err) => Some(err),
        }
    }
}

impl From<ConfigError> for EngineError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<LoggingError> for EngineError {
    fn from(value: LoggingError) -> Self {
        Self::Logging(value)
    }
}

impl From<DbError> for EngineError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<RepoError> for EngineError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<ImportError> for EngineError {
    fn from(value: ImportError) -> Self {
        Self::Import(value)
    }
}

impl From<ExportError> for EngineError {
    fn from(value: ExportError) -> Self {
        Self::Export(value)
    }
}

pub struct Engine {
    store: Store,
    config: EngineConfig,
}

impl Engine {
    /// Validates `config`, starts logging when `log_dir` is set, and opens
    /// the database file.
    pub fn open(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        if let Some(log_dir) = config.log_dir.as_deref() {
            init_logging(&config.log_level, log_dir)?;
        }
        let store = Store::open(&config.database_path)?;
        Ok(Self { store, config })
    }

    /// Same as [`Engine::open`] but backed by an in-memory database;
    /// `database_path` is ignored.
    pub fn open_in_memory(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let store = Store::open_in_memory()?;
        Ok(Self { store, config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Wipes imported data and reimports every source file.
    pub fn import_fresh(&mut self) -> EngineResult<ImportReport> {
        Ok(import_service::import_fresh(&mut self.store, &self.config)?)
    }

    /// Imports source files whose calendar is not stored yet.
    pub fn import_incremental(&mut self) -> EngineResult<ImportReport> {
        Ok(import_service::import_incremental(
            &mut self.store,
            &self.config,
        )?)
    }

    pub fn analytics(&self) -> AnalyticsEngine<'_> {
        AnalyticsEngine::new(&self.store)
    }

    pub fn export_calendar(&self, name: &str) -> EngineResult<String> {
        Ok(export_calendar(&self.store, name)?)
    }
}
