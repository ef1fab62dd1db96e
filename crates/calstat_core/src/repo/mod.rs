//! Repository layer over the relational store.
//!
//! # Responsibility
//! - Keep SQL for calendars, events and taxonomy lookups inside one boundary.
//! - Return semantic errors alongside transport errors.
//!
//! # Invariants
//! - Repositories borrow a `Connection`, so the same code runs on a plain
//!   connection, a transaction or a savepoint.
//! - Lookup entities are only ever created through get-or-create.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod calendar_repo;
pub mod event_repo;
pub mod taxonomy_repo;

/// Primary key of any persisted row.
pub type EntityId = i64;

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound(String),
    InvalidData(String),
}

impl RepoError {
    /// UNIQUE / FOREIGN KEY / CHECK failures; per-row and recoverable.
    pub fn is_constraint_violation(&self) -> bool {
        match self {
            Self::Db(err) => err.is_constraint_violation(),
            Self::NotFound(_) | Self::InvalidData(_) => false,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(what) => write!(f, "not found: {what}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
