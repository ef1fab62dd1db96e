//! Store handle over one migrated SQLite connection.
//!
//! # Responsibility
//! - Own the single writer connection for one process.
//! - Provide the `execute` / `fetch_one` / `fetch_all` primitives used by
//!   repositories, the import pipeline and the analytics engine.
//!
//! # Invariants
//! - A `Store` is only constructed from a connection with migrations applied.
//! - `execute` commits or rolls back as one unit.
//! - Only one write transaction is open at a time (`&mut self` borrow).

use super::migrations::apply_migrations;
use super::{open_db, open_db_in_memory, DbResult};
use rusqlite::{Connection, OptionalExtension, Params, Row, Transaction, TransactionBehavior};
use std::path::Path;

/// Explicit store handle created once at startup and passed by reference.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Opens a file-backed store and applies pending migrations.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Ok(Self {
            conn: open_db(path)?,
        })
    }

    /// Opens an in-memory store, mostly for tests and dry runs.
    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self {
            conn: open_db_in_memory()?,
        })
    }

    /// Re-runs the idempotent migration step.
    ///
    /// Safe to call on an initialized store; nothing changes when the schema is
    /// already at the latest version.
    pub fn migrate(&mut self) -> DbResult<()> {
        apply_migrations(&mut self.conn)
    }

    /// Read access for repositories and query builders.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Executes one write statement inside its own immediate transaction.
    ///
    /// Returns the number of changed rows. On error the transaction is
    /// dropped, which rolls it back.
    pub fn execute<P: Params>(&mut self, sql: &str, params: P) -> DbResult<usize> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let changed = tx.execute(sql, params)?;
        tx.commit()?;
        Ok(changed)
    }

    /// Fetches at most one row mapped through `map`.
    pub fn fetch_one<T, P, F>(&self, sql: &str, params: P, map: F) -> DbResult<Option<T>>
    where
        P: Params,
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        let value = self.conn.query_row(sql, params, map).optional()?;
        Ok(value)
    }

    /// Fetches every row mapped through `map`, preserving SQL order.
    pub fn fetch_all<T, P, F>(&self, sql: &str, params: P, map: F) -> DbResult<Vec<T>>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, map)?
            .collect::<rusqlite::Result<Vec<T>>>()?;
        Ok(rows)
    }

    /// Starts an immediate write transaction for multi-statement units of work.
    pub fn transaction(&mut self) -> DbResult<Transaction<'_>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        Ok(tx)
    }
}
