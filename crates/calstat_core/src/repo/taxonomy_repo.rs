//! Get-or-create resolution of taxonomy values.
//!
//! # Responsibility
//! - Map a raw area/project/type/tag string to a stable row id.
//!
//! # Invariants
//! - Lookup and insert use the normalized name (trim + lowercase), so raw
//!   strings that normalize identically share one id.
//! - Project/Type parent areas are first-write-wins: an existing row keeps
//!   its original `area_id` even when later input names another area.
//! - Callers resolve serially on one connection; check-then-create is not
//!   safe under concurrent writers.

use crate::model::taxonomy::{normalize_name, Difficulty, TaxonomyKind};
use crate::repo::{EntityId, RepoResult};
use rusqlite::{params, Connection, OptionalExtension};

/// Entity resolver contract.
pub trait TaxonomyResolver {
    /// Returns the id for `name`, creating the row when absent.
    ///
    /// `None` for absent or blank input. `parent_area` is only used when a
    /// Project/Type row is created.
    fn resolve(
        &self,
        kind: TaxonomyKind,
        name: Option<&str>,
        parent_area: Option<&str>,
    ) -> RepoResult<Option<EntityId>>;

    /// Looks up the seeded difficulty row.
    fn difficulty_id(&self, difficulty: Difficulty) -> RepoResult<Option<EntityId>>;
}

/// SQLite-backed resolver.
pub struct SqliteTaxonomyResolver<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaxonomyResolver<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Read-only lookup; never creates.
    pub fn find(&self, kind: TaxonomyKind, name: &str) -> RepoResult<Option<EntityId>> {
        let Some(normalized) = normalize_name(name) else {
            return Ok(None);
        };
        self.find_normalized(kind, &normalized)
    }

    /// Parent area of a project or type, by name.
    pub fn parent_area(&self, kind: TaxonomyKind, name: &str) -> RepoResult<Option<String>> {
        if !kind.has_parent_area() {
            return Ok(None);
        }
        let Some(normalized) = normalize_name(name) else {
            return Ok(None);
        };
        let sql = format!(
            "SELECT a.name
             FROM {table} t
             INNER JOIN areas a ON a.id = t.area_id
             WHERE t.name = ?1;",
            table = kind.table()
        );
        let area = self
            .conn
            .query_row(&sql, [normalized.as_str()], |row| row.get::<_, String>(0))
            .optional()?;
        Ok(area)
    }

    fn find_normalized(&self, kind: TaxonomyKind, normalized: &str) -> RepoResult<Option<EntityId>> {
        let sql = format!("SELECT id FROM {} WHERE name = ?1;", kind.table());
        let id = self
            .conn
            .query_row(&sql, [normalized], |row| row.get::<_, EntityId>(0))
            .optional()?;
        Ok(id)
    }
}

impl TaxonomyResolver for SqliteTaxonomyResolver<'_> {
    fn resolve(
        &self,
        kind: TaxonomyKind,
        name: Option<&str>,
        parent_area: Option<&str>,
    ) -> RepoResult<Option<EntityId>> {
        let Some(normalized) = name.and_then(normalize_name) else {
            return Ok(None);
        };

        // Resolve the parent first so it exists even when the child already
        // does; an event naming an area always gets that area row.
        let area_id = if kind.has_parent_area() {
            self.resolve(TaxonomyKind::Area, parent_area, None)?
        } else {
            None
        };

        if let Some(id) = self.find_normalized(kind, &normalized)? {
            return Ok(Some(id));
        }

        if kind.has_parent_area() {
            self.conn.execute(
                &format!(
                    "INSERT INTO {} (name, area_id) VALUES (?1, ?2);",
                    kind.table()
                ),
                params![normalized, area_id],
            )?;
        } else {
            self.conn.execute(
                &format!("INSERT INTO {} (name) VALUES (?1);", kind.table()),
                [normalized.as_str()],
            )?;
        }
        Ok(Some(self.conn.last_insert_rowid()))
    }

    fn difficulty_id(&self, difficulty: Difficulty) -> RepoResult<Option<EntityId>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM difficulties WHERE level = ?1;",
                [i64::from(difficulty.level())],
                |row| row.get::<_, EntityId>(0),
            )
            .optional()?;
        Ok(id)
    }
}
