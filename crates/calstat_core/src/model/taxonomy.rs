//! Taxonomy records parsed from event descriptions.
//!
//! # Invariants
//! - `area`, `project` and `kind` are stored normalized (trim + lowercase).
//! - `detail` keeps the author's original text.
//! - `tags` contain no empty tokens and no duplicates.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Normalizes one taxonomy value.
///
/// Returns `None` for empty or whitespace-only input.
pub fn normalize_name(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Persisted lookup entity kinds resolved by get-or-create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaxonomyKind {
    Area,
    Project,
    Type,
    Tag,
}

impl TaxonomyKind {
    pub(crate) fn table(self) -> &'static str {
        match self {
            Self::Area => "areas",
            Self::Project => "projects",
            Self::Type => "types",
            Self::Tag => "tags",
        }
    }

    /// Whether rows of this kind carry an optional parent area.
    pub fn has_parent_area(self) -> bool {
        matches!(self, Self::Project | Self::Type)
    }
}

/// Categorical axis used by dimension-scoped analytics queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Area,
    Type,
    Project,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [Self::Area, Self::Type, Self::Project];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Area => "area",
            Self::Type => "type",
            Self::Project => "project",
        }
    }

    pub(crate) fn table(self) -> &'static str {
        self.taxonomy_kind().table()
    }

    /// Foreign key column on `events` referencing this dimension.
    pub(crate) fn event_column(self) -> &'static str {
        match self {
            Self::Area => "area_id",
            Self::Type => "type_id",
            Self::Project => "project_id",
        }
    }

    pub fn taxonomy_kind(self) -> TaxonomyKind {
        match self {
            Self::Area => TaxonomyKind::Area,
            Self::Type => TaxonomyKind::Type,
            Self::Project => TaxonomyKind::Project,
        }
    }
}

impl Display for Dimension {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = String;

    /// Accepts singular or plural names in any case (`area`, `Areas`, ...).
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "area" | "areas" => Ok(Self::Area),
            "type" | "types" => Ok(Self::Type),
            "project" | "projects" => Ok(Self::Project),
            other => Err(format!(
                "unsupported dimension `{other}`; expected area|type|project"
            )),
        }
    }
}

/// Fixed difficulty scale seeded into the `difficulties` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    VeryEasy = 1,
    Easy = 2,
    Medium = 3,
    Hard = 4,
    VeryHard = 5,
}

impl Difficulty {
    pub const ALL: [Difficulty; 5] = [
        Self::VeryEasy,
        Self::Easy,
        Self::Medium,
        Self::Hard,
        Self::VeryHard,
    ];

    pub fn level(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::VeryEasy => "Very Easy",
            Self::Easy => "Easy",
            Self::Medium => "Medium",
            Self::Hard => "Hard",
            Self::VeryHard => "Very Hard",
        }
    }

    pub fn from_level(level: i64) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|difficulty| i64::from(difficulty.level()) == level)
    }

    /// Parses a level number (`3`) or a label (`medium`, `Very Hard`).
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if let Ok(level) = trimmed.parse::<i64>() {
            return Self::from_level(level);
        }
        Self::ALL
            .into_iter()
            .find(|difficulty| difficulty.label().eq_ignore_ascii_case(trimmed))
    }
}

/// Fixed-shape taxonomy record parsed from one event description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EventMetadata {
    pub area: Option<String>,
    pub project: Option<String>,
    /// Value of the `Type:` key.
    pub kind: Option<String>,
    pub tags: Vec<String>,
    pub difficulty: Option<Difficulty>,
    pub detail: Option<String>,
}

impl EventMetadata {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_name, Difficulty, Dimension};

    #[test]
    fn normalize_name_trims_and_lowercases() {
        assert_eq!(normalize_name("  Deep Work "), Some("deep work".to_string()));
        assert_eq!(normalize_name("   "), None);
    }

    #[test]
    fn dimension_accepts_legacy_plural_names() {
        assert_eq!("Areas".parse::<Dimension>().unwrap(), Dimension::Area);
        assert_eq!("types".parse::<Dimension>().unwrap(), Dimension::Type);
        assert_eq!(" PROJECT ".parse::<Dimension>().unwrap(), Dimension::Project);
        assert!("tags".parse::<Dimension>().is_err());
    }

    #[test]
    fn difficulty_parses_level_or_label() {
        assert_eq!(Difficulty::parse("3"), Some(Difficulty::Medium));
        assert_eq!(Difficulty::parse("very hard"), Some(Difficulty::VeryHard));
        assert_eq!(Difficulty::parse("9"), None);
        assert_eq!(Difficulty::parse("impossible"), None);
    }
}
