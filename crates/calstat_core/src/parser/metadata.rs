//! `Key: value` metadata parser for event descriptions.
//!
//! # Responsibility
//! - Turn one free-text description into a fixed-shape [`EventMetadata`].
//!
//! # Invariants
//! - Recognized keys are exactly `area`, `project`, `type`, `tags`,
//!   `difficulty`, `detail` (case-insensitive); everything else is ignored.
//! - When a key repeats, the last non-empty occurrence wins. An empty value
//!   (`Area:`) never clears an earlier value.
//! - Parsing is pure and never fails.

use crate::model::taxonomy::{normalize_name, Difficulty, EventMetadata};
use once_cell::sync::Lazy;
use regex::Regex;

static BR_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid br regex"));
static HTML_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));

const HTML_ENTITIES: &[(&str, &str)] = &[
    ("&nbsp;", " "),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    // Last so that `&amp;lt;` decodes to `&lt;` and not `<`.
    ("&amp;", "&"),
];

/// Converts HTML line breaks to newlines, drops remaining tags and decodes
/// the handful of entities calendar web UIs emit.
pub fn clean_description(description: &str) -> String {
    let with_breaks = BR_TAG_RE.replace_all(description, "\n");
    let without_tags = HTML_TAG_RE.replace_all(&with_breaks, "");
    HTML_ENTITIES
        .iter()
        .fold(without_tags.into_owned(), |text, (entity, plain)| {
            text.replace(entity, plain)
        })
}

/// Parses one event description into a taxonomy record.
///
/// `area`, `project` and `type` are case-folded; `detail` keeps original
/// casing; `tags` are trimmed, deduplicated case-insensitively and keep the
/// order of first appearance.
pub fn parse_description(description: &str) -> EventMetadata {
    let mut metadata = EventMetadata::default();
    if description.trim().is_empty() {
        return metadata;
    }

    let cleaned = clean_description(description);
    for line in cleaned.lines() {
        let Some((raw_key, raw_value)) = line.split_once(':') else {
            continue;
        };
        let value = raw_value.trim();
        if value.is_empty() {
            continue;
        }

        match raw_key.trim().to_lowercase().as_str() {
            "area" => metadata.area = normalize_name(value),
            "project" => metadata.project = normalize_name(value),
            "type" => metadata.kind = normalize_name(value),
            "tags" => metadata.tags = split_tags(value),
            "difficulty" => {
                if let Some(difficulty) = Difficulty::parse(value) {
                    metadata.difficulty = Some(difficulty);
                }
            }
            "detail" => metadata.detail = Some(value.to_string()),
            _ => {}
        }
    }

    metadata
}

fn split_tags(value: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for token in value.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        if tags.iter().any(|known| known.eq_ignore_ascii_case(token)) {
            continue;
        }
        tags.push(token.to_string());
    }
    tags
}
