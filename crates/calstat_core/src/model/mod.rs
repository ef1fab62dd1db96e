//! Domain model for calendar events and their taxonomy.
//!
//! # Responsibility
//! - Define the in-memory shapes flowing from extraction to persistence.
//! - Define closed enumerations for taxonomy kinds, analytics dimensions and
//!   difficulty levels.
//!
//! # Invariants
//! - Taxonomy names are compared only in normalized form (trim + lowercase).
//! - Event duration is derived from start/end, never supplied independently.

pub mod event;
pub mod taxonomy;
