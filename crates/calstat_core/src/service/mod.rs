//! Write-side use cases over the store.
//!
//! # Responsibility
//! - Orchestrate extractor, parser, resolver and repositories into import
//!   and export runs.
//! - Keep CLI callers decoupled from SQL and file-format details.

pub mod export_service;
pub mod import_service;
