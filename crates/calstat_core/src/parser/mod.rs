//! Description mini-language parsing.
//!
//! Only the `Key: value` line convention is supported; see [`metadata`].

pub mod metadata;

pub use metadata::{clean_description, parse_description};
