//! Engine configuration loaded from TOML.
//!
//! # Invariants
//! - Colors are `#RRGGBB`.
//! - `fallback_timezone`, when set, names a known IANA zone.
//! - A loaded `EngineConfig` has already passed [`EngineConfig::validate`].

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const DEFAULT_CALENDAR_COLOR: &str = "#FF0000";

fn default_color() -> String {
    DEFAULT_CALENDAR_COLOR.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(toml::de::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config syntax: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

/// Settings for one engine instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// SQLite database file.
    pub database_path: PathBuf,
    /// Directory scanned for `*.ics` source files.
    pub sources_dir: PathBuf,
    #[serde(default = "default_color")]
    pub default_color: String,
    /// Calendar name -> color.
    #[serde(default)]
    pub calendar_colors: BTreeMap<String, String>,
    /// IANA zone for calendars that declare none. UTC when unset.
    #[serde(default)]
    pub fallback_timezone: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Logging stays disabled when unset.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl EngineConfig {
    /// Minimal config with defaults for everything optional.
    pub fn new(database_path: impl Into<PathBuf>, sources_dir: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            sources_dir: sources_dir.into(),
            default_color: default_color(),
            calendar_colors: BTreeMap::new(),
            fallback_timezone: None,
            log_level: default_log_level(),
            log_dir: None,
        }
    }

    /// Reads and validates a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !is_hex_color(&self.default_color) {
            return Err(ConfigError::Invalid(format!(
                "default_color `{}` is not #RRGGBB",
                self.default_color
            )));
        }
        for (name, color) in &self.calendar_colors {
            if !is_hex_color(color) {
                return Err(ConfigError::Invalid(format!(
                    "color `{color}` for calendar `{name}` is not #RRGGBB"
                )));
            }
        }
        if let Some(zone) = self.fallback_timezone.as_deref() {
            if zone.parse::<Tz>().is_err() {
                return Err(ConfigError::Invalid(format!(
                    "fallback_timezone `{zone}` is not a known IANA timezone"
                )));
            }
        }
        Ok(())
    }

    /// Color for a calendar: explicit mapping first, then `default_color`.
    pub fn color_for(&self, calendar_name: &str) -> &str {
        self.calendar_colors
            .get(calendar_name)
            .map(String::as_str)
            .unwrap_or(&self.default_color)
    }

    pub fn fallback_tz(&self) -> Option<Tz> {
        self.fallback_timezone
            .as_deref()
            .and_then(|zone| zone.parse::<Tz>().ok())
    }
}

fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}
