//! Editor configuration loading and config file resolution
//!
//! Config file resolution priority:
//! 1. Explicit path (command-line or embedding application)
//! 2. Environment variable `BREWLOG_CONFIG`
//! 3. `<user config dir>/brewlog/editor.toml`
//! 4. Compiled defaults (no file)
//!
//! A missing file is not an error: defaults are used and a warning is logged.
//! A file that exists but does not parse is an error.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::filter::{Directive, LevelFilter};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "BREWLOG_CONFIG";

/// Top-level editor configuration
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct EditorConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub events: EventsConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub export: ExportConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log filter: a bare level (`info`) or comma-separated directives
    /// (`info,brewlog_editor=debug`)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Event bus sizing
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct EventsConfig {
    /// Broadcast channel capacity; slow subscribers lag past this many events
    #[serde(default = "default_event_capacity")]
    pub capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: default_event_capacity(),
        }
    }
}

/// Ingredient catalog behaviour
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CatalogConfig {
    /// Fetch the catalog as soon as an editing session opens
    #[serde(default = "default_true")]
    pub preload_on_open: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            preload_on_open: true,
        }
    }
}

/// Export behaviour
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ExportConfig {
    /// Save unsaved changes before exporting instead of refusing
    #[serde(default = "default_true")]
    pub save_before_export: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            save_before_export: true,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_event_capacity() -> usize {
    256
}

fn default_true() -> bool {
    true
}

impl EditorConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: EditorConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Resolve and load configuration using the documented priority order
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match resolve_config_path(explicit_path) {
            Some(path) if path.exists() => {
                info!("Loading editor config from {}", path.display());
                Self::from_file(&path)
            }
            Some(path) => {
                warn!(
                    "Config file {} not found, using compiled defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            None => {
                info!("No config file located, using compiled defaults");
                Ok(Self::default())
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.events.capacity == 0 {
            return Err(Error::Config(
                "events.capacity must be greater than zero".to_string(),
            ));
        }
        check_log_filter(&self.logging.level)?;
        Ok(())
    }
}

/// Each directive is either a bare level or `target[span]=level`
fn check_log_filter(filter: &str) -> Result<()> {
    let directives: Vec<&str> = filter
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .collect();
    if directives.is_empty() {
        return Err(Error::Config("logging.level is empty".to_string()));
    }
    for directive in directives {
        let valid = if directive.contains('=') || directive.contains('[') {
            directive.parse::<Directive>().is_ok()
        } else {
            directive.parse::<LevelFilter>().is_ok()
        };
        if !valid {
            return Err(Error::Config(format!(
                "logging.level has an invalid directive {:?} in {:?}",
                directive, filter
            )));
        }
    }
    Ok(())
}

/// Pick the config file path without reading it
///
/// Returns None when no tier names a file.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: explicit path
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    // Priority 2: environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: per-user config directory (only when the file is there)
    dirs::config_dir()
        .map(|dir| dir.join("brewlog").join("editor.toml"))
        .filter(|path| path.exists())
}
