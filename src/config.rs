//! Application configuration.
//!
//! Precedence: command line > environment > config files > defaults. Every layer is an
//! [`AppConfig`] with optional fields; [`AppConfig::fill_from`] lets earlier layers win.

use crate::errors::DbError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_URI: &str = "mongodb://localhost/playground";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const CONFIG_FILE: &str = "coursebook.toml";
pub const ENV_PREFIX: &str = "COURSEBOOK_";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub uri: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    pub page_size: Option<usize>,
    /// Delay of the asynchronous tags check; unset or 0 runs it synchronously.
    pub tag_validator_delay_ms: Option<u64>,
}

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub uri: String,
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub log_level: String,
    pub page_size: usize,
    pub tag_validator_delay_ms: u64,
}

impl AppConfig {
    /// Fill every unset field from `other`.
    pub fn fill_from(&mut self, other: Self) {
        self.uri = self.uri.take().or(other.uri);
        self.data_dir = self.data_dir.take().or(other.data_dir);
        self.log_dir = self.log_dir.take().or(other.log_dir);
        self.log_level = self.log_level.take().or(other.log_level);
        self.page_size = self.page_size.or(other.page_size);
        self.tag_validator_delay_ms = self.tag_validator_delay_ms.or(other.tag_validator_delay_ms);
    }

    /// Parse a TOML document.
    ///
    /// # Errors
    /// Returns `DbError::Config` for malformed TOML or unknown keys.
    pub fn from_toml(s: &str) -> Result<Self, DbError> {
        toml::from_str(s).map_err(|e| DbError::Config(e.to_string()))
    }

    /// Read a config file; a missing file is an empty layer.
    ///
    /// # Errors
    /// Returns `DbError::Config` when the file exists but cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, DbError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let s = std::fs::read_to_string(path)
            .map_err(|e| DbError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&s).map_err(|e| DbError::Config(format!("{}: {e}", path.display())))
    }

    /// Build a layer from `COURSEBOOK_*` variables. Numbers that fail to parse are ignored.
    pub fn from_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut cfg = Self::default();
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else { continue };
            match name {
                "URI" => cfg.uri = Some(value),
                "DATA_DIR" => cfg.data_dir = Some(PathBuf::from(value)),
                "LOG_DIR" => cfg.log_dir = Some(PathBuf::from(value)),
                "LOG_LEVEL" => cfg.log_level = Some(value),
                "PAGE_SIZE" => cfg.page_size = value.parse().ok(),
                "TAG_DELAY_MS" => cfg.tag_validator_delay_ms = value.parse().ok(),
                _ => {}
            }
        }
        cfg
    }

    /// Apply defaults to whatever is still unset.
    #[must_use]
    pub fn resolve(self) -> Settings {
        let data_dir = self.data_dir.unwrap_or_else(default_data_dir);
        Settings {
            uri: self.uri.unwrap_or_else(|| DEFAULT_URI.to_string()),
            log_dir: self.log_dir.unwrap_or_else(|| data_dir.join("logs")),
            data_dir,
            log_level: self.log_level.unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            page_size: self.page_size.filter(|n| *n > 0).unwrap_or(DEFAULT_PAGE_SIZE),
            tag_validator_delay_ms: self.tag_validator_delay_ms.unwrap_or(0),
        }
    }
}

/// Where the stores live when nothing else is configured.
#[must_use]
pub fn default_data_dir() -> PathBuf {
    dirs_next::data_dir()
        .map_or_else(|| PathBuf::from(".coursebook"), |d| d.join("coursebook"))
}

/// Config files in lookup order: explicit path, `$COURSEBOOK_CONFIG`,
/// `~/.config/coursebook.toml`, `./coursebook.toml`.
#[must_use]
pub fn config_paths(explicit: Option<&Path>, env_path: Option<PathBuf>) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(p) = explicit {
        paths.push(p.to_path_buf());
    }
    paths.extend(env_path);
    if let Some(home) = dirs_next::home_dir() {
        paths.push(home.join(".config").join(CONFIG_FILE));
    }
    if let Ok(cur) = std::env::current_dir() {
        paths.push(cur.join(CONFIG_FILE));
    }
    paths
}

/// Layer `cli` over the environment, config files and defaults.
///
/// # Errors
/// Returns `DbError::Config` when the explicit config file is missing or any
/// existing config file is malformed.
pub fn load(cli: AppConfig, explicit: Option<&Path>) -> Result<Settings, DbError> {
    if let Some(p) = explicit
        && !p.exists()
    {
        return Err(DbError::Config(format!("config file not found: {}", p.display())));
    }
    let env_path = std::env::var_os(format!("{ENV_PREFIX}CONFIG")).map(PathBuf::from);
    let mut cfg = cli;
    cfg.fill_from(AppConfig::from_vars(std::env::vars()));
    for path in config_paths(explicit, env_path) {
        cfg.fill_from(AppConfig::from_file(&path)?);
    }
    Ok(cfg.resolve())
}
