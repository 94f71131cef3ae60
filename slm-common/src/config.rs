//! Bootstrap configuration loading and root folder resolution
//!
//! Configuration values are resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! Tiers 1 and 2 are handled by the binary's argument parser; this module
//! provides the TOML tier and the compiled defaults. A missing config file is
//! not an error: defaults are used. Nothing here logs while loading, since the
//! binary installs its subscriber only after configuration is resolved.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Directory name used under the platform config and data directories
pub const APP_DIR_NAME: &str = "shopping-list-manager";

/// File name of the product cache inside the root folder
pub const CACHE_FILE_NAME: &str = "barcode-db.json";

/// Bootstrap configuration loaded from TOML file
///
/// Every field is optional so that a partial file (or none at all) works.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    /// Folder holding the product cache
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// HTTP port for the correction UI
    #[serde(default)]
    pub port: Option<u16>,

    /// Input device node of the barcode reader
    #[serde(default)]
    pub barcode_reader: Option<PathBuf>,

    /// Public base URL of the correction UI, used in task descriptions
    #[serde(default)]
    pub webapp_base_url: Option<String>,

    /// Speech endpoint for scan feedback
    #[serde(default)]
    pub announce_url: Option<String>,

    #[serde(default)]
    pub todoist: TodoistConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub assistant: AssistantConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Shopping list (Todoist) credentials
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TodoistConfig {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
}

/// Web search (Google Custom Search) credentials
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchConfig {
    #[serde(default)]
    pub engine_id: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Language model endpoint settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssistantConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    /// OpenAI-compatible API base URL
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
    }

    /// Load an optional config file
    ///
    /// `None` (no file found) yields defaults. A file that exists but cannot be
    /// parsed is an error: silently ignoring it would hide credentials the user set.
    pub fn load_optional(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}

/// Locate the config file: user config dir first, then /etc on Linux
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc").join(APP_DIR_NAME).join("config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Resolve the root folder from the CLI/env value, the TOML value, or the default
pub fn resolve_root_folder(cli_or_env: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_or_env {
        return path.to_path_buf();
    }

    if let Some(path) = &toml_config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/shopping-list-manager (or /var/lib for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join(APP_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from("/var/lib").join(APP_DIR_NAME))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join(APP_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support").join(APP_DIR_NAME))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join(APP_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData").join(APP_DIR_NAME))
    } else {
        PathBuf::from("./shopping_list_data")
    }
}

/// Create the root folder if missing and return the cache file path inside it
pub fn ensure_root_folder(root_folder: &Path) -> Result<PathBuf> {
    if !root_folder.exists() {
        std::fs::create_dir_all(root_folder)?;
        info!("Created root folder: {}", root_folder.display());
    }
    Ok(root_folder.join(CACHE_FILE_NAME))
}

/// Treat empty and whitespace-only values as unset
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
