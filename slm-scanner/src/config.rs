//! Runtime configuration for slm-scanner
//!
//! Command-line flags and environment variables arrive through clap (its `env`
//! attributes give the environment tier); [`ScannerConfig::resolve`] fills the
//! gaps from the TOML file and compiled defaults.

use clap::Args;
use slm_common::config::{ensure_root_folder, non_empty, resolve_root_folder, TomlConfig};
use slm_common::{Error, Result};
use std::path::PathBuf;

use crate::clients::SearchCredentials;

/// Default HTTP port of the correction UI
pub const DEFAULT_PORT: u16 = 80;

/// Default input device node of the barcode reader
pub const DEFAULT_BARCODE_READER: &str = "/dev/barcode-reader";

/// Fallback environment variable for the language model API key
const FALLBACK_ASSISTANT_KEY_VAR: &str = "OPENAI_API_KEY";

/// Settings shared by every subcommand
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Folder holding the product cache
    #[arg(long, global = true, env = "SLM_ROOT_FOLDER")]
    pub root_folder: Option<PathBuf>,

    /// HTTP port for the correction UI
    #[arg(long, global = true, env = "PORT")]
    pub port: Option<u16>,

    /// Barcode reader input device; /dev/null disables it
    #[arg(long, global = true, env = "BARCODE_READER")]
    pub barcode_reader: Option<PathBuf>,

    /// Public base URL of the correction UI
    #[arg(long, global = true, env = "WEBAPP_BASEURL")]
    pub webapp_base_url: Option<String>,

    /// Speech endpoint receiving scan feedback as JSON
    #[arg(long, global = true, env = "ANNOUNCE_URL")]
    pub announce_url: Option<String>,

    #[arg(long, global = true, env = "TODOIST_TOKEN", hide_env_values = true)]
    pub todoist_token: Option<String>,

    /// Todoist project holding the shopping list
    #[arg(long, global = true, env = "TODOIST_PROJECT_ID")]
    pub todoist_project_id: Option<String>,

    #[arg(long, global = true, env = "GOOGLE_SEARCH_CUSTOM_SEARCH_ENGINE_ID")]
    pub search_engine_id: Option<String>,

    #[arg(long, global = true, env = "GOOGLE_SEARCH_API_KEY", hide_env_values = true)]
    pub search_api_key: Option<String>,

    #[arg(long, global = true, env = "AI_PROVIDER_API_KEY", hide_env_values = true)]
    pub assistant_api_key: Option<String>,
}

/// Fully resolved configuration
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub root_folder: PathBuf,
    pub cache_path: PathBuf,
    pub port: u16,
    pub barcode_reader: PathBuf,
    pub webapp_base_url: String,
    pub announce_url: Option<String>,
    pub todoist_token: Option<String>,
    pub todoist_project_id: Option<String>,
    pub search: Option<SearchCredentials>,
    pub assistant_api_key: Option<String>,
    pub assistant_base_url: Option<String>,
    pub assistant_model: Option<String>,
}

impl ScannerConfig {
    /// Merge CLI/env values over TOML values over defaults
    ///
    /// Creates the root folder if it is missing.
    pub fn resolve(args: GlobalArgs, toml_config: TomlConfig) -> Result<Self> {
        let root_folder = resolve_root_folder(args.root_folder.as_deref(), &toml_config);
        let cache_path = ensure_root_folder(&root_folder)?;

        let port = args.port.or(toml_config.port).unwrap_or(DEFAULT_PORT);

        let barcode_reader = args
            .barcode_reader
            .or(toml_config.barcode_reader)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BARCODE_READER));

        let webapp_base_url = non_empty(args.webapp_base_url)
            .or(non_empty(toml_config.webapp_base_url))
            .unwrap_or_else(|| format!("http://localhost:{}", port));

        let search_engine_id = non_empty(args.search_engine_id).or(non_empty(toml_config.search.engine_id));
        let search_api_key = non_empty(args.search_api_key).or(non_empty(toml_config.search.api_key));
        let search = match (search_engine_id, search_api_key) {
            (Some(engine_id), Some(api_key)) => Some(SearchCredentials { engine_id, api_key }),
            _ => None,
        };

        let assistant_api_key = non_empty(args.assistant_api_key)
            .or_else(|| non_empty(std::env::var(FALLBACK_ASSISTANT_KEY_VAR).ok()))
            .or(non_empty(toml_config.assistant.api_key));

        Ok(Self {
            root_folder,
            cache_path,
            port,
            barcode_reader,
            webapp_base_url,
            announce_url: non_empty(args.announce_url).or(non_empty(toml_config.announce_url)),
            todoist_token: non_empty(args.todoist_token).or(non_empty(toml_config.todoist.token)),
            todoist_project_id: non_empty(args.todoist_project_id)
                .or(non_empty(toml_config.todoist.project_id)),
            search,
            assistant_api_key,
            assistant_base_url: non_empty(toml_config.assistant.base_url),
            assistant_model: non_empty(toml_config.assistant.model),
        })
    }

    /// Todoist token and project id, which every shopping list command needs
    pub fn require_todoist(&self) -> Result<(String, String)> {
        let token = self
            .todoist_token
            .clone()
            .ok_or_else(|| Error::Config("TODOIST_TOKEN is not set".to_string()))?;
        let project_id = self
            .todoist_project_id
            .clone()
            .ok_or_else(|| Error::Config("TODOIST_PROJECT_ID is not set".to_string()))?;
        Ok((token, project_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use slm_common::config::{AssistantConfig, TodoistConfig};

    fn temp_args(dir: &tempfile::TempDir) -> GlobalArgs {
        GlobalArgs {
            root_folder: Some(dir.path().join("root")),
            ..Default::default()
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        std::env::remove_var(FALLBACK_ASSISTANT_KEY_VAR);
        let dir = tempfile::tempdir().unwrap();

        let config = ScannerConfig::resolve(temp_args(&dir), TomlConfig::default()).unwrap();

        assert_eq!(config.port, 80);
        assert_eq!(config.barcode_reader, PathBuf::from("/dev/barcode-reader"));
        assert_eq!(config.webapp_base_url, "http://localhost:80");
        assert_eq!(config.cache_path, dir.path().join("root").join("barcode-db.json"));
        assert!(config.root_folder.exists());
        assert!(config.search.is_none());
        assert!(config.assistant_api_key.is_none());
    }

    #[test]
    #[serial]
    fn test_cli_values_win_over_toml() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = temp_args(&dir);
        args.port = Some(8080);
        args.todoist_project_id = Some("cli-project".into());

        let toml_config = TomlConfig {
            port: Some(9090),
            todoist: TodoistConfig {
                token: Some("toml-token".into()),
                project_id: Some("toml-project".into()),
            },
            ..Default::default()
        };

        let config = ScannerConfig::resolve(args, toml_config).unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(
            config.require_todoist().unwrap(),
            ("toml-token".to_string(), "cli-project".to_string())
        );
    }

    #[test]
    #[serial]
    fn test_search_needs_both_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = temp_args(&dir);
        args.search_api_key = Some("key".into());

        let config = ScannerConfig::resolve(args.clone(), TomlConfig::default()).unwrap();
        assert!(config.search.is_none());

        args.search_engine_id = Some("cx".into());
        let config = ScannerConfig::resolve(args, TomlConfig::default()).unwrap();
        assert_eq!(config.search.map(|s| s.engine_id), Some("cx".to_string()));
    }

    #[test]
    #[serial]
    fn test_assistant_key_falls_back_to_openai_variable() {
        let dir = tempfile::tempdir().unwrap();
        let toml_config = TomlConfig {
            assistant: AssistantConfig {
                api_key: Some("from-toml".into()),
                ..Default::default()
            },
            ..Default::default()
        };

        std::env::set_var(FALLBACK_ASSISTANT_KEY_VAR, "from-env");
        let config = ScannerConfig::resolve(temp_args(&dir), toml_config.clone()).unwrap();
        assert_eq!(config.assistant_api_key.as_deref(), Some("from-env"));

        std::env::remove_var(FALLBACK_ASSISTANT_KEY_VAR);
        let config = ScannerConfig::resolve(temp_args(&dir), toml_config).unwrap();
        assert_eq!(config.assistant_api_key.as_deref(), Some("from-toml"));
    }

    #[test]
    #[serial]
    fn test_missing_todoist_settings_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = ScannerConfig::resolve(temp_args(&dir), TomlConfig::default()).unwrap();

        match config.require_todoist() {
            Err(Error::Config(msg)) => assert!(msg.contains("TODOIST_TOKEN")),
            other => panic!("expected config error, got {other:?}"),
        }
    }
}
