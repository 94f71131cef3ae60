//! Tests for bootstrap configuration loading
//!
//! Covers partial TOML files, unknown keys, optional config files and root
//! folder creation.

use slm_common::config::{ensure_root_folder, TomlConfig, CACHE_FILE_NAME};
use std::path::PathBuf;

#[test]
fn test_partial_toml_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
port = 8080

[todoist]
token = "secret"
project_id = "12345"
"#,
    )
    .unwrap();

    let config = TomlConfig::from_file(&path).unwrap();
    assert_eq!(config.port, Some(8080));
    assert_eq!(config.todoist.token.as_deref(), Some("secret"));
    assert_eq!(config.todoist.project_id.as_deref(), Some("12345"));
    assert!(config.search.api_key.is_none());
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_unknown_key_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "prot = 8080\n").unwrap();

    let err = TomlConfig::from_file(&path).unwrap_err();
    assert!(err.to_string().contains("Parse"), "unexpected error: {err}");
}

#[test]
fn test_missing_file_is_config_error() {
    let err = TomlConfig::from_file(&PathBuf::from("/nonexistent/slm/config.toml")).unwrap_err();
    assert!(matches!(err, slm_common::Error::Config(_)));
}

#[test]
fn test_no_config_file_gives_defaults() {
    let config = TomlConfig::load_optional(None).unwrap();
    assert!(config.barcode_reader.is_none());
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_found_config_file_is_parsed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[logging]\nlevel = \"debug\"\n").unwrap();

    let config = TomlConfig::load_optional(Some(path.as_path())).unwrap();
    assert_eq!(config.logging.level, "debug");

    std::fs::write(&path, "[logging\n").unwrap();
    assert!(TomlConfig::load_optional(Some(path.as_path())).is_err());
}

#[test]
fn test_ensure_root_folder_creates_directory() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("data");

    let cache_path = ensure_root_folder(&root).unwrap();

    assert!(root.is_dir());
    assert_eq!(cache_path, root.join(CACHE_FILE_NAME));
}
