//! Tests for bootstrap configuration and root folder resolution
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate BOOKFACTORY_ROOT or the API key variables are
//! marked with #[serial].

use bf_common::config::{
    is_valid_key, resolve_root_folder, BootstrapConfig, UnknownMethodPolicy, DATABASE_FILE_NAME,
    ROOT_FOLDER_ENV,
};
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};

#[test]
fn test_defaults_without_file() {
    let config = BootstrapConfig::default();
    assert_eq!(config.port, 5731);
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.llm.max_tokens, 2000);
    assert!(config.llm.api_key.is_none());
    assert_eq!(config.resolution.unknown_method, UnknownMethodPolicy::Resolve);
}

#[test]
fn test_partial_toml_keeps_defaults() {
    let config = BootstrapConfig::from_toml_str(
        r#"
        port = 6000

        [llm]
        model = "claude-test"
        "#,
    )
    .unwrap();

    assert_eq!(config.port, 6000);
    assert_eq!(config.llm.model, "claude-test");
    assert_eq!(config.llm.max_tokens, 2000);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_reject_policy_parses() {
    let config = BootstrapConfig::from_toml_str(
        r#"
        [resolution]
        unknown_method = "reject"
        "#,
    )
    .unwrap();
    assert_eq!(config.resolution.unknown_method, UnknownMethodPolicy::Reject);
}

#[test]
fn test_invalid_toml_is_config_error() {
    let err = BootstrapConfig::from_toml_str("port = \"not a number\"").unwrap_err();
    assert!(err.to_string().contains("Configuration error"));
}

#[test]
fn test_load_explicit_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "port = 7001").unwrap();
    writeln!(file, "[logging]").unwrap();
    writeln!(file, "level = \"debug\"").unwrap();

    let config = BootstrapConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.port, 7001);
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_load_missing_explicit_file_fails() {
    let result = BootstrapConfig::load(Some(Path::new("/nonexistent/bookfactory.toml")));
    assert!(result.is_err());
}

#[test]
fn test_explicit_database_path_wins() {
    let config = BootstrapConfig {
        database_path: Some(PathBuf::from("/tmp/custom.db")),
        ..BootstrapConfig::default()
    };
    assert_eq!(
        config.database_path(Some(Path::new("/ignored"))),
        PathBuf::from("/tmp/custom.db")
    );
}

#[test]
#[serial]
fn test_cli_root_beats_environment() {
    env::set_var(ROOT_FOLDER_ENV, "/from/env");
    let root = resolve_root_folder(Some(Path::new("/from/cli")), ROOT_FOLDER_ENV, None);
    env::remove_var(ROOT_FOLDER_ENV);

    assert_eq!(root, PathBuf::from("/from/cli"));
}

#[test]
#[serial]
fn test_environment_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/from/env");
    let root = resolve_root_folder(None, ROOT_FOLDER_ENV, Some(Path::new("/from/toml")));
    env::remove_var(ROOT_FOLDER_ENV);

    assert_eq!(root, PathBuf::from("/from/env"));
}

#[test]
#[serial]
fn test_database_path_uses_root_folder() {
    env::remove_var(ROOT_FOLDER_ENV);
    let config = BootstrapConfig {
        root_folder: Some(PathBuf::from("/srv/books")),
        ..BootstrapConfig::default()
    };
    assert_eq!(
        config.database_path(None),
        PathBuf::from("/srv/books").join(DATABASE_FILE_NAME)
    );
}

#[test]
#[serial]
fn test_api_key_environment_beats_toml() {
    env::remove_var("BOOKFACTORY_ANTHROPIC_API_KEY");
    env::set_var("ANTHROPIC_API_KEY", "env-key");

    let mut config = BootstrapConfig::default();
    config.llm.api_key = Some("toml-key".to_string());
    let key = config.resolve_api_key();

    env::remove_var("ANTHROPIC_API_KEY");
    assert_eq!(key.as_deref(), Some("env-key"));
}

#[test]
#[serial]
fn test_api_key_blank_values_ignored() {
    env::remove_var("BOOKFACTORY_ANTHROPIC_API_KEY");
    env::set_var("ANTHROPIC_API_KEY", "   ");

    let mut config = BootstrapConfig::default();
    config.llm.api_key = Some("toml-key".to_string());
    let key = config.resolve_api_key();

    env::remove_var("ANTHROPIC_API_KEY");
    assert_eq!(key.as_deref(), Some("toml-key"));
    assert!(!is_valid_key(""));
}
