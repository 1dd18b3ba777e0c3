//! Unit tests for configuration and graceful degradation
//!
//! Tests:
//! - Root folder priority order (CLI → ENV → TOML → default)
//! - Directory layout creation on first run
//! - TOML parsing with missing fields and atomic write-back
//!
//! Tests that manipulate CATCHLOG_ROOT_FOLDER are marked with #[serial]
//! so they run sequentially, not in parallel.

use catchlog_common::config::{
    load_toml_config, write_toml_config, LoggingConfig, RootFolderInitializer,
    RootFolderResolver, TomlConfig, ROOT_FOLDER_ENV,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;

#[test]
#[serial]
fn test_cli_argument_wins_over_environment() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/from-env");

    let resolver = RootFolderResolver::new("test")
        .with_cli_arg(Some(PathBuf::from("/tmp/from-cli")));
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/from-cli"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_environment_wins_over_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/from-env");

    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/from-toml")),
        ..Default::default()
    };
    let resolver = RootFolderResolver::new("test").with_toml(&toml);
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/from-env"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_toml_used_when_no_cli_or_env() {
    env::remove_var(ROOT_FOLDER_ENV);

    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/from-toml")),
        ..Default::default()
    };
    let resolver = RootFolderResolver::new("test").with_toml(&toml);
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/from-toml"));
}

#[test]
#[serial]
fn test_resolver_with_no_overrides_uses_default() {
    env::remove_var(ROOT_FOLDER_ENV);

    let resolved = RootFolderResolver::new("test").resolve();
    assert!(
        resolved.to_string_lossy().contains("catchlog"),
        "default root should be a catchlog folder, got {}",
        resolved.display()
    );
}

#[test]
fn test_initializer_creates_images_folder() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path().join("catchlog-root");

    let initializer = RootFolderInitializer::new(root.clone());
    initializer.ensure_directory_exists().unwrap();

    assert!(root.is_dir());
    assert!(initializer.images_path().is_dir());
    assert_eq!(initializer.database_path(), root.join("catchlog.db"));
}

#[test]
fn test_toml_missing_fields_use_defaults() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("catchlog.toml");
    std::fs::write(&path, "gemini_model = \"gemini-1.5-flash\"\n").unwrap();

    let config = load_toml_config(&path).unwrap();
    assert_eq!(config.gemini_model.as_deref(), Some("gemini-1.5-flash"));
    assert_eq!(config.gemini_api_key, None);
    assert_eq!(config.logging, LoggingConfig::default());
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_malformed_toml_is_config_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("catchlog.toml");
    std::fs::write(&path, "root_folder = [not toml").unwrap();

    let result = load_toml_config(&path);
    assert!(matches!(result, Err(catchlog_common::Error::Config(_))));
}

#[test]
fn test_write_then_load_preserves_values() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("nested").join("catchlog.toml");

    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/srv/catchlog")),
        gemini_api_key: Some("key-123".to_string()),
        gemini_model: None,
        logging: LoggingConfig {
            level: "debug".to_string(),
        },
    };

    write_toml_config(&config, &path).unwrap();
    assert!(!path.with_extension("toml.tmp").exists());
    assert_eq!(load_toml_config(&path).unwrap(), config);
}
