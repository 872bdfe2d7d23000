// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Promstash Contributors
#![allow(clippy::unwrap_used)]

use promstash_config::{
    Config, ConfigError, ConfigFormat, ConfigLoader, NamespaceConfig, StoreConfig, Validator,
};
use std::fs;
use tempfile::TempDir;

#[tokio::test]
async fn test_load_toml_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("promstash.toml");
    fs::write(
        &path,
        r#"
[namespace]
prefix = "checkout:"
index_suffix = ":metric_keys"

[store]
backend = "redis"
url = "redis://10.1.2.3:6379/4"

[collect]
sort_metrics = false

[observability]
log_level = "debug"
log_format = "json"
"#,
    )
    .unwrap();

    let config = ConfigLoader::new().load_file(&path).await.unwrap();
    assert_eq!(config.namespace.prefix, "checkout:");
    assert_eq!(
        config.store,
        StoreConfig::Redis {
            url: "redis://10.1.2.3:6379/4".to_string()
        }
    );
    assert!(!config.collect.sort_metrics);
    assert_eq!(config.observability.log_format, "json");
}

#[tokio::test]
async fn test_load_yaml_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("promstash.yml");
    fs::write(
        &path,
        "namespace:\n  prefix: \"jobs:\"\nstore:\n  backend: memory\n",
    )
    .unwrap();

    let config = ConfigLoader::new().load_file(&path).await.unwrap();
    assert_eq!(config.namespace.prefix, "jobs:");
    assert_eq!(config.namespace.index_suffix, ":metric_keys");
    assert_eq!(config.store, StoreConfig::Memory);
}

#[tokio::test]
async fn test_load_json_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("promstash.json");
    fs::write(&path, r#"{"store": {"backend": "memory"}}"#).unwrap();

    let config = ConfigLoader::new().load_file(&path).await.unwrap();
    assert_eq!(config.store, StoreConfig::Memory);
    assert!(config.collect.sort_metrics);
}

#[tokio::test]
async fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let result = ConfigLoader::new()
        .load_file(dir.path().join("absent.toml"))
        .await;
    assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
}

#[tokio::test]
async fn test_unsupported_extension() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("promstash.ini");
    fs::write(&path, "prefix=x").unwrap();

    let result = ConfigLoader::new().load_file(&path).await;
    assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
}

#[tokio::test]
async fn test_malformed_toml() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("promstash.toml");
    fs::write(&path, "[namespace\nprefix = ").unwrap();

    let result = ConfigLoader::new().load_file(&path).await;
    assert!(matches!(result, Err(ConfigError::TomlParseError(_))));
}

#[tokio::test]
async fn test_invalid_file_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("promstash.toml");
    fs::write(&path, "[store]\nbackend = \"redis\"\nurl = \"http://nope\"\n").unwrap();

    let result = ConfigLoader::new().load_file(&path).await;
    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
}

#[tokio::test]
async fn test_save_and_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("promstash.toml");

    let config = Config {
        namespace: NamespaceConfig {
            prefix: "edge:".to_string(),
            ..NamespaceConfig::default()
        },
        store: StoreConfig::Memory,
        ..Config::default()
    };
    config.save(&path).unwrap();

    let loaded = ConfigLoader::new().load_file(&path).await.unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_format_from_string_matches_file_extension() {
    let loader = ConfigLoader::new();
    let config = loader
        .load_from_string("{}", ConfigFormat::Json)
        .unwrap();
    assert_eq!(config, Config::default());
    assert!(config.validate().is_ok());
}
