// Promstash - Shared-store metrics engine
// Copyright (C) 2026 Promstash Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
use crate::error::{ConfigError, ConfigResult};
use crate::schema::{Config, StoreConfig};
use crate::validation::Validator;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

/// Configuration format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML document
    Toml,
    /// YAML document
    Yaml,
    /// JSON document
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("json") => Ok(ConfigFormat::Json),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => Err(ConfigError::InvalidPath(path.to_path_buf())),
        }
    }

    /// Get format name as string
    pub fn name(&self) -> &'static str {
        match self {
            ConfigFormat::Toml => "TOML",
            ConfigFormat::Yaml => "YAML",
            ConfigFormat::Json => "JSON",
        }
    }
}

/// Configuration loader
pub struct ConfigLoader {
    validate: bool,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        ConfigLoader { validate: true }
    }

    /// Create a loader without validation
    pub fn without_validation() -> Self {
        ConfigLoader { validate: false }
    }

    /// Load configuration from a file
    pub async fn load_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<Config> {
        let (content, format) = self.read_file(path.as_ref()).await?;
        self.load_from_string(&content, format)
    }

    /// Load configuration from a string
    pub fn load_from_string(&self, content: &str, format: ConfigFormat) -> ConfigResult<Config> {
        let config = parse(content, format)?;

        if self.validate {
            config.validate()?;
            debug!("Configuration validated successfully");
        }

        Ok(config)
    }

    /// Load configuration with environment variable overrides
    ///
    /// Validation runs after the overrides are applied.
    pub async fn load_with_overrides<P: AsRef<Path>>(&self, path: P) -> ConfigResult<Config> {
        let (content, format) = self.read_file(path.as_ref()).await?;
        self.finish(parse(&content, format)?)
    }

    /// Load from `path` when given, else start from defaults; either way
    /// apply environment overrides
    pub async fn load_or_default<P: AsRef<Path>>(&self, path: Option<P>) -> ConfigResult<Config> {
        match path {
            Some(path) => self.load_with_overrides(path).await,
            None => {
                debug!("No configuration file given, using defaults");
                self.finish(Config::default())
            }
        }
    }

    async fn read_file(&self, path: &Path) -> ConfigResult<(String, ConfigFormat)> {
        debug!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let format = ConfigFormat::from_path(path)?;
        let content = fs::read_to_string(path).await?;

        info!(
            "Loaded {} configuration file: {}",
            format.name(),
            path.display()
        );

        Ok((content, format))
    }

    fn finish(&self, mut config: Config) -> ConfigResult<Config> {
        self.apply_env_overrides(&mut config)?;
        if self.validate {
            config.validate()?;
        }
        Ok(config)
    }

    /// Apply `PROMSTASH_*` environment variable overrides
    pub fn apply_env_overrides(&self, config: &mut Config) -> ConfigResult<()> {
        self.apply_overrides_from(config, &|name| std::env::var(name).ok())
    }

    /// Apply overrides read through `lookup`, keyed by environment variable name
    pub fn apply_overrides_from(
        &self,
        config: &mut Config,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> ConfigResult<()> {
        // Namespace settings
        if let Some(value) = lookup("PROMSTASH_PREFIX") {
            config.namespace.prefix = value;
        }
        if let Some(value) = lookup("PROMSTASH_INDEX_SUFFIX") {
            config.namespace.index_suffix = value;
        }

        // Store settings; a URL alone implies the redis backend
        if let Some(value) = lookup("PROMSTASH_STORE") {
            config.store = match value.to_lowercase().as_str() {
                "memory" => StoreConfig::Memory,
                "redis" => match &config.store {
                    StoreConfig::Redis { url } => StoreConfig::Redis { url: url.clone() },
                    StoreConfig::Memory => StoreConfig::default(),
                },
                _ => {
                    return Err(ConfigError::env_var_parsing_error(
                        "PROMSTASH_STORE",
                        &value,
                        "expected 'memory' or 'redis'",
                    ))
                }
            };
        }
        if let Some(value) = lookup("PROMSTASH_REDIS_URL") {
            config.store = StoreConfig::Redis { url: value };
        }

        // Collection settings
        if let Some(value) = lookup("PROMSTASH_SORT_METRICS") {
            config.collect.sort_metrics = parse_bool("PROMSTASH_SORT_METRICS", &value)?;
        }

        // Observability settings
        if let Some(value) = lookup("PROMSTASH_LOG_LEVEL") {
            config.observability.log_level = value;
        }
        if let Some(value) = lookup("PROMSTASH_LOG_FORMAT") {
            config.observability.log_format = value;
        }

        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse(content: &str, format: ConfigFormat) -> ConfigResult<Config> {
    let config = match format {
        ConfigFormat::Toml => toml::from_str(content)?,
        ConfigFormat::Yaml => serde_yaml::from_str(content)?,
        ConfigFormat::Json => serde_json::from_str(content)?,
    };
    debug!("Configuration parsed as {}", format.name());
    Ok(config)
}

/// Parse boolean from string (accepts: true, false, yes, no, 1, 0, on, off)
fn parse_bool(variable_name: &str, value: &str) -> ConfigResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(ConfigError::env_var_parsing_error(
            variable_name,
            value,
            "expected 'true', 'false', 'yes', 'no', '1', '0', 'on', or 'off'",
        )),
    }
}
