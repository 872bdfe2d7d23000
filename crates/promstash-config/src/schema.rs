use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// Key namespace shared by every process writing to the same store
    pub namespace: NamespaceConfig,

    /// Store backend
    pub store: StoreConfig,

    /// Collection settings
    pub collect: CollectConfig,

    /// Logging settings
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Serialize to pretty TOML
    pub fn to_toml(&self) -> crate::ConfigResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| crate::ConfigError::SerializationError(e.to_string()))
    }

    /// Write the configuration as TOML, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> crate::ConfigResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }
}

/// Key namespace settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NamespaceConfig {
    /// Prefix of every key the engine writes
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Suffix of the per-type index set keys
    #[serde(default = "default_index_suffix")]
    pub index_suffix: String,
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        NamespaceConfig {
            prefix: default_prefix(),
            index_suffix: default_index_suffix(),
        }
    }
}

/// Store backend configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "backend")]
pub enum StoreConfig {
    /// Process-local store
    #[serde(rename = "memory")]
    Memory,

    /// Shared Redis server
    #[serde(rename = "redis")]
    Redis {
        /// Connection URL (`redis://`, `rediss://` or `unix://`)
        #[serde(default = "default_redis_url")]
        url: String,
    },
}

impl StoreConfig {
    /// Backend name as used in configuration files
    pub fn backend_name(&self) -> &'static str {
        match self {
            StoreConfig::Memory => "memory",
            StoreConfig::Redis { .. } => "redis",
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Redis {
            url: default_redis_url(),
        }
    }
}

/// Collection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectConfig {
    /// Sort counter and gauge samples by label values
    #[serde(default = "default_true")]
    pub sort_metrics: bool,
}

impl Default for CollectConfig {
    fn default() -> Self {
        CollectConfig {
            sort_metrics: true,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObservabilityConfig {
    /// Logging level or filter directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format (pretty, compact, json)
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        ObservabilityConfig {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_prefix() -> String {
    "prometheus:".to_string()
}

fn default_index_suffix() -> String {
    ":metric_keys".to_string()
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.namespace.prefix, "prometheus:");
        assert_eq!(config.namespace.index_suffix, ":metric_keys");
        assert_eq!(config.store.backend_name(), "redis");
        assert!(config.collect.sort_metrics);
        assert_eq!(config.observability.log_level, "info");
        assert_eq!(config.observability.log_format, "pretty");
    }

    #[test]
    fn test_store_tagging() {
        let memory: StoreConfig = serde_json::from_str(r#"{"backend":"memory"}"#).unwrap();
        assert_eq!(memory, StoreConfig::Memory);

        let redis: StoreConfig = serde_json::from_str(r#"{"backend":"redis"}"#).unwrap();
        assert_eq!(
            redis,
            StoreConfig::Redis {
                url: "redis://127.0.0.1:6379".to_string()
            }
        );

        assert!(serde_json::from_str::<StoreConfig>(r#"{"backend":"etcd"}"#).is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = Config {
            namespace: NamespaceConfig {
                prefix: "app:".to_string(),
                ..NamespaceConfig::default()
            },
            store: StoreConfig::Memory,
            ..Config::default()
        };

        let text = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
