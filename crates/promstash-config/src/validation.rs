use crate::error::{ConfigError, ConfigResult};
use crate::schema::*;

/// Validator for configuration settings
pub trait Validator {
    /// Check the settings, reporting the first offending field
    fn validate(&self) -> ConfigResult<()>;
}

impl Validator for Config {
    fn validate(&self) -> ConfigResult<()> {
        self.namespace.validate()?;
        self.store.validate()?;
        self.observability.validate()?;
        Ok(())
    }
}

impl Validator for NamespaceConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.index_suffix.is_empty() {
            return Err(ConfigError::MissingRequired(
                "namespace.index_suffix".to_string(),
            ));
        }

        // Braces would open a second hash tag inside the key
        for (field, value) in [
            ("namespace.prefix", &self.prefix),
            ("namespace.index_suffix", &self.index_suffix),
        ] {
            if value.contains(['{', '}']) {
                return Err(ConfigError::invalid_value(
                    field,
                    format!("must not contain '{{' or '}}', got {}", value),
                ));
            }
        }

        Ok(())
    }
}

impl Validator for StoreConfig {
    fn validate(&self) -> ConfigResult<()> {
        match self {
            StoreConfig::Memory => Ok(()),
            StoreConfig::Redis { url } => {
                if url.is_empty() {
                    return Err(ConfigError::MissingRequired("store.url".to_string()));
                }

                let valid_schemes = ["redis://", "rediss://", "unix://"];
                if !valid_schemes.iter().any(|scheme| url.starts_with(scheme)) {
                    return Err(ConfigError::invalid_value(
                        "store.url",
                        format!("must start with one of: {}", valid_schemes.join(", ")),
                    ));
                }

                Ok(())
            }
        }
    }
}

impl Validator for ObservabilityConfig {
    fn validate(&self) -> ConfigResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        let is_directive = self.log_level.contains('=') || self.log_level.contains(',');
        if !is_directive && !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::invalid_value(
                "observability.log_level",
                format!(
                    "must be a filter directive or one of: {}",
                    valid_levels.join(", ")
                ),
            ));
        }

        let valid_formats = ["pretty", "compact", "json"];
        if !valid_formats.contains(&self.log_format.to_lowercase().as_str()) {
            return Err(ConfigError::invalid_value(
                "observability.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        Ok(())
    }
}
