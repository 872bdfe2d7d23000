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

//! Logging initialization and setup.
//!
//! Installs the global tracing subscriber. Only the first successful call in
//! a process takes effect; later calls return [`LogError::AlreadyInitialized`].

use crate::config::{LogConfig, LogError, LogFormat, LogOutput};
use std::io;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Initialize tracing with the specified format and optional log level.
///
/// # Example
///
/// ```ignore
/// use promstash_observability::{init_tracing, LogFormat};
///
/// fn main() {
///     init_tracing(LogFormat::Compact, Some("debug")).unwrap();
///     tracing::info!("collector started");
/// }
/// ```
pub fn init_tracing(format: LogFormat, level: Option<&str>) -> Result<(), LogError> {
    let mut config = LogConfig::new().with_format(format);
    if let Some(level) = level {
        config = config.with_level(level);
    }
    init_tracing_with_config(&config)
}

/// Initialize tracing with a detailed configuration.
///
/// # Example
///
/// ```ignore
/// use promstash_observability::{init_tracing_with_config, LogConfig, LogFormat};
///
/// fn main() {
///     let config = LogConfig::new()
///         .with_format(LogFormat::Json)
///         .with_level("promstash_metrics=trace")
///         .with_timestamps(true);
///
///     init_tracing_with_config(&config).unwrap();
/// }
/// ```
pub fn init_tracing_with_config(config: &LogConfig) -> Result<(), LogError> {
    let env_filter = build_env_filter(config)?;
    let registry = Registry::default().with(env_filter);
    let writer = get_writer(config.output);

    let installed = match config.format {
        LogFormat::Pretty => {
            let layer = fmt::layer()
                .with_writer(writer)
                .with_target(config.include_targets)
                .with_thread_ids(config.include_thread_ids)
                .with_ansi(config.use_color)
                .with_span_events(FmtSpan::NONE)
                .pretty();

            if config.use_timestamps {
                registry.with(layer.with_timer(fmt::time::SystemTime)).try_init()
            } else {
                registry.with(layer.without_time()).try_init()
            }
        }
        LogFormat::Compact => {
            let layer = fmt::layer()
                .with_writer(writer)
                .with_target(config.include_targets)
                .with_thread_ids(config.include_thread_ids)
                .with_ansi(config.use_color)
                .with_span_events(FmtSpan::NONE)
                .compact();

            if config.use_timestamps {
                registry.with(layer.with_timer(fmt::time::SystemTime)).try_init()
            } else {
                registry.with(layer.without_time()).try_init()
            }
        }
        LogFormat::Json => {
            let layer = fmt::layer()
                .with_writer(writer)
                .json()
                .with_target(config.include_targets)
                .with_thread_ids(config.include_thread_ids)
                .with_span_events(FmtSpan::CLOSE);

            if config.use_timestamps {
                registry.with(layer.with_timer(fmt::time::SystemTime)).try_init()
            } else {
                registry.with(layer.without_time()).try_init()
            }
        }
    };

    installed.map_err(|e| LogError::AlreadyInitialized(e.to_string()))
}

/// Get the writer for the specified output
fn get_writer(output: LogOutput) -> fn() -> Box<dyn io::Write + Send> {
    match output {
        LogOutput::Stderr => || Box::new(io::stderr()),
        LogOutput::Stdout => || Box::new(io::stdout()),
    }
}

/// Build an environment filter for the given configuration
fn build_env_filter(config: &LogConfig) -> Result<EnvFilter, LogError> {
    let directive = config.filter_directive();

    EnvFilter::try_new(&directive).map_err(|e| LogError::InvalidFilter {
        filter: directive.clone(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Installing the global subscriber is a once-per-process operation; see
    // tests/integration_tests.rs.

    #[test]
    fn test_env_filter_parsing() {
        assert!(build_env_filter(&LogConfig::new().with_level("debug")).is_ok());
        assert!(build_env_filter(&LogConfig::new().with_level("info,redis=warn")).is_ok());
    }

    #[test]
    fn test_invalid_filter_rejected() {
        let result = build_env_filter(&LogConfig::new().with_level("promstash=loud,"));
        assert!(matches!(result, Err(LogError::InvalidFilter { .. })));
    }
}
