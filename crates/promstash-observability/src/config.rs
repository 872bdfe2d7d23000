//! Configuration for structured logging.
//!
//! Output format, filter level and layout switches for the tracing
//! subscriber. A plain level such as `debug` applies to the promstash crates
//! only; third-party crates stay at `warn`. Full `EnvFilter` directives are
//! used verbatim.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::str::FromStr;
use thiserror::Error;

/// Crates whose events a plain level applies to
pub const PROMSTASH_TARGETS: [&str; 5] = [
    "promstash",
    "promstash_metrics",
    "promstash_store",
    "promstash_config",
    "promstash_observability",
];

/// Errors that can occur during logging configuration
#[derive(Error, Debug)]
pub enum LogError {
    /// Unknown output format name
    #[error("Invalid log format: {0}")]
    InvalidFormat(String),

    /// Filter directive rejected by `EnvFilter`
    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidFilter {
        /// Directive as given
        filter: String,
        /// Parser message
        reason: String,
    },

    /// A global subscriber is already installed
    #[error("Tracing already initialized: {0}")]
    AlreadyInitialized(String),

    /// IO failure
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

/// Output format for logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, human-readable output
    #[default]
    Pretty,

    /// Single-line output
    Compact,

    /// One JSON object per event
    Json,
}

impl LogFormat {
    /// Format name as used in configuration files
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Pretty => "pretty",
            LogFormat::Compact => "compact",
            LogFormat::Json => "json",
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogFormat {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            _ => Err(LogError::InvalidFormat(format!(
                "Unknown format: {}. Expected one of: pretty, compact, json",
                s
            ))),
        }
    }
}

/// Log output destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    /// Write to standard error
    Stderr,

    /// Write to standard output
    Stdout,
}

/// Configuration for logging
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Output format for logs
    pub format: LogFormat,

    /// Level or filter directive; falls back to `RUST_LOG`, then `info`
    pub level: Option<String>,

    /// Whether to use ANSI colors (Pretty and Compact only)
    pub use_color: bool,

    /// Whether to include timestamps
    pub use_timestamps: bool,

    /// Whether to include thread IDs
    pub include_thread_ids: bool,

    /// Whether to include event targets
    pub include_targets: bool,

    /// Output destination (stderr by default, keeping stdout for command output)
    pub output: LogOutput,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            format: LogFormat::Pretty,
            level: None,
            use_color: true,
            use_timestamps: true,
            include_thread_ids: false,
            include_targets: true,
            output: LogOutput::Stderr,
        }
    }
}

impl LogConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration for a command-line run
    ///
    /// `quiet` wins over `verbose`; each `verbose` step raises the level from
    /// `base` to `debug`, then `trace`.
    pub fn for_cli(base: &str, verbose: u8, quiet: bool) -> Self {
        let level = if quiet {
            "error"
        } else {
            match verbose {
                0 => base,
                1 => "debug",
                _ => "trace",
            }
        };
        LogConfig::new().with_level(level).with_thread_ids(verbose > 1)
    }

    /// Set the output format
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the log level or filter directive
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    /// Enable or disable color output
    pub fn with_color(mut self, use_color: bool) -> Self {
        self.use_color = use_color;
        self
    }

    /// Enable or disable timestamps
    pub fn with_timestamps(mut self, use_timestamps: bool) -> Self {
        self.use_timestamps = use_timestamps;
        self
    }

    /// Enable or disable thread IDs
    pub fn with_thread_ids(mut self, include_thread_ids: bool) -> Self {
        self.include_thread_ids = include_thread_ids;
        self
    }

    /// Enable or disable target names
    pub fn with_targets(mut self, include_targets: bool) -> Self {
        self.include_targets = include_targets;
        self
    }

    /// Set the output destination
    pub fn with_output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    /// Get the effective log level from config or environment
    pub fn get_effective_level(&self) -> String {
        self.level
            .clone()
            .or_else(|| std::env::var("RUST_LOG").ok())
            .unwrap_or_else(|| "info".to_string())
    }

    /// Filter directive handed to `EnvFilter`
    pub fn filter_directive(&self) -> String {
        let level = self.get_effective_level();
        if level.contains('=') || level.contains(',') {
            return level;
        }
        let mut directive = String::from("warn");
        for target in PROMSTASH_TARGETS {
            directive.push_str(&format!(",{}={}", target, level));
        }
        directive
    }
}
