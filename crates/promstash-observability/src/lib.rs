//! Promstash Observability Module
//!
//! Structured logging setup shared by the promstash binaries.
//!
//! # Features
//!
//! - **Multiple Output Formats**: Pretty, compact and JSON output
//! - **Scoped Filtering**: a plain level applies to the promstash crates while
//!   dependencies stay at `warn`; full `RUST_LOG`-style directives also work
//! - **Stderr by Default**: stdout stays free for command output
//!
//! # Example
//!
//! ```ignore
//! use promstash_observability::{init_tracing, LogFormat};
//!
//! fn main() -> Result<(), promstash_observability::LogError> {
//!     init_tracing(LogFormat::Pretty, None)?;
//!     tracing::info!("collector started");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod initialization;

pub use config::{LogConfig, LogError, LogFormat, LogOutput, PROMSTASH_TARGETS};
pub use initialization::{init_tracing, init_tracing_with_config};
