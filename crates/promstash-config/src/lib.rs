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
//! Configuration management for promstash
//!
//! Settings shared by every process that writes into the same metrics store:
//! the key namespace, the store backend, collection options and logging.
//!
//! # Features
//!
//! - Multi-format configuration support (TOML, YAML, JSON)
//! - Environment variable overrides with `PROMSTASH_` prefix
//! - Validation with the offending field named in the error
//!
//! # Example
//!
//! ```no_run
//! use promstash_config::ConfigLoader;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let loader = ConfigLoader::new();
//!     let config = loader.load_with_overrides("promstash.toml").await?;
//!
//!     println!("Key prefix: {}", config.namespace.prefix);
//!     println!("Store backend: {}", config.store.backend_name());
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

// Re-export commonly used items
pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigFormat, ConfigLoader};
pub use schema::*;
pub use validation::Validator;
