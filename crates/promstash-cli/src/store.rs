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

//! Store and engine construction from configuration

use anyhow::{Context, Result};
use promstash_config::{Config, StoreConfig};
use promstash_metrics::{KeyScheme, MetricsEngine};
use promstash_store::{MemoryStore, MetricStore, RedisStore};
use std::sync::Arc;
use tracing::debug;

/// Open the store backend named by `config`
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn MetricStore>> {
    match config {
        StoreConfig::Memory => {
            debug!("Using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreConfig::Redis { url } => {
            let store = RedisStore::connect(url)
                .await
                .with_context(|| format!("failed to connect to redis at {}", url))?;
            debug!(endpoint = %store.endpoint(), "Connected to redis store");
            Ok(Arc::new(store))
        }
    }
}

/// Everything a command needs: the loaded configuration and an engine over
/// the configured store and namespace
#[derive(Debug, Clone)]
pub struct Session {
    /// Effective configuration
    pub config: Config,
    /// Engine over the configured store
    pub engine: MetricsEngine,
}

impl Session {
    /// Open the configured store and bind an engine to it
    pub async fn open(config: Config) -> Result<Self> {
        let store = open_store(&config.store).await?;
        Ok(Self::with_store(config, store))
    }

    /// Bind an engine over an already opened store
    pub fn with_store(config: Config, store: Arc<dyn MetricStore>) -> Self {
        let keys = KeyScheme::new(
            config.namespace.prefix.clone(),
            config.namespace.index_suffix.clone(),
        );
        let engine = MetricsEngine::new(store, keys);
        Session { config, engine }
    }

    /// Whether values written in this session outlive the process
    pub fn is_persistent(&self) -> bool {
        !matches!(self.config.store, StoreConfig::Memory)
    }
}
