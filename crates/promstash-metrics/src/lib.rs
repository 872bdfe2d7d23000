//! Promstash Metrics Engine
//!
//! Persists counter, gauge, histogram and summary updates into a shared
//! key/value store and rebuilds them into metric families on demand.
//!
//! # Features
//!
//! - **Atomic updates**: every counter, gauge and histogram update is one
//!   store transaction, safe under any number of concurrent writers
//! - **Shared state**: many processes write to the same store; any of them
//!   can collect the combined result
//! - **Sliding-window summaries**: observations expire after the series'
//!   max age; quantiles are computed at collection time
//! - **Deterministic output**: families and samples come out in a stable order
//!
//! # Storage Layout
//!
//! See [`keys`] for the exact key format. Series hashes hold one field per
//! label combination plus a `__meta` field; each type keeps an index set of its
//! series keys.
//!
//! # Example
//!
//! ```rust,no_run
//! use promstash_metrics::{KeyScheme, MetricFactory, MetricsEngine};
//! use promstash_store::MemoryStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = MetricsEngine::new(Arc::new(MemoryStore::new()), KeyScheme::default());
//!     let factory = MetricFactory::new(engine.clone());
//!
//!     factory.counter("jobs_total", "Processed jobs", &[])?.add(1).await?;
//!
//!     let families = engine.collect(true).await?;
//!     assert_eq!(families[0].samples[0].value, 1.0);
//!
//!     engine.wipe().await?;
//!     Ok(())
//! }
//! ```

mod collect;
pub mod engine;
pub mod error;
pub mod handles;
pub mod keys;
pub mod labels;
pub mod quantile;
pub mod types;
mod update;

pub use engine::MetricsEngine;
pub use error::{MetricsError, MetricsResult};
pub use handles::{Counter, Gauge, Histogram, MetricFactory, Summary, MAX_EXACT_DELTA};
pub use keys::{KeyScheme, DEFAULT_INDEX_SUFFIX, DEFAULT_PREFIX};
pub use types::{
    HistogramObservation, MetricFamily, MetricKind, MetricMeta, MetricUpdate, Sample,
    ScalarUpdate, SummaryObservation, UpdateCommand, DEFAULT_BUCKETS, DEFAULT_MAX_AGE_SECONDS,
    DEFAULT_QUANTILES,
};
