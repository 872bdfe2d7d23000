//! Metrics engine entry point

use crate::error::{MetricsError, MetricsResult};
use crate::keys::KeyScheme;
use crate::types::{MetricMeta, MetricUpdate};
use promstash_store::MetricStore;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Stateless engine persisting metric updates into a shared store
///
/// Holds no per-metric state of its own: every update is one store
/// transaction, and every collect reads the store from scratch. Any number of
/// engines, in any number of processes, can share one store.
///
/// # Example
///
/// ```rust,no_run
/// use promstash_metrics::{KeyScheme, MetricUpdate, MetricsEngine, ScalarUpdate, UpdateCommand};
/// use promstash_store::MemoryStore;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let engine = MetricsEngine::new(Arc::new(MemoryStore::new()), KeyScheme::default());
///
///     engine
///         .update(&MetricUpdate::Counter(ScalarUpdate {
///             name: "jobs_total".to_string(),
///             help: "Processed jobs".to_string(),
///             label_names: vec!["queue".to_string()],
///             label_values: vec!["default".to_string()],
///             command: UpdateCommand::IncrementInteger,
///             value: 1.0,
///         }))
///         .await?;
///
///     for family in engine.collect(true).await? {
///         println!("{} has {} samples", family.name, family.samples.len());
///     }
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct MetricsEngine {
    pub(crate) store: Arc<dyn MetricStore>,
    pub(crate) keys: KeyScheme,
}

impl MetricsEngine {
    /// Create an engine over `store` using the `keys` layout
    pub fn new(store: Arc<dyn MetricStore>, keys: KeyScheme) -> Self {
        info!(
            prefix = %keys.prefix(),
            index_suffix = %keys.index_suffix(),
            "metrics engine initialized"
        );
        MetricsEngine { store, keys }
    }

    /// Key layout in use
    pub fn keys(&self) -> &KeyScheme {
        &self.keys
    }

    /// Underlying store
    pub fn store(&self) -> &Arc<dyn MetricStore> {
        &self.store
    }

    /// Apply one update
    ///
    /// # Errors
    ///
    /// Input errors (`InvalidCommand`, `Encoding`, `LabelArity`,
    /// `InvalidSeries`, `InvalidValue`) are raised before the store is
    /// touched. Store failures surface as `Storage` and are not retried.
    pub async fn update(&self, update: &MetricUpdate) -> MetricsResult<()> {
        debug!(kind = %update.kind(), name = %update.name(), "metric update");
        match update {
            MetricUpdate::Counter(u) => self.update_counter(u).await.map(|_| ()),
            MetricUpdate::Gauge(u) => self.update_gauge(u).await.map(|_| ()),
            MetricUpdate::Histogram(o) => self.update_histogram(o).await,
            MetricUpdate::Summary(o) => self.update_summary(o).await,
        }
    }

    /// Delete every key under the namespace prefix
    ///
    /// Returns the number of deleted keys.
    pub async fn wipe(&self) -> MetricsResult<u64> {
        let deleted = self
            .store
            .delete_matching(&self.keys.namespace_pattern())
            .await?;
        info!(prefix = %self.keys.prefix(), deleted, "metric storage wiped");
        Ok(deleted)
    }

    pub(crate) fn meta_json(meta: &MetricMeta) -> MetricsResult<String> {
        serde_json::to_string(meta).map_err(|e| MetricsError::encoding(e.to_string()))
    }
}

impl fmt::Debug for MetricsEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsEngine")
            .field("store", &self.store)
            .field("keys", &self.keys)
            .finish()
    }
}

pub(crate) fn check_name(name: &str) -> MetricsResult<()> {
    if name.is_empty() {
        return Err(MetricsError::invalid_series(name, "metric name cannot be empty"));
    }
    Ok(())
}

pub(crate) fn check_arity(
    name: &str,
    label_names: &[String],
    label_values: &[String],
) -> MetricsResult<()> {
    if label_names.len() != label_values.len() {
        return Err(MetricsError::LabelArity {
            name: name.to_string(),
            expected: label_names.len(),
            actual: label_values.len(),
        });
    }
    Ok(())
}

pub(crate) fn check_finite(name: &str, value: f64) -> MetricsResult<()> {
    if !value.is_finite() {
        return Err(MetricsError::invalid_value(
            name,
            format!("{} is not a finite number", value),
        ));
    }
    Ok(())
}

pub(crate) fn check_buckets(name: &str, buckets: &[f64]) -> MetricsResult<()> {
    if buckets.is_empty() {
        return Err(MetricsError::invalid_series(
            name,
            "histogram needs at least one bucket",
        ));
    }
    if buckets.iter().any(|b| !b.is_finite()) {
        return Err(MetricsError::invalid_series(
            name,
            "bucket boundaries must be finite; +Inf is implicit",
        ));
    }
    if buckets.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(MetricsError::invalid_series(
            name,
            "bucket boundaries must be strictly ascending",
        ));
    }
    Ok(())
}

pub(crate) fn check_quantiles(name: &str, quantiles: &[f64]) -> MetricsResult<()> {
    if quantiles.is_empty() {
        return Err(MetricsError::invalid_series(
            name,
            "summary needs at least one quantile",
        ));
    }
    if quantiles.iter().any(|q| !(0.0..=1.0).contains(q)) {
        return Err(MetricsError::invalid_series(
            name,
            "quantiles must lie within [0, 1]",
        ));
    }
    if quantiles.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(MetricsError::invalid_series(
            name,
            "quantiles must be strictly ascending",
        ));
    }
    Ok(())
}

pub(crate) fn check_max_age(name: &str, max_age_seconds: u64) -> MetricsResult<()> {
    if max_age_seconds == 0 {
        return Err(MetricsError::invalid_series(
            name,
            "max age must be at least one second",
        ));
    }
    Ok(())
}
