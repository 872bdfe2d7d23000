//! Typed metric handles
//!
//! A [`MetricFactory`] bound to an engine hands out [`Counter`], [`Gauge`],
//! [`Histogram`] and [`Summary`] handles. Handles are cheap to clone; bind
//! label values with `with` and record through the bound copy.
//!
//! ```rust,no_run
//! use promstash_metrics::{KeyScheme, MetricFactory, MetricsEngine};
//! use promstash_store::MemoryStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = MetricsEngine::new(Arc::new(MemoryStore::new()), KeyScheme::default());
//!     let factory = MetricFactory::new(engine).with_namespace("shop");
//!
//!     let orders = factory.counter("orders_total", "Orders placed", &["channel"])?;
//!     orders.with(["web"]).add(1).await?;
//!
//!     let latency = factory.histogram("checkout_seconds", "Checkout latency", &[])?;
//!     latency.observe(0.42).await?;
//!     Ok(())
//! }
//! ```

use crate::engine::{check_buckets, check_max_age, check_name, check_quantiles, MetricsEngine};
use crate::error::{MetricsError, MetricsResult};
use crate::types::{
    HistogramObservation, ScalarUpdate, SummaryObservation, UpdateCommand, DEFAULT_BUCKETS,
    DEFAULT_MAX_AGE_SECONDS, DEFAULT_QUANTILES,
};
use std::sync::Arc;

#[derive(Debug)]
struct Descriptor {
    name: String,
    help: String,
    label_names: Vec<String>,
}

/// Creates metric handles bound to one engine
#[derive(Debug, Clone)]
pub struct MetricFactory {
    engine: MetricsEngine,
    namespace: Option<String>,
}

impl MetricFactory {
    /// Create a factory over `engine`
    pub fn new(engine: MetricsEngine) -> Self {
        MetricFactory {
            engine,
            namespace: None,
        }
    }

    /// Prefix every metric name with `<namespace>_`
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        self.namespace = (!namespace.is_empty()).then_some(namespace);
        self
    }

    fn descriptor(
        &self,
        name: &str,
        help: &str,
        label_names: &[&str],
    ) -> MetricsResult<Arc<Descriptor>> {
        check_name(name)?;
        let name = match &self.namespace {
            Some(namespace) => format!("{}_{}", namespace, name),
            None => name.to_string(),
        };
        Ok(Arc::new(Descriptor {
            name,
            help: help.to_string(),
            label_names: label_names.iter().map(|s| s.to_string()).collect(),
        }))
    }

    /// Create a counter
    pub fn counter(&self, name: &str, help: &str, label_names: &[&str]) -> MetricsResult<Counter> {
        Ok(Counter {
            engine: self.engine.clone(),
            descriptor: self.descriptor(name, help, label_names)?,
            label_values: Vec::new(),
        })
    }

    /// Create a gauge
    pub fn gauge(&self, name: &str, help: &str, label_names: &[&str]) -> MetricsResult<Gauge> {
        Ok(Gauge {
            engine: self.engine.clone(),
            descriptor: self.descriptor(name, help, label_names)?,
            label_values: Vec::new(),
        })
    }

    /// Create a histogram with the default buckets
    pub fn histogram(
        &self,
        name: &str,
        help: &str,
        label_names: &[&str],
    ) -> MetricsResult<Histogram> {
        self.histogram_with_buckets(name, help, label_names, DEFAULT_BUCKETS.to_vec())
    }

    /// Create a histogram with explicit, strictly ascending buckets
    pub fn histogram_with_buckets(
        &self,
        name: &str,
        help: &str,
        label_names: &[&str],
        buckets: Vec<f64>,
    ) -> MetricsResult<Histogram> {
        check_buckets(name, &buckets)?;
        Ok(Histogram {
            engine: self.engine.clone(),
            descriptor: self.descriptor(name, help, label_names)?,
            buckets: Arc::new(buckets),
            label_values: Vec::new(),
        })
    }

    /// Create a summary with the default quantiles and window
    pub fn summary(&self, name: &str, help: &str, label_names: &[&str]) -> MetricsResult<Summary> {
        self.summary_with(
            name,
            help,
            label_names,
            DEFAULT_QUANTILES.to_vec(),
            DEFAULT_MAX_AGE_SECONDS,
        )
    }

    /// Create a summary with explicit quantiles and window
    pub fn summary_with(
        &self,
        name: &str,
        help: &str,
        label_names: &[&str],
        quantiles: Vec<f64>,
        max_age_seconds: u64,
    ) -> MetricsResult<Summary> {
        check_quantiles(name, &quantiles)?;
        check_max_age(name, max_age_seconds)?;
        Ok(Summary {
            engine: self.engine.clone(),
            descriptor: self.descriptor(name, help, label_names)?,
            quantiles: Arc::new(quantiles),
            max_age_seconds,
            label_values: Vec::new(),
        })
    }
}

/// Largest integral delta an `f64` update carries without rounding
pub const MAX_EXACT_DELTA: u64 = 1 << 53;

fn bind<I, S>(label_values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    label_values.into_iter().map(Into::into).collect()
}

/// Counter handle
#[derive(Debug, Clone)]
pub struct Counter {
    engine: MetricsEngine,
    descriptor: Arc<Descriptor>,
    label_values: Vec<String>,
}

impl Counter {
    /// Copy of this handle bound to `label_values`
    pub fn with<I, S>(&self, label_values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Counter {
            engine: self.engine.clone(),
            descriptor: Arc::clone(&self.descriptor),
            label_values: bind(label_values),
        }
    }

    /// Metric name, including any namespace
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    async fn apply(&self, command: UpdateCommand, value: f64) -> MetricsResult<f64> {
        self.engine
            .update_counter(&ScalarUpdate {
                name: self.descriptor.name.clone(),
                help: self.descriptor.help.clone(),
                label_names: self.descriptor.label_names.clone(),
                label_values: self.label_values.clone(),
                command,
                value,
            })
            .await
    }

    /// Add an integral delta, returning the new total
    ///
    /// Deltas above [`MAX_EXACT_DELTA`] are rejected with `InvalidValue`.
    pub async fn add(&self, delta: u64) -> MetricsResult<f64> {
        if delta > MAX_EXACT_DELTA {
            return Err(MetricsError::invalid_value(
                &self.descriptor.name,
                format!("counter delta {} cannot be represented exactly", delta),
            ));
        }
        self.apply(UpdateCommand::IncrementInteger, delta as f64).await
    }

    /// Add a fractional delta, returning the new total
    pub async fn add_float(&self, delta: f64) -> MetricsResult<f64> {
        self.apply(UpdateCommand::IncrementFloat, delta).await
    }
}

/// Gauge handle
#[derive(Debug, Clone)]
pub struct Gauge {
    engine: MetricsEngine,
    descriptor: Arc<Descriptor>,
    label_values: Vec<String>,
}

impl Gauge {
    /// Copy of this handle bound to `label_values`
    pub fn with<I, S>(&self, label_values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Gauge {
            engine: self.engine.clone(),
            descriptor: Arc::clone(&self.descriptor),
            label_values: bind(label_values),
        }
    }

    /// Metric name, including any namespace
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    async fn apply(&self, command: UpdateCommand, value: f64) -> MetricsResult<f64> {
        self.engine
            .update_gauge(&ScalarUpdate {
                name: self.descriptor.name.clone(),
                help: self.descriptor.help.clone(),
                label_names: self.descriptor.label_names.clone(),
                label_values: self.label_values.clone(),
                command,
                value,
            })
            .await
    }

    /// Overwrite the value
    pub async fn set(&self, value: f64) -> MetricsResult<f64> {
        self.apply(UpdateCommand::Set, value).await
    }

    /// Add a (possibly negative) delta, returning the new value
    pub async fn add(&self, delta: f64) -> MetricsResult<f64> {
        self.apply(UpdateCommand::IncrementFloat, delta).await
    }
}

/// Histogram handle
#[derive(Debug, Clone)]
pub struct Histogram {
    engine: MetricsEngine,
    descriptor: Arc<Descriptor>,
    buckets: Arc<Vec<f64>>,
    label_values: Vec<String>,
}

impl Histogram {
    /// Copy of this handle bound to `label_values`
    pub fn with<I, S>(&self, label_values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Histogram {
            engine: self.engine.clone(),
            descriptor: Arc::clone(&self.descriptor),
            buckets: Arc::clone(&self.buckets),
            label_values: bind(label_values),
        }
    }

    /// Metric name, including any namespace
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Record one observation
    pub async fn observe(&self, value: f64) -> MetricsResult<()> {
        self.engine
            .update_histogram(&HistogramObservation {
                name: self.descriptor.name.clone(),
                help: self.descriptor.help.clone(),
                label_names: self.descriptor.label_names.clone(),
                label_values: self.label_values.clone(),
                buckets: self.buckets.to_vec(),
                value,
            })
            .await
    }
}

/// Summary handle
#[derive(Debug, Clone)]
pub struct Summary {
    engine: MetricsEngine,
    descriptor: Arc<Descriptor>,
    quantiles: Arc<Vec<f64>>,
    max_age_seconds: u64,
    label_values: Vec<String>,
}

impl Summary {
    /// Copy of this handle bound to `label_values`
    pub fn with<I, S>(&self, label_values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Summary {
            engine: self.engine.clone(),
            descriptor: Arc::clone(&self.descriptor),
            quantiles: Arc::clone(&self.quantiles),
            max_age_seconds: self.max_age_seconds,
            label_values: bind(label_values),
        }
    }

    /// Metric name, including any namespace
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Record one observation
    pub async fn observe(&self, value: f64) -> MetricsResult<()> {
        self.engine
            .update_summary(&SummaryObservation {
                name: self.descriptor.name.clone(),
                help: self.descriptor.help.clone(),
                label_names: self.descriptor.label_names.clone(),
                label_values: self.label_values.clone(),
                quantiles: self.quantiles.to_vec(),
                max_age_seconds: self.max_age_seconds,
                value,
            })
            .await
    }
}
