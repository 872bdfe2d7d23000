//! Common types for metric updates and collected families

use crate::error::{MetricsError, MetricsResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default histogram bucket boundaries
pub const DEFAULT_BUCKETS: [f64; 14] = [
    0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5, 10.0,
];

/// Default summary quantiles
pub const DEFAULT_QUANTILES: [f64; 5] = [0.01, 0.05, 0.5, 0.95, 0.99];

/// Default summary sliding window, in seconds
pub const DEFAULT_MAX_AGE_SECONDS: u64 = 600;

/// Metric type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Monotonic counter
    Counter,
    /// Arbitrary value
    Gauge,
    /// Bucketed observations
    Histogram,
    /// Quantiles over a sliding window
    Summary,
}

impl MetricKind {
    /// Every kind, in collection order
    pub const COLLECTION_ORDER: [MetricKind; 4] = [
        MetricKind::Histogram,
        MetricKind::Gauge,
        MetricKind::Counter,
        MetricKind::Summary,
    ];

    /// Type name used in keys and metadata
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
            MetricKind::Summary => "summary",
        }
    }

    /// Hash tag appended to every key of this type
    ///
    /// Keeps all keys of one type on the same cluster slot so the update
    /// script can touch the series hash and the index set together.
    pub fn routing_tag(&self) -> &'static str {
        match self {
            MetricKind::Counter => "{counter}",
            MetricKind::Gauge => "{gauge}",
            MetricKind::Histogram => "{histogram}",
            MetricKind::Summary => "{summary}",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = MetricsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "counter" => Ok(MetricKind::Counter),
            "gauge" => Ok(MetricKind::Gauge),
            "histogram" => Ok(MetricKind::Histogram),
            "summary" => Ok(MetricKind::Summary),
            other => Err(MetricsError::invalid_command(format!(
                "unknown metric type: {}",
                other
            ))),
        }
    }
}

/// Mutation applied by a counter or gauge update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateCommand {
    /// Add an integral delta
    IncrementInteger,
    /// Add a float delta
    IncrementFloat,
    /// Overwrite the value
    Set,
}

impl UpdateCommand {
    /// Decode a numeric command code (1 integer increment, 2 float increment, 3 set)
    pub fn from_code(code: i32) -> MetricsResult<Self> {
        match code {
            1 => Ok(UpdateCommand::IncrementInteger),
            2 => Ok(UpdateCommand::IncrementFloat),
            3 => Ok(UpdateCommand::Set),
            other => Err(MetricsError::invalid_command(format!(
                "unknown update command code: {}",
                other
            ))),
        }
    }

    /// Numeric command code
    pub fn code(&self) -> i32 {
        match self {
            UpdateCommand::IncrementInteger => 1,
            UpdateCommand::IncrementFloat => 2,
            UpdateCommand::Set => 3,
        }
    }
}

/// Series metadata, stored once per series as a JSON blob
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricMeta {
    /// Metric name
    pub name: String,
    /// Help text
    #[serde(default)]
    pub help: String,
    /// Metric type
    #[serde(rename = "type")]
    pub kind: MetricKind,
    /// Label names, in order
    #[serde(default)]
    pub label_names: Vec<String>,
    /// Histogram bucket boundaries, without `+Inf`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buckets: Option<Vec<f64>>,
    /// Summary quantiles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantiles: Option<Vec<f64>>,
    /// Summary sliding window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age_seconds: Option<u64>,
}

/// Counter or gauge update
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarUpdate {
    /// Metric name
    pub name: String,
    /// Help text
    pub help: String,
    /// Label names
    pub label_names: Vec<String>,
    /// Label values, one per label name
    pub label_values: Vec<String>,
    /// Mutation to apply
    pub command: UpdateCommand,
    /// Operand
    pub value: f64,
}

/// Histogram observation
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramObservation {
    /// Metric name
    pub name: String,
    /// Help text
    pub help: String,
    /// Label names
    pub label_names: Vec<String>,
    /// Label values, one per label name
    pub label_values: Vec<String>,
    /// Strictly ascending bucket boundaries, without `+Inf`
    pub buckets: Vec<f64>,
    /// Observed value
    pub value: f64,
}

/// Summary observation
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryObservation {
    /// Metric name
    pub name: String,
    /// Help text
    pub help: String,
    /// Label names
    pub label_names: Vec<String>,
    /// Label values, one per label name
    pub label_values: Vec<String>,
    /// Quantiles to report, each in `[0, 1]`
    pub quantiles: Vec<f64>,
    /// Lifetime of each observation
    pub max_age_seconds: u64,
    /// Observed value
    pub value: f64,
}

/// One update, tagged with its metric type
#[derive(Debug, Clone, PartialEq)]
pub enum MetricUpdate {
    /// Counter update
    Counter(ScalarUpdate),
    /// Gauge update
    Gauge(ScalarUpdate),
    /// Histogram observation
    Histogram(HistogramObservation),
    /// Summary observation
    Summary(SummaryObservation),
}

impl MetricUpdate {
    /// Metric type of this update
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricUpdate::Counter(_) => MetricKind::Counter,
            MetricUpdate::Gauge(_) => MetricKind::Gauge,
            MetricUpdate::Histogram(_) => MetricKind::Histogram,
            MetricUpdate::Summary(_) => MetricKind::Summary,
        }
    }

    /// Metric name of this update
    pub fn name(&self) -> &str {
        match self {
            MetricUpdate::Counter(u) | MetricUpdate::Gauge(u) => &u.name,
            MetricUpdate::Histogram(o) => &o.name,
            MetricUpdate::Summary(o) => &o.name,
        }
    }
}

/// One sample of a collected family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    /// Sample name, including any `_bucket`, `_count` or `_sum` suffix
    pub name: String,
    /// Extra label names beyond the family's (`le` or `quantile`)
    pub label_names: Vec<String>,
    /// Family label values followed by the extra label values
    pub label_values: Vec<String>,
    /// Sample value
    pub value: f64,
}

/// All samples of one metric, reassembled from the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricFamily {
    /// Metric name
    pub name: String,
    /// Help text
    pub help: String,
    /// Metric type
    #[serde(rename = "type")]
    pub kind: MetricKind,
    /// Label names
    pub label_names: Vec<String>,
    /// Samples, in emission order
    pub samples: Vec<Sample>,
}

impl MetricFamily {
    pub(crate) fn from_meta(meta: &MetricMeta) -> Self {
        MetricFamily {
            name: meta.name.clone(),
            help: meta.help.clone(),
            kind: meta.kind,
            label_names: meta.label_names.clone(),
            samples: Vec::new(),
        }
    }

    /// Find the first sample with `name` and exactly `label_values`
    pub fn sample(&self, name: &str, label_values: &[&str]) -> Option<&Sample> {
        self.samples.iter().find(|s| {
            s.name == name
                && s.label_values.len() == label_values.len()
                && s.label_values.iter().zip(label_values).all(|(a, b)| a == b)
        })
    }
}
