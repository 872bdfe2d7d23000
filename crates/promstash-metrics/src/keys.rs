//! Storage key layout
//!
//! Every key the engine touches is derived here from the namespace prefix,
//! the index suffix, the metric type and the metric name:
//!
//! | Purpose | Key |
//! |---|---|
//! | Series hash | `<prefix><type>:<name>{<type>}` |
//! | Index set | `<prefix><type><suffix>{<type>}` |
//! | Summary meta | `<summary index>:<name>:meta` |
//! | Summary value index | `<summary index>:<name>:<base64 labels>:value` |
//! | Summary sample | `<value index>:<unique id>` |

use crate::types::MetricKind;
use promstash_store::escape_pattern;

/// Default namespace prefix
pub const DEFAULT_PREFIX: &str = "prometheus:";

/// Default index-set suffix
pub const DEFAULT_INDEX_SUFFIX: &str = ":metric_keys";

/// Deterministic mapping from metrics to storage keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyScheme {
    prefix: String,
    index_suffix: String,
}

impl Default for KeyScheme {
    fn default() -> Self {
        KeyScheme::new(DEFAULT_PREFIX, DEFAULT_INDEX_SUFFIX)
    }
}

impl KeyScheme {
    /// Create a scheme with an explicit prefix and index suffix
    pub fn new(prefix: impl Into<String>, index_suffix: impl Into<String>) -> Self {
        KeyScheme {
            prefix: prefix.into(),
            index_suffix: index_suffix.into(),
        }
    }

    /// Namespace prefix
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Index-set suffix
    pub fn index_suffix(&self) -> &str {
        &self.index_suffix
    }

    /// Hash holding every label combination of a counter, gauge or histogram
    pub fn series_key(&self, kind: MetricKind, name: &str) -> String {
        format!(
            "{}{}:{}{}",
            self.prefix,
            kind.as_str(),
            name,
            kind.routing_tag()
        )
    }

    /// Set of series keys registered for `kind`
    pub fn index_key(&self, kind: MetricKind) -> String {
        format!(
            "{}{}{}{}",
            self.prefix,
            kind.as_str(),
            self.index_suffix,
            kind.routing_tag()
        )
    }

    fn summary_base(&self) -> String {
        self.index_key(MetricKind::Summary)
    }

    /// Write-once metadata key of a summary
    pub fn summary_meta_key(&self, name: &str) -> String {
        format!("{}:{}:meta", self.summary_base(), name)
    }

    /// Pattern matching every summary metadata key
    pub fn summary_meta_pattern(&self) -> String {
        format!("{}:*:meta", escape_pattern(&self.summary_base()))
    }

    /// Write-once key naming one label combination of a summary
    pub fn summary_value_key(&self, name: &str, encoded_labels: &str) -> String {
        format!("{}:{}:{}:value", self.summary_base(), name, encoded_labels)
    }

    /// Pattern matching the value keys of summary `name`
    ///
    /// Also matches value keys of names that extend `name` with a colon;
    /// filter with [`KeyScheme::is_summary_value_key`].
    pub fn summary_value_pattern(&self, name: &str) -> String {
        let literal = format!("{}:{}:", self.summary_base(), name);
        format!("{}*:value", escape_pattern(&literal))
    }

    /// Whether `key` is a value key of summary `name`
    pub fn is_summary_value_key(&self, name: &str, key: &str) -> bool {
        let head = format!("{}:{}:", self.summary_base(), name);
        key.strip_prefix(&head)
            .and_then(|rest| rest.strip_suffix(":value"))
            .is_some_and(|labels| !labels.is_empty() && !labels.contains(':'))
    }

    /// Key of one summary observation
    pub fn summary_sample_key(&self, value_key: &str, unique: &str) -> String {
        format!("{}:{}", value_key, unique)
    }

    /// Pattern matching the observations under a value key
    pub fn summary_sample_pattern(&self, value_key: &str) -> String {
        format!("{}*", escape_pattern(&format!("{}:", value_key)))
    }

    /// Whether `key` is an observation under `value_key`
    pub fn is_summary_sample_key(&self, value_key: &str, key: &str) -> bool {
        key.strip_prefix(value_key)
            .and_then(|rest| rest.strip_prefix(':'))
            .is_some_and(|unique| !unique.is_empty() && !unique.contains(':'))
    }

    /// Pattern matching every key under the namespace
    pub fn namespace_pattern(&self) -> String {
        format!("{}*", escape_pattern(&self.prefix))
    }
}
