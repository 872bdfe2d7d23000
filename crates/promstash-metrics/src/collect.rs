//! Collection: rebuilding metric families from raw store state

use crate::engine::MetricsEngine;
use crate::error::{MetricsError, MetricsResult};
use crate::labels::{self, format_bound, SUM_BUCKET};
use crate::quantile::quantile;
use crate::types::{MetricFamily, MetricKind, MetricMeta, Sample};
use promstash_store::META_FIELD;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

fn parse_meta(key: &str, raw: &str) -> MetricsResult<MetricMeta> {
    serde_json::from_str(raw)
        .map_err(|e| MetricsError::decode(format!("metadata at {}: {}", key, e)))
}

fn parse_value(key: &str, raw: &str) -> MetricsResult<f64> {
    raw.parse::<f64>()
        .map_err(|e| MetricsError::decode(format!("value {:?} at {}: {}", raw, key, e)))
}

fn with_extra(label_values: &[String], extra: String) -> Vec<String> {
    let mut values = Vec::with_capacity(label_values.len() + 1);
    values.extend_from_slice(label_values);
    values.push(extra);
    values
}

impl MetricsEngine {
    /// Read every registered metric back as families
    ///
    /// Families come out histograms first, then gauges, counters and
    /// summaries, each group ordered by storage key. With `sort_metrics`,
    /// counter and gauge samples are ordered by their concatenated label
    /// values.
    ///
    /// Expired summary observations are dropped, and summary keys left with
    /// no live observations are deleted along the way.
    ///
    /// # Errors
    ///
    /// Any store failure aborts the whole collection. Series without
    /// metadata are skipped; unreadable metadata or values are `Decode`
    /// errors.
    pub async fn collect(&self, sort_metrics: bool) -> MetricsResult<Vec<MetricFamily>> {
        let mut families = self.collect_histograms().await?;
        families.extend(self.collect_scalars(MetricKind::Gauge, sort_metrics).await?);
        families.extend(self.collect_scalars(MetricKind::Counter, sort_metrics).await?);
        families.extend(self.collect_summaries().await?);

        debug!(families = families.len(), "metrics collected");
        Ok(families)
    }

    async fn indexed_series(&self, kind: MetricKind) -> MetricsResult<Vec<String>> {
        let mut keys = self.store.set_members(&self.keys.index_key(kind)).await?;
        keys.sort();
        Ok(keys)
    }

    async fn collect_scalars(
        &self,
        kind: MetricKind,
        sort_metrics: bool,
    ) -> MetricsResult<Vec<MetricFamily>> {
        let mut families = Vec::new();
        for key in self.indexed_series(kind).await? {
            let mut hash = self.store.hash_get_all(&key).await?;
            let Some(raw_meta) = hash.remove(META_FIELD) else {
                debug!(key = %key, "skipping series without metadata");
                continue;
            };
            let meta = parse_meta(&key, &raw_meta)?;

            let mut family = MetricFamily::from_meta(&meta);
            for (field, raw) in &hash {
                family.samples.push(Sample {
                    name: meta.name.clone(),
                    label_names: Vec::new(),
                    label_values: labels::decode(field)?,
                    value: parse_value(&key, raw)?,
                });
            }
            if sort_metrics {
                family
                    .samples
                    .sort_by_cached_key(|sample| sample.label_values.concat());
            }
            families.push(family);
        }
        Ok(families)
    }

    async fn collect_histograms(&self) -> MetricsResult<Vec<MetricFamily>> {
        let mut families = Vec::new();
        for key in self.indexed_series(MetricKind::Histogram).await? {
            let mut hash = self.store.hash_get_all(&key).await?;
            let Some(raw_meta) = hash.remove(META_FIELD) else {
                debug!(key = %key, "skipping series without metadata");
                continue;
            };
            let meta = parse_meta(&key, &raw_meta)?;
            let mut bounds = meta.buckets.clone().ok_or_else(|| {
                MetricsError::decode(format!("histogram metadata at {} has no buckets", key))
            })?;
            bounds.push(f64::INFINITY);

            // label values -> bucket marker -> raw cell
            let mut combinations: BTreeMap<Vec<String>, HashMap<String, String>> = BTreeMap::new();
            for (field, raw) in hash {
                let (bucket, label_values) = labels::decode_bucket_field(&field)?;
                combinations
                    .entry(label_values)
                    .or_default()
                    .insert(bucket, raw);
            }

            let mut family = MetricFamily::from_meta(&meta);
            for (label_values, cells) in &combinations {
                let mut cumulative = 0.0;
                for bound in &bounds {
                    let le = format_bound(*bound);
                    if let Some(raw) = cells.get(&le) {
                        cumulative += parse_value(&key, raw)?;
                    }
                    family.samples.push(Sample {
                        name: format!("{}_bucket", meta.name),
                        label_names: vec!["le".to_string()],
                        label_values: with_extra(label_values, le),
                        value: cumulative,
                    });
                }

                family.samples.push(Sample {
                    name: format!("{}_count", meta.name),
                    label_names: Vec::new(),
                    label_values: label_values.clone(),
                    value: cumulative,
                });

                let raw_sum = cells.get(SUM_BUCKET).ok_or_else(|| {
                    MetricsError::decode(format!(
                        "histogram {} has no sum for labels {:?}",
                        meta.name, label_values
                    ))
                })?;
                family.samples.push(Sample {
                    name: format!("{}_sum", meta.name),
                    label_names: Vec::new(),
                    label_values: label_values.clone(),
                    value: parse_value(&key, raw_sum)?,
                });
            }
            families.push(family);
        }
        Ok(families)
    }

    async fn collect_summaries(&self) -> MetricsResult<Vec<MetricFamily>> {
        let mut families = Vec::new();
        let meta_keys = self
            .store
            .keys_matching(&self.keys.summary_meta_pattern())
            .await?;

        for meta_key in meta_keys {
            let Some(raw_meta) = self.store.get(&meta_key).await? else {
                continue;
            };
            let meta = parse_meta(&meta_key, &raw_meta)?;
            let quantiles = meta.quantiles.clone().ok_or_else(|| {
                MetricsError::decode(format!("summary metadata at {} has no quantiles", meta_key))
            })?;

            let mut family = MetricFamily::from_meta(&meta);
            let value_keys = self
                .store
                .keys_matching(&self.keys.summary_value_pattern(&meta.name))
                .await?;
            for value_key in value_keys
                .iter()
                .filter(|k| self.keys.is_summary_value_key(&meta.name, k))
            {
                let Some(raw_labels) = self.store.get(value_key).await? else {
                    continue;
                };
                let encoded: String = serde_json::from_str(&raw_labels).map_err(|e| {
                    MetricsError::decode(format!("label index at {}: {}", value_key, e))
                })?;
                let label_values = labels::decode_key_safe(&encoded)?;

                let mut window = self.live_observations(value_key).await?;
                if window.is_empty() {
                    self.store.delete(value_key).await?;
                    debug!(key = %value_key, "pruned summary label set without live samples");
                    continue;
                }
                window.sort_by(f64::total_cmp);

                for q in &quantiles {
                    family.samples.push(Sample {
                        name: meta.name.clone(),
                        label_names: vec!["quantile".to_string()],
                        label_values: with_extra(&label_values, q.to_string()),
                        value: quantile(&window, *q),
                    });
                }
                family.samples.push(Sample {
                    name: format!("{}_count", meta.name),
                    label_names: Vec::new(),
                    label_values: label_values.clone(),
                    value: window.len() as f64,
                });
                family.samples.push(Sample {
                    name: format!("{}_sum", meta.name),
                    label_names: Vec::new(),
                    label_values,
                    value: window.iter().sum(),
                });
            }

            if family.samples.is_empty() {
                self.store.delete(&meta_key).await?;
                debug!(key = %meta_key, "pruned summary without live samples");
            } else {
                families.push(family);
            }
        }
        Ok(families)
    }

    async fn live_observations(&self, value_key: &str) -> MetricsResult<Vec<f64>> {
        let sample_keys = self
            .store
            .keys_matching(&self.keys.summary_sample_pattern(value_key))
            .await?;

        let mut window = Vec::with_capacity(sample_keys.len());
        for key in sample_keys
            .iter()
            .filter(|k| self.keys.is_summary_sample_key(value_key, k))
        {
            // Expired between the scan and the read.
            if let Some(raw) = self.store.get(key).await? {
                window.push(parse_value(key, &raw)?);
            }
        }
        Ok(window)
    }
}
