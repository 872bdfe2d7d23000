//! Per-type update procedures
//!
//! Counters, gauges and histograms are single [`HashUpdate`] transactions.
//! Summaries write scalar keys: two write-once keys naming the series, then
//! one expiring key per observation.

use crate::engine::{
    check_arity, check_buckets, check_finite, check_max_age, check_name, check_quantiles,
    MetricsEngine,
};
use crate::error::{MetricsError, MetricsResult};
use crate::labels::{self, format_bound, INF_BUCKET, SUM_BUCKET};
use crate::types::{
    HistogramObservation, MetricKind, MetricMeta, ScalarUpdate, SummaryObservation,
    UpdateCommand,
};
use chrono::Utc;
use promstash_store::{FieldMutation, HashUpdate};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

impl MetricsEngine {
    /// Apply a counter update, returning the post-mutation value
    pub async fn update_counter(&self, update: &ScalarUpdate) -> MetricsResult<f64> {
        self.update_scalar(MetricKind::Counter, update).await
    }

    /// Apply a gauge update, returning the post-mutation value
    pub async fn update_gauge(&self, update: &ScalarUpdate) -> MetricsResult<f64> {
        self.update_scalar(MetricKind::Gauge, update).await
    }

    async fn update_scalar(&self, kind: MetricKind, update: &ScalarUpdate) -> MetricsResult<f64> {
        check_name(&update.name)?;
        check_arity(&update.name, &update.label_names, &update.label_values)?;
        check_finite(&update.name, update.value)?;

        let field = labels::encode(&update.label_values)?;
        let mutation = match update.command {
            UpdateCommand::IncrementInteger => {
                FieldMutation::increment(&field, integral(&update.name, update.value)?)
            }
            UpdateCommand::IncrementFloat => FieldMutation::increment_float(&field, update.value),
            UpdateCommand::Set => FieldMutation::set(&field, update.value),
        };

        let meta = MetricMeta {
            name: update.name.clone(),
            help: update.help.clone(),
            kind,
            label_names: update.label_names.clone(),
            buckets: None,
            quantiles: None,
            max_age_seconds: None,
        };

        let hash_update = HashUpdate::new(
            self.keys.series_key(kind, &update.name),
            self.keys.index_key(kind),
        )
        .with_meta(Self::meta_json(&meta)?)
        .with_probe_field(&field)
        .mutate(mutation);

        let outcome = self.store.update_hash(&hash_update).await?;
        if outcome.registered {
            debug!(kind = %kind, name = %update.name, "series registered");
        }

        outcome.value.parse::<f64>().map_err(|e| {
            MetricsError::decode(format!(
                "{} {} returned {:?}: {}",
                kind, update.name, outcome.value, e
            ))
        })
    }

    /// Record one histogram observation
    ///
    /// The observation lands in the first bucket whose boundary is at least
    /// the value, or in `+Inf` when it exceeds every boundary.
    pub async fn update_histogram(&self, observation: &HistogramObservation) -> MetricsResult<()> {
        let name = &observation.name;
        check_name(name)?;
        check_arity(name, &observation.label_names, &observation.label_values)?;
        check_finite(name, observation.value)?;
        check_buckets(name, &observation.buckets)?;

        let bucket = observation
            .buckets
            .iter()
            .find(|bound| observation.value <= **bound)
            .map_or_else(|| INF_BUCKET.to_string(), |bound| format_bound(*bound));

        let sum_field = labels::encode_bucket_field(SUM_BUCKET, &observation.label_values)?;
        let bucket_field = labels::encode_bucket_field(&bucket, &observation.label_values)?;

        let meta = MetricMeta {
            name: name.clone(),
            help: observation.help.clone(),
            kind: MetricKind::Histogram,
            label_names: observation.label_names.clone(),
            buckets: Some(observation.buckets.clone()),
            quantiles: None,
            max_age_seconds: None,
        };

        let hash_update = HashUpdate::new(
            self.keys.series_key(MetricKind::Histogram, name),
            self.keys.index_key(MetricKind::Histogram),
        )
        .with_meta(Self::meta_json(&meta)?)
        .with_probe_field(&sum_field)
        .mutate(FieldMutation::increment_float(&sum_field, observation.value))
        .mutate(FieldMutation::increment(&bucket_field, 1));

        let outcome = self.store.update_hash(&hash_update).await?;
        if outcome.registered {
            debug!(kind = "histogram", name = %name, "series registered");
        }
        Ok(())
    }

    /// Record one summary observation
    ///
    /// The observation expires after `max_age_seconds`.
    pub async fn update_summary(&self, observation: &SummaryObservation) -> MetricsResult<()> {
        let name = &observation.name;
        check_name(name)?;
        check_arity(name, &observation.label_names, &observation.label_values)?;
        check_finite(name, observation.value)?;
        check_quantiles(name, &observation.quantiles)?;
        check_max_age(name, observation.max_age_seconds)?;

        let meta = MetricMeta {
            name: name.clone(),
            help: observation.help.clone(),
            kind: MetricKind::Summary,
            label_names: observation.label_names.clone(),
            buckets: None,
            quantiles: Some(observation.quantiles.clone()),
            max_age_seconds: Some(observation.max_age_seconds),
        };
        self.store
            .set_if_absent(
                &self.keys.summary_meta_key(name),
                &Self::meta_json(&meta)?,
                None,
            )
            .await?;

        let encoded = labels::encode_key_safe(&observation.label_values)?;
        let value_key = self.keys.summary_value_key(name, &encoded);
        let stored_labels =
            serde_json::to_string(&encoded).map_err(|e| MetricsError::encoding(e.to_string()))?;
        self.store
            .set_if_absent(&value_key, &stored_labels, None)
            .await?;

        let ttl = Duration::from_secs(observation.max_age_seconds);
        let value = observation.value.to_string();
        loop {
            let sample_key = self.keys.summary_sample_key(&value_key, &unique_suffix());
            if self
                .store
                .set_if_absent(&sample_key, &value, Some(ttl))
                .await?
            {
                return Ok(());
            }
            warn!(key = %sample_key, "summary sample key collision, retrying");
        }
    }
}

/// Convert an integer-increment operand, rejecting fractions and overflow
fn integral(name: &str, value: f64) -> MetricsResult<i64> {
    if value.fract() != 0.0 {
        return Err(MetricsError::invalid_value(
            name,
            format!("integer increment by non-integral {}", value),
        ));
    }
    if value < i64::MIN as f64 || value >= i64::MAX as f64 {
        return Err(MetricsError::invalid_value(
            name,
            format!("integer increment {} is out of range", value),
        ));
    }
    Ok(value as i64)
}

/// Time-ordered unique id for a summary sample key
fn unique_suffix() -> String {
    format!(
        "{}.{}",
        Utc::now().timestamp_micros(),
        Uuid::new_v4().simple()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integral() {
        assert_eq!(integral("c", 3.0).unwrap(), 3);
        assert_eq!(integral("c", -2.0).unwrap(), -2);
        assert!(integral("c", 1.5).is_err());
        assert!(integral("c", 1e19).is_err());
    }

    #[test]
    fn test_unique_suffix_has_no_separator() {
        let a = unique_suffix();
        let b = unique_suffix();
        assert_ne!(a, b);
        assert!(!a.contains(':'));
    }
}
