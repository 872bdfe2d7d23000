//! Single-update commands: `inc`, `set`, `observe`, `summary`

use crate::output;
use crate::store::Session;
use anyhow::Result;
use clap::{Args, Parser};
use promstash_metrics::{
    HistogramObservation, MetricUpdate, ScalarUpdate, SummaryObservation, UpdateCommand,
    DEFAULT_BUCKETS, DEFAULT_MAX_AGE_SECONDS, DEFAULT_QUANTILES,
};
use tracing::debug;

/// Metric identity shared by every update command
#[derive(Args, Debug, Clone, Default)]
pub struct MetricArgs {
    /// Metric name
    pub name: String,

    /// Help text stored with the series on first write
    #[arg(long = "help-text", value_name = "TEXT", default_value = "")]
    pub help_text: String,

    /// Label name, repeat in label order
    #[arg(long = "label-name", value_name = "NAME")]
    pub label_names: Vec<String>,

    /// Label value, repeat in the same order as --label-name
    #[arg(long = "label", value_name = "VALUE")]
    pub label_values: Vec<String>,
}

/// Increment a counter (or, with --gauge, a gauge)
#[derive(Parser, Debug)]
pub struct IncCmd {
    /// Metric identity
    #[command(flatten)]
    pub metric: MetricArgs,

    /// Increment; integral values use the integer command
    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    pub by: f64,

    /// Increment a gauge instead of a counter
    #[arg(long)]
    pub gauge: bool,
}

impl IncCmd {
    /// Apply the increment and print the new value
    pub async fn execute(&self, session: &Session) -> Result<()> {
        let value = self.run(session).await?;
        println!("{}", output::format_value(value));
        Ok(())
    }

    /// Apply the increment, returning the series value afterwards
    pub async fn run(&self, session: &Session) -> Result<f64> {
        let command = if self.by.fract() == 0.0 && !self.gauge {
            UpdateCommand::IncrementInteger
        } else {
            UpdateCommand::IncrementFloat
        };
        let update = scalar(&self.metric, command, self.by);
        debug!(name = %update.name, ?command, by = self.by, "Incrementing");

        let value = if self.gauge {
            session.engine.update_gauge(&update).await?
        } else {
            session.engine.update_counter(&update).await?
        };
        Ok(value)
    }
}

/// Set a gauge
#[derive(Parser, Debug)]
pub struct SetCmd {
    /// Metric identity
    #[command(flatten)]
    pub metric: MetricArgs,

    /// New value
    #[arg(allow_negative_numbers = true)]
    pub value: f64,
}

impl SetCmd {
    /// Overwrite the gauge value
    pub async fn execute(&self, session: &Session) -> Result<()> {
        let update = scalar(&self.metric, UpdateCommand::Set, self.value);
        session.engine.update_gauge(&update).await?;
        Ok(())
    }
}

/// Record one histogram observation
#[derive(Parser, Debug)]
pub struct ObserveCmd {
    /// Metric identity
    #[command(flatten)]
    pub metric: MetricArgs,

    /// Observed value
    #[arg(allow_negative_numbers = true)]
    pub value: f64,

    /// Bucket upper bound, repeat in ascending order (default buckets when omitted)
    #[arg(long = "bucket", value_name = "BOUND")]
    pub buckets: Vec<f64>,
}

impl ObserveCmd {
    /// Record the observation
    pub async fn execute(&self, session: &Session) -> Result<()> {
        let buckets = if self.buckets.is_empty() {
            DEFAULT_BUCKETS.to_vec()
        } else {
            self.buckets.clone()
        };
        let update = MetricUpdate::Histogram(HistogramObservation {
            name: self.metric.name.clone(),
            help: self.metric.help_text.clone(),
            label_names: self.metric.label_names.clone(),
            label_values: self.metric.label_values.clone(),
            buckets,
            value: self.value,
        });
        session.engine.update(&update).await?;
        Ok(())
    }
}

/// Record one summary observation
#[derive(Parser, Debug)]
pub struct SummaryCmd {
    /// Metric identity
    #[command(flatten)]
    pub metric: MetricArgs,

    /// Observed value
    #[arg(allow_negative_numbers = true)]
    pub value: f64,

    /// Quantile to report, repeat in ascending order (default quantiles when omitted)
    #[arg(long = "quantile", value_name = "Q")]
    pub quantiles: Vec<f64>,

    /// Seconds each observation stays in the window
    #[arg(long = "max-age", value_name = "SECONDS", default_value_t = DEFAULT_MAX_AGE_SECONDS)]
    pub max_age_seconds: u64,
}

impl SummaryCmd {
    /// Record the observation
    pub async fn execute(&self, session: &Session) -> Result<()> {
        let quantiles = if self.quantiles.is_empty() {
            DEFAULT_QUANTILES.to_vec()
        } else {
            self.quantiles.clone()
        };
        let update = MetricUpdate::Summary(SummaryObservation {
            name: self.metric.name.clone(),
            help: self.metric.help_text.clone(),
            label_names: self.metric.label_names.clone(),
            label_values: self.metric.label_values.clone(),
            quantiles,
            max_age_seconds: self.max_age_seconds,
            value: self.value,
        });
        session.engine.update(&update).await?;
        Ok(())
    }
}

fn scalar(metric: &MetricArgs, command: UpdateCommand, value: f64) -> ScalarUpdate {
    ScalarUpdate {
        name: metric.name.clone(),
        help: metric.help_text.clone(),
        label_names: metric.label_names.clone(),
        label_values: metric.label_values.clone(),
        command,
        value,
    }
}
