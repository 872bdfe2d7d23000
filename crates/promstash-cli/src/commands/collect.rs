use crate::output::format_value;
use crate::store::Session;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use promstash_metrics::MetricFamily;
use std::fmt::Write as _;

/// Output layout of `collect`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CollectFormat {
    /// Array of metric families (NaN quantiles become null)
    #[default]
    Json,
    /// Prometheus text exposition
    Text,
}

/// Read every series in the namespace and print the reassembled families
#[derive(Parser, Debug)]
pub struct CollectCmd {
    /// Keep counter and gauge samples in store order
    #[arg(long)]
    pub unsorted: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = CollectFormat::Json)]
    pub format: CollectFormat,
}

impl CollectCmd {
    /// Collect and print
    pub async fn execute(&self, session: &Session) -> Result<()> {
        let families = self.run(session).await?;
        let rendered = match self.format {
            CollectFormat::Json if self.pretty => serde_json::to_string_pretty(&families)?,
            CollectFormat::Json => serde_json::to_string(&families)?,
            CollectFormat::Text => render_text(&families),
        };
        println!("{}", rendered.trim_end());
        Ok(())
    }

    /// Collect without printing
    pub async fn run(&self, session: &Session) -> Result<Vec<MetricFamily>> {
        let sort = session.config.collect.sort_metrics && !self.unsorted;
        Ok(session.engine.collect(sort).await?)
    }
}

/// Render families in the Prometheus text exposition format
pub fn render_text(families: &[MetricFamily]) -> String {
    let mut out = String::new();
    for family in families {
        if !family.help.is_empty() {
            let _ = writeln!(out, "# HELP {} {}", family.name, escape_help(&family.help));
        }
        let _ = writeln!(out, "# TYPE {} {}", family.name, family.kind);
        for sample in &family.samples {
            let names = family.label_names.iter().chain(&sample.label_names);
            let pairs: Vec<String> = names
                .zip(&sample.label_values)
                .map(|(name, value)| format!("{}=\"{}\"", name, escape_label(value)))
                .collect();
            if pairs.is_empty() {
                let _ = writeln!(out, "{} {}", sample.name, format_value(sample.value));
            } else {
                let _ = writeln!(
                    out,
                    "{}{{{}}} {}",
                    sample.name,
                    pairs.join(","),
                    format_value(sample.value)
                );
            }
        }
    }
    out
}

fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use promstash_metrics::{MetricKind, Sample};

    #[test]
    fn test_render_text() {
        let family = MetricFamily {
            name: "request_seconds".to_string(),
            help: "Request latency".to_string(),
            kind: MetricKind::Histogram,
            label_names: vec!["path".to_string()],
            samples: vec![
                Sample {
                    name: "request_seconds_bucket".to_string(),
                    label_names: vec!["le".to_string()],
                    label_values: vec!["/a\"b".to_string(), "+Inf".to_string()],
                    value: 2.0,
                },
                Sample {
                    name: "request_seconds_sum".to_string(),
                    label_names: vec![],
                    label_values: vec!["/a\"b".to_string()],
                    value: 0.75,
                },
            ],
        };

        let text = render_text(&[family]);
        assert_eq!(
            text,
            "# HELP request_seconds Request latency\n\
             # TYPE request_seconds histogram\n\
             request_seconds_bucket{path=\"/a\\\"b\",le=\"+Inf\"} 2\n\
             request_seconds_sum{path=\"/a\\\"b\"} 0.75\n"
        );
    }

    #[test]
    fn test_render_unlabelled_nan() {
        let family = MetricFamily {
            name: "payload".to_string(),
            help: String::new(),
            kind: MetricKind::Summary,
            label_names: vec![],
            samples: vec![Sample {
                name: "payload".to_string(),
                label_names: vec!["quantile".to_string()],
                label_values: vec!["0.5".to_string()],
                value: f64::NAN,
            }],
        };

        assert_eq!(
            render_text(&[family]),
            "# TYPE payload summary\npayload{quantile=\"0.5\"} NaN\n"
        );
    }
}
