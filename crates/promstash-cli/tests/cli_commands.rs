// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Promstash Contributors
#![allow(clippy::unwrap_used)]

use clap::Parser;
use promstash_cli::commands::*;
use promstash_cli::Session;
use promstash_config::{CollectConfig, Config, StoreConfig};
use promstash_store::MemoryStore;
use std::sync::Arc;

fn session() -> Session {
    let config = Config {
        store: StoreConfig::Memory,
        ..Config::default()
    };
    Session::with_store(config, Arc::new(MemoryStore::new()))
}

#[tokio::test]
async fn test_inc_accumulates_and_collects() {
    let session = session();
    let args = [
        "inc",
        "jobs_total",
        "--help-text",
        "Processed jobs",
        "--label-name",
        "queue",
        "--label",
        "default",
    ];

    assert_eq!(IncCmd::try_parse_from(args).unwrap().run(&session).await.unwrap(), 1.0);
    assert_eq!(IncCmd::try_parse_from(args).unwrap().run(&session).await.unwrap(), 2.0);

    let families = CollectCmd::try_parse_from(["collect"])
        .unwrap()
        .run(&session)
        .await
        .unwrap();
    assert_eq!(families.len(), 1);
    assert_eq!(families[0].help, "Processed jobs");
    assert_eq!(
        families[0].sample("jobs_total", &["default"]).unwrap().value,
        2.0
    );
}

#[tokio::test]
async fn test_fractional_inc_on_gauge() {
    let session = session();
    SetCmd::try_parse_from(["set", "temperature", "20"])
        .unwrap()
        .execute(&session)
        .await
        .unwrap();

    let value = IncCmd::try_parse_from(["inc", "temperature", "--gauge", "--by", "-0.5"])
        .unwrap()
        .run(&session)
        .await
        .unwrap();
    assert_eq!(value, 19.5);
}

#[tokio::test]
async fn test_fractional_inc_on_counter_uses_float_command() {
    let session = session();
    let value = IncCmd::try_parse_from(["inc", "bytes_total", "--by", "1.25"])
        .unwrap()
        .run(&session)
        .await
        .unwrap();
    assert_eq!(value, 1.25);
}

#[tokio::test]
async fn test_label_arity_mismatch_is_an_error() {
    let session = session();
    let result = IncCmd::try_parse_from(["inc", "jobs_total", "--label", "orphan"])
        .unwrap()
        .run(&session)
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_observe_and_summary_commands() {
    let session = session();
    for value in ["0.05", "0.4", "3"] {
        ObserveCmd::try_parse_from(["observe", "latency", value, "--bucket", "0.1", "--bucket", "1"])
            .unwrap()
            .execute(&session)
            .await
            .unwrap();
    }
    SummaryCmd::try_parse_from(["summary", "payload", "10", "--quantile", "0.5"])
        .unwrap()
        .execute(&session)
        .await
        .unwrap();

    let families = CollectCmd::try_parse_from(["collect"])
        .unwrap()
        .run(&session)
        .await
        .unwrap();
    assert_eq!(families.len(), 2);

    let histogram = &families[0];
    assert_eq!(histogram.name, "latency");
    assert_eq!(histogram.sample("latency_bucket", &["0.1"]).unwrap().value, 1.0);
    assert_eq!(histogram.sample("latency_bucket", &["1"]).unwrap().value, 2.0);
    assert_eq!(histogram.sample("latency_bucket", &["+Inf"]).unwrap().value, 3.0);
    assert_eq!(histogram.sample("latency_count", &[]).unwrap().value, 3.0);

    let summary = &families[1];
    assert_eq!(summary.name, "payload");
    assert_eq!(summary.sample("payload", &["0.5"]).unwrap().value, 10.0);
}

#[tokio::test]
async fn test_unsorted_flag_overrides_config() {
    let config = Config {
        store: StoreConfig::Memory,
        collect: CollectConfig { sort_metrics: true },
        ..Config::default()
    };
    let session = Session::with_store(config, Arc::new(MemoryStore::new()));
    for worker in ["b", "a"] {
        IncCmd::try_parse_from(["inc", "ticks", "--label-name", "worker", "--label", worker])
            .unwrap()
            .run(&session)
            .await
            .unwrap();
    }

    let sorted = CollectCmd::try_parse_from(["collect"])
        .unwrap()
        .run(&session)
        .await
        .unwrap();
    let order: Vec<&str> = sorted[0]
        .samples
        .iter()
        .map(|s| s.label_values[0].as_str())
        .collect();
    assert_eq!(order, vec!["a", "b"]);

    let unsorted = CollectCmd::try_parse_from(["collect", "--unsorted"]).unwrap();
    assert!(unsorted.unsorted);
    assert_eq!(unsorted.run(&session).await.unwrap()[0].samples.len(), 2);
}

#[tokio::test]
async fn test_wipe_requires_confirmation() {
    let session = session();
    IncCmd::try_parse_from(["inc", "jobs_total"])
        .unwrap()
        .run(&session)
        .await
        .unwrap();

    assert!(WipeCmd::try_parse_from(["wipe"])
        .unwrap()
        .execute(&session)
        .await
        .is_err());
    let before = CollectCmd::try_parse_from(["collect"]).unwrap().run(&session).await.unwrap();
    assert_eq!(before.len(), 1);

    WipeCmd::try_parse_from(["wipe", "--yes"])
        .unwrap()
        .execute(&session)
        .await
        .unwrap();
    let after = CollectCmd::try_parse_from(["collect"]).unwrap().run(&session).await.unwrap();
    assert!(after.is_empty());
}
