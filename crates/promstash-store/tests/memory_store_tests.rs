//! Behavioural tests for MemoryStore through the `MetricStore` trait
//!
//! Every test drives the store as `Arc<dyn MetricStore>` so the assertions
//! describe the contract the engine relies on, not the memory backend itself.

use promstash_store::{
    escape_pattern, FieldMutation, HashUpdate, MemoryStore, MetricStore, StorageError, META_FIELD,
};
use std::sync::Arc;
use std::time::Duration;

fn store() -> Arc<dyn MetricStore> {
    Arc::new(MemoryStore::new())
}

fn histogram_update(bucket: &str, value: f64) -> HashUpdate {
    HashUpdate::new(
        "prometheus:histogram:latency{histogram}",
        "prometheus:histogram:metric_keys{histogram}",
    )
    .with_meta(r#"{"name":"latency","buckets":[0.1,1]}"#)
    .with_probe_field(r#"{"b":"sum","labelValues":[]}"#)
    .mutate(FieldMutation::increment_float(
        r#"{"b":"sum","labelValues":[]}"#,
        value,
    ))
    .mutate(FieldMutation::increment(
        format!(r#"{{"b":"{}","labelValues":[]}}"#, bucket),
        1,
    ))
}

/// Missing keys read as empty, never as errors
#[tokio::test]
async fn test_reads_of_missing_keys() {
    let store = store();
    assert!(store.hash_get_all("nope").await.unwrap().is_empty());
    assert!(store.set_members("nope").await.unwrap().is_empty());
    assert_eq!(store.get("nope").await.unwrap(), None);
    assert!(store.keys_matching("nope*").await.unwrap().is_empty());
    store.delete("nope").await.unwrap();
    assert_eq!(store.delete_matching("nope*").await.unwrap(), 0);
}

/// The returned value is the first mutation's result
#[tokio::test]
async fn test_histogram_style_update() {
    let store = store();

    let first = store.update_hash(&histogram_update("0.1", 0.05)).await.unwrap();
    assert_eq!(first.value, "0.05");
    assert!(first.registered);

    let second = store.update_hash(&histogram_update("1", 0.5)).await.unwrap();
    assert_eq!(second.value, "0.55");
    assert!(!second.registered);

    let hash = store
        .hash_get_all("prometheus:histogram:latency{histogram}")
        .await
        .unwrap();
    assert_eq!(hash.len(), 4);
    assert!(hash.contains_key(META_FIELD));
    assert_eq!(
        hash.get(r#"{"b":"0.1","labelValues":[]}"#).map(String::as_str),
        Some("1")
    );
    assert_eq!(
        hash.get(r#"{"b":"1","labelValues":[]}"#).map(String::as_str),
        Some("1")
    );
}

/// Deleting a registered series and writing again re-registers it
#[tokio::test]
async fn test_reregistration_after_delete() {
    let store = store();
    store.update_hash(&histogram_update("1", 0.5)).await.unwrap();

    store
        .delete("prometheus:histogram:latency{histogram}")
        .await
        .unwrap();
    store
        .delete("prometheus:histogram:metric_keys{histogram}")
        .await
        .unwrap();

    let outcome = store.update_hash(&histogram_update("1", 0.5)).await.unwrap();
    assert!(outcome.registered);
    assert_eq!(outcome.value, "0.5");
}

/// Integer increments on a float field are type errors
#[tokio::test]
async fn test_integer_increment_of_float_field() {
    let store = store();
    let float = HashUpdate::new("k", "idx")
        .with_probe_field("f")
        .mutate(FieldMutation::increment_float("f", 0.5));
    store.update_hash(&float).await.unwrap();

    let int = HashUpdate::new("k", "idx")
        .with_probe_field("f")
        .mutate(FieldMutation::increment("f", 1));
    let err = store.update_hash(&int).await.unwrap_err();
    assert!(matches!(err, StorageError::WrongType { .. }));
}

/// Patterns built with escape_pattern only match the literal prefix
#[tokio::test]
async fn test_escaped_patterns() {
    let store = store();
    store.set_if_absent("a*:1", "x", None).await.unwrap();
    store.set_if_absent("ab:1", "x", None).await.unwrap();

    let pattern = format!("{}*", escape_pattern("a*:"));
    assert_eq!(store.keys_matching(&pattern).await.unwrap(), vec!["a*:1"]);
    assert_eq!(store.keys_matching("a*").await.unwrap().len(), 2);
}

/// Matching keys come back sorted
#[tokio::test]
async fn test_keys_matching_sorted() {
    let store = store();
    for key in ["s:3", "s:1", "s:2"] {
        store.set_if_absent(key, "v", None).await.unwrap();
    }
    assert_eq!(
        store.keys_matching("s:*").await.unwrap(),
        vec!["s:1", "s:2", "s:3"]
    );
}

/// Expired keys disappear from every read path
#[tokio::test(start_paused = true)]
async fn test_expiry_hides_keys() {
    let store = store();
    store
        .set_if_absent("sample:a", "1", Some(Duration::from_secs(5)))
        .await
        .unwrap();
    store.set_if_absent("sample:b", "2", None).await.unwrap();

    tokio::time::advance(Duration::from_secs(6)).await;

    assert_eq!(store.keys_matching("sample:*").await.unwrap(), vec!["sample:b"]);
    assert_eq!(store.get("sample:a").await.unwrap(), None);
    assert_eq!(store.delete_matching("sample:*").await.unwrap(), 1);
}

/// Wipe removes every type of key under the pattern
#[tokio::test]
async fn test_delete_matching_all_types() {
    let store = store();
    store.update_hash(&histogram_update("1", 0.5)).await.unwrap();
    store
        .set_if_absent("prometheus:summary:x:meta", "{}", None)
        .await
        .unwrap();
    store.set_if_absent("unrelated", "1", None).await.unwrap();

    assert_eq!(store.delete_matching("prometheus:*").await.unwrap(), 3);
    assert_eq!(store.keys_matching("*").await.unwrap(), vec!["unrelated"]);
}

/// Concurrent first writes register the series exactly once
#[tokio::test]
async fn test_concurrent_first_writes_register_once() {
    let store = store();
    let mut handles = Vec::new();
    for _ in 0..16 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .update_hash(&histogram_update("0.1", 0.05))
                .await
                .unwrap()
                .registered
        }));
    }

    let mut registered = 0;
    for handle in handles {
        if handle.await.unwrap() {
            registered += 1;
        }
    }
    assert_eq!(registered, 1);

    let hash = store
        .hash_get_all("prometheus:histogram:latency{histogram}")
        .await
        .unwrap();
    assert_eq!(
        hash.get(r#"{"b":"0.1","labelValues":[]}"#).map(String::as_str),
        Some("16")
    );
}
