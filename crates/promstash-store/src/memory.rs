// Promstash - Shared-store metrics engine
// Copyright (C) 2026 Promstash Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.

//! In-memory metric store
//!
//! Provides a thread-safe, in-memory implementation of [`MetricStore`](crate::MetricStore)
//! using `Arc<RwLock<HashMap>>`. Every mutating call takes the write lock for
//! its whole duration, which is what makes [`MetricStore::update_hash`] atomic.
//!
//! Expiry is measured with `tokio::time::Instant`, so tests can drive it with
//! a paused clock (`tokio::time::pause` / `advance`). Expired entries are
//! evicted whenever a key scan runs and on every [`SWEEP_INTERVAL`]th write
//! that carries a TTL.
//!
//! # Examples
//!
//! ```rust,no_run
//! use promstash_store::{MemoryStore, MetricStore};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = MemoryStore::new();
//!
//!     assert!(store.set_if_absent("sample:1", "0.25", Some(Duration::from_secs(60))).await?);
//!     assert!(!store.set_if_absent("sample:1", "0.5", None).await?);
//!     assert_eq!(store.get("sample:1").await?.as_deref(), Some("0.25"));
//!
//!     let keys = store.keys_matching("sample:*").await?;
//!     assert_eq!(keys, vec!["sample:1"]);
//!
//!     Ok(())
//! }
//! ```

use crate::{
    FieldMutation, FieldOp, HashUpdate, HashUpdateOutcome, MetricStore, StorageError,
    StorageResult, META_FIELD,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::trace;

#[derive(Debug, Clone)]
enum Value {
    Scalar(String),
    Hash(HashMap<String, String>),
    Set(BTreeSet<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn persistent(value: Value) -> Self {
        Entry {
            value,
            expires_at: None,
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        !self.expires_at.is_some_and(|at| at <= now)
    }
}

type Keyspace = HashMap<String, Entry>;

/// Writes with a TTL between two full sweeps of expired entries
pub const SWEEP_INTERVAL: usize = 1024;

/// In-memory metric store
///
/// Cloning shares the underlying keyspace, so clones behave like several
/// connections to the same server.
#[derive(Clone)]
pub struct MemoryStore {
    store: Arc<RwLock<Keyspace>>,
    expiring_writes: Arc<AtomicUsize>,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        MemoryStore {
            store: Arc::new(RwLock::new(HashMap::new())),
            expiring_writes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Remove expired entries, returning how many were dropped
    pub async fn purge_expired(&self) -> usize {
        evict_expired(&mut *self.store.write().await, Instant::now())
    }

    /// Number of live keys
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.store
            .read()
            .await
            .values()
            .filter(|e| e.is_live(now))
            .count()
    }

    /// Check if the store holds no live keys
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop every key
    pub async fn clear(&self) {
        self.store.write().await.clear();
    }

    /// Sorted list of all live keys
    pub async fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        let mut keys: Vec<String> = self
            .store
            .read()
            .await
            .iter()
            .filter(|(_, e)| e.is_live(now))
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        keys
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore").finish()
    }
}

fn evict_expired(store: &mut Keyspace, now: Instant) -> usize {
    let before = store.len();
    store.retain(|_, entry| entry.is_live(now));
    let evicted = before - store.len();
    if evicted > 0 {
        trace!(evicted, "expired entries evicted");
    }
    evicted
}

fn live<'a>(store: &'a Keyspace, key: &str, now: Instant) -> Option<&'a Entry> {
    store.get(key).filter(|e| e.is_live(now))
}

fn apply_mutation(
    key: &str,
    hash: &mut HashMap<String, String>,
    mutation: &FieldMutation,
) -> StorageResult<String> {
    let current = hash.get(&mutation.field);
    let next = match mutation.op {
        FieldOp::Set => mutation.operand.clone(),
        FieldOp::IncrementInteger => {
            let current: i64 = match current {
                Some(raw) => raw
                    .parse()
                    .map_err(|_| StorageError::wrong_type(key, "hash value is not an integer"))?,
                None => 0,
            };
            let delta: i64 = mutation.operand.parse().map_err(|_| {
                StorageError::invalid_request(format!(
                    "integer increment operand is not an integer: {}",
                    mutation.operand
                ))
            })?;
            current
                .checked_add(delta)
                .ok_or_else(|| StorageError::backend("increment or decrement would overflow"))?
                .to_string()
        }
        FieldOp::IncrementFloat => {
            let current: f64 = match current {
                Some(raw) => raw
                    .parse()
                    .map_err(|_| StorageError::wrong_type(key, "hash value is not a float"))?,
                None => 0.0,
            };
            let delta: f64 = mutation.operand.parse().map_err(|_| {
                StorageError::invalid_request(format!(
                    "float increment operand is not a float: {}",
                    mutation.operand
                ))
            })?;
            let sum = current + delta;
            if !sum.is_finite() {
                return Err(StorageError::backend(
                    "increment would produce NaN or Infinity",
                ));
            }
            sum.to_string()
        }
    };
    hash.insert(mutation.field.clone(), next.clone());
    Ok(next)
}

#[async_trait]
impl MetricStore for MemoryStore {
    async fn update_hash(&self, update: &HashUpdate) -> StorageResult<HashUpdateOutcome> {
        if update.key.is_empty() || update.index_key.is_empty() {
            return Err(StorageError::invalid_request("key cannot be empty"));
        }
        if update.mutations.is_empty() {
            return Err(StorageError::invalid_request("hash update has no mutations"));
        }

        let now = Instant::now();
        let mut store = self.store.write().await;

        // Work on a copy so a rejected mutation leaves nothing behind.
        let mut hash = match live(&store, &update.key, now) {
            None => HashMap::new(),
            Some(Entry {
                value: Value::Hash(hash),
                ..
            }) => hash.clone(),
            Some(_) => return Err(StorageError::wrong_type(&update.key, "expected a hash")),
        };
        let current_index = match live(&store, &update.index_key, now) {
            None => None,
            Some(Entry {
                value: Value::Set(set),
                ..
            }) => Some(set),
            Some(_) => {
                return Err(StorageError::wrong_type(
                    &update.index_key,
                    "expected a set",
                ))
            }
        };

        let fresh = !hash.contains_key(&update.probe_field);
        // The index is only rewritten for a series seen for the first time.
        let mut index = fresh.then(|| current_index.cloned().unwrap_or_default());

        let mut first_value = None;
        for mutation in &update.mutations {
            let value = apply_mutation(&update.key, &mut hash, mutation)?;
            first_value.get_or_insert(value);
        }

        let mut registered = false;
        if let Some(index) = index.as_mut() {
            hash.entry(META_FIELD.to_string())
                .or_insert_with(|| update.meta.clone());
            registered = index.insert(update.key.clone());
        }

        store.insert(update.key.clone(), Entry::persistent(Value::Hash(hash)));
        if let Some(index) = index {
            store.insert(update.index_key.clone(), Entry::persistent(Value::Set(index)));
        }

        trace!(key = %update.key, fresh, registered, "hash update applied");

        Ok(HashUpdateOutcome {
            value: first_value.unwrap_or_default(),
            registered,
        })
    }

    async fn hash_get_all(&self, key: &str) -> StorageResult<BTreeMap<String, String>> {
        let store = self.store.read().await;
        match live(&store, key, Instant::now()) {
            None => Ok(BTreeMap::new()),
            Some(Entry {
                value: Value::Hash(hash),
                ..
            }) => Ok(hash.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
            Some(_) => Err(StorageError::wrong_type(key, "expected a hash")),
        }
    }

    async fn set_members(&self, key: &str) -> StorageResult<Vec<String>> {
        let store = self.store.read().await;
        match live(&store, key, Instant::now()) {
            None => Ok(Vec::new()),
            Some(Entry {
                value: Value::Set(set),
                ..
            }) => Ok(set.iter().cloned().collect()),
            Some(_) => Err(StorageError::wrong_type(key, "expected a set")),
        }
    }

    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let store = self.store.read().await;
        match live(&store, key, Instant::now()) {
            None => Ok(None),
            Some(Entry {
                value: Value::Scalar(value),
                ..
            }) => Ok(Some(value.clone())),
            Some(_) => Err(StorageError::wrong_type(key, "expected a string")),
        }
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> StorageResult<bool> {
        if key.is_empty() {
            return Err(StorageError::invalid_request("key cannot be empty"));
        }

        let now = Instant::now();
        let mut store = self.store.write().await;
        if live(&store, key, now).is_some() {
            return Ok(false);
        }

        if ttl.is_some()
            && (self.expiring_writes.fetch_add(1, Ordering::Relaxed) + 1) % SWEEP_INTERVAL == 0
        {
            evict_expired(&mut store, now);
        }
        store.insert(
            key.to_string(),
            Entry {
                value: Value::Scalar(value.to_string()),
                expires_at: ttl.map(|ttl| now + ttl),
            },
        );
        Ok(true)
    }

    async fn keys_matching(&self, pattern: &str) -> StorageResult<Vec<String>> {
        let now = Instant::now();
        let mut store = self.store.write().await;
        evict_expired(&mut store, now);
        let mut keys: Vec<String> = store
            .iter()
            .filter(|(k, _)| glob_match(pattern, k))
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.store.write().await.remove(key);
        Ok(())
    }

    async fn delete_matching(&self, pattern: &str) -> StorageResult<u64> {
        let now = Instant::now();
        let mut store = self.store.write().await;
        let mut deleted = 0;
        store.retain(|key, entry| {
            if !glob_match(pattern, key) {
                return true;
            }
            if entry.is_live(now) {
                deleted += 1;
            }
            false
        });
        Ok(deleted)
    }
}

/// Match `text` against a Redis-style glob pattern
///
/// Supports `*`, `?`, `[...]` classes (with `^` negation and `a-z` ranges) and
/// `\` escapes.
pub(crate) fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    match_from(&pattern, &text)
}

fn match_from(p: &[char], t: &[char]) -> bool {
    match p.first() {
        None => t.is_empty(),
        Some('*') => {
            let mut rest = &p[1..];
            while rest.first() == Some(&'*') {
                rest = &rest[1..];
            }
            if rest.is_empty() {
                return true;
            }
            (0..=t.len()).any(|i| match_from(rest, &t[i..]))
        }
        Some('?') => !t.is_empty() && match_from(&p[1..], &t[1..]),
        Some('\\') if p.len() > 1 => {
            !t.is_empty() && t[0] == p[1] && match_from(&p[2..], &t[1..])
        }
        Some('[') => match t.first() {
            None => false,
            Some(&c) => match match_class(p, c) {
                Some((true, consumed)) => match_from(&p[consumed..], &t[1..]),
                Some((false, _)) => false,
                // Unterminated class: `[` is a literal.
                None => c == '[' && match_from(&p[1..], &t[1..]),
            },
        },
        Some(&c) => !t.is_empty() && t[0] == c && match_from(&p[1..], &t[1..]),
    }
}

/// Returns whether `c` matches the class opening `p`, and the class length
fn match_class(p: &[char], c: char) -> Option<(bool, usize)> {
    let mut i = 1;
    let negate = p.get(1) == Some(&'^');
    if negate {
        i += 1;
    }

    let mut matched = false;
    while i < p.len() && p[i] != ']' {
        if p[i] == '\\' && i + 1 < p.len() {
            matched |= p[i + 1] == c;
            i += 2;
        } else if i + 2 < p.len() && p[i + 1] == '-' && p[i + 2] != ']' {
            let (lo, hi) = if p[i] <= p[i + 2] {
                (p[i], p[i + 2])
            } else {
                (p[i + 2], p[i])
            };
            matched |= lo <= c && c <= hi;
            i += 3;
        } else {
            matched |= p[i] == c;
            i += 1;
        }
    }

    if i >= p.len() {
        return None;
    }
    Some((matched != negate, i + 1))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn counter_update(field: &str, delta: i64) -> HashUpdate {
        HashUpdate::new("p:counter:jobs{counter}", "p:counter:keys{counter}")
            .with_meta(r#"{"name":"jobs"}"#)
            .with_probe_field(field)
            .mutate(FieldMutation::increment(field, delta))
    }

    #[tokio::test]
    async fn test_new() {
        let store = MemoryStore::new();
        assert!(store.is_empty().await);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_first_update_registers_once() {
        let store = MemoryStore::new();

        let first = store.update_hash(&counter_update("a", 2)).await.unwrap();
        assert_eq!(first.value, "2");
        assert!(first.registered);

        let second = store.update_hash(&counter_update("a", 3)).await.unwrap();
        assert_eq!(second.value, "5");
        assert!(!second.registered);

        // New label combination on a registered series: probe is fresh but
        // the index already holds the key.
        let third = store.update_hash(&counter_update("b", 1)).await.unwrap();
        assert!(!third.registered);

        let members = store.set_members("p:counter:keys{counter}").await.unwrap();
        assert_eq!(members, vec!["p:counter:jobs{counter}"]);

        let hash = store.hash_get_all("p:counter:jobs{counter}").await.unwrap();
        assert_eq!(hash.get("a").map(String::as_str), Some("5"));
        assert_eq!(hash.get("b").map(String::as_str), Some("1"));
        assert_eq!(hash.get(META_FIELD).map(String::as_str), Some(r#"{"name":"jobs"}"#));
    }

    #[tokio::test]
    async fn test_meta_first_writer_wins() {
        let store = MemoryStore::new();
        store.update_hash(&counter_update("a", 1)).await.unwrap();

        let update = counter_update("b", 1).with_meta(r#"{"name":"other"}"#);
        store.update_hash(&update).await.unwrap();

        let hash = store.hash_get_all("p:counter:jobs{counter}").await.unwrap();
        assert_eq!(hash.get(META_FIELD).map(String::as_str), Some(r#"{"name":"jobs"}"#));
    }

    #[tokio::test]
    async fn test_float_and_set_mutations() {
        let store = MemoryStore::new();
        let update = HashUpdate::new("h", "idx")
            .with_probe_field("bucket")
            .mutate(FieldMutation::increment_float("sum", 0.25))
            .mutate(FieldMutation::increment("bucket", 1));
        let outcome = store.update_hash(&update).await.unwrap();
        assert_eq!(outcome.value, "0.25");

        let set = HashUpdate::new("g", "idx")
            .with_probe_field("x")
            .mutate(FieldMutation::set("x", 7.5));
        assert_eq!(store.update_hash(&set).await.unwrap().value, "7.5");

        let members = store.set_members("idx").await.unwrap();
        assert_eq!(members, vec!["g", "h"]);
    }

    #[tokio::test]
    async fn test_rejected_mutation_leaves_no_trace() {
        let store = MemoryStore::new();
        let float = HashUpdate::new("h", "idx")
            .with_probe_field("f")
            .mutate(FieldMutation::increment_float("f", 1.5));
        store.update_hash(&float).await.unwrap();

        let bad = HashUpdate::new("h", "idx")
            .with_probe_field("g")
            .mutate(FieldMutation::increment("g", 1))
            .mutate(FieldMutation::increment("f", 1));
        let err = store.update_hash(&bad).await.unwrap_err();
        assert!(err.is_wrong_type());

        let hash = store.hash_get_all("h").await.unwrap();
        assert!(!hash.contains_key("g"));
    }

    #[tokio::test]
    async fn test_empty_update_rejected() {
        let store = MemoryStore::new();
        let result = store.update_hash(&HashUpdate::new("h", "idx")).await;
        assert!(matches!(result, Err(StorageError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_wrong_type_reads() {
        let store = MemoryStore::new();
        store.set_if_absent("scalar", "1", None).await.unwrap();
        assert!(store.hash_get_all("scalar").await.unwrap_err().is_wrong_type());
        assert!(store.set_members("scalar").await.unwrap_err().is_wrong_type());
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_if_absent_expiry() {
        let store = MemoryStore::new();
        let ttl = Some(Duration::from_secs(10));

        assert!(store.set_if_absent("k", "1", ttl).await.unwrap());
        assert!(!store.set_if_absent("k", "2", ttl).await.unwrap());

        tokio::time::advance(Duration::from_secs(11)).await;

        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(store.keys_matching("*").await.unwrap().is_empty());
        assert!(store.set_if_absent("k", "3", ttl).await.unwrap());
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("3"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_evicts_expired_entries() {
        let store = MemoryStore::new();
        let ttl = Some(Duration::from_secs(1));
        for i in 0..1000 {
            store
                .set_if_absent(&format!("sample:{}", i), "0.5", ttl)
                .await
                .unwrap();
        }
        store.set_if_absent("keep", "1", None).await.unwrap();

        tokio::time::advance(Duration::from_secs(5)).await;

        assert!(store.keys_matching("sample:*").await.unwrap().is_empty());
        assert_eq!(store.store.read().await.len(), 1);
        assert_eq!(store.get("keep").await.unwrap().as_deref(), Some("1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiring_writes_sweep_without_scans() {
        let store = MemoryStore::new();
        let ttl = Some(Duration::from_secs(1));
        for i in 0..SWEEP_INTERVAL - 1 {
            store
                .set_if_absent(&format!("old:{}", i), "1", ttl)
                .await
                .unwrap();
        }

        tokio::time::advance(Duration::from_secs(5)).await;

        store.set_if_absent("new", "1", ttl).await.unwrap();
        assert_eq!(store.store.read().await.len(), 1);
        assert_eq!(store.purge_expired().await, 0);
    }

    #[tokio::test]
    async fn test_repeat_update_keeps_index() {
        let store = MemoryStore::new();
        store.update_hash(&counter_update("a", 1)).await.unwrap();
        let outcome = store.update_hash(&counter_update("a", 2)).await.unwrap();
        assert!(!outcome.registered);
        assert_eq!(outcome.value, "3");
        assert_eq!(
            store.set_members("p:counter:keys{counter}").await.unwrap(),
            vec!["p:counter:jobs{counter}"]
        );
    }

    #[tokio::test]
    async fn test_delete_matching() {
        let store = MemoryStore::new();
        store.set_if_absent("ns:a", "1", None).await.unwrap();
        store.set_if_absent("ns:b", "1", None).await.unwrap();
        store.set_if_absent("other:c", "1", None).await.unwrap();

        assert_eq!(store.delete_matching("ns:*").await.unwrap(), 2);
        assert_eq!(store.keys().await, vec!["other:c"]);

        store.delete("other:c").await.unwrap();
        store.delete("other:c").await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_concurrent_increments() {
        let store = MemoryStore::new();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..25 {
                    store.update_hash(&counter_update("a", 1)).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let hash = store.hash_get_all("p:counter:jobs{counter}").await.unwrap();
        assert_eq!(hash.get("a").map(String::as_str), Some("200"));
        assert_eq!(store.set_members("p:counter:keys{counter}").await.unwrap().len(), 1);
    }

    #[test]
    fn test_glob_match() {
        assert!(glob_match("*", ""));
        assert!(glob_match("prefix:*", "prefix:a:b"));
        assert!(!glob_match("prefix:*", "other:a"));
        assert!(glob_match("a?c", "abc"));
        assert!(!glob_match("a?c", "ac"));
        assert!(glob_match("s{summary}:*:meta", "s{summary}:jobs:meta"));
        assert!(!glob_match("s{summary}:*:meta", "s{summary}:jobs:value"));
        assert!(glob_match("a\\*b", "a*b"));
        assert!(!glob_match("a\\*b", "axb"));
        assert!(glob_match("[a-c]x", "bx"));
        assert!(!glob_match("[^a-c]x", "bx"));
        assert!(glob_match("\\[x\\]", "[x]"));
        assert!(glob_match("[x", "[x"));
    }

    #[tokio::test]
    async fn test_debug_impl() {
        let store = MemoryStore::new();
        assert!(format!("{:?}", store).contains("MemoryStore"));
    }
}
