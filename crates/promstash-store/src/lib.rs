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

//! Store abstraction layer for promstash
//!
//! This crate provides the asynchronous key/value interface the metrics engine
//! persists into. Two backends are available:
//! - In-memory (`MemoryStore`), for tests and single-process use
//! - Redis (`RedisStore`, feature `redis`), for shared multi-process deployments
//!
//! # Architecture
//!
//! The `MetricStore` trait is deliberately shaped around the handful of
//! primitives the engine needs rather than a general key/value API. The one
//! multi-step operation, [`MetricStore::update_hash`], must execute as a single
//! indivisible transaction on the backend side: Redis runs it as a Lua script,
//! the in-memory backend runs it under one write lock.
//!
//! ## Core Concepts
//!
//! - **Hashes**: one per counter, gauge or histogram series, holding a field per
//!   label combination plus a `__meta` field with the series metadata
//! - **Index sets**: one per metric type, naming every hash worth collecting
//! - **Scalars**: plain string keys, optionally expiring, used by summaries
//! - **Patterns**: Redis-style glob patterns (`*`, `?`, `\` escapes)
//!
//! # Examples
//!
//! ```no_run
//! use promstash_store::{FieldMutation, HashUpdate, MemoryStore, MetricStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = MemoryStore::new();
//!
//!     let update = HashUpdate::new("prometheus:counter:jobs{counter}", "prometheus:counter:metric_keys{counter}")
//!         .with_meta(r#"{"name":"jobs"}"#)
//!         .with_probe_field(r#"["worker"]"#)
//!         .mutate(FieldMutation::increment(r#"["worker"]"#, 1));
//!
//!     let outcome = store.update_hash(&update).await?;
//!     assert_eq!(outcome.value, "1");
//!     assert!(outcome.registered);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Implementation Guide
//!
//! When implementing `MetricStore`:
//!
//! 1. Use `#[async_trait]` on the impl block
//! 2. Return `StorageResult<T>` for all operations
//! 3. Make `update_hash` and `delete_matching` atomic with respect to every other call
//! 4. Treat expired keys as absent everywhere
//! 5. Deleting a missing key succeeds

pub mod error;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis_store;

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::time::Duration;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
#[cfg(feature = "redis")]
pub use redis_store::RedisStore;

/// Hash field holding the JSON metadata blob of a series
pub const META_FIELD: &str = "__meta";

/// Primitive mutation applied to one hash field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldOp {
    /// Overwrite the field (`HSET`)
    Set,
    /// Integer increment (`HINCRBY`)
    IncrementInteger,
    /// Float increment (`HINCRBYFLOAT`)
    IncrementFloat,
}

impl FieldOp {
    /// Wire name understood by the update script
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldOp::Set => "set",
            FieldOp::IncrementInteger => "incrby",
            FieldOp::IncrementFloat => "incrbyfloat",
        }
    }
}

/// One field mutation inside a [`HashUpdate`]
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMutation {
    /// Hash field to mutate
    pub field: String,
    /// Mutation kind
    pub op: FieldOp,
    /// Operand, already rendered the way the backend parses it
    pub operand: String,
}

impl FieldMutation {
    /// Overwrite `field` with `value`
    pub fn set(field: impl Into<String>, value: f64) -> Self {
        Self {
            field: field.into(),
            op: FieldOp::Set,
            operand: value.to_string(),
        }
    }

    /// Add an integer delta to `field`
    pub fn increment(field: impl Into<String>, delta: i64) -> Self {
        Self {
            field: field.into(),
            op: FieldOp::IncrementInteger,
            operand: delta.to_string(),
        }
    }

    /// Add a float delta to `field`
    pub fn increment_float(field: impl Into<String>, delta: f64) -> Self {
        Self {
            field: field.into(),
            op: FieldOp::IncrementFloat,
            operand: delta.to_string(),
        }
    }
}

/// Atomic multi-field update of one series hash
///
/// Executed as one transaction:
/// 1. Probe whether `probe_field` exists in `key`
/// 2. Apply every mutation in order
/// 3. If the probe field was absent, write [`META_FIELD`] (only if missing) and
///    add `key` to the `index_key` set
///
/// The mutations always run before the registration step, so a reader can
/// never observe an indexed series that has no value.
#[derive(Debug, Clone, PartialEq)]
pub struct HashUpdate {
    /// Series hash key
    pub key: String,
    /// Index set the series key is registered in
    pub index_key: String,
    /// Metadata blob written on first write
    pub meta: String,
    /// Field whose absence marks this update as a first write
    pub probe_field: String,
    /// Mutations, applied in order
    pub mutations: Vec<FieldMutation>,
}

impl HashUpdate {
    /// Start an update of `key`, registering into `index_key`
    pub fn new(key: impl Into<String>, index_key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            index_key: index_key.into(),
            meta: String::new(),
            probe_field: String::new(),
            mutations: Vec::new(),
        }
    }

    /// Set the metadata blob
    pub fn with_meta(mut self, meta: impl Into<String>) -> Self {
        self.meta = meta.into();
        self
    }

    /// Set the first-write probe field
    pub fn with_probe_field(mut self, field: impl Into<String>) -> Self {
        self.probe_field = field.into();
        self
    }

    /// Append a mutation
    pub fn mutate(mut self, mutation: FieldMutation) -> Self {
        self.mutations.push(mutation);
        self
    }
}

/// Result of a [`HashUpdate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashUpdateOutcome {
    /// Post-mutation value of the first mutated field, as stored
    pub value: String,
    /// Whether this call added the series key to its index set
    pub registered: bool,
}

/// Store trait for the metrics engine
///
/// All implementations must be `Send + Sync + Debug` and safe to share across
/// tasks and processes. Every method is a single round trip; none retries.
///
/// # Errors
///
/// Transport and backend failures surface as [`StorageError`]. Missing keys are
/// never errors: reads return empty collections or `None`.
#[async_trait]
pub trait MetricStore: Send + Sync + Debug {
    /// Atomically apply a series hash update
    ///
    /// # Errors
    ///
    /// Returns an error if the update has no mutations, a mutation is rejected
    /// by the backend (e.g. integer increment of a float field), or the
    /// transaction fails.
    async fn update_hash(&self, update: &HashUpdate) -> StorageResult<HashUpdateOutcome>;

    /// Read every field of a hash, sorted by field name
    ///
    /// A missing key yields an empty map.
    async fn hash_get_all(&self, key: &str) -> StorageResult<BTreeMap<String, String>>;

    /// Read the members of a set
    ///
    /// A missing key yields an empty list.
    async fn set_members(&self, key: &str) -> StorageResult<Vec<String>>;

    /// Read a scalar key
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Create a scalar key only if it does not exist
    ///
    /// With `ttl`, the key expires after that duration (millisecond precision).
    /// Returns `true` if the key was created.
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> StorageResult<bool>;

    /// List live keys matching a glob pattern, sorted
    async fn keys_matching(&self, pattern: &str) -> StorageResult<Vec<String>>;

    /// Delete a key of any type
    ///
    /// Deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Atomically delete every key matching a glob pattern
    ///
    /// Returns the number of deleted keys.
    async fn delete_matching(&self, pattern: &str) -> StorageResult<u64>;
}

/// Escape glob metacharacters so `literal` only matches itself
///
/// Escapes `*`, `?`, `[`, `]` and `\` with a backslash, which both Redis and
/// the in-memory matcher understand.
pub fn escape_pattern(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());
    for c in literal.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
