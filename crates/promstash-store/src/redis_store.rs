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

//! Redis store backend
//!
//! Implements [`MetricStore`] on top of a Redis server (or any server speaking
//! the Redis protocol with Lua scripting, such as Valkey or KeyDB).
//!
//! - `update_hash` runs as a single Lua script, so the probe, the field
//!   mutations and the index registration are one transaction
//! - `delete_matching` runs a SCAN/DEL loop inside a Lua script
//! - `keys_matching` uses cursor-based `SCAN`, never `KEYS`
//! - The connection is a [`ConnectionManager`], which reconnects on failure
//!   and can be cloned freely across tasks
//!
//! # Examples
//!
//! ```rust,no_run
//! use promstash_store::{MetricStore, RedisStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = RedisStore::connect("redis://127.0.0.1:6379/0").await?;
//!     let keys = store.keys_matching("prometheus:*").await?;
//!     println!("{} keys", keys.len());
//!     Ok(())
//! }
//! ```
//!
//! # Testing with a local server
//!
//! ```bash
//! docker run --rm -p 6379:6379 redis:7
//! export PROMSTASH_TEST_REDIS_URL=redis://127.0.0.1:6379/15
//! cargo test -p promstash-store --test redis_store_tests -- --ignored
//! ```

use crate::{HashUpdate, HashUpdateOutcome, MetricStore, StorageError, StorageResult, META_FIELD};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::Script;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

/// KEYS[1] series hash, KEYS[2] index set.
/// ARGV[1] probe field, ARGV[2] meta field, ARGV[3] meta blob, then
/// (op, field, operand) triples.
const UPDATE_SCRIPT: &str = r#"
local fresh = redis.call('HEXISTS', KEYS[1], ARGV[1]) == 0
local result
for i = 4, #ARGV, 3 do
    local op, field, operand = ARGV[i], ARGV[i + 1], ARGV[i + 2]
    local r
    if op == 'set' then
        redis.call('HSET', KEYS[1], field, operand)
        r = operand
    elseif op == 'incrby' then
        r = redis.call('HINCRBY', KEYS[1], field, operand)
        -- tostring would render large totals as %.14g
        r = string.format('%d', r)
    elseif op == 'incrbyfloat' then
        r = redis.call('HINCRBYFLOAT', KEYS[1], field, operand)
    else
        return redis.error_reply('unknown hash operation ' .. op)
    end
    if result == nil then
        result = r
    end
end
local registered = 0
if fresh then
    redis.call('HSETNX', KEYS[1], ARGV[2], ARGV[3])
    registered = redis.call('SADD', KEYS[2], KEYS[1])
end
return {tostring(result), registered}
"#;

/// ARGV[1] glob pattern.
const WIPE_SCRIPT: &str = r#"
local cursor = '0'
local deleted = 0
repeat
    local page = redis.call('SCAN', cursor, 'MATCH', ARGV[1], 'COUNT', 1000)
    cursor = page[1]
    for _, key in ipairs(page[2]) do
        deleted = deleted + redis.call('DEL', key)
    end
until cursor == '0'
return deleted
"#;

const SCAN_COUNT: u64 = 1000;

/// Redis-backed metric store
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    endpoint: String,
    update_script: Script,
    wipe_script: Script,
}

impl RedisStore {
    /// Connect to `url` (`redis://[:password@]host[:port][/db]`)
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is malformed or the server does not
    /// answer a `PING`.
    pub async fn connect(url: &str) -> StorageResult<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| StorageError::connection(format!("invalid redis url: {}", e)))?;
        let endpoint = client.get_connection_info().addr.to_string();

        let mut conn = ConnectionManager::new(client).await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        debug!(endpoint = %endpoint, reply = %pong, "redis ping");
        info!(endpoint = %endpoint, "connected to redis store");

        Ok(RedisStore {
            conn,
            endpoint,
            update_script: Script::new(UPDATE_SCRIPT),
            wipe_script: Script::new(WIPE_SCRIPT),
        })
    }

    /// Address of the connected server
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Map a server error for `key`, keeping type mismatches distinguishable
fn classify(key: &str, err: redis::RedisError) -> StorageError {
    let detail = err.to_string();
    if err.code() == Some("WRONGTYPE")
        || detail.contains("not an integer")
        || detail.contains("not a valid float")
    {
        StorageError::wrong_type(key, detail)
    } else {
        StorageError::from(err)
    }
}

/// Milliseconds for `PX`; Redis rejects zero
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl MetricStore for RedisStore {
    async fn update_hash(&self, update: &HashUpdate) -> StorageResult<HashUpdateOutcome> {
        if update.key.is_empty() || update.index_key.is_empty() {
            return Err(StorageError::invalid_request("key cannot be empty"));
        }
        if update.mutations.is_empty() {
            return Err(StorageError::invalid_request("hash update has no mutations"));
        }

        let mut invocation = self.update_script.prepare_invoke();
        invocation
            .key(&update.key)
            .key(&update.index_key)
            .arg(&update.probe_field)
            .arg(META_FIELD)
            .arg(&update.meta);
        for mutation in &update.mutations {
            invocation
                .arg(mutation.op.as_str())
                .arg(&mutation.field)
                .arg(&mutation.operand);
        }

        let mut conn = self.conn.clone();
        let (value, registered): (String, i64) = invocation
            .invoke_async(&mut conn)
            .await
            .map_err(|e| classify(&update.key, e))?;

        Ok(HashUpdateOutcome {
            value,
            registered: registered == 1,
        })
    }

    async fn hash_get_all(&self, key: &str) -> StorageResult<BTreeMap<String, String>> {
        let mut conn = self.conn.clone();
        let fields: BTreeMap<String, String> = redis::cmd("HGETALL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| classify(key, e))?;
        Ok(fields)
    }

    async fn set_members(&self, key: &str) -> StorageResult<Vec<String>> {
        let mut conn = self.conn.clone();
        let mut members: Vec<String> = redis::cmd("SMEMBERS")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| classify(key, e))?;
        members.sort();
        Ok(members)
    }

    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| classify(key, e))?;
        Ok(value)
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

        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value).arg("NX");
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(ttl_millis(ttl));
        }

        let mut conn = self.conn.clone();
        let reply: Option<String> = cmd
            .query_async(&mut conn)
            .await
            .map_err(|e| classify(key, e))?;
        Ok(reply.is_some())
    }

    async fn keys_matching(&self, pattern: &str) -> StorageResult<Vec<String>> {
        let mut conn = self.conn.clone();
        let mut keys = BTreeSet::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, page): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await?;
            // SCAN may return a key more than once.
            keys.extend(page);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(keys.into_iter().collect())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let mut conn = self.conn.clone();
        let _removed: i64 = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
        Ok(())
    }

    async fn delete_matching(&self, pattern: &str) -> StorageResult<u64> {
        let mut conn = self.conn.clone();
        let deleted: u64 = self
            .wipe_script
            .arg(pattern)
            .invoke_async(&mut conn)
            .await?;
        debug!(pattern = %pattern, deleted, "deleted matching keys");
        Ok(deleted)
    }
}
