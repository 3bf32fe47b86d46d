//! Ephemeral key/value store.
//!
//! Holds pairing tickets, name reservations, the time-ordered user indices and the audit log.
//! Absence is always a return value (`None`, `false`, empty collection), never an error.
//!
//! Two implementations exist: [`RedisStore`] on top of a fred connection pool, and
//! [`MemoryStore`] for single-node deployments and tests.

pub mod keys;
pub mod memory;
pub mod redis;

mod lua;

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;

pub use memory::MemoryStore;
pub use redis::RedisStore;

use crate::error::store::StoreError;

/// Direction for sorted set range queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// A single write submitted through [`EphemeralStore::batch`].
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Overwrite a string value, optionally with a TTL.
    Set {
        key: String,
        value: String,
        ttl: Option<Duration>,
    },
    /// Set one or more hash fields.
    HashSet {
        key: String,
        fields: Vec<(String, String)>,
    },
    HashDelete {
        key: String,
        field: String,
    },
    /// Push a value at the head of a list.
    ListPush {
        key: String,
        value: String,
    },
    SortedSetAdd {
        key: String,
        member: String,
        score: f64,
    },
    SortedSetRemove {
        key: String,
        member: String,
    },
    /// Set a TTL on an existing key.
    Expire {
        key: String,
        ttl: Duration,
    },
    Delete {
        key: String,
    },
}

/// Key/value store with TTLs, hashes, sorted sets and lists.
#[async_trait]
pub trait EphemeralStore: Send + Sync {
    /// Sets `key` to `value` only when the key does not exist.
    ///
    /// Returns `true` when the value was written.
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Returns `true` when a key was removed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Sets a TTL on an existing key, returning `false` when the key does not exist.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError>;

    /// Sets a hash field only when the field does not exist.
    ///
    /// Returns `true` when the field was written.
    async fn hash_set_if_absent(
        &self,
        key: &str,
        field: &str,
        value: &str,
    ) -> Result<bool, StoreError>;

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, StoreError>;

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, StoreError>;

    async fn hash_delete(&self, key: &str, field: &str) -> Result<bool, StoreError>;

    /// Atomically deletes a hash field if it currently holds `expected`.
    async fn hash_delete_if_eq(
        &self,
        key: &str,
        field: &str,
        expected: &str,
    ) -> Result<bool, StoreError>;

    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<(), StoreError>;

    /// Members with `min <= score <= max` in the requested order, at most `limit` of them.
    async fn zrange_by_score(
        &self,
        key: &str,
        min: f64,
        max: f64,
        order: SortOrder,
        limit: Option<usize>,
    ) -> Result<Vec<(String, f64)>, StoreError>;

    async fn zrem(&self, key: &str, member: &str) -> Result<bool, StoreError>;

    /// Inclusive list range; negative indices count from the tail.
    async fn list_range(&self, key: &str, start: i64, stop: i64)
        -> Result<Vec<String>, StoreError>;

    /// Atomically deletes a string key if it currently holds `expected`.
    async fn delete_if_eq(&self, key: &str, expected: &str) -> Result<bool, StoreError>;

    /// Submits all commands in one round-trip.
    ///
    /// The outer error reports a failure to submit the batch at all; otherwise each command's
    /// reply is returned in submission order.
    async fn batch(
        &self,
        commands: Vec<Command>,
    ) -> Result<Vec<Result<(), StoreError>>, StoreError>;
}

/// Collapses batch replies into the first failure, if any.
pub fn first_failure(replies: Vec<Result<(), StoreError>>) -> Result<(), StoreError> {
    replies.into_iter().collect()
}
