use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::StateError;
use crate::key::StateKey;

/// Trait for the shared state store backing rate limiting and caching.
///
/// Implementations must be `Send + Sync` and safe for concurrent access from
/// multiple processes; `increment` in particular must be atomic in the
/// backend, since rate-limit admission depends on it.
///
/// Two storage shapes are supported under one key space: plain string
/// entries (counters, markers) and hash entries (a map of field -> value,
/// used for cached resource collections). A given key is only ever used with
/// one shape.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Get the value for a key. Returns `None` if not found or expired.
    async fn get(&self, key: &StateKey) -> Result<Option<String>, StateError>;

    /// Set a value with an optional TTL, overwriting any previous value.
    async fn set(
        &self,
        key: &StateKey,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), StateError>;

    /// Delete a key (either shape). Returns `true` if the key existed.
    async fn delete(&self, key: &StateKey) -> Result<bool, StateError>;

    /// Atomically increment a counter by `delta`. Returns the new value.
    /// Creates the counter at 0 if it doesn't exist before incrementing.
    async fn increment(
        &self,
        key: &StateKey,
        delta: i64,
        ttl: Option<Duration>,
    ) -> Result<i64, StateError>;

    /// Read every field of a hash entry. Returns `None` when the key is
    /// missing or expired; an existing-but-empty hash returns `None` too, so
    /// callers can treat both as a cache miss.
    async fn hash_get_all(
        &self,
        key: &StateKey,
    ) -> Result<Option<HashMap<String, String>>, StateError>;

    /// Write the given fields into a hash entry, creating it if absent, and
    /// refresh the key's TTL. Fields not named are left untouched.
    async fn hash_put(
        &self,
        key: &StateKey,
        fields: &[(String, String)],
        ttl: Option<Duration>,
    ) -> Result<(), StateError>;

    /// Remove the named fields from a hash entry. Returns the number of
    /// fields that existed. Removing the last field removes the key.
    async fn hash_remove(&self, key: &StateKey, fields: &[String]) -> Result<u64, StateError>;
}
