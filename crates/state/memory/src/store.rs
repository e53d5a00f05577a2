use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use taggate_state::error::StateError;
use taggate_state::key::StateKey;
use taggate_state::store::StateStore;

/// Stored payload of one entry: either a plain string (values, counters) or
/// a hash of fields (cached resource collections).
#[derive(Debug, Clone)]
enum Stored {
    Value(String),
    Hash(HashMap<String, String>),
}

/// A single entry in the in-memory store.
#[derive(Debug, Clone)]
struct Entry {
    stored: Stored,
    expires_at: Option<Instant>,
}

impl Entry {
    /// Returns `true` if this entry has passed its TTL deadline.
    fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// Compute the expiry instant from an optional TTL duration.
fn expiry_from_ttl(ttl: Option<Duration>) -> Option<Instant> {
    ttl.map(|d| Instant::now() + d)
}

/// In-memory [`StateStore`] backed by a [`DashMap`].
///
/// Entries are lazily evicted on access when their TTL has elapsed. This
/// implementation is fully synchronous internally; the async trait methods
/// return immediately.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    data: DashMap<String, Entry>,
}

impl MemoryStateStore {
    /// Create a new, empty in-memory state store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Render a [`StateKey`] into the string used as the map key.
    fn render_key(key: &StateKey) -> String {
        key.canonical()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get(&self, key: &StateKey) -> Result<Option<String>, StateError> {
        let rendered = Self::render_key(key);

        // Lazy TTL eviction: check and remove if expired.
        if let Some(entry) = self.data.get(&rendered) {
            if entry.is_expired() {
                drop(entry);
                self.data.remove(&rendered);
                return Ok(None);
            }
            return match &entry.stored {
                Stored::Value(v) => Ok(Some(v.clone())),
                Stored::Hash(_) => Err(StateError::Serialization(format!(
                    "key {rendered} holds a hash, not a value"
                ))),
            };
        }

        Ok(None)
    }

    async fn set(
        &self,
        key: &StateKey,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), StateError> {
        let rendered = Self::render_key(key);
        self.data.insert(
            rendered,
            Entry {
                stored: Stored::Value(value.to_owned()),
                expires_at: expiry_from_ttl(ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &StateKey) -> Result<bool, StateError> {
        let rendered = Self::render_key(key);

        // Remove, but treat expired entries as "not found".
        match self.data.remove(&rendered) {
            Some((_, entry)) => Ok(!entry.is_expired()),
            None => Ok(false),
        }
    }

    async fn increment(
        &self,
        key: &StateKey,
        delta: i64,
        ttl: Option<Duration>,
    ) -> Result<i64, StateError> {
        let rendered = Self::render_key(key);
        let expires_at = expiry_from_ttl(ttl);

        // Remove any expired entry first so the counter starts fresh.
        self.data.remove_if(&rendered, |_, entry| entry.is_expired());

        let mut ref_mut = self.data.entry(rendered.clone()).or_insert_with(|| Entry {
            stored: Stored::Value("0".to_owned()),
            expires_at,
        });

        let Stored::Value(ref mut raw) = ref_mut.stored else {
            return Err(StateError::Serialization(format!(
                "key {rendered} holds a hash, not a counter"
            )));
        };

        let current: i64 = raw.parse().map_err(|e: std::num::ParseIntError| {
            StateError::Serialization(format!("counter value is not an integer: {e}"))
        })?;

        let new_value = current + delta;
        *raw = new_value.to_string();
        if let Some(ea) = expires_at {
            ref_mut.expires_at = Some(ea);
        }

        Ok(new_value)
    }

    async fn hash_get_all(
        &self,
        key: &StateKey,
    ) -> Result<Option<HashMap<String, String>>, StateError> {
        let rendered = Self::render_key(key);

        if let Some(entry) = self.data.get(&rendered) {
            if entry.is_expired() {
                drop(entry);
                self.data.remove(&rendered);
                return Ok(None);
            }
            return match &entry.stored {
                Stored::Hash(fields) if fields.is_empty() => Ok(None),
                Stored::Hash(fields) => Ok(Some(fields.clone())),
                Stored::Value(_) => Err(StateError::Serialization(format!(
                    "key {rendered} holds a value, not a hash"
                ))),
            };
        }

        Ok(None)
    }

    async fn hash_put(
        &self,
        key: &StateKey,
        fields: &[(String, String)],
        ttl: Option<Duration>,
    ) -> Result<(), StateError> {
        let rendered = Self::render_key(key);
        let expires_at = expiry_from_ttl(ttl);

        self.data.remove_if(&rendered, |_, entry| entry.is_expired());

        let mut ref_mut = self.data.entry(rendered.clone()).or_insert_with(|| Entry {
            stored: Stored::Hash(HashMap::new()),
            expires_at,
        });

        let Stored::Hash(ref mut map) = ref_mut.stored else {
            return Err(StateError::Serialization(format!(
                "key {rendered} holds a value, not a hash"
            )));
        };

        for (field, value) in fields {
            map.insert(field.clone(), value.clone());
        }
        // Writes refresh the TTL so live caches do not decay mid-session;
        // a write without a TTL leaves the existing deadline alone.
        if expires_at.is_some() {
            ref_mut.expires_at = expires_at;
        }

        Ok(())
    }

    async fn hash_remove(&self, key: &StateKey, fields: &[String]) -> Result<u64, StateError> {
        let rendered = Self::render_key(key);

        self.data.remove_if(&rendered, |_, entry| entry.is_expired());

        let Some(mut entry) = self.data.get_mut(&rendered) else {
            return Ok(0);
        };

        let Stored::Hash(ref mut map) = entry.stored else {
            return Err(StateError::Serialization(format!(
                "key {rendered} holds a value, not a hash"
            )));
        };

        let mut removed = 0u64;
        for field in fields {
            if map.remove(field).is_some() {
                removed += 1;
            }
        }
        let now_empty = map.is_empty();
        drop(entry);

        if now_empty {
            self.data.remove(&rendered);
        }

        Ok(removed)
    }
}
