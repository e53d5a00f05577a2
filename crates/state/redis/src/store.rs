use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use redis::AsyncCommands;

use taggate_state::error::StateError;
use taggate_state::key::StateKey;
use taggate_state::store::StateStore;

use crate::config::RedisConfig;
use crate::key_render::render_key;

/// Redis-backed implementation of [`StateStore`].
///
/// Counters and plain values are Redis strings; cached resource collections
/// are Redis hashes. TTLs are applied with `PEXPIRE` after the write so a
/// write always refreshes the key's lifetime.
pub struct RedisStateStore {
    pool: Pool,
    prefix: String,
}

impl RedisStateStore {
    /// Create a new `RedisStateStore` from the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Connection`] if the pool cannot be created.
    pub fn new(config: &RedisConfig) -> Result<Self, StateError> {
        let cfg = Config::from_url(&config.url);
        let pool = cfg
            .builder()
            .map(|b| {
                b.max_size(config.pool_size)
                    .wait_timeout(Some(config.connection_timeout))
                    .runtime(Runtime::Tokio1)
                    .build()
            })
            .map_err(|e| StateError::Connection(e.to_string()))?
            .map_err(|e| StateError::Connection(e.to_string()))?;

        Ok(Self {
            pool,
            prefix: config.prefix.clone(),
        })
    }

    /// Build the full Redis key.
    fn redis_key(&self, key: &StateKey) -> String {
        render_key(&self.prefix, key)
    }

    /// Obtain a connection from the pool.
    async fn conn(&self) -> Result<deadpool_redis::Connection, StateError> {
        self.pool
            .get()
            .await
            .map_err(|e| StateError::Connection(e.to_string()))
    }

    /// Apply a TTL to a key if one was requested.
    async fn apply_ttl(
        conn: &mut deadpool_redis::Connection,
        redis_key: &str,
        ttl: Option<Duration>,
    ) -> Result<(), StateError> {
        if let Some(d) = ttl {
            let ms = i64::try_from(d.as_millis()).unwrap_or(i64::MAX);
            let () = conn
                .pexpire(redis_key, ms)
                .await
                .map_err(|e| StateError::Backend(e.to_string()))?;
        }
        Ok(())
    }
}

#[async_trait]
impl StateStore for RedisStateStore {
    async fn get(&self, key: &StateKey) -> Result<Option<String>, StateError> {
        let redis_key = self.redis_key(key);
        let mut conn = self.conn().await?;

        let val: Option<String> = conn
            .get(&redis_key)
            .await
            .map_err(|e| StateError::Backend(e.to_string()))?;

        Ok(val)
    }

    async fn set(
        &self,
        key: &StateKey,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), StateError> {
        let redis_key = self.redis_key(key);
        let mut conn = self.conn().await?;

        let () = conn
            .set(&redis_key, value)
            .await
            .map_err(|e| StateError::Backend(e.to_string()))?;

        Self::apply_ttl(&mut conn, &redis_key, ttl).await
    }

    async fn delete(&self, key: &StateKey) -> Result<bool, StateError> {
        let redis_key = self.redis_key(key);
        let mut conn = self.conn().await?;

        let deleted: i64 = conn
            .del(&redis_key)
            .await
            .map_err(|e| StateError::Backend(e.to_string()))?;

        Ok(deleted > 0)
    }

    async fn increment(
        &self,
        key: &StateKey,
        delta: i64,
        ttl: Option<Duration>,
    ) -> Result<i64, StateError> {
        // INCRBY is atomic on the server, which is what makes concurrent
        // rate-limit admission safe across processes.
        let redis_key = self.redis_key(key);
        let mut conn = self.conn().await?;

        let new_val: i64 = conn
            .incr(&redis_key, delta)
            .await
            .map_err(|e| StateError::Backend(e.to_string()))?;

        Self::apply_ttl(&mut conn, &redis_key, ttl).await?;

        Ok(new_val)
    }

    async fn hash_get_all(
        &self,
        key: &StateKey,
    ) -> Result<Option<HashMap<String, String>>, StateError> {
        let redis_key = self.redis_key(key);
        let mut conn = self.conn().await?;

        // HGETALL on a missing key returns an empty map; both read as a miss.
        let fields: HashMap<String, String> = conn
            .hgetall(&redis_key)
            .await
            .map_err(|e| StateError::Backend(e.to_string()))?;

        if fields.is_empty() {
            Ok(None)
        } else {
            Ok(Some(fields))
        }
    }

    async fn hash_put(
        &self,
        key: &StateKey,
        fields: &[(String, String)],
        ttl: Option<Duration>,
    ) -> Result<(), StateError> {
        if fields.is_empty() {
            return Ok(());
        }

        let redis_key = self.redis_key(key);
        let mut conn = self.conn().await?;

        let () = conn
            .hset_multiple(&redis_key, fields)
            .await
            .map_err(|e| StateError::Backend(e.to_string()))?;

        Self::apply_ttl(&mut conn, &redis_key, ttl).await
    }

    async fn hash_remove(&self, key: &StateKey, fields: &[String]) -> Result<u64, StateError> {
        if fields.is_empty() {
            return Ok(0);
        }

        let redis_key = self.redis_key(key);
        let mut conn = self.conn().await?;

        let removed: u64 = conn
            .hdel(&redis_key, fields)
            .await
            .map_err(|e| StateError::Backend(e.to_string()))?;

        Ok(removed)
    }
}
