use std::time::Duration;

/// Configuration for the Redis state store backend.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (e.g. `redis://127.0.0.1:6379`).
    pub url: String,

    /// Key prefix applied to every Redis key to avoid collisions.
    pub prefix: String,

    /// Number of connections in the `deadpool-redis` pool.
    pub pool_size: usize,

    /// Timeout for acquiring a pooled connection.
    pub connection_timeout: Duration,
}

impl RedisConfig {
    /// Create a config for the given URL with default pool settings.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: String::from("redis://127.0.0.1:6379"),
            prefix: String::from("taggate"),
            pool_size: 10,
            connection_timeout: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let cfg = RedisConfig::default();
        assert_eq!(cfg.url, "redis://127.0.0.1:6379");
        assert_eq!(cfg.prefix, "taggate");
        assert_eq!(cfg.pool_size, 10);
        assert_eq!(cfg.connection_timeout, Duration::from_secs(5));
    }

    #[test]
    fn new_overrides_url_only() {
        let cfg = RedisConfig::new("redis://cache.internal:6380");
        assert_eq!(cfg.url, "redis://cache.internal:6380");
        assert_eq!(cfg.prefix, "taggate");
    }
}
