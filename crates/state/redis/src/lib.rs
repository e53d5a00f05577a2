//! Redis state backend for Taggate.
//!
//! Provides the Redis-backed implementation of the
//! [`StateStore`](taggate_state::StateStore) trait used in multi-instance
//! deployments, where rate-limit counters and cached upstream resources must
//! be shared across every dashboard process.
//!
//! - **Counters**: plain string keys mutated with `INCRBY` (atomic on the
//!   server, which is what makes the distributed rate limiter safe).
//! - **Resource caches**: one Redis hash per `{family, tenant, feature}`
//!   with a field per resource id, expired with `PEXPIRE`.
//! - **Connection pooling**: `deadpool-redis`.

mod config;
mod key_render;
mod store;

pub use config::RedisConfig;
pub use store::RedisStateStore;
