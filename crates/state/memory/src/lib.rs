//! In-memory state store backend for Taggate.
//!
//! Backs the rate limiter and resource cache in tests and single-node
//! development runs. Counters are process-local here, so multi-instance
//! deployments must use the Redis backend instead.

mod store;

pub use store::MemoryStateStore;
