//! Throttled execution of upstream API calls for Taggate.
//!
//! The distributed rate limiter keeps a tenant inside its long-term quota,
//! but a single batch fanning out over many resources can still trip the
//! upstream's instantaneous throttling. This crate provides the in-process
//! half of the defense: [`UpstreamExecutor`] caps concurrent outbound calls,
//! spaces dispatches by a minimum interval, and retries quota (HTTP 429)
//! rejections with exponential backoff — and nothing else.

mod config;
mod executor;
mod retry;

pub use config::ExecutorConfig;
pub use executor::{ExecutionFailure, UpstreamExecutor};
pub use retry::RetryStrategy;
