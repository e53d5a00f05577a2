//! Per-tenant caching of upstream GTM/GA4 resources.
//!
//! List screens are the dashboard's hottest path, and every upstream list
//! call spends tenant quota. [`ResourceCache`] keeps one hash per
//! `(tenant, feature)` in the shared state store — a field per resource id —
//! read through on lists and patched in place after mutations. The
//! *soft revalidate* path updates or evicts only the affected fields instead
//! of flushing the key, so one write does not trigger a re-fetch storm for
//! everything else the tenant has cached.

mod cache;
mod revalidate;

pub use cache::{CacheConfig, CacheError, CacheOp, CacheRead, ResourceCache};
pub use revalidate::{NoopRevalidator, RouteRevalidator};
