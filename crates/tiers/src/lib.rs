//! Subscription tier usage gating for Taggate.
//!
//! Every paid plan caps how many creates, updates, and deletes a tenant may
//! perform per feature. Admission happens *before* any upstream call: the
//! gate atomically reserves usage for the whole batch, and after the batch
//! settles it releases the reservations that went unused. The reserve is a
//! single conditional increment in the backing store, so two concurrent
//! batches for the same tenant can never jointly overshoot a limit.

pub mod error;
pub mod gate;
pub mod limits;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::TierError;
pub use gate::{Reservation, TierLimitGate, TierStatus};
pub use limits::{TierLimitRow, TierLimits};
pub use memory::MemoryTierStore;
pub use postgres::{PostgresTierConfig, PostgresTierStore};
pub use store::TierStore;
