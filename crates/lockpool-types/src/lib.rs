//! Foundation types for lockpool.
//!
//! This crate provides the identity, amount, and event types used
//! throughout the lockpool system. Every other lockpool crate depends on
//! `lockpool-types`.
//!
//! # Key Types
//!
//! - [`AccountId`] — Opaque account/asset reference with a zero sentinel
//! - [`PoolId`] — Monotonically assigned pool identifier, never reused
//! - [`PoolInfo`] / [`PoolData`] — Externally reported pool state
//! - [`PoolError`] — The full failure taxonomy for cascade operations
//! - [`PoolEvent`] — Creation, split, and closure events for indexers

pub mod account;
pub mod error;
pub mod events;
pub mod pool;

pub use account::AccountId;
pub use error::PoolError;
pub use events::{EventSink, MemoryEventLog, PoolEvent};
pub use pool::{Amount, PoolData, PoolId, PoolInfo, Timestamp};
