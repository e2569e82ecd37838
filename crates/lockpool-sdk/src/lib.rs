//! High-level facade for lockpool.
//!
//! Provides a wired-up [`Deployment`] — custodian, registry, and the
//! standard provider cascade — for applications embedding the pool ledger
//! and for end-to-end tests.

pub mod deployment;

pub use deployment::Deployment;

// Re-export key types
pub use lockpool_ledger::{BaseLedgerProvider, InMemoryCustodian, PoolProvider, ValueCustodian};
pub use lockpool_providers::{PoolPhase, TimeGateProvider, VestingProvider, VestingSchedule};
pub use lockpool_registry::PoolRegistry;
pub use lockpool_types::{
    AccountId, Amount, MemoryEventLog, PoolData, PoolError, PoolEvent, PoolId, Timestamp,
};
