//! Pool ownership registry for lockpool.
//!
//! The registry is the source of truth for pool identifiers, current
//! ownership, and which provider is authoritative for each pool. It holds
//! the deployment's approved-provider capability table and dispatches
//! external withdraw/split/query calls to the pool's top-of-chain provider.

pub mod registry;

pub use registry::PoolRegistry;
