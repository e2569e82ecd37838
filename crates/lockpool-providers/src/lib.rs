//! Policy layers of the lockpool provider cascade.
//!
//! Each provider here wraps a simpler layer, delegates primitive ledger
//! mutations to it, and adds its own withdrawal/split semantics on top:
//!
//! - [`TimeGateProvider`] — nothing is withdrawable before an activation
//!   timestamp; everything is after it
//! - [`VestingProvider`] — withdrawable amount is a linear function of
//!   elapsed time over a vesting window, net of prior withdrawals
//! - [`RelayProvider`] — pass-through higher-order composite; the minimal
//!   shape of refund-backed, collateral-backed, or bundled layers

pub mod relay;
pub mod timegate;
pub mod vesting;

#[cfg(test)]
pub(crate) mod testutil;

pub use relay::RelayProvider;
pub use timegate::{PoolPhase, TimeGateProvider};
pub use vesting::{VestingProvider, VestingSchedule};
