use std::fmt;

use serde::{Deserialize, Serialize};

use crate::account::AccountId;

/// Quantity of a fungible asset. All release arithmetic is integer-exact.
pub type Amount = u128;

/// Wall-clock seconds since the UNIX epoch, sampled once per call by the
/// external caller.
pub type Timestamp = u64;

/// Unique pool identifier. Assigned monotonically by the registry and never
/// reused, even after a pool is burned or a mint is rolled back.
#[derive(
    Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Debug, Default,
)]
pub struct PoolId(pub u64);

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pool#{}", self.0)
    }
}

/// Registry-level identity of a pool: who owns it and what asset it holds.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct PoolInfo {
    pub pool_id: PoolId,
    pub owner: AccountId,
    pub asset: AccountId,
}

/// Externally reported pool state.
///
/// `params` layout is layer-specific:
/// - base ledger: `[remaining]`
/// - time gate: `[remaining, start]`
/// - vesting: `[remaining, start, finish, basis]`
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct PoolData {
    pub pool_info: PoolInfo,
    pub params: Vec<Amount>,
}

impl PoolData {
    /// The remaining amount, which every layer reports at `params[0]`.
    pub fn remaining(&self) -> Amount {
        self.params.first().copied().unwrap_or(0)
    }
}
