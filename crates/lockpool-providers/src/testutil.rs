//! Test doubles and cascade wiring shared by the provider tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use lockpool_ledger::{BaseLedgerProvider, InMemoryCustodian, OwnershipRegistry, PoolProvider};
use lockpool_types::{AccountId, MemoryEventLog, PoolError, PoolId, PoolInfo};

use crate::timegate::TimeGateProvider;
use crate::vesting::VestingProvider;

/// Minimal registry double: sequential identifiers, explicit approval
/// list, burn resets the owner to the zero sentinel.
#[derive(Default)]
pub(crate) struct StubRegistry {
    state: Mutex<StubState>,
}

#[derive(Default)]
struct StubState {
    next_id: u64,
    pools: HashMap<PoolId, PoolInfo>,
    active: HashMap<PoolId, AccountId>,
    approved: Vec<AccountId>,
}

impl StubRegistry {
    pub(crate) fn approve(&self, account: AccountId) {
        self.state.lock().unwrap().approved.push(account);
    }

    pub(crate) fn pool_count(&self) -> usize {
        self.state.lock().unwrap().pools.len()
    }
}

impl OwnershipRegistry for StubRegistry {
    fn mint_next(
        &self,
        provider: AccountId,
        owner: AccountId,
        asset: AccountId,
    ) -> Result<PoolId, PoolError> {
        if !self.is_approved_provider(provider) {
            return Err(PoolError::UnauthorizedProvider);
        }
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let pool_id = PoolId(state.next_id);
        state.pools.insert(pool_id, PoolInfo { pool_id, owner, asset });
        state.active.insert(pool_id, provider);
        Ok(pool_id)
    }

    fn rollback_mint(&self, caller: AccountId, pool: PoolId) -> Result<(), PoolError> {
        if !self.is_approved_provider(caller) {
            return Err(PoolError::UnauthorizedProvider);
        }
        let mut state = self.state.lock().unwrap();
        state.pools.remove(&pool);
        state.active.remove(&pool);
        Ok(())
    }

    fn owner_of(&self, pool: PoolId) -> Result<AccountId, PoolError> {
        Ok(self.pool_info(pool)?.owner)
    }

    fn pool_info(&self, pool: PoolId) -> Result<PoolInfo, PoolError> {
        self.state
            .lock()
            .unwrap()
            .pools
            .get(&pool)
            .copied()
            .ok_or(PoolError::UnknownPool(pool))
    }

    fn active_provider(&self, pool: PoolId) -> Result<AccountId, PoolError> {
        self.state
            .lock()
            .unwrap()
            .active
            .get(&pool)
            .copied()
            .ok_or(PoolError::UnknownPool(pool))
    }

    fn is_approved_provider(&self, account: AccountId) -> bool {
        self.state.lock().unwrap().approved.contains(&account)
    }

    fn set_active_provider(
        &self,
        caller: AccountId,
        pool: PoolId,
        provider: AccountId,
    ) -> Result<(), PoolError> {
        if !self.is_approved_provider(caller) {
            return Err(PoolError::UnauthorizedProvider);
        }
        self.state.lock().unwrap().active.insert(pool, provider);
        Ok(())
    }

    fn burn(&self, caller: AccountId, pool: PoolId) -> Result<(), PoolError> {
        if !self.is_approved_provider(caller) {
            return Err(PoolError::UnauthorizedProvider);
        }
        let mut state = self.state.lock().unwrap();
        if let Some(info) = state.pools.get_mut(&pool) {
            info.owner = AccountId::ZERO;
        }
        Ok(())
    }
}

/// A fully wired base <- gate <- vesting cascade over stub collaborators.
pub(crate) struct Cascade {
    pub registry: Arc<StubRegistry>,
    pub custodian: Arc<InMemoryCustodian>,
    pub events: Arc<MemoryEventLog>,
    pub base: Arc<BaseLedgerProvider>,
    pub gate: Arc<TimeGateProvider>,
    pub vesting: Arc<VestingProvider>,
    pub alice: AccountId,
    pub bob: AccountId,
    pub token: AccountId,
}

pub(crate) fn cascade() -> Cascade {
    let registry = Arc::new(StubRegistry::default());
    let custodian = Arc::new(InMemoryCustodian::new());
    let events = Arc::new(MemoryEventLog::new());

    let base = Arc::new(BaseLedgerProvider::new(
        AccountId::derive("base-provider"),
        registry.clone(),
        custodian.clone(),
        events.clone(),
    ));
    let gate = Arc::new(TimeGateProvider::new(
        AccountId::derive("timegate-provider"),
        registry.clone(),
        base.clone(),
        events.clone(),
    ));
    let vesting = Arc::new(VestingProvider::new(
        AccountId::derive("vesting-provider"),
        registry.clone(),
        gate.clone(),
        events.clone(),
    ));
    registry.approve(base.provider_ref());
    registry.approve(gate.provider_ref());
    registry.approve(vesting.provider_ref());

    let alice = AccountId::derive("alice");
    let bob = AccountId::derive("bob");
    let token = AccountId::derive("token");
    custodian.fund(alice, token, 10_000_000);

    Cascade {
        registry,
        custodian,
        events,
        base,
        gate,
        vesting,
        alice,
        bob,
        token,
    }
}
