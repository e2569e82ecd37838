use std::sync::Arc;

use tracing::info;

use lockpool_ledger::{BaseLedgerProvider, InMemoryCustodian, ValueCustodian};
use lockpool_providers::{TimeGateProvider, VestingProvider};
use lockpool_registry::PoolRegistry;
use lockpool_types::{
    AccountId, Amount, MemoryEventLog, PoolData, PoolError, PoolEvent, PoolId, Timestamp,
};

/// A fully wired lockpool deployment.
///
/// Owns the registry, an in-memory custodian, the event log, and the
/// standard provider cascade: a vesting layer over a time gate over the
/// leaf ledger. Callers create pools through the convenience constructors
/// and drive everything else through the registry dispatch surface.
pub struct Deployment {
    registry: Arc<PoolRegistry>,
    custodian: Arc<InMemoryCustodian>,
    events: Arc<MemoryEventLog>,
    base: Arc<BaseLedgerProvider>,
    time_gate: Arc<TimeGateProvider>,
    vesting: Arc<VestingProvider>,
}

impl Deployment {
    /// Wire up a deployment with the standard cascade, approving every
    /// layer at the registry.
    pub fn init() -> Self {
        let events: Arc<MemoryEventLog> = Arc::new(MemoryEventLog::new());
        let custodian = Arc::new(InMemoryCustodian::new());
        let registry = Arc::new(PoolRegistry::new(
            AccountId::derive("lockpool-registry"),
            events.clone(),
        ));

        let base = Arc::new(BaseLedgerProvider::new(
            AccountId::derive("base-provider"),
            registry.clone(),
            custodian.clone(),
            events.clone(),
        ));
        let time_gate = Arc::new(TimeGateProvider::new(
            AccountId::derive("timegate-provider"),
            registry.clone(),
            base.clone(),
            events.clone(),
        ));
        let vesting = Arc::new(VestingProvider::new(
            AccountId::derive("vesting-provider"),
            registry.clone(),
            time_gate.clone(),
            events.clone(),
        ));

        registry.set_approved_provider(base.clone(), true);
        registry.set_approved_provider(time_gate.clone(), true);
        registry.set_approved_provider(vesting.clone(), true);

        info!(registry = %registry.registry_ref(), "lockpool deployment initialized");
        Self {
            registry,
            custodian,
            events,
            base,
            time_gate,
            vesting,
        }
    }

    // ---- collaborators ----

    pub fn registry(&self) -> &Arc<PoolRegistry> {
        &self.registry
    }

    pub fn custodian(&self) -> &Arc<InMemoryCustodian> {
        &self.custodian
    }

    pub fn events(&self) -> &Arc<MemoryEventLog> {
        &self.events
    }

    pub fn base(&self) -> &Arc<BaseLedgerProvider> {
        &self.base
    }

    pub fn time_gate(&self) -> &Arc<TimeGateProvider> {
        &self.time_gate
    }

    pub fn vesting(&self) -> &Arc<VestingProvider> {
        &self.vesting
    }

    // ---- funding ----

    /// Seed an external balance at the in-memory custodian.
    pub fn fund(&self, account: AccountId, asset: AccountId, amount: Amount) {
        self.custodian.fund(account, asset, amount);
    }

    pub fn balance_of(&self, account: AccountId, asset: AccountId) -> Amount {
        self.custodian.balance_of(account, asset)
    }

    pub fn custodied(&self, asset: AccountId) -> Amount {
        self.custodian.custodied(asset)
    }

    // ---- pool creation ----

    /// A pool with no policy layer: its full amount is withdrawable
    /// immediately.
    pub fn create_basic_pool(
        &self,
        owner: AccountId,
        asset: AccountId,
        amount: Amount,
    ) -> Result<PoolId, PoolError> {
        self.base.create_new_pool(owner, asset, &[amount])
    }

    /// A pool that releases nothing before `start` and everything after.
    pub fn create_locked_pool(
        &self,
        owner: AccountId,
        asset: AccountId,
        amount: Amount,
        start: Timestamp,
    ) -> Result<PoolId, PoolError> {
        self.time_gate
            .create_new_pool(owner, asset, &[amount, Amount::from(start)])
    }

    /// A pool that vests linearly from `start` to `finish`. The vesting
    /// basis is the created amount.
    pub fn create_vesting_pool(
        &self,
        owner: AccountId,
        asset: AccountId,
        amount: Amount,
        start: Timestamp,
        finish: Timestamp,
    ) -> Result<PoolId, PoolError> {
        self.vesting.create_new_pool(
            owner,
            asset,
            &[amount, Amount::from(start), Amount::from(finish), amount],
        )
    }

    // ---- dispatch ----

    /// Withdraw up to `requested` (`None` = everything eligible) from a
    /// pool. Owner only; routed through the pool's active provider.
    pub fn withdraw(
        &self,
        caller: AccountId,
        pool: PoolId,
        requested: Option<Amount>,
        now: Timestamp,
    ) -> Result<Amount, PoolError> {
        self.registry.withdraw(caller, pool, requested, now)
    }

    /// Split `amount` out of a pool into a new pool owned by `new_owner`.
    pub fn split(
        &self,
        caller: AccountId,
        pool: PoolId,
        amount: Amount,
        new_owner: AccountId,
    ) -> Result<PoolId, PoolError> {
        self.registry.split(caller, pool, amount, new_owner)
    }

    pub fn withdrawable_amount(&self, pool: PoolId, now: Timestamp) -> Result<Amount, PoolError> {
        self.registry.withdrawable_amount(pool, now)
    }

    pub fn get_data(&self, pool: PoolId) -> Result<PoolData, PoolError> {
        self.registry.get_data(pool)
    }

    pub fn owner_of(&self, pool: PoolId) -> Result<AccountId, PoolError> {
        use lockpool_ledger::OwnershipRegistry;
        self.registry.owner_of(pool)
    }

    /// Creation, split, and closure events recorded for a pool, in order.
    pub fn events_for(&self, pool: PoolId) -> Vec<PoolEvent> {
        self.events.for_pool(pool)
    }
}
