use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use lockpool_ledger::{OwnershipRegistry, PoolProvider};
use lockpool_types::{
    AccountId, Amount, EventSink, PoolData, PoolError, PoolEvent, PoolId, PoolInfo, Timestamp,
};

/// Registry-side record of one pool. Ownership truth lives here and only
/// here; cascade layers keep just the arithmetic their own layer needs.
#[derive(Clone, Copy)]
struct PoolRecord {
    owner: AccountId,
    asset: AccountId,
    provider: AccountId,
}

#[derive(Default)]
struct RegistryState {
    next_id: u64,
    pools: HashMap<PoolId, PoolRecord>,
    providers: HashMap<AccountId, Arc<dyn PoolProvider>>,
}

/// The pool ownership registry.
///
/// Mints identifiers monotonically (never reused), records each pool's
/// owner and active provider, restricts mutating calls to the approved
/// capability table, and forwards external withdraw/split calls to the
/// pool's current top-level provider. The registry's own reference is the
/// caller identity providers see on dispatched calls.
pub struct PoolRegistry {
    registry_ref: AccountId,
    events: Arc<dyn EventSink>,
    inner: RwLock<RegistryState>,
}

impl PoolRegistry {
    pub fn new(registry_ref: AccountId, events: Arc<dyn EventSink>) -> Self {
        Self {
            registry_ref,
            events,
            inner: RwLock::new(RegistryState::default()),
        }
    }

    /// The registry's own caller identity.
    pub fn registry_ref(&self) -> AccountId {
        self.registry_ref
    }

    /// Add or remove a provider from the deployment's capability table.
    pub fn set_approved_provider(&self, provider: Arc<dyn PoolProvider>, approved: bool) {
        let provider_ref = provider.provider_ref();
        let mut state = self.write_guard();
        if approved {
            state.providers.insert(provider_ref, provider);
        } else {
            state.providers.remove(&provider_ref);
        }
        debug!(provider = %provider_ref, approved, "capability table updated");
    }

    /// Number of pools ever minted (burned pools included).
    pub fn total_minted(&self) -> u64 {
        self.read_guard().next_id
    }

    // ---- dispatch surface for external callers ----

    /// Withdraw up to `requested` (`None` = everything currently eligible)
    /// from a pool, via its active provider. Owner only.
    pub fn withdraw(
        &self,
        caller: AccountId,
        pool: PoolId,
        requested: Option<Amount>,
        now: Timestamp,
    ) -> Result<Amount, PoolError> {
        let (record, provider) = self.record_and_provider(pool)?;
        if record.owner.is_zero() {
            // Closed pool: idempotently rejected as an exhausted amount.
            return Err(PoolError::InvalidAmount);
        }
        if caller != record.owner {
            return Err(PoolError::UnauthorizedCaller);
        }
        provider.withdraw(self.registry_ref, pool, requested, now)
    }

    /// Split `amount` out of a pool into a freshly minted sibling owned by
    /// `new_owner`, via the pool's active provider. Owner only.
    pub fn split(
        &self,
        caller: AccountId,
        pool: PoolId,
        amount: Amount,
        new_owner: AccountId,
    ) -> Result<PoolId, PoolError> {
        let (record, provider) = self.record_and_provider(pool)?;
        if caller.is_zero() || caller != record.owner {
            return Err(PoolError::UnauthorizedCaller);
        }
        if new_owner.is_zero() {
            return Err(PoolError::InvalidAddress);
        }
        // Full precondition check before minting the sibling, so a rejected
        // split allocates nothing.
        let remaining = provider.get_data(pool)?.remaining();
        if amount == 0 || amount > remaining {
            return Err(PoolError::InvalidAmount);
        }

        let target = {
            let mut state = self.write_guard();
            state.next_id += 1;
            let target = PoolId(state.next_id);
            state.pools.insert(
                target,
                PoolRecord {
                    owner: new_owner,
                    asset: record.asset,
                    provider: record.provider,
                },
            );
            target
        };

        if let Err(err) = provider.split(self.registry_ref, pool, target, amount, new_owner) {
            // Roll back the sibling record; the identifier stays consumed.
            warn!(pool = pool.0, target = target.0, error = %err, "split failed after mint; rolling back");
            self.write_guard().pools.remove(&target);
            return Err(err);
        }

        debug!(pool = pool.0, target = target.0, amount, "pool split dispatched");
        Ok(target)
    }

    /// Currently eligible amount, via the pool's active provider.
    pub fn withdrawable_amount(&self, pool: PoolId, now: Timestamp) -> Result<Amount, PoolError> {
        let (_, provider) = self.record_and_provider(pool)?;
        provider.withdrawable_amount(pool, now)
    }

    /// Pool state in the active provider's params layout.
    pub fn get_data(&self, pool: PoolId) -> Result<PoolData, PoolError> {
        let (_, provider) = self.record_and_provider(pool)?;
        provider.get_data(pool)
    }

    fn record_and_provider(
        &self,
        pool: PoolId,
    ) -> Result<(PoolRecord, Arc<dyn PoolProvider>), PoolError> {
        let state = self.read_guard();
        let record = *state.pools.get(&pool).ok_or(PoolError::UnknownPool(pool))?;
        let provider = state
            .providers
            .get(&record.provider)
            .cloned()
            .ok_or(PoolError::UnauthorizedProvider)?;
        Ok((record, provider))
    }

    fn write_guard(&self) -> std::sync::RwLockWriteGuard<'_, RegistryState> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    fn read_guard(&self) -> std::sync::RwLockReadGuard<'_, RegistryState> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }
}

impl OwnershipRegistry for PoolRegistry {
    fn mint_next(
        &self,
        provider: AccountId,
        owner: AccountId,
        asset: AccountId,
    ) -> Result<PoolId, PoolError> {
        if owner.is_zero() || asset.is_zero() {
            return Err(PoolError::InvalidAddress);
        }
        if !self.is_approved_provider(provider) {
            return Err(PoolError::UnauthorizedProvider);
        }
        let mut state = self.write_guard();
        state.next_id += 1;
        let pool = PoolId(state.next_id);
        state.pools.insert(
            pool,
            PoolRecord {
                owner,
                asset,
                provider,
            },
        );
        debug!(pool = pool.0, owner = %owner, provider = %provider, "pool minted");
        Ok(pool)
    }

    fn rollback_mint(&self, caller: AccountId, pool: PoolId) -> Result<(), PoolError> {
        if !self.is_approved_provider(caller) {
            return Err(PoolError::UnauthorizedProvider);
        }
        if self.write_guard().pools.remove(&pool).is_some() {
            debug!(pool = pool.0, "minted record rolled back");
        }
        Ok(())
    }

    fn owner_of(&self, pool: PoolId) -> Result<AccountId, PoolError> {
        Ok(self.pool_info(pool)?.owner)
    }

    fn pool_info(&self, pool: PoolId) -> Result<PoolInfo, PoolError> {
        let state = self.read_guard();
        let record = state.pools.get(&pool).ok_or(PoolError::UnknownPool(pool))?;
        Ok(PoolInfo {
            pool_id: pool,
            owner: record.owner,
            asset: record.asset,
        })
    }

    fn active_provider(&self, pool: PoolId) -> Result<AccountId, PoolError> {
        let state = self.read_guard();
        let record = state.pools.get(&pool).ok_or(PoolError::UnknownPool(pool))?;
        Ok(record.provider)
    }

    fn is_approved_provider(&self, account: AccountId) -> bool {
        account == self.registry_ref || self.read_guard().providers.contains_key(&account)
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
        let mut state = self.write_guard();
        if !state.providers.contains_key(&provider) {
            return Err(PoolError::UnauthorizedProvider);
        }
        let record = state
            .pools
            .get_mut(&pool)
            .ok_or(PoolError::UnknownPool(pool))?;
        record.provider = provider;
        Ok(())
    }

    fn burn(&self, caller: AccountId, pool: PoolId) -> Result<(), PoolError> {
        if !self.is_approved_provider(caller) {
            return Err(PoolError::UnauthorizedProvider);
        }
        let closed = {
            let mut state = self.write_guard();
            let record = state
                .pools
                .get_mut(&pool)
                .ok_or(PoolError::UnknownPool(pool))?;
            if record.owner.is_zero() {
                false
            } else {
                record.owner = AccountId::ZERO;
                true
            }
        };
        if closed {
            debug!(pool = pool.0, "pool burned");
            self.events.record(PoolEvent::Closed { pool });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use lockpool_types::MemoryEventLog;

    /// Provider double that only records its identity; dispatch tests that
    /// need real cascade behavior live in the sdk crate.
    struct NullProvider {
        provider_ref: AccountId,
    }

    impl PoolProvider for NullProvider {
        fn provider_ref(&self) -> AccountId {
            self.provider_ref
        }

        fn param_count(&self) -> usize {
            1
        }

        fn register_pool(
            &self,
            _caller: AccountId,
            _pool: PoolId,
            _owner: AccountId,
            _asset: AccountId,
            _params: &[Amount],
        ) -> Result<(), PoolError> {
            Ok(())
        }

        fn withdraw(
            &self,
            _caller: AccountId,
            _pool: PoolId,
            _requested: Option<Amount>,
            _now: Timestamp,
        ) -> Result<Amount, PoolError> {
            Ok(0)
        }

        fn split(
            &self,
            _caller: AccountId,
            _source: PoolId,
            _target: PoolId,
            _amount: Amount,
            _new_owner: AccountId,
        ) -> Result<(), PoolError> {
            Err(PoolError::InvalidAmount)
        }

        fn withdrawable_amount(&self, _pool: PoolId, _now: Timestamp) -> Result<Amount, PoolError> {
            Ok(7)
        }

        fn get_data(&self, pool: PoolId) -> Result<PoolData, PoolError> {
            Ok(PoolData {
                pool_info: PoolInfo {
                    pool_id: pool,
                    owner: AccountId::ZERO,
                    asset: AccountId::ZERO,
                },
                params: vec![7],
            })
        }
    }

    fn registry() -> (PoolRegistry, Arc<MemoryEventLog>) {
        let events = Arc::new(MemoryEventLog::new());
        (
            PoolRegistry::new(AccountId::derive("registry"), events.clone()),
            events,
        )
    }

    fn approved_provider(registry: &PoolRegistry, label: &str) -> AccountId {
        let provider_ref = AccountId::derive(label);
        registry.set_approved_provider(Arc::new(NullProvider { provider_ref }), true);
        provider_ref
    }

    #[test]
    fn mint_assigns_monotonic_never_reused_ids() {
        let (registry, _) = registry();
        let provider = approved_provider(&registry, "p1");
        let alice = AccountId::derive("alice");
        let token = AccountId::derive("token");

        let a = registry.mint_next(provider, alice, token).unwrap();
        let b = registry.mint_next(provider, alice, token).unwrap();
        assert!(b > a);
        assert_eq!(registry.total_minted(), 2);
    }

    #[test]
    fn mint_rejects_unapproved_provider() {
        let (registry, _) = registry();
        let err = registry
            .mint_next(
                AccountId::derive("rogue"),
                AccountId::derive("alice"),
                AccountId::derive("token"),
            )
            .unwrap_err();
        assert_eq!(err, PoolError::UnauthorizedProvider);
    }

    #[test]
    fn mint_rejects_zero_references() {
        let (registry, _) = registry();
        let provider = approved_provider(&registry, "p1");
        let token = AccountId::derive("token");

        let err = registry.mint_next(provider, AccountId::ZERO, token).unwrap_err();
        assert_eq!(err, PoolError::InvalidAddress);
        let err = registry
            .mint_next(provider, AccountId::derive("alice"), AccountId::ZERO)
            .unwrap_err();
        assert_eq!(err, PoolError::InvalidAddress);
    }

    #[test]
    fn registry_ref_counts_as_approved() {
        let (registry, _) = registry();
        assert!(registry.is_approved_provider(registry.registry_ref()));
        assert!(!registry.is_approved_provider(AccountId::derive("rogue")));
    }

    #[test]
    fn unapproval_removes_capability() {
        let (registry, _) = registry();
        let provider_ref = AccountId::derive("p1");
        let provider = Arc::new(NullProvider { provider_ref });
        registry.set_approved_provider(provider.clone(), true);
        assert!(registry.is_approved_provider(provider_ref));

        registry.set_approved_provider(provider, false);
        assert!(!registry.is_approved_provider(provider_ref));
    }

    #[test]
    fn rollback_removes_record_but_never_reuses_the_id() {
        let (registry, _) = registry();
        let provider = approved_provider(&registry, "p1");
        let alice = AccountId::derive("alice");
        let token = AccountId::derive("token");
        let pool = registry.mint_next(provider, alice, token).unwrap();

        registry.rollback_mint(provider, pool).unwrap();
        assert_eq!(
            registry.owner_of(pool).unwrap_err(),
            PoolError::UnknownPool(pool)
        );
        // rolling back twice is a no-op
        registry.rollback_mint(provider, pool).unwrap();

        let next = registry.mint_next(provider, alice, token).unwrap();
        assert!(next > pool);
    }

    #[test]
    fn rollback_requires_approval() {
        let (registry, _) = registry();
        let provider = approved_provider(&registry, "p1");
        let pool = registry
            .mint_next(
                provider,
                AccountId::derive("alice"),
                AccountId::derive("token"),
            )
            .unwrap();

        let err = registry
            .rollback_mint(AccountId::derive("rogue"), pool)
            .unwrap_err();
        assert_eq!(err, PoolError::UnauthorizedProvider);
        assert!(registry.owner_of(pool).is_ok());
    }

    #[test]
    fn burn_zeroes_owner_and_emits_once() {
        let (registry, events) = registry();
        let provider = approved_provider(&registry, "p1");
        let alice = AccountId::derive("alice");
        let pool = registry
            .mint_next(provider, alice, AccountId::derive("token"))
            .unwrap();

        registry.burn(provider, pool).unwrap();
        assert_eq!(registry.owner_of(pool).unwrap(), AccountId::ZERO);

        // idempotent: a second burn emits no second closure event
        registry.burn(provider, pool).unwrap();
        let closures = events
            .for_pool(pool)
            .into_iter()
            .filter(|e| matches!(e, PoolEvent::Closed { .. }))
            .count();
        assert_eq!(closures, 1);
    }

    #[test]
    fn burn_requires_approval() {
        let (registry, _) = registry();
        let provider = approved_provider(&registry, "p1");
        let pool = registry
            .mint_next(
                provider,
                AccountId::derive("alice"),
                AccountId::derive("token"),
            )
            .unwrap();

        let err = registry.burn(AccountId::derive("rogue"), pool).unwrap_err();
        assert_eq!(err, PoolError::UnauthorizedProvider);
    }

    #[test]
    fn set_active_provider_requires_both_sides_approved() {
        let (registry, _) = registry();
        let p1 = approved_provider(&registry, "p1");
        let pool = registry
            .mint_next(p1, AccountId::derive("alice"), AccountId::derive("token"))
            .unwrap();

        let err = registry
            .set_active_provider(p1, pool, AccountId::derive("unapproved"))
            .unwrap_err();
        assert_eq!(err, PoolError::UnauthorizedProvider);

        let p2 = approved_provider(&registry, "p2");
        registry.set_active_provider(p1, pool, p2).unwrap();
        assert_eq!(registry.active_provider(pool).unwrap(), p2);
    }

    #[test]
    fn dispatch_rejects_non_owner() {
        let (registry, _) = registry();
        let provider = approved_provider(&registry, "p1");
        let alice = AccountId::derive("alice");
        let pool = registry
            .mint_next(provider, alice, AccountId::derive("token"))
            .unwrap();

        let err = registry
            .withdraw(AccountId::derive("mallory"), pool, None, 0)
            .unwrap_err();
        assert_eq!(err, PoolError::UnauthorizedCaller);

        // once burned, the pool reads as exhausted for every caller
        registry.burn(provider, pool).unwrap();
        let err = registry.withdraw(alice, pool, None, 0).unwrap_err();
        assert_eq!(err, PoolError::InvalidAmount);
    }

    #[test]
    fn failed_split_rolls_back_the_minted_sibling() {
        let (registry, _) = registry();
        let provider = approved_provider(&registry, "p1");
        let alice = AccountId::derive("alice");
        let pool = registry
            .mint_next(provider, alice, AccountId::derive("token"))
            .unwrap();

        // NullProvider reports remaining = 7 but rejects every split
        let err = registry
            .split(alice, pool, 5, AccountId::derive("bob"))
            .unwrap_err();
        assert_eq!(err, PoolError::InvalidAmount);

        // the sibling record is gone, but its identifier stays consumed
        assert_eq!(registry.total_minted(), 2);
        assert_eq!(
            registry.owner_of(PoolId(2)).unwrap_err(),
            PoolError::UnknownPool(PoolId(2))
        );
    }

    #[test]
    fn split_preconditions_mint_nothing() {
        let (registry, _) = registry();
        let provider = approved_provider(&registry, "p1");
        let alice = AccountId::derive("alice");
        let pool = registry
            .mint_next(provider, alice, AccountId::derive("token"))
            .unwrap();

        let bob = AccountId::derive("bob");
        // amount exceeding reported remaining (7)
        let err = registry.split(alice, pool, 8, bob).unwrap_err();
        assert_eq!(err, PoolError::InvalidAmount);
        // zero amount
        let err = registry.split(alice, pool, 0, bob).unwrap_err();
        assert_eq!(err, PoolError::InvalidAmount);
        // zero new owner
        let err = registry.split(alice, pool, 5, AccountId::ZERO).unwrap_err();
        assert_eq!(err, PoolError::InvalidAddress);

        assert_eq!(registry.total_minted(), 1);
    }
}
