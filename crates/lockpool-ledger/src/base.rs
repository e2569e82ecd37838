use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use lockpool_types::{
    AccountId, Amount, EventSink, PoolData, PoolError, PoolEvent, PoolId, Timestamp,
};

use crate::traits::{
    authorize_mutation, mint_and_register, OwnershipRegistry, PoolProvider, ValueCustodian,
};

/// Per-pool bookkeeping owned exclusively by the leaf layer.
///
/// Invariant: `remaining + withdrawn == created` at every point, and
/// `remaining` is never negative. A split reduces both `remaining` and
/// `created` of the source by the same literal amount.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub asset: AccountId,
    pub remaining: Amount,
    pub withdrawn: Amount,
    pub created: Amount,
}

/// Leaf bookkeeping layer of the cascade.
///
/// Owns one remaining-amount field per pool and implements the three
/// primitive mutations every higher layer delegates to: create, reduce on
/// withdrawal, and absolute-amount split. This is the only layer that
/// moves value in and out of custody.
pub struct BaseLedgerProvider {
    provider_ref: AccountId,
    registry: Arc<dyn OwnershipRegistry>,
    custodian: Arc<dyn ValueCustodian>,
    events: Arc<dyn EventSink>,
    inner: RwLock<HashMap<PoolId, LedgerEntry>>,
}

impl BaseLedgerProvider {
    pub fn new(
        provider_ref: AccountId,
        registry: Arc<dyn OwnershipRegistry>,
        custodian: Arc<dyn ValueCustodian>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            provider_ref,
            registry,
            custodian,
            events,
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Create a pool governed directly by this layer: mint an identifier,
    /// take `params[0]` of `asset` into custody, and record the entry.
    pub fn create_new_pool(
        &self,
        owner: AccountId,
        asset: AccountId,
        params: &[Amount],
    ) -> Result<PoolId, PoolError> {
        validate_creation(owner, asset, params, self.param_count())?;
        if !self.registry.is_approved_provider(self.provider_ref) {
            return Err(PoolError::UnauthorizedProvider);
        }
        mint_and_register(self.registry.as_ref(), self.provider_ref, owner, asset, |pool| {
            self.register_pool(self.provider_ref, pool, owner, asset, params)
        })
    }

    /// Snapshot of this layer's entry, for audits and tests.
    pub fn entry(&self, pool: PoolId) -> Option<LedgerEntry> {
        self.read_guard().get(&pool).copied()
    }

    fn write_guard(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<PoolId, LedgerEntry>> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    fn read_guard(&self) -> std::sync::RwLockReadGuard<'_, HashMap<PoolId, LedgerEntry>> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }
}

/// Shared creation preconditions: non-zero references, positive amount,
/// and the exact params arity for the layer.
pub fn validate_creation(
    owner: AccountId,
    asset: AccountId,
    params: &[Amount],
    expected: usize,
) -> Result<(), PoolError> {
    if owner.is_zero() || asset.is_zero() {
        return Err(PoolError::InvalidAddress);
    }
    if params.len() != expected {
        return Err(PoolError::InvalidParams {
            expected,
            actual: params.len(),
        });
    }
    if params[0] == 0 {
        return Err(PoolError::InvalidAmount);
    }
    Ok(())
}

impl PoolProvider for BaseLedgerProvider {
    fn provider_ref(&self) -> AccountId {
        self.provider_ref
    }

    fn param_count(&self) -> usize {
        1
    }

    fn register_pool(
        &self,
        caller: AccountId,
        pool: PoolId,
        owner: AccountId,
        asset: AccountId,
        params: &[Amount],
    ) -> Result<(), PoolError> {
        if !self.registry.is_approved_provider(caller) {
            return Err(PoolError::UnauthorizedProvider);
        }
        validate_creation(owner, asset, params, self.param_count())?;
        let amount = params[0];

        {
            let mut entries = self.write_guard();
            if entries.contains_key(&pool) {
                return Err(PoolError::DuplicatePool(pool));
            }
            self.custodian.deposit(asset, owner, amount)?;
            entries.insert(
                pool,
                LedgerEntry {
                    asset,
                    remaining: amount,
                    withdrawn: 0,
                    created: amount,
                },
            );
        }

        debug!(pool = pool.0, amount, asset = %asset, "ledger entry created");
        self.events.record(PoolEvent::Created {
            pool,
            owner,
            asset,
            provider: self.provider_ref,
            params: params.to_vec(),
        });
        Ok(())
    }

    fn withdraw(
        &self,
        caller: AccountId,
        pool: PoolId,
        requested: Option<Amount>,
        _now: Timestamp,
    ) -> Result<Amount, PoolError> {
        let owner = authorize_mutation(self.registry.as_ref(), self.provider_ref, caller, pool)?;

        let (released, drained) = {
            let mut entries = self.write_guard();
            let entry = entries.get_mut(&pool).ok_or(PoolError::UnknownPool(pool))?;
            if entry.remaining == 0 {
                return Err(PoolError::InvalidAmount);
            }
            let released = requested.unwrap_or(entry.remaining).min(entry.remaining);
            if released == 0 {
                return Err(PoolError::InvalidAmount);
            }
            // Custody moves first so a rejected transfer leaves the entry
            // untouched.
            self.custodian.release(entry.asset, owner, released)?;
            entry.remaining -= released;
            entry.withdrawn += released;
            (released, entry.remaining == 0)
        };

        debug!(pool = pool.0, released, drained, "withdrawal released");
        if drained {
            // Funds have already moved; a rejected burn must not turn the
            // completed withdrawal into an error.
            if let Err(err) = self.registry.burn(self.provider_ref, pool) {
                warn!(pool = pool.0, error = %err, "drained pool could not be burned");
            }
        }
        Ok(released)
    }

    fn split(
        &self,
        caller: AccountId,
        source: PoolId,
        target: PoolId,
        amount: Amount,
        new_owner: AccountId,
    ) -> Result<(), PoolError> {
        if !self.registry.is_approved_provider(caller) {
            return Err(PoolError::UnauthorizedProvider);
        }
        if new_owner.is_zero() {
            return Err(PoolError::InvalidAddress);
        }
        let owner = self.registry.owner_of(source)?;

        let (remaining_after, new_remaining) = {
            let mut entries = self.write_guard();
            if entries.contains_key(&target) {
                return Err(PoolError::DuplicatePool(target));
            }
            let entry = entries
                .get_mut(&source)
                .ok_or(PoolError::UnknownPool(source))?;
            if amount == 0 || amount > entry.remaining {
                return Err(PoolError::InvalidAmount);
            }
            entry.remaining -= amount;
            entry.created -= amount;
            let asset = entry.asset;
            let remaining_after = entry.remaining;
            entries.insert(
                target,
                LedgerEntry {
                    asset,
                    remaining: amount,
                    withdrawn: 0,
                    created: amount,
                },
            );
            (remaining_after, amount)
        };

        debug!(
            source = source.0,
            target = target.0,
            amount,
            "ledger entry split"
        );
        self.events.record(PoolEvent::Split {
            pool: source,
            new_pool: target,
            owner,
            new_owner,
            remaining: remaining_after,
            new_remaining,
        });
        Ok(())
    }

    fn withdrawable_amount(&self, pool: PoolId, _now: Timestamp) -> Result<Amount, PoolError> {
        let entries = self.read_guard();
        let entry = entries.get(&pool).ok_or(PoolError::UnknownPool(pool))?;
        Ok(entry.remaining)
    }

    fn get_data(&self, pool: PoolId) -> Result<PoolData, PoolError> {
        let info = self.registry.pool_info(pool)?;
        let remaining = {
            let entries = self.read_guard();
            entries
                .get(&pool)
                .ok_or(PoolError::UnknownPool(pool))?
                .remaining
        };
        Ok(PoolData {
            pool_info: info,
            params: vec![remaining],
        })
    }
}
