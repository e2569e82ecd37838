use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use lockpool_ledger::{
    authorize_mutation, mint_and_register, validate_creation, OwnershipRegistry, PoolProvider,
};
use lockpool_types::{
    AccountId, Amount, EventSink, PoolData, PoolError, PoolEvent, PoolId, Timestamp,
};

/// Time-driven phase of a gated pool. `Locked -> Unlocked` happens by the
/// clock alone; `Closed` means the delegated remaining amount is zero.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PoolPhase {
    Locked,
    Unlocked,
    Closed,
}

/// Time-gated release layer.
///
/// Adds one activation timestamp per pool on top of the wrapped layer.
/// Before the timestamp nothing is withdrawable; at or after it, the full
/// delegated remaining amount is withdrawable in one step. Splits ignore
/// the gate entirely.
///
/// Params layout: `[amount, start]`.
pub struct TimeGateProvider {
    provider_ref: AccountId,
    registry: Arc<dyn OwnershipRegistry>,
    inner: Arc<dyn PoolProvider>,
    events: Arc<dyn EventSink>,
    gates: RwLock<HashMap<PoolId, Timestamp>>,
}

impl TimeGateProvider {
    pub fn new(
        provider_ref: AccountId,
        registry: Arc<dyn OwnershipRegistry>,
        inner: Arc<dyn PoolProvider>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            provider_ref,
            registry,
            inner,
            events,
            gates: RwLock::new(HashMap::new()),
        }
    }

    /// Create a pool governed by this layer: mint an identifier and drive
    /// the register cascade down to the leaf.
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

    /// The activation timestamp recorded for a pool.
    pub fn gate_of(&self, pool: PoolId) -> Option<Timestamp> {
        self.read_guard().get(&pool).copied()
    }

    /// Current phase of a pool at `now`.
    pub fn phase(&self, pool: PoolId, now: Timestamp) -> Result<PoolPhase, PoolError> {
        let start = self
            .gate_of(pool)
            .ok_or(PoolError::UnknownPool(pool))?;
        if self.inner.get_data(pool)?.remaining() == 0 {
            return Ok(PoolPhase::Closed);
        }
        if now < start {
            Ok(PoolPhase::Locked)
        } else {
            Ok(PoolPhase::Unlocked)
        }
    }

    fn write_guard(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<PoolId, Timestamp>> {
        self.gates.write().unwrap_or_else(|e| e.into_inner())
    }

    fn read_guard(&self) -> std::sync::RwLockReadGuard<'_, HashMap<PoolId, Timestamp>> {
        self.gates.read().unwrap_or_else(|e| e.into_inner())
    }
}

/// Timestamps travel through params as amounts; they must fit the
/// timestamp domain exactly.
pub(crate) fn as_timestamp(value: Amount) -> Result<Timestamp, PoolError> {
    Timestamp::try_from(value).map_err(|_| PoolError::Overflow)
}

impl PoolProvider for TimeGateProvider {
    fn provider_ref(&self) -> AccountId {
        self.provider_ref
    }

    fn param_count(&self) -> usize {
        self.inner.param_count() + 1
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
        let start = as_timestamp(params[params.len() - 1])?;

        if self.read_guard().contains_key(&pool) {
            return Err(PoolError::DuplicatePool(pool));
        }
        // The wrapped layer records its entry (and takes custody) first;
        // the gate timestamp is only stored once that succeeded.
        self.inner.register_pool(
            self.provider_ref,
            pool,
            owner,
            asset,
            &params[..self.inner.param_count()],
        )?;
        self.write_guard().insert(pool, start);

        debug!(pool = pool.0, start, "time gate registered");
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
        now: Timestamp,
    ) -> Result<Amount, PoolError> {
        authorize_mutation(self.registry.as_ref(), self.provider_ref, caller, pool)?;

        let eligible = self.withdrawable_amount(pool, now)?;
        if eligible == 0 {
            return Err(PoolError::InvalidAmount);
        }
        let take = requested.unwrap_or(eligible).min(eligible);
        if take == 0 {
            return Err(PoolError::InvalidAmount);
        }
        self.inner.withdraw(self.provider_ref, pool, Some(take), now)
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
        let start = self
            .gate_of(source)
            .ok_or(PoolError::UnknownPool(source))?;
        if self.read_guard().contains_key(&target) {
            return Err(PoolError::DuplicatePool(target));
        }

        // Lock state does not gate splits.
        self.inner
            .split(self.provider_ref, source, target, amount, new_owner)?;
        self.write_guard().insert(target, start);

        debug!(source = source.0, target = target.0, amount, "time gate split");
        Ok(())
    }

    fn withdrawable_amount(&self, pool: PoolId, now: Timestamp) -> Result<Amount, PoolError> {
        let start = self
            .gate_of(pool)
            .ok_or(PoolError::UnknownPool(pool))?;
        if now < start {
            return Ok(0);
        }
        self.inner.withdrawable_amount(pool, now)
    }

    fn get_data(&self, pool: PoolId) -> Result<PoolData, PoolError> {
        let start = self
            .gate_of(pool)
            .ok_or(PoolError::UnknownPool(pool))?;
        let inner = self.inner.get_data(pool)?;
        let mut params = inner.params;
        params.push(start as Amount);
        Ok(PoolData {
            pool_info: inner.pool_info,
            params,
        })
    }
}
