use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

use lockpool_ledger::{
    authorize_mutation, mint_and_register, validate_creation, OwnershipRegistry, PoolProvider,
};
use lockpool_types::{
    AccountId, Amount, EventSink, PoolData, PoolError, PoolEvent, PoolId, Timestamp,
};

use crate::timegate::as_timestamp;

/// Linear release schedule for one pool.
///
/// `start` and `finish` are immutable after creation. `basis` is the fixed
/// total the curve releases over the window: withdrawals never touch it,
/// and a split reduces it by exactly the literal amount moved out. That
/// keeps the release rate `basis / (finish - start)` proportional across
/// arbitrarily many splits with no rounding step.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct VestingSchedule {
    pub start: Timestamp,
    pub finish: Timestamp,
    pub basis: Amount,
}

impl VestingSchedule {
    /// Amount the curve has released by `now`: clamped linear interpolation
    /// with floor division, so repeated partial withdrawals never drift.
    pub fn vested(&self, now: Timestamp) -> Result<Amount, PoolError> {
        if now <= self.start {
            return Ok(0);
        }
        let duration = (self.finish - self.start) as Amount;
        let elapsed = (now - self.start).min(self.finish - self.start) as Amount;
        let scaled = self.basis.checked_mul(elapsed).ok_or(PoolError::Overflow)?;
        Ok(scaled / duration)
    }
}

/// Linear vesting layer.
///
/// Wraps a time gate (or the leaf ledger directly) and owns one
/// [`VestingSchedule`] per pool. The withdrawable amount at any time is
/// the vested amount net of what has already been withdrawn, where
/// already-withdrawn is derived as `basis - inner_remaining` rather than
/// tracked separately.
///
/// Params layout: `[amount, start, finish, basis]`. The wrapped layer
/// receives the `params[..inner.param_count()]` prefix, so a time-gate
/// inner is gated at the vesting start.
pub struct VestingProvider {
    provider_ref: AccountId,
    registry: Arc<dyn OwnershipRegistry>,
    inner: Arc<dyn PoolProvider>,
    events: Arc<dyn EventSink>,
    schedules: RwLock<HashMap<PoolId, VestingSchedule>>,
}

impl VestingProvider {
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
            schedules: RwLock::new(HashMap::new()),
        }
    }

    /// Create a pool governed by this layer: validate the schedule, mint an
    /// identifier, and drive the register cascade down to the leaf.
    pub fn create_new_pool(
        &self,
        owner: AccountId,
        asset: AccountId,
        params: &[Amount],
    ) -> Result<PoolId, PoolError> {
        self.validate(owner, asset, params)?;
        if !self.registry.is_approved_provider(self.provider_ref) {
            return Err(PoolError::UnauthorizedProvider);
        }
        mint_and_register(self.registry.as_ref(), self.provider_ref, owner, asset, |pool| {
            self.register_pool(self.provider_ref, pool, owner, asset, params)
        })
    }

    /// The schedule recorded for a pool, for audits and tests.
    pub fn schedule_of(&self, pool: PoolId) -> Option<VestingSchedule> {
        self.read_guard().get(&pool).copied()
    }

    fn validate(
        &self,
        owner: AccountId,
        asset: AccountId,
        params: &[Amount],
    ) -> Result<VestingSchedule, PoolError> {
        validate_creation(owner, asset, params, self.param_count())?;
        let amount = params[0];
        let start = as_timestamp(params[1])?;
        let finish = as_timestamp(params[2])?;
        let basis = params[3];
        if finish <= start {
            return Err(PoolError::ScheduleInvalid);
        }
        // basis >= amount keeps basis >= remaining for the pool's whole
        // lifetime, so already-withdrawn (basis - remaining) never
        // underflows.
        if basis < amount {
            return Err(PoolError::InvalidAmount);
        }
        Ok(VestingSchedule { start, finish, basis })
    }

    fn write_guard(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<PoolId, VestingSchedule>> {
        self.schedules.write().unwrap_or_else(|e| e.into_inner())
    }

    fn read_guard(&self) -> std::sync::RwLockReadGuard<'_, HashMap<PoolId, VestingSchedule>> {
        self.schedules.read().unwrap_or_else(|e| e.into_inner())
    }
}

impl PoolProvider for VestingProvider {
    fn provider_ref(&self) -> AccountId {
        self.provider_ref
    }

    fn param_count(&self) -> usize {
        4
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
        let schedule = self.validate(owner, asset, params)?;

        if self.read_guard().contains_key(&pool) {
            return Err(PoolError::DuplicatePool(pool));
        }
        self.inner.register_pool(
            self.provider_ref,
            pool,
            owner,
            asset,
            &params[..self.inner.param_count()],
        )?;
        self.write_guard().insert(pool, schedule);

        debug!(
            pool = pool.0,
            start = schedule.start,
            finish = schedule.finish,
            basis = schedule.basis,
            "vesting schedule registered"
        );
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
        // The same absolute amount cascades down; basis stays untouched.
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
        let schedule = self
            .schedule_of(source)
            .ok_or(PoolError::UnknownPool(source))?;
        if self.read_guard().contains_key(&target) {
            return Err(PoolError::DuplicatePool(target));
        }

        // The inner layer enforces 0 < amount <= remaining; only after it
        // commits does this layer move basis by the same literal amount.
        self.inner
            .split(self.provider_ref, source, target, amount, new_owner)?;

        let mut schedules = self.write_guard();
        if let Some(entry) = schedules.get_mut(&source) {
            entry.basis = entry.basis.saturating_sub(amount);
        }
        schedules.insert(
            target,
            VestingSchedule {
                start: schedule.start,
                finish: schedule.finish,
                basis: amount,
            },
        );
        drop(schedules);

        debug!(source = source.0, target = target.0, amount, "vesting split");
        Ok(())
    }

    fn withdrawable_amount(&self, pool: PoolId, now: Timestamp) -> Result<Amount, PoolError> {
        let schedule = self
            .schedule_of(pool)
            .ok_or(PoolError::UnknownPool(pool))?;
        let remaining = self.inner.get_data(pool)?.remaining();
        let vested = schedule.vested(now)?;
        let already_withdrawn = schedule.basis.saturating_sub(remaining);
        Ok(vested.saturating_sub(already_withdrawn))
    }

    fn get_data(&self, pool: PoolId) -> Result<PoolData, PoolError> {
        let schedule = self
            .schedule_of(pool)
            .ok_or(PoolError::UnknownPool(pool))?;
        let inner = self.inner.get_data(pool)?;
        Ok(PoolData {
            pool_info: inner.pool_info,
            params: vec![
                inner.remaining(),
                schedule.start as Amount,
                schedule.finish as Amount,
                schedule.basis,
            ],
        })
    }
}
