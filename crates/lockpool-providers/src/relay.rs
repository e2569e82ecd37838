use std::sync::Arc;

use lockpool_ledger::{
    authorize_mutation, mint_and_register, validate_creation, OwnershipRegistry, PoolProvider,
};
use lockpool_types::{AccountId, Amount, PoolData, PoolError, PoolId, Timestamp};

/// Pass-through higher-order layer.
///
/// Forwards every operation to its inner provider under its own caller
/// identity, adding no eligibility rule of its own. This is the minimal
/// shape of richer composites (refund-backed, collateral-backed, bundled
/// pools), and it exercises the authorization chain end to end: an
/// unapproved relay can neither mint nor cascade into the layer below.
pub struct RelayProvider {
    provider_ref: AccountId,
    registry: Arc<dyn OwnershipRegistry>,
    inner: Arc<dyn PoolProvider>,
}

impl RelayProvider {
    pub fn new(
        provider_ref: AccountId,
        registry: Arc<dyn OwnershipRegistry>,
        inner: Arc<dyn PoolProvider>,
    ) -> Self {
        Self {
            provider_ref,
            registry,
            inner,
        }
    }

    /// Create a pool governed by this layer, delegating registration to
    /// the wrapped provider.
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
}

impl PoolProvider for RelayProvider {
    fn provider_ref(&self) -> AccountId {
        self.provider_ref
    }

    fn param_count(&self) -> usize {
        self.inner.param_count()
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
        self.inner
            .register_pool(self.provider_ref, pool, owner, asset, params)
    }

    fn withdraw(
        &self,
        caller: AccountId,
        pool: PoolId,
        requested: Option<Amount>,
        now: Timestamp,
    ) -> Result<Amount, PoolError> {
        authorize_mutation(self.registry.as_ref(), self.provider_ref, caller, pool)?;
        self.inner
            .withdraw(self.provider_ref, pool, requested, now)
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
        self.inner
            .split(self.provider_ref, source, target, amount, new_owner)
    }

    fn withdrawable_amount(&self, pool: PoolId, now: Timestamp) -> Result<Amount, PoolError> {
        self.inner.withdrawable_amount(pool, now)
    }

    fn get_data(&self, pool: PoolId) -> Result<PoolData, PoolError> {
        self.inner.get_data(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use lockpool_types::Timestamp;

    use crate::testutil::{cascade, Cascade};

    const AMOUNT: Amount = 100_000;
    const ONE_DAY: Timestamp = 86_400;
    const START: Timestamp = 1_000_000;
    const FINISH: Timestamp = START + 7 * ONE_DAY;

    fn relay_over_vesting(f: &Cascade, label: &str) -> RelayProvider {
        RelayProvider::new(
            AccountId::derive(label),
            f.registry.clone(),
            f.vesting.clone(),
        )
    }

    fn params() -> Vec<Amount> {
        vec![AMOUNT, START as Amount, FINISH as Amount, AMOUNT]
    }

    #[test]
    fn approved_relay_registers_through_the_whole_cascade() {
        let f = cascade();
        let relay = relay_over_vesting(&f, "relay");
        f.registry.approve(relay.provider_ref());

        let pool = relay.create_new_pool(f.alice, f.token, &params()).unwrap();

        let data = relay.get_data(pool).unwrap();
        assert_eq!(data.params, params());
        assert_eq!(data.pool_info.owner, f.alice);
    }

    #[test]
    fn relay_withdraw_respects_inner_eligibility() {
        let f = cascade();
        let relay = relay_over_vesting(&f, "relay");
        f.registry.approve(relay.provider_ref());
        let pool = relay.create_new_pool(f.alice, f.token, &params()).unwrap();

        let halftime = START + 7 * ONE_DAY / 2;
        let released = relay
            .withdraw(f.alice, pool, Some(AMOUNT / 2), halftime)
            .unwrap();
        assert_eq!(released, AMOUNT / 2);
        assert_eq!(relay.get_data(pool).unwrap().remaining(), AMOUNT / 2);

        // eligibility is enforced below the relay, not bypassed by it
        let err = relay.withdraw(f.alice, pool, None, halftime).unwrap_err();
        assert_eq!(err, PoolError::InvalidAmount);
    }

    #[test]
    fn relay_rejects_zero_amount_before_minting() {
        let f = cascade();
        let relay = relay_over_vesting(&f, "relay");
        f.registry.approve(relay.provider_ref());

        let err = relay
            .create_new_pool(f.alice, f.token, &[0, START as Amount, FINISH as Amount, 0])
            .unwrap_err();
        assert_eq!(err, PoolError::InvalidAmount);
        assert_eq!(f.registry.pool_count(), 0);
    }

    #[test]
    fn rejected_cascade_params_leave_no_registry_record() {
        let f = cascade();
        let relay = relay_over_vesting(&f, "relay");
        f.registry.approve(relay.provider_ref());

        // the vesting layer below rejects a basis smaller than the amount,
        // after the identifier was already minted
        let err = relay
            .create_new_pool(
                f.alice,
                f.token,
                &[AMOUNT, START as Amount, FINISH as Amount, AMOUNT - 1],
            )
            .unwrap_err();
        assert_eq!(err, PoolError::InvalidAmount);
        assert_eq!(f.registry.pool_count(), 0);
    }

    #[test]
    fn unapproved_relay_cannot_create() {
        let f = cascade();
        let rogue = relay_over_vesting(&f, "rogue-relay");

        let err = rogue
            .create_new_pool(f.alice, f.token, &params())
            .unwrap_err();
        assert_eq!(err, PoolError::UnauthorizedProvider);
    }

    #[test]
    fn unapproved_relay_cannot_withdraw_someone_elses_pool() {
        let f = cascade();
        let relay = relay_over_vesting(&f, "relay");
        f.registry.approve(relay.provider_ref());
        let pool = relay.create_new_pool(f.alice, f.token, &params()).unwrap();

        let rogue = relay_over_vesting(&f, "rogue-relay");
        let err = rogue.withdraw(f.alice, pool, None, FINISH).unwrap_err();
        assert_eq!(err, PoolError::UnauthorizedProvider);
    }
}
