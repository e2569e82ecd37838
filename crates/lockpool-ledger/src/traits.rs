use tracing::warn;

use lockpool_types::{AccountId, Amount, PoolData, PoolError, PoolId, PoolInfo, Timestamp};

/// The shared capability interface of every cascade layer.
///
/// Layers compose by holding a reference to their inner provider and
/// forwarding calls, adding their own precondition and derived-value logic
/// on the way down. All amounts that cross a layer boundary are absolute;
/// a layer never re-derives what an upper layer already computed.
pub trait PoolProvider: Send + Sync {
    /// This layer's identity in the deployment's capability table.
    fn provider_ref(&self) -> AccountId;

    /// Length of this layer's params layout. An upper layer slices
    /// `params[..inner.param_count()]` when cascading a registration.
    fn param_count(&self) -> usize;

    /// Record this layer's entry for an already-minted pool identifier.
    ///
    /// Cascade-facing: fails with `UnauthorizedProvider` unless `caller`
    /// is in the deployment's approved set.
    fn register_pool(
        &self,
        caller: AccountId,
        pool: PoolId,
        owner: AccountId,
        asset: AccountId,
        params: &[Amount],
    ) -> Result<(), PoolError>;

    /// Release up to `requested` of the pool's currently eligible amount
    /// to its owner; `None` means everything currently eligible.
    ///
    /// Callable by the pool owner or an approved provider. Returns the
    /// amount actually released. Fails with `InvalidAmount` when nothing
    /// is eligible.
    fn withdraw(
        &self,
        caller: AccountId,
        pool: PoolId,
        requested: Option<Amount>,
        now: Timestamp,
    ) -> Result<Amount, PoolError>;

    /// Move the literal `amount` from `source` into the already-minted
    /// `target`, reducing every field this layer owns by the same amount.
    ///
    /// Splitting is phase-independent and never touches custody.
    fn split(
        &self,
        caller: AccountId,
        source: PoolId,
        target: PoolId,
        amount: Amount,
        new_owner: AccountId,
    ) -> Result<(), PoolError>;

    /// Amount currently eligible for withdrawal. Pure query.
    fn withdrawable_amount(&self, pool: PoolId, now: Timestamp) -> Result<Amount, PoolError>;

    /// Externally reported pool state with this layer's params layout.
    /// Pure query.
    fn get_data(&self, pool: PoolId) -> Result<PoolData, PoolError>;
}

/// Boundary to the external ownership registry.
///
/// The registry is the single source of truth for identifier allocation,
/// current ownership, and the approved-provider capability table. Cascade
/// layers never duplicate ownership state beyond what their own arithmetic
/// needs.
pub trait OwnershipRegistry: Send + Sync {
    /// Allocate the next pool identifier, owned by `owner` and governed by
    /// `provider`. Fails with `UnauthorizedProvider` for unapproved minters.
    fn mint_next(
        &self,
        provider: AccountId,
        owner: AccountId,
        asset: AccountId,
    ) -> Result<PoolId, PoolError>;

    /// Remove the record of a just-minted pool whose registration cascade
    /// failed downstream. The identifier stays consumed. Approved callers
    /// only; rolling back an already-absent record is a no-op.
    fn rollback_mint(&self, caller: AccountId, pool: PoolId) -> Result<(), PoolError>;

    /// Current owner; the zero sentinel once the pool is burned.
    fn owner_of(&self, pool: PoolId) -> Result<AccountId, PoolError>;

    /// Identifier, owner, and asset for a pool.
    fn pool_info(&self, pool: PoolId) -> Result<PoolInfo, PoolError>;

    /// The provider currently authoritative for a pool (top of its chain).
    fn active_provider(&self, pool: PoolId) -> Result<AccountId, PoolError>;

    /// Whether `account` may act as a cascading provider in this deployment.
    fn is_approved_provider(&self, account: AccountId) -> bool;

    /// Re-point a pool at a different governing provider. Approved callers
    /// only.
    fn set_active_provider(
        &self,
        caller: AccountId,
        pool: PoolId,
        provider: AccountId,
    ) -> Result<(), PoolError>;

    /// Mark a drained pool terminal: owner becomes the zero sentinel and a
    /// closure event is emitted. Approved callers only; idempotent.
    fn burn(&self, caller: AccountId, pool: PoolId) -> Result<(), PoolError>;
}

/// Authorization chain check shared by every layer's withdraw path.
///
/// Approved providers may always cascade downward. The pool owner may
/// mutate only through the pool's registered top-of-chain provider; a
/// direct call into a lower layer would bypass the layers above it.
/// Returns the current owner on success.
pub fn authorize_mutation(
    registry: &dyn OwnershipRegistry,
    provider_ref: AccountId,
    caller: AccountId,
    pool: PoolId,
) -> Result<AccountId, PoolError> {
    let owner = registry.owner_of(pool)?;
    if registry.is_approved_provider(caller) {
        return Ok(owner);
    }
    if owner.is_zero() {
        // Closed pool: there is nothing left to release for anyone.
        return Err(PoolError::InvalidAmount);
    }
    if caller != owner {
        return Err(PoolError::UnauthorizedCaller);
    }
    if registry.active_provider(pool)? != provider_ref {
        return Err(PoolError::UnauthorizedProvider);
    }
    Ok(owner)
}

/// Mint an identifier and run a layer's registration cascade against it.
///
/// A registration failure can surface only after the identifier exists,
/// for example when the custodian rejects the deposit for an underfunded
/// owner. The minted record is rolled back before the error is returned,
/// so a failed creation leaves no ownership state behind; the identifier
/// itself stays consumed.
pub fn mint_and_register(
    registry: &dyn OwnershipRegistry,
    provider_ref: AccountId,
    owner: AccountId,
    asset: AccountId,
    register: impl FnOnce(PoolId) -> Result<(), PoolError>,
) -> Result<PoolId, PoolError> {
    let pool = registry.mint_next(provider_ref, owner, asset)?;
    if let Err(err) = register(pool) {
        if let Err(rollback_err) = registry.rollback_mint(provider_ref, pool) {
            warn!(pool = pool.0, error = %rollback_err, "rollback of failed registration rejected");
        }
        return Err(err);
    }
    Ok(pool)
}

/// Boundary to the external value custodian that actually moves the
/// fungible asset. The settlement mechanics behind it are opaque.
pub trait ValueCustodian: Send + Sync {
    /// Move `amount` of `asset` from `from`'s external balance into custody.
    fn deposit(&self, asset: AccountId, from: AccountId, amount: Amount) -> Result<(), PoolError>;

    /// Release `amount` of `asset` from custody to `to`'s external balance.
    fn release(&self, asset: AccountId, to: AccountId, amount: Amount) -> Result<(), PoolError>;

    /// External (non-custodied) balance of an account.
    fn balance_of(&self, account: AccountId, asset: AccountId) -> Amount;

    /// Total custodied balance for an asset. The sum of all pools'
    /// remaining amounts for an asset must never exceed this.
    fn custodied(&self, asset: AccountId) -> Amount;
}
