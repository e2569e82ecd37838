use std::collections::HashMap;
use std::sync::RwLock;

use lockpool_types::{AccountId, Amount, PoolError};

use crate::traits::ValueCustodian;

/// In-memory value custodian for tests, local demos, and embedding.
///
/// Tracks one external balance per (account, asset) pair and one custody
/// total per asset. `fund` seeds external balances.
#[derive(Default)]
pub struct InMemoryCustodian {
    inner: RwLock<CustodyState>,
}

#[derive(Default)]
struct CustodyState {
    balances: HashMap<(AccountId, AccountId), Amount>,
    custody: HashMap<AccountId, Amount>,
}

impl InMemoryCustodian {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an external balance. Test/demo helper; a real custodian learns
    /// balances from the underlying asset ledger.
    pub fn fund(&self, account: AccountId, asset: AccountId, amount: Amount) {
        let mut state = self.write_guard();
        let balance = state.balances.entry((account, asset)).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    fn write_guard(&self) -> std::sync::RwLockWriteGuard<'_, CustodyState> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    fn read_guard(&self) -> std::sync::RwLockReadGuard<'_, CustodyState> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }
}

impl ValueCustodian for InMemoryCustodian {
    fn deposit(&self, asset: AccountId, from: AccountId, amount: Amount) -> Result<(), PoolError> {
        let mut state = self.write_guard();

        let balance = state.balances.entry((from, asset)).or_insert(0);
        if *balance < amount {
            return Err(PoolError::Custody(format!(
                "insufficient balance: {from} holds {balance} of {asset}, needs {amount}"
            )));
        }
        *balance -= amount;

        let custody = state.custody.entry(asset).or_insert(0);
        *custody = custody.checked_add(amount).ok_or(PoolError::Overflow)?;
        Ok(())
    }

    fn release(&self, asset: AccountId, to: AccountId, amount: Amount) -> Result<(), PoolError> {
        let mut state = self.write_guard();

        let custody = state.custody.entry(asset).or_insert(0);
        let updated = custody.checked_sub(amount).ok_or_else(|| {
            PoolError::Custody(format!(
                "custody underflow: {custody} of {asset} held, release of {amount} requested"
            ))
        })?;
        *custody = updated;

        let balance = state.balances.entry((to, asset)).or_insert(0);
        *balance = balance.saturating_add(amount);
        Ok(())
    }

    fn balance_of(&self, account: AccountId, asset: AccountId) -> Amount {
        self.read_guard()
            .balances
            .get(&(account, asset))
            .copied()
            .unwrap_or(0)
    }

    fn custodied(&self, asset: AccountId) -> Amount {
        self.read_guard().custody.get(&asset).copied().unwrap_or(0)
    }
}
