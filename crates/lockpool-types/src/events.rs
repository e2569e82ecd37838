use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::account::AccountId;
use crate::pool::{Amount, PoolId};

/// Events emitted for external observers and indexers.
///
/// `Created` fires once per cascade layer that registers an entry for a
/// pool, carrying that layer's params layout. `Split` carries both sibling
/// identifiers with their post-split remaining amounts. `Closed` fires when
/// a withdrawal drains a pool and the registry burns it.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum PoolEvent {
    Created {
        pool: PoolId,
        owner: AccountId,
        asset: AccountId,
        provider: AccountId,
        params: Vec<Amount>,
    },
    Split {
        pool: PoolId,
        new_pool: PoolId,
        owner: AccountId,
        new_owner: AccountId,
        remaining: Amount,
        new_remaining: Amount,
    },
    Closed {
        pool: PoolId,
    },
}

impl PoolEvent {
    /// The primary pool this event concerns.
    pub fn pool(&self) -> PoolId {
        match self {
            PoolEvent::Created { pool, .. }
            | PoolEvent::Split { pool, .. }
            | PoolEvent::Closed { pool } => *pool,
        }
    }
}

/// Sink for cascade events. Shared by the registry and every provider in a
/// deployment; recording is infallible so event emission can never abort a
/// ledger mutation that already validated.
pub trait EventSink: Send + Sync {
    fn record(&self, event: PoolEvent);
}

/// In-memory event log for tests, local demos, and embedding.
#[derive(Default)]
pub struct MemoryEventLog {
    inner: RwLock<Vec<PoolEvent>>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events recorded so far, in emission order.
    pub fn all(&self) -> Vec<PoolEvent> {
        self.read_guard().clone()
    }

    /// Events concerning the given pool (as primary subject).
    pub fn for_pool(&self, pool: PoolId) -> Vec<PoolEvent> {
        self.read_guard()
            .iter()
            .filter(|e| e.pool() == pool)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read_guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_guard(&self) -> std::sync::RwLockReadGuard<'_, Vec<PoolEvent>> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }
}

impl EventSink for MemoryEventLog {
    fn record(&self, event: PoolEvent) {
        self.inner
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}
