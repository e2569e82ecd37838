use thiserror::Error;

use crate::pool::PoolId;

/// Errors produced by cascade and registry operations.
///
/// Every rejected precondition is a distinct named failure, detected before
/// any state mutation; a failed call has no partial effect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// A zero/null owner, asset, or provider reference was supplied.
    #[error("zero address is not allowed")]
    InvalidAddress,

    /// Zero, exhausted, or exceeding-available amount in create/withdraw/split.
    #[error("amount should be greater than 0")]
    InvalidAmount,

    /// Caller is neither the pool owner nor an approved cascading provider.
    #[error("not the owner of the pool")]
    UnauthorizedCaller,

    /// A provider attempted to mutate state it is not approved for.
    #[error("invalid provider address")]
    UnauthorizedProvider,

    /// Vesting window is degenerate (finish <= start).
    #[error("vesting finish must be after start")]
    ScheduleInvalid,

    /// No pool is registered under this identifier at this layer.
    #[error("unknown pool {0}")]
    UnknownPool(PoolId),

    /// A layer was asked to register an identifier it already tracks.
    #[error("pool {0} is already registered at this layer")]
    DuplicatePool(PoolId),

    /// The params sequence does not match the layer's expected layout.
    #[error("malformed params: expected {expected} values, got {actual}")]
    InvalidParams { expected: usize, actual: usize },

    /// Release arithmetic exceeded the amount domain.
    #[error("arithmetic overflow in release computation")]
    Overflow,

    /// The external value custodian rejected a transfer.
    #[error("custody error: {0}")]
    Custody(String),
}
