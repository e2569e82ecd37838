//! Leaf ledger bookkeeping for the lockpool provider cascade.
//!
//! This crate provides:
//! - The `PoolProvider` capability interface every cascade layer implements
//! - The `OwnershipRegistry` and `ValueCustodian` collaborator boundaries
//! - `BaseLedgerProvider`, the leaf layer that owns remaining-amount
//!   bookkeeping and is the only layer that moves value in and out of
//!   custody
//! - `InMemoryCustodian` for tests and embedding

pub mod base;
pub mod custody;
pub mod traits;

pub use base::{validate_creation, BaseLedgerProvider, LedgerEntry};
pub use custody::InMemoryCustodian;
pub use traits::{
    authorize_mutation, mint_and_register, OwnershipRegistry, PoolProvider, ValueCustodian,
};
