use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::error::PoolError;

/// Opaque reference to an account, asset, or provider contract.
///
/// An `AccountId` is derived deterministically from a label using BLAKE3,
/// so the same label always produces the same identity. The all-zero value
/// is the null sentinel: it is never a valid owner, asset, or provider, and
/// a burned pool's owner reads as [`AccountId::ZERO`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId {
    bytes: [u8; 32],
}

impl AccountId {
    /// The null sentinel. Rejected everywhere a real reference is required.
    pub const ZERO: AccountId = AccountId { bytes: [0u8; 32] };

    /// Derive an `AccountId` from a label.
    pub fn derive(label: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"lockpool-account-v1:");
        hasher.update(label.as_bytes());
        Self {
            bytes: *hasher.finalize().as_bytes(),
        }
    }

    /// Create a random `AccountId` for tests and demos.
    pub fn ephemeral() -> Self {
        let mut bytes = [0u8; 32];
        rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
        Self { bytes }
    }

    /// Create from raw bytes. Use [`Self::derive`] for production code.
    pub fn from_raw(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// The raw 32-byte value.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Returns `true` if this is the null sentinel.
    pub fn is_zero(&self) -> bool {
        self.bytes == [0u8; 32]
    }

    /// Full hex-encoded string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Parse from a hex string (64 hex characters).
    pub fn from_hex(s: &str) -> Result<Self, PoolError> {
        let s = s.strip_prefix("acct:").unwrap_or(s);
        let decoded = hex::decode(s).map_err(|_| PoolError::InvalidAddress)?;
        if decoded.len() != 32 {
            return Err(PoolError::InvalidAddress);
        }
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&decoded);
        Ok(Self { bytes })
    }

    /// Short identifier (first 8 hex characters).
    pub fn short_id(&self) -> String {
        format!("acct:{}", hex::encode(&self.bytes[..4]))
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.short_id())
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_id())
    }
}
