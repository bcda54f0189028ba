//! Transaction builder settings.

use serde::{Deserialize, Serialize};

use crate::address::{Pubkey, PUBKEY_BYTES};
use crate::error::SolError;

/// Largest serialized transaction the reference chain accepts in one packet.
pub const MAX_TRANSACTION_SIZE: usize = 1232;

/// Settings that govern how raw input is accepted and how large a finished
/// transaction may get.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TxConfig {
    /// Upper bound checked by [`Transaction::check_size`](crate::Transaction::check_size).
    pub max_transaction_size: usize,
    /// Accept an empty key slice as the all-zero key instead of rejecting it.
    pub zero_fill_empty_keys: bool,
}

impl Default for TxConfig {
    fn default() -> Self {
        Self {
            max_transaction_size: MAX_TRANSACTION_SIZE,
            zero_fill_empty_keys: true,
        }
    }
}

impl TxConfig {
    /// Load settings from JSON. Missing fields fall back to their defaults.
    pub fn from_json(json: &str) -> Result<Self, SolError> {
        serde_json::from_str(json).map_err(|e| SolError::ConfigError(e.to_string()))
    }

    /// Turn raw key bytes from an upstream caller into a [`Pubkey`].
    ///
    /// An empty slice becomes the zero-filled key when
    /// `zero_fill_empty_keys` is set. Every other length must be exactly 32.
    pub fn parse_key(&self, raw: &[u8]) -> Result<Pubkey, SolError> {
        if raw.is_empty() {
            if self.zero_fill_empty_keys {
                tracing::debug!("empty account key replaced with zero-filled placeholder");
                return Ok(Pubkey::new([0u8; PUBKEY_BYTES]));
            }
            return Err(SolError::InvalidPublicKey("empty account key".into()));
        }
        Pubkey::try_from(raw)
    }
}
