//! Fixed-size chain identifiers: public keys, blockhashes and signatures.
//!
//! Solana addresses are simply Base58-encoded 32-byte Ed25519 public keys.
//! There is no hashing step (unlike Bitcoin or Ethereum). The canonical
//! alphabet is the standard Bitcoin Base58 alphabet used by the `bs58` crate.

use std::fmt;
use std::str::FromStr;

use crate::error::SolError;

/// Size of an Ed25519 public key / account address.
pub const PUBKEY_BYTES: usize = 32;

/// Size of a recent blockhash.
pub const BLOCKHASH_BYTES: usize = 32;

/// Size of an Ed25519 signature.
pub const SIGNATURE_BYTES: usize = 64;

/// A 32-byte account address.
///
/// Equality, ordering and hashing are by value, so two keys parsed from the
/// same address are interchangeable everywhere in the compiler.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pubkey([u8; PUBKEY_BYTES]);

impl Pubkey {
    pub const fn new(bytes: [u8; PUBKEY_BYTES]) -> Self {
        Self(bytes)
    }

    pub const fn to_bytes(self) -> [u8; PUBKEY_BYTES] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; PUBKEY_BYTES] {
        &self.0
    }
}

impl From<[u8; PUBKEY_BYTES]> for Pubkey {
    fn from(bytes: [u8; PUBKEY_BYTES]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for Pubkey {
    type Error = SolError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; PUBKEY_BYTES] = bytes.try_into().map_err(|_| {
            SolError::InvalidPublicKey(format!(
                "expected {PUBKEY_BYTES} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }
}

impl FromStr for Pubkey {
    type Err = SolError;

    fn from_str(address: &str) -> Result<Self, Self::Err> {
        decode_fixed::<PUBKEY_BYTES>(address).map(Self)
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pubkey({self})")
    }
}

/// A recent blockhash, fetched from an RPC node by the caller.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Blockhash([u8; BLOCKHASH_BYTES]);

impl Blockhash {
    pub const fn new(bytes: [u8; BLOCKHASH_BYTES]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; BLOCKHASH_BYTES] {
        &self.0
    }
}

impl From<[u8; BLOCKHASH_BYTES]> for Blockhash {
    fn from(bytes: [u8; BLOCKHASH_BYTES]) -> Self {
        Self(bytes)
    }
}

impl FromStr for Blockhash {
    type Err = SolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_fixed::<BLOCKHASH_BYTES>(s).map(Self)
    }
}

impl fmt::Display for Blockhash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Blockhash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Blockhash({self})")
    }
}

/// A 64-byte Ed25519 signature slot. The all-zero value marks an empty slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature([u8; SIGNATURE_BYTES]);

impl Signature {
    pub const fn new(bytes: [u8; SIGNATURE_BYTES]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_BYTES] {
        &self.0
    }

    /// True for a slot that has not been signed yet.
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self([0u8; SIGNATURE_BYTES])
    }
}

impl From<[u8; SIGNATURE_BYTES]> for Signature {
    fn from(bytes: [u8; SIGNATURE_BYTES]) -> Self {
        Self(bytes)
    }
}

impl From<ed25519_dalek::Signature> for Signature {
    fn from(sig: ed25519_dalek::Signature) -> Self {
        Self(sig.to_bytes())
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({self})")
    }
}

/// Validate a Solana address string.
///
/// A valid Solana address is a Base58-encoded string that decodes to exactly
/// 32 bytes. Returns `Ok(true)` if valid, or an error if decoding fails or
/// the length is wrong.
pub fn validate_address(address: &str) -> Result<bool, SolError> {
    Pubkey::from_str(address).map(|_| true)
}

fn decode_fixed<const N: usize>(encoded: &str) -> Result<[u8; N], SolError> {
    let bytes = bs58::decode(encoded)
        .into_vec()
        .map_err(|e| SolError::InvalidAddress(format!("base58 decode failed: {e}")))?;

    bytes.try_into().map_err(|v: Vec<u8>| {
        SolError::InvalidAddress(format!("expected {N} bytes, got {}", v.len()))
    })
}
