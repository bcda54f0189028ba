//! Signing capability consumed by [`Transaction::sign`](crate::Transaction::sign).
//!
//! The transaction only needs to know which key is signing and how to get a
//! signature over a payload. Private key material stays with whoever
//! implements [`TransactionSigner`].

use ed25519_dalek::Signer;
use zeroize::Zeroize;

use crate::address::{Pubkey, Signature};
use crate::error::SolError;

/// Something that can sign a message payload on behalf of one account.
pub trait TransactionSigner {
    fn pubkey(&self) -> Pubkey;

    fn try_sign_message(&self, message: &[u8]) -> Result<Signature, SolError>;
}

impl TransactionSigner for ed25519_dalek::SigningKey {
    fn pubkey(&self) -> Pubkey {
        Pubkey::new(self.verifying_key().to_bytes())
    }

    fn try_sign_message(&self, message: &[u8]) -> Result<Signature, SolError> {
        Ok(self.sign(message).into())
    }
}

/// An Ed25519 keypair built from a 32-byte seed.
///
/// `ed25519_dalek::SigningKey` zeroizes itself on drop; the seed copy taken
/// during construction is wiped as well.
pub struct Keypair {
    signing_key: ed25519_dalek::SigningKey,
}

impl Keypair {
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let mut bytes = *seed;
        let signing_key = ed25519_dalek::SigningKey::from_bytes(&bytes);
        bytes.zeroize();
        Self { signing_key }
    }

    /// Build a keypair from a seed of unchecked length.
    pub fn from_seed_slice(seed: &[u8]) -> Result<Self, SolError> {
        let mut bytes: [u8; 32] = seed.try_into().map_err(|_| {
            SolError::InvalidPrivateKey(format!("expected 32 bytes, got {}", seed.len()))
        })?;
        let keypair = Self::from_seed(&bytes);
        bytes.zeroize();
        Ok(keypair)
    }

    pub fn verifying_key(&self) -> ed25519_dalek::VerifyingKey {
        self.signing_key.verifying_key()
    }
}

impl From<ed25519_dalek::SigningKey> for Keypair {
    fn from(signing_key: ed25519_dalek::SigningKey) -> Self {
        Self { signing_key }
    }
}

impl TransactionSigner for Keypair {
    fn pubkey(&self) -> Pubkey {
        self.signing_key.pubkey()
    }

    fn try_sign_message(&self, message: &[u8]) -> Result<Signature, SolError> {
        self.signing_key.try_sign_message(message)
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keypair")
            .field("pubkey", &self.pubkey())
            .finish_non_exhaustive()
    }
}
