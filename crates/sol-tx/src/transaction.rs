//! Transaction lifecycle: build, set blockhash, sign incrementally.
//!
//! ```text
//! Built -> BlockhashSet -> PartiallySigned* -> FullySigned -> (external encoder)
//! ```
//!
//! Signature slot `i` belongs to `message.account_keys[i]` for every
//! `i < header.num_required_signatures`.

use std::fmt;

use ed25519_dalek::VerifyingKey;

use crate::address::{Blockhash, Pubkey, Signature, SIGNATURE_BYTES};
use crate::config::TxConfig;
use crate::error::SolError;
use crate::instruction::Instruction;
use crate::message::{encode_compact_u16, Message};
use crate::signer::TransactionSigner;

/// A message plus one signature slot per required signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub signatures: Vec<Signature>,
    pub message: Message,
}

impl Transaction {
    /// Compile `instructions` with `payer` as fee payer and allocate empty
    /// signature slots.
    pub fn new(payer: &Pubkey, instructions: &[Instruction]) -> Result<Self, SolError> {
        let message = Message::compile(payer, instructions)?;
        Ok(Self::from_message(message))
    }

    pub fn from_message(message: Message) -> Self {
        let signatures =
            vec![Signature::default(); message.header.num_required_signatures as usize];
        Self {
            signatures,
            message,
        }
    }

    /// Set the recent blockhash.
    ///
    /// Signatures cover the blockhash, so changing it clears every slot that
    /// was already filled.
    pub fn set_blockhash(&mut self, blockhash: Blockhash) {
        if self.message.recent_blockhash == blockhash {
            return;
        }
        self.message.recent_blockhash = blockhash;

        let filled = self.signatures.iter().filter(|s| !s.is_empty()).count();
        if filled > 0 {
            tracing::warn!(
                cleared = filled,
                %blockhash,
                "blockhash changed after signing, clearing stale signatures"
            );
            self.signatures.fill(Signature::default());
        }
    }

    /// The bytes every signer signs for the current state of the message.
    pub fn message_data(&self) -> Result<Vec<u8>, SolError> {
        self.message.serialize()
    }

    /// Sign with each of `signers`, writing into their slots.
    ///
    /// Every signer is matched against the account table before anything is
    /// signed: if one is missing or is not a required signer, the call fails
    /// and no slot is touched. Signing again with the same key overwrites its
    /// slot.
    pub fn sign<S>(&mut self, signers: &[&S]) -> Result<(), SolError>
    where
        S: TransactionSigner + ?Sized,
    {
        let slots = signers
            .iter()
            .map(|signer| self.signer_slot(&signer.pubkey()))
            .collect::<Result<Vec<usize>, SolError>>()?;

        let payload = self.message_data()?;

        let mut signed = Vec::with_capacity(signers.len());
        for (signer, slot) in signers.iter().zip(slots) {
            signed.push((slot, signer.try_sign_message(&payload)?));
        }

        for (slot, signature) in signed {
            tracing::debug!(slot, signer = %self.message.account_keys[slot], "signed slot");
            self.signatures[slot] = signature;
        }

        Ok(())
    }

    /// The slot `pubkey` signs into.
    pub fn signer_slot(&self, pubkey: &Pubkey) -> Result<usize, SolError> {
        let Some(index) = self.message.account_index(pubkey) else {
            tracing::warn!(%pubkey, "signer is not in the account list");
            return Err(SolError::UnknownSigner(pubkey.to_string()));
        };
        if index >= self.signatures.len() {
            tracing::warn!(%pubkey, index, "account is not a required signer");
            return Err(SolError::NotASigner(pubkey.to_string()));
        }
        Ok(index)
    }

    /// The first signature, which identifies the transaction on chain.
    pub fn signature(&self) -> Option<&Signature> {
        self.signatures.first()
    }

    /// True once every slot holds a signature.
    pub fn is_signed(&self) -> bool {
        self.signatures.iter().all(|s| !s.is_empty())
    }

    /// Check every slot against the current payload.
    pub fn verify(&self) -> Result<(), SolError> {
        let payload = self.message_data()?;

        for (slot, (signature, key)) in self
            .signatures
            .iter()
            .zip(self.message.signer_keys())
            .enumerate()
        {
            let verifying_key = VerifyingKey::from_bytes(key.as_bytes())
                .map_err(|e| SolError::InvalidPublicKey(format!("slot {slot}: {e}")))?;
            let sig = ed25519_dalek::Signature::from_bytes(signature.as_bytes());
            verifying_key
                .verify_strict(&payload, &sig)
                .map_err(|_| SolError::SigningError(format!("slot {slot} does not verify")))?;
        }

        Ok(())
    }

    /// Length of the full wire form: compact-u16 signature count, the
    /// signatures, then the message.
    pub fn serialized_size(&self) -> Result<usize, SolError> {
        let count = u16::try_from(self.signatures.len()).map_err(|_| {
            SolError::SerializationError("too many signatures".into())
        })?;
        Ok(encode_compact_u16(count).len()
            + self.signatures.len() * SIGNATURE_BYTES
            + self.message_data()?.len())
    }

    /// Fail if the wire form would exceed `config.max_transaction_size`.
    pub fn check_size(&self, config: &TxConfig) -> Result<usize, SolError> {
        let size = self.serialized_size()?;
        if size > config.max_transaction_size {
            return Err(SolError::TransactionTooLarge {
                size,
                max: config.max_transaction_size,
            });
        }
        Ok(size)
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Signatures:")?;
        for (i, s) in self.signatures.iter().enumerate() {
            writeln!(f, "  {i}: {s}")?;
        }
        writeln!(f, "Message:")?;
        writeln!(f, "  Header:")?;
        let header = &self.message.header;
        writeln!(f, "    NumSignatures: {}", header.num_required_signatures)?;
        writeln!(f, "    NumReadOnly: {}", header.num_readonly_unsigned_accounts)?;
        writeln!(f, "    NumReadOnlySigned: {}", header.num_readonly_signed_accounts)?;
        writeln!(f, "  Accounts:")?;
        for (i, a) in self.message.account_keys.iter().enumerate() {
            writeln!(f, "    {i}: {a}")?;
        }
        writeln!(f, "  Instructions:")?;
        for (i, ix) in self.message.instructions.iter().enumerate() {
            writeln!(f, "    {i}:")?;
            writeln!(f, "      ProgramIndex: {}", ix.program_id_index)?;
            writeln!(f, "      Accounts: {:?}", ix.accounts)?;
            writeln!(f, "      Data: {:?}", ix.data)?;
        }
        Ok(())
    }
}
