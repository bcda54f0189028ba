//! Account collection: deduplication with permission promotion, then the
//! canonical ordering that the message header counts depend on.
//!
//! Every consumer of a compiled message infers an account's permissions
//! purely from its index relative to the header counts, so the order produced
//! here is part of the wire contract:
//!
//! ```text
//! [ payer | writable signers | read-only signers | writable | read-only | programs ]
//!   \______________ signers ______________/   \_________ non-signers _________/
//! ```

use std::collections::HashMap;

use crate::address::Pubkey;
use crate::instruction::{AccountMeta, Instruction};

/// Unique accounts in first-seen order, keyed by public key.
///
/// Inserting a key that is already present promotes the stored entry's flags
/// instead of adding a second entry; flags are never demoted.
#[derive(Debug, Default)]
pub struct AccountSet {
    index: HashMap<Pubkey, usize>,
    accounts: Vec<AccountMeta>,
}

impl AccountSet {
    /// Collect the payer followed by each instruction's program and accounts.
    pub fn collect(payer: &Pubkey, instructions: &[Instruction]) -> Self {
        let mut set = Self::default();
        set.insert(AccountMeta::payer(*payer));
        for ix in instructions {
            set.insert(AccountMeta::program(ix.program_id));
            for meta in &ix.accounts {
                set.insert(meta.clone());
            }
        }
        set
    }

    /// Add one account, merging it into an existing entry with the same key.
    pub fn insert(&mut self, meta: AccountMeta) {
        match self.index.get(&meta.pubkey) {
            Some(&pos) => {
                let entry = &mut self.accounts[pos];
                entry.is_signer |= meta.is_signer;
                entry.is_writable |= meta.is_writable;
                entry.is_payer |= meta.is_payer;
                entry.is_program |= meta.is_program;
            }
            None => {
                self.index.insert(meta.pubkey, self.accounts.len());
                self.accounts.push(meta);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn get(&self, pubkey: &Pubkey) -> Option<&AccountMeta> {
        self.index.get(pubkey).map(|&pos| &self.accounts[pos])
    }

    /// The collected accounts in canonical order.
    pub fn into_sorted(self) -> Vec<AccountMeta> {
        let mut accounts = self.accounts;
        sort_canonical(&mut accounts);
        accounts
    }
}

/// Sort accounts into canonical message order.
///
/// Payer first, then signers before non-signers, writable before read-only
/// within each group, and program-only references after plain read-only
/// accounts. The sort is stable, so equal entries keep encounter order.
pub fn sort_canonical(accounts: &mut [AccountMeta]) {
    accounts.sort_by_key(|meta| {
        (
            !meta.is_payer,
            !meta.is_signer,
            !meta.is_writable,
            meta.is_program_only(),
        )
    });
}
