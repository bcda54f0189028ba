//! Message compilation and the signing payload format.
//!
//! The message is the part of a transaction every signature covers. Its
//! serialized form is a compact binary layout:
//!
//! ```text
//! message:
//!   num_required_sigs     u8
//!   num_readonly_signed   u8
//!   num_readonly_unsigned u8
//!   num_accounts          compact-u16
//!   account_keys          32 bytes * num_accounts
//!   recent_blockhash      32 bytes
//!   num_instructions      compact-u16
//!   instructions[]        (see below)
//!
//! Instruction:
//!   program_id_index      u8
//!   num_accounts          compact-u16
//!   account_indices       u8 * num_accounts
//!   data_len              compact-u16
//!   data                  u8 * data_len
//! ```

use std::collections::HashMap;

use crate::accounts::AccountSet;
use crate::address::{Blockhash, Pubkey};
use crate::error::SolError;
use crate::instruction::Instruction;

/// Account indices are a single byte on the wire.
const MAX_ACCOUNTS: usize = u8::MAX as usize + 1;

// ---------------------------------------------------------------------------
// Compact-u16 encoding
// ---------------------------------------------------------------------------

/// Encode a `u16` value in Solana's compact-u16 format.
///
/// - Values 0..0x7f       -> 1 byte
/// - Values 0x80..0x3fff  -> 2 bytes
/// - Values 0x4000..      -> 3 bytes (max 0x1_ffff, but u16 caps at 0xffff)
pub fn encode_compact_u16(value: u16) -> Vec<u8> {
    let mut val = value as u32;
    let mut out = Vec::with_capacity(3);

    loop {
        let mut byte = (val & 0x7f) as u8;
        val >>= 7;
        if val > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if val == 0 {
            break;
        }
    }

    out
}

fn push_len(buf: &mut Vec<u8>, len: usize, what: &str) -> Result<(), SolError> {
    let len = u16::try_from(len)
        .map_err(|_| SolError::SerializationError(format!("{what} length {len} exceeds u16")))?;
    buf.extend_from_slice(&encode_compact_u16(len));
    Ok(())
}

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// Permission counts that partition the account table.
///
/// The first `num_required_signatures` accounts sign; the last
/// `num_readonly_signed_accounts` of those are read-only. Of the remaining
/// accounts, the last `num_readonly_unsigned_accounts` are read-only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Header {
    pub num_required_signatures: u8,
    pub num_readonly_signed_accounts: u8,
    pub num_readonly_unsigned_accounts: u8,
}

/// An instruction whose keys are replaced by indices into the account table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    /// Index into `account_keys` for the program to invoke.
    pub program_id_index: u8,
    /// Indices into `account_keys` for each account the instruction reads/writes.
    pub accounts: Vec<u8>,
    /// Opaque instruction data.
    pub data: Vec<u8>,
}

/// A compiled message, ready to be signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub header: Header,
    /// All account keys referenced by the message, in canonical order.
    pub account_keys: Vec<Pubkey>,
    pub recent_blockhash: Blockhash,
    pub instructions: Vec<CompiledInstruction>,
}

impl Message {
    /// Compile `instructions` for `payer` with an unset blockhash.
    pub fn compile(payer: &Pubkey, instructions: &[Instruction]) -> Result<Self, SolError> {
        Self::compile_with_blockhash(payer, instructions, Blockhash::default())
    }

    /// Compile `instructions` for `payer`.
    ///
    /// Accounts are deduplicated and put in canonical order, the header is
    /// counted from that order, and every instruction's program and account
    /// keys are rewritten as indices into the table.
    pub fn compile_with_blockhash(
        payer: &Pubkey,
        instructions: &[Instruction],
        recent_blockhash: Blockhash,
    ) -> Result<Self, SolError> {
        let accounts = AccountSet::collect(payer, instructions).into_sorted();

        if accounts.len() > MAX_ACCOUNTS {
            return Err(SolError::TransactionBuildError(format!(
                "{} accounts exceed the {MAX_ACCOUNTS} account limit",
                accounts.len()
            )));
        }

        let mut num_signers = 0usize;
        let mut num_readonly_signed = 0usize;
        let mut num_readonly_unsigned = 0usize;
        for meta in &accounts {
            if meta.is_signer {
                num_signers += 1;
                if !meta.is_writable {
                    num_readonly_signed += 1;
                }
            } else if !meta.is_writable {
                num_readonly_unsigned += 1;
            }
        }

        let header = Header {
            num_required_signatures: header_count(num_signers)?,
            num_readonly_signed_accounts: header_count(num_readonly_signed)?,
            num_readonly_unsigned_accounts: header_count(num_readonly_unsigned)?,
        };

        let account_keys: Vec<Pubkey> = accounts.iter().map(|m| m.pubkey).collect();

        // Positions fit in a u8: the table length was checked above.
        let positions: HashMap<Pubkey, u8> = account_keys
            .iter()
            .enumerate()
            .map(|(i, k)| (*k, i as u8))
            .collect();
        let index_of = |key: &Pubkey| {
            positions.get(key).copied().ok_or_else(|| {
                SolError::TransactionBuildError(format!("{key} not in account keys"))
            })
        };

        let mut compiled = Vec::with_capacity(instructions.len());
        for ix in instructions {
            let program_id_index = index_of(&ix.program_id)?;
            let indices = ix
                .accounts
                .iter()
                .map(|meta| index_of(&meta.pubkey))
                .collect::<Result<Vec<u8>, SolError>>()?;

            compiled.push(CompiledInstruction {
                program_id_index,
                accounts: indices,
                data: ix.data.clone(),
            });
        }

        tracing::debug!(
            accounts = account_keys.len(),
            signers = header.num_required_signatures,
            readonly_signed = header.num_readonly_signed_accounts,
            readonly_unsigned = header.num_readonly_unsigned_accounts,
            instructions = compiled.len(),
            "compiled message"
        );

        Ok(Self {
            header,
            account_keys,
            recent_blockhash,
            instructions: compiled,
        })
    }

    /// Position of `key` in the account table.
    pub fn account_index(&self, key: &Pubkey) -> Option<usize> {
        self.account_keys.iter().position(|k| k == key)
    }

    /// Whether the account at `index` must sign.
    pub fn is_signer(&self, index: usize) -> bool {
        index < self.header.num_required_signatures as usize
    }

    /// Whether the account at `index` may be written, as implied by its
    /// position relative to the header counts.
    pub fn is_writable(&self, index: usize) -> bool {
        let num_signers = self.header.num_required_signatures as usize;
        if index >= self.account_keys.len() {
            return false;
        }
        if index < num_signers {
            index < num_signers - self.header.num_readonly_signed_accounts as usize
        } else {
            index < self.account_keys.len() - self.header.num_readonly_unsigned_accounts as usize
        }
    }

    /// The signers' keys, in signature slot order.
    pub fn signer_keys(&self) -> &[Pubkey] {
        let n = (self.header.num_required_signatures as usize).min(self.account_keys.len());
        &self.account_keys[..n]
    }

    /// Serialize the message (the bytes that get signed).
    pub fn serialize(&self) -> Result<Vec<u8>, SolError> {
        let mut buf = Vec::with_capacity(256);

        // Header: 3 bytes.
        buf.push(self.header.num_required_signatures);
        buf.push(self.header.num_readonly_signed_accounts);
        buf.push(self.header.num_readonly_unsigned_accounts);

        // Account keys.
        push_len(&mut buf, self.account_keys.len(), "account list")?;
        for key in &self.account_keys {
            buf.extend_from_slice(key.as_bytes());
        }

        buf.extend_from_slice(self.recent_blockhash.as_bytes());

        // Instructions.
        push_len(&mut buf, self.instructions.len(), "instruction list")?;
        for ix in &self.instructions {
            buf.push(ix.program_id_index);

            push_len(&mut buf, ix.accounts.len(), "instruction account list")?;
            buf.extend_from_slice(&ix.accounts);

            push_len(&mut buf, ix.data.len(), "instruction data")?;
            buf.extend_from_slice(&ix.data);
        }

        Ok(buf)
    }
}

fn header_count(count: usize) -> Result<u8, SolError> {
    u8::try_from(count).map_err(|_| {
        SolError::TransactionBuildError(format!("header count {count} does not fit in a byte"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{system_transfer, AccountMeta, SYSTEM_PROGRAM_ID};

    fn key(b: u8) -> Pubkey {
        Pubkey::new([b; 32])
    }

    // -- compact-u16 encoding -----------------------------------------------

    #[test]
    fn compact_u16_zero() {
        assert_eq!(encode_compact_u16(0), vec![0x00]);
    }

    #[test]
    fn compact_u16_one_byte_max() {
        assert_eq!(encode_compact_u16(0x7f), vec![0x7f]);
    }

    #[test]
    fn compact_u16_boundary_128() {
        // 128 = 0x80 -> two bytes: (0x00 | 0x80), 0x01
        assert_eq!(encode_compact_u16(128), vec![0x80, 0x01]);
    }

    #[test]
    fn compact_u16_boundary_16384() {
        assert_eq!(encode_compact_u16(16384), vec![0x80, 0x80, 0x01]);
    }

    #[test]
    fn compact_u16_max_value() {
        // ((0x7f) | (0x7f << 7) | (0x03 << 14)) = 65535
        assert_eq!(encode_compact_u16(u16::MAX), vec![0xff, 0xff, 0x03]);
    }

    // -- Compilation ----------------------------------------------------------

    #[test]
    fn transfer_account_order_and_header() {
        let from = key(1);
        let to = key(2);
        let ix = system_transfer(&from, &to, 1000).unwrap();
        let msg = Message::compile(&from, &[ix]).unwrap();

        // Accounts: from (signer+writable), to (writable), system program (read-only)
        assert_eq!(msg.account_keys, vec![from, to, SYSTEM_PROGRAM_ID]);
        assert_eq!(msg.header.num_required_signatures, 1);
        assert_eq!(msg.header.num_readonly_signed_accounts, 0);
        assert_eq!(msg.header.num_readonly_unsigned_accounts, 1);
    }

    #[test]
    fn self_transfer_deduplicates_accounts() {
        let k = key(0xAA);
        let ix = system_transfer(&k, &k, 100).unwrap();
        let msg = Message::compile(&k, &[ix]).unwrap();

        assert_eq!(msg.account_keys.len(), 2);
        assert_eq!(msg.header.num_required_signatures, 1);
        assert_eq!(msg.instructions[0].accounts, vec![0, 0]);
    }

    #[test]
    fn scenario_payer_signer_readonly_program() {
        let (p, a, b, g) = (key(1), key(2), key(3), key(4));
        let ix = Instruction::new(
            g,
            vec![AccountMeta::new(a, true), AccountMeta::new_readonly(b, false)],
            vec![0xde, 0xad],
        );
        let msg = Message::compile(&p, &[ix]).unwrap();

        assert_eq!(msg.account_keys, vec![p, a, b, g]);
        assert_eq!(
            msg.header,
            Header {
                num_required_signatures: 2,
                num_readonly_signed_accounts: 0,
                num_readonly_unsigned_accounts: 2,
            }
        );
        assert_eq!(msg.instructions[0].program_id_index, 3);
        assert_eq!(msg.instructions[0].accounts, vec![1, 2]);
        assert_eq!(msg.instructions[0].data, vec![0xde, 0xad]);
    }

    #[test]
    fn indices_round_trip_to_original_keys() {
        let payer = key(1);
        let instructions = vec![
            Instruction::new(
                key(20),
                vec![
                    AccountMeta::new_readonly(key(5), false),
                    AccountMeta::new(key(6), false),
                    AccountMeta::new_readonly(key(7), true),
                ],
                vec![1],
            ),
            Instruction::new(
                key(21),
                vec![AccountMeta::new(key(6), true), AccountMeta::new_readonly(key(20), false)],
                vec![2, 3],
            ),
        ];
        let msg = Message::compile(&payer, &instructions).unwrap();

        for (ix, cix) in instructions.iter().zip(&msg.instructions) {
            assert_eq!(msg.account_keys[cix.program_id_index as usize], ix.program_id);
            let resolved: Vec<Pubkey> = cix
                .accounts
                .iter()
                .map(|&i| msg.account_keys[i as usize])
                .collect();
            let expected: Vec<Pubkey> = ix.accounts.iter().map(|m| m.pubkey).collect();
            assert_eq!(resolved, expected);
            assert_eq!(cix.data, ix.data);
        }
    }

    #[test]
    fn partition_matches_header_counts() {
        let payer = key(1);
        let ix = Instruction::new(
            key(30),
            vec![
                AccountMeta::new_readonly(key(2), false),
                AccountMeta::new_readonly(key(3), true),
                AccountMeta::new(key(4), false),
                AccountMeta::new(key(5), true),
            ],
            vec![],
        );
        let msg = Message::compile(&payer, &[ix]).unwrap();
        // payer, 5 (ws), 3 (rs), 4 (w), 2 (r), 30 (program)
        assert_eq!(
            msg.account_keys,
            vec![payer, key(5), key(3), key(4), key(2), key(30)]
        );

        let signers = [true, true, true, false, false, false];
        let writable = [true, true, false, true, false, false];
        for i in 0..msg.account_keys.len() {
            assert_eq!(msg.is_signer(i), signers[i], "signer flag at {i}");
            assert_eq!(msg.is_writable(i), writable[i], "writable flag at {i}");
        }
        assert_eq!(msg.signer_keys(), &[payer, key(5), key(3)]);
    }

    #[test]
    fn no_instructions_still_has_payer() {
        let msg = Message::compile(&key(1), &[]).unwrap();
        assert_eq!(msg.account_keys, vec![key(1)]);
        assert_eq!(msg.header.num_required_signatures, 1);
        assert!(msg.instructions.is_empty());
    }

    #[test]
    fn too_many_accounts_fails() {
        let accounts: Vec<AccountMeta> = (0..300u16)
            .map(|i| {
                let mut bytes = [0xEEu8; 32];
                bytes[..2].copy_from_slice(&i.to_le_bytes());
                AccountMeta::new_readonly(Pubkey::new(bytes), false)
            })
            .collect();
        let ix = Instruction::new(key(1), accounts, vec![]);
        let err = Message::compile(&key(2), &[ix]).unwrap_err();
        assert!(matches!(err, SolError::TransactionBuildError(_)));
    }

    // -- Serialization --------------------------------------------------------

    #[test]
    fn serialize_message_starts_with_header() {
        let ix = system_transfer(&key(1), &key(2), 100).unwrap();
        let msg = Message::compile(&key(1), &[ix]).unwrap();
        let bytes = msg.serialize().unwrap();

        assert_eq!(&bytes[..3], &[1, 0, 1]);
        assert_eq!(bytes[3], 3); // compact-u16 account count
        assert_eq!(&bytes[4..36], key(1).as_bytes());
    }

    #[test]
    fn serialize_message_contains_blockhash() {
        let blockhash = Blockhash::new([0xCC; 32]);
        let ix = system_transfer(&key(1), &key(2), 500).unwrap();
        let msg = Message::compile_with_blockhash(&key(1), &[ix], blockhash).unwrap();
        let bytes = msg.serialize().unwrap();

        // Blockhash sits after: header(3) + compact-u16(num_accounts) + 32*num_accounts
        let offset = 3 + 1 + 32 * msg.account_keys.len();
        assert_eq!(&bytes[offset..offset + 32], blockhash.as_bytes());
    }

    #[test]
    fn serialize_message_instruction_layout() {
        let ix = system_transfer(&key(1), &key(2), 7).unwrap();
        let msg = Message::compile(&key(1), &[ix]).unwrap();
        let bytes = msg.serialize().unwrap();

        let start = 3 + 1 + 32 * 3 + 32;
        // one instruction, program index 2, accounts [0, 1], 12 data bytes
        assert_eq!(&bytes[start..start + 6], &[1, 2, 2, 0, 1, 12]);
        assert_eq!(bytes.len(), start + 6 + 12);
    }

    #[test]
    fn oversized_instruction_data_fails_to_serialize() {
        let ix = Instruction::new(key(3), vec![], vec![0u8; 70_000]);
        let msg = Message::compile(&key(1), &[ix]).unwrap();
        assert!(matches!(
            msg.serialize().unwrap_err(),
            SolError::SerializationError(_)
        ));
    }
}
