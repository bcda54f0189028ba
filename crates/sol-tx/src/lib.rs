//! Solana transaction message compiler for the wallet backend.
//!
//! Takes a fee payer and a list of instructions and produces a canonical
//! legacy message: accounts deduplicated with their strongest permissions,
//! ordered so the three header counts describe every account's role, and
//! instructions re-expressed as indices into that account table. Signing
//! fills one 64-byte slot per required signer.
//!
//! Everything is built by hand on top of `ed25519-dalek` and `bs58`, without
//! `solana-sdk`. Transport encoding, RPC and key custody live elsewhere.

pub mod accounts;
pub mod address;
pub mod config;
pub mod error;
pub mod instruction;
pub mod message;
pub mod signer;
pub mod transaction;

// Re-export key public types for ergonomic imports.
pub use accounts::{sort_canonical, AccountSet};
pub use address::{validate_address, Blockhash, Pubkey, Signature};
pub use config::{TxConfig, MAX_TRANSACTION_SIZE};
pub use error::SolError;
pub use instruction::{system_transfer, AccountMeta, Instruction, SYSTEM_PROGRAM_ID};
pub use message::{encode_compact_u16, CompiledInstruction, Header, Message};
pub use signer::{Keypair, TransactionSigner};
pub use transaction::Transaction;
