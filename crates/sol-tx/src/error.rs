use thiserror::Error;

/// Errors raised while compiling, signing or sizing a transaction.
#[derive(Debug, Error)]
pub enum SolError {
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("transaction build error: {0}")]
    TransactionBuildError(String),

    /// The signing key does not appear anywhere in the account table.
    #[error("signing account {0} is not in the account list")]
    UnknownSigner(String),

    /// The signing key is in the account table but outside the signer range.
    #[error("signing account {0} is not in the list of signers")]
    NotASigner(String),

    #[error("signing error: {0}")]
    SigningError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("transaction too large: {size} bytes exceeds the {max} byte limit")]
    TransactionTooLarge { size: usize, max: usize },

    #[error("config error: {0}")]
    ConfigError(String),
}
