//! Error types for spend validation

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Decode failed: {0}")]
    Decode(String),

    #[error("Script rejected: {0}")]
    Script(String),

    #[error("Invalid key material: {0}")]
    Key(String),

    #[error("Invalid signature encoding: {0}")]
    Signature(String),

    #[error("Transaction invalid: {0}")]
    Transaction(String),

    #[error("Input index {index} out of range for {len} inputs")]
    InputIndexOutOfRange { index: usize, len: usize },

    #[error("UTXO already recorded for outpoint: {0}")]
    DuplicateUtxo(String),

    #[error("UTXO not found: {0}")]
    UtxoNotFound(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
