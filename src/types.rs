//! Core ledger types for spend validation

use serde::{Deserialize, Serialize};

/// Hash type: 256-bit digest
pub type Hash = [u8; 32];

/// Byte string type
pub type ByteString = Vec<u8>;

/// Natural number type
pub type Natural = u64;

/// Reference to a specific output of a specific transaction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Outpoint {
    pub txid: Hash,
    pub vout: u32,
}

impl Outpoint {
    pub fn new(txid: Hash, vout: u32) -> Self {
        Self { txid, vout }
    }
}

impl std::fmt::Display for Outpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", hex::encode(self.txid), self.vout)
    }
}

/// Transaction input: outpoint being spent plus the unlocking proof.
///
/// `script_sig` is empty at construction and populated by signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    pub prevout: Outpoint,
    pub script_sig: ByteString,
    pub sequence: u32,
}

impl TxInput {
    /// Unsigned input spending the given outpoint.
    pub fn unsigned(prevout: Outpoint) -> Self {
        Self {
            prevout,
            script_sig: Vec::new(),
            sequence: crate::constants::SEQUENCE_FINAL,
        }
    }
}

/// Transaction output: amount locked behind a spending condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub value: u64,
    pub script_pubkey: ByteString,
}

/// Ordered stack of witness items attached to one input
pub type Witness = Vec<ByteString>;

/// Transaction: versioned list of inputs and outputs.
///
/// `witnesses` is either empty (legacy serialization) or aligned 1:1 with
/// `inputs` (segregated-witness serialization). The transaction id is the
/// double-SHA256 of the witness-stripped serialization and is recomputed on
/// demand; any structural edit invalidates a previously computed id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub witnesses: Vec<Witness>,
    pub lock_time: u32,
}

impl Transaction {
    /// Version-1 legacy transaction with no witness data.
    pub fn new(inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Self {
        Self {
            version: 1,
            inputs,
            outputs,
            witnesses: Vec::new(),
            lock_time: 0,
        }
    }

    pub fn has_witness(&self) -> bool {
        !self.witnesses.is_empty()
    }

    /// Transaction id: hash256 of the witness-stripped serialization.
    pub fn txid(&self) -> Hash {
        crate::hashing::hash256(&crate::codec::serialize_transaction_base(self))
    }
}

/// Unspent transaction output with its validation context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub outpoint: Outpoint,
    pub height: Natural,
    pub value: u64,
    pub script_pubkey: ByteString,
    pub coinbase: bool,
}

/// Structural validation result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid(String),
}
