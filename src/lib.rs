//! # Spend-Proof
//!
//! Transaction-validation core of a UTXO ledger: a script interpreter that
//! decides whether a claimed spend of a recorded output is authorized,
//! elliptic-curve machinery for key recovery and signature verification,
//! and a minimal unspent-output index supplying validation context.
//!
//! ## Architecture
//!
//! Leaves first:
//! - `field` - quadratic-residue tests and Tonelli-Shanks square roots
//! - `hashing` - the two digest algorithms (hash256, hash160)
//! - `codec` - canonical wire serialization of transactions and UTXOs
//! - `asm` - script assembler/disassembler (token list to packed bytes)
//! - `keys` - point decompression and the keypair wallet boundary
//! - `script` - the stack-machine execution engine
//! - `engine` - signature digests, signing, unlocking-script assembly
//! - `utxo` - the keyed unspent-output index
//!
//! ## Design principles
//!
//! 1. **Pure functions**: digest computation and script execution never
//!    mutate caller state; each execution owns its stack.
//! 2. **Strict decoding**: malformed bytes are surfaced as errors, never
//!    repaired. A failed validation is a verdict, not an error.
//! 3. **Exact version pinning** for consensus-critical cryptography.
//!
//! ## Usage
//!
//! ```rust
//! use spend_proof::{SpendProof, Keypair, Outpoint, Transaction, TxInput, TxOutput, Utxo};
//! use spend_proof::engine::p2pkh_locking_script;
//!
//! let core = SpendProof::new();
//! let keypair = Keypair::generate();
//!
//! // A recorded output locked to our key
//! let outpoint = Outpoint::new([7; 32], 0);
//! let utxo = Utxo {
//!     outpoint: outpoint.clone(),
//!     height: 450_000,
//!     value: 0x10,
//!     script_pubkey: p2pkh_locking_script(&keypair.public_key_hash()),
//!     coinbase: false,
//! };
//!
//! // A transaction spending it
//! let tx = Transaction::new(
//!     vec![TxInput::unsigned(outpoint)],
//!     vec![TxOutput { value: 0x0f, script_pubkey: vec![0x01, 0x01] }],
//! );
//!
//! let signed = core.sign_tx_p2pkh(&tx, 0, &utxo, &keypair).unwrap();
//! let verdict = core
//!     .verify_spend(&signed.inputs[0].script_sig, &utxo.script_pubkey, &signed, 0, &utxo)
//!     .unwrap();
//! assert!(verdict.is_authorized());
//! ```

pub mod asm;
pub mod codec;
pub mod constants;
pub mod engine;
pub mod error;
pub mod field;
pub mod hashing;
pub mod keys;
pub mod script;
pub mod types;
pub mod utxo;

// Re-export commonly used types
pub use constants::*;
pub use error::{CoreError, Result};
pub use keys::Keypair;
pub use script::{FailReason, Verdict};
pub use types::*;
pub use utxo::UtxoIndex;

/// Stateless facade over the validation core.
pub struct SpendProof;

impl SpendProof {
    pub fn new() -> Self {
        Self
    }

    /// Run unlocking + locking script for one input of a transaction.
    ///
    /// # Examples
    ///
    /// ```
    /// use spend_proof::{SpendProof, Outpoint, Transaction, TxInput, TxOutput, Utxo};
    ///
    /// let core = SpendProof::new();
    /// let outpoint = Outpoint::new([1; 32], 0);
    /// let tx = Transaction::new(
    ///     vec![TxInput::unsigned(outpoint.clone())],
    ///     vec![TxOutput { value: 1, script_pubkey: vec![] }],
    /// );
    /// let utxo = Utxo {
    ///     outpoint,
    ///     height: 0,
    ///     value: 2,
    ///     script_pubkey: vec![],
    ///     coinbase: false,
    /// };
    ///
    /// // Unlocking script pushes a truthy byte; empty locking script.
    /// let verdict = core.verify_spend(&[0x01, 0x01], &[], &tx, 0, &utxo).unwrap();
    /// assert!(verdict.is_authorized());
    /// ```
    pub fn verify_spend(
        &self,
        script_sig: &[u8],
        script_pubkey: &[u8],
        tx: &Transaction,
        input_index: usize,
        spent: &Utxo,
    ) -> Result<Verdict> {
        script::verify_spend(script_sig, script_pubkey, tx, input_index, spent)
    }

    /// Hex-interface variant of [`SpendProof::verify_spend`]: the input is
    /// unlocking-script hex concatenated with locking-script hex.
    pub fn verify_spend_hex(
        &self,
        script_hex: &str,
        tx: &Transaction,
        input_index: usize,
        spent: &Utxo,
    ) -> Result<Verdict> {
        script::verify_spend_hex(script_hex, tx, input_index, spent)
    }

    /// Signature digest for one input under a prior locking script.
    pub fn signature_digest(
        &self,
        tx: &Transaction,
        input_index: usize,
        prior_script_pubkey: &[u8],
    ) -> Result<Hash> {
        engine::signature_digest(tx, input_index, prior_script_pubkey)
    }

    /// Sign one P2PKH input, returning the transaction with its unlocking
    /// script populated.
    pub fn sign_tx_p2pkh(
        &self,
        tx: &Transaction,
        input_index: usize,
        spent: &Utxo,
        keypair: &Keypair,
    ) -> Result<Transaction> {
        engine::sign_tx_p2pkh(tx, input_index, spent, keypair)
    }

    /// Structural transaction checks, independent of UTXO context.
    ///
    /// # Examples
    ///
    /// ```
    /// use spend_proof::{SpendProof, Outpoint, Transaction, TxInput, TxOutput, ValidationResult};
    ///
    /// let core = SpendProof::new();
    /// let tx = Transaction::new(
    ///     vec![TxInput::unsigned(Outpoint::new([1; 32], 0))],
    ///     vec![TxOutput { value: 1000, script_pubkey: vec![] }],
    /// );
    /// assert_eq!(core.check_transaction(&tx).unwrap(), ValidationResult::Valid);
    /// ```
    pub fn check_transaction(&self, tx: &Transaction) -> Result<ValidationResult> {
        engine::check_transaction(tx)
    }
}

impl Default for SpendProof {
    fn default() -> Self {
        Self::new()
    }
}
