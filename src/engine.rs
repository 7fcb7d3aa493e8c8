//! Transaction signing and digest engine
//!
//! The signature digest is the correctness anchor of the whole system: the
//! signer and the script engine's OP_CHECKSIG must derive byte-identical
//! pre-images or every future signature check breaks. The digest is a pure
//! function of the transaction value - the caller's transaction is never
//! mutated, only a private clone.

use secp256k1::ecdsa::Signature;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};

use crate::codec;
use crate::constants::{MAX_MONEY, MAX_SCRIPT_SIZE, MAX_TX_SIZE, SIGHASH_ALL};
use crate::error::{CoreError, Result};
use crate::hashing::hash256;
use crate::keys::Keypair;
use crate::script::Opcode;
use crate::types::{ByteString, Hash, Transaction, Utxo, ValidationResult};

/// Compute the digest a signature for `input_index` must attest to.
///
/// Legacy replacement rule: the target input's unlocking script is replaced
/// by the prior output's locking script, every other input's unlocking
/// script is cleared, the result is serialized in base (witness-stripped)
/// form with a trailing 4-byte sighash-type marker, and hashed with
/// hash256. Both signing and verification call this; the caller's
/// transaction is untouched.
pub fn signature_digest(
    tx: &Transaction,
    input_index: usize,
    prior_script_pubkey: &[u8],
) -> Result<Hash> {
    if input_index >= tx.inputs.len() {
        return Err(CoreError::InputIndexOutOfRange {
            index: input_index,
            len: tx.inputs.len(),
        });
    }

    let mut preimage_tx = tx.clone();
    preimage_tx.witnesses.clear();
    for (i, input) in preimage_tx.inputs.iter_mut().enumerate() {
        input.script_sig = if i == input_index {
            prior_script_pubkey.to_vec()
        } else {
            Vec::new()
        };
    }

    let mut preimage = codec::serialize_transaction_base(&preimage_tx);
    preimage.extend_from_slice(&(SIGHASH_ALL as u32).to_le_bytes());
    Ok(hash256(&preimage))
}

/// Sign a digest, returning the DER-encoded signature.
///
/// Nonces are RFC6979-deterministic and the signature is emitted in the
/// normalized lower-S form, so signing the same digest twice yields the
/// same bytes.
pub fn sign_digest(secret: &SecretKey, digest: &Hash) -> Vec<u8> {
    let secp = Secp256k1::new();
    let message = Message::from_digest_slice(digest).expect("digest is 32 bytes");
    let signature = secp.sign_ecdsa(&message, secret);
    signature.serialize_der().to_vec()
}

/// Verify a DER signature over a digest.
///
/// Accepts compressed or uncompressed public keys. Malleability policy:
/// only the normalized lower-S encoding of a signature is accepted; the
/// high-S twin of a valid signature is rejected rather than normalized.
pub fn verify_digest(pubkey: &[u8], digest: &Hash, der_signature: &[u8]) -> bool {
    let secp = Secp256k1::verification_only();
    let Ok(public_key) = PublicKey::from_slice(pubkey) else {
        return false;
    };
    let Ok(signature) = Signature::from_der(der_signature) else {
        return false;
    };
    let Ok(message) = Message::from_digest_slice(digest) else {
        return false;
    };
    secp.verify_ecdsa(&message, &signature, &public_key).is_ok()
}

/// Standard pay-to-pubkey-hash locking script for a 20-byte key commitment:
/// OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG.
pub fn p2pkh_locking_script(pubkey_hash: &[u8; 20]) -> ByteString {
    let mut script = Vec::with_capacity(25);
    script.push(Opcode::Dup.to_byte());
    script.push(Opcode::Hash160.to_byte());
    script.push(20);
    script.extend_from_slice(pubkey_hash);
    script.push(Opcode::EqualVerify.to_byte());
    script.push(Opcode::CheckSig.to_byte());
    script
}

/// Assemble the canonical unlocking script: push signature (with trailing
/// sighash marker), push public key.
pub fn build_unlocking_script(signature: &[u8], pubkey: &[u8]) -> Result<ByteString> {
    for (what, bytes) in [("signature", signature), ("public key", pubkey)] {
        if bytes.is_empty() || bytes.len() > 75 {
            return Err(CoreError::Script(format!(
                "{what} of {} bytes cannot be direct-pushed",
                bytes.len()
            )));
        }
    }
    let mut script = Vec::with_capacity(2 + signature.len() + pubkey.len());
    script.push(signature.len() as u8);
    script.extend_from_slice(signature);
    script.push(pubkey.len() as u8);
    script.extend_from_slice(pubkey);
    Ok(script)
}

/// Sign one P2PKH input, returning a new transaction with that input's
/// unlocking script populated. The digest covers the spent UTXO's locking
/// script under the replacement rule, so the spend later satisfies the
/// exact script committed to by the output.
pub fn sign_tx_p2pkh(
    tx: &Transaction,
    input_index: usize,
    spent: &Utxo,
    keypair: &Keypair,
) -> Result<Transaction> {
    let digest = signature_digest(tx, input_index, &spent.script_pubkey)?;
    let mut signature = sign_digest(keypair.secret_key(), &digest);
    signature.push(SIGHASH_ALL);
    let script_sig = build_unlocking_script(&signature, &keypair.compressed_public_key())?;

    let mut signed = tx.clone();
    signed.inputs[input_index].script_sig = script_sig;
    Ok(signed)
}

/// Structural transaction checks, independent of any UTXO context.
pub fn check_transaction(tx: &Transaction) -> Result<ValidationResult> {
    if tx.inputs.is_empty() || tx.outputs.is_empty() {
        return Ok(ValidationResult::Invalid(
            "empty inputs or outputs".to_string(),
        ));
    }

    let mut total: u64 = 0;
    for (i, output) in tx.outputs.iter().enumerate() {
        if output.value > MAX_MONEY {
            return Ok(ValidationResult::Invalid(format!(
                "output {i} value {} above money cap",
                output.value
            )));
        }
        total = match total.checked_add(output.value) {
            Some(t) if t <= MAX_MONEY => t,
            _ => {
                return Ok(ValidationResult::Invalid(
                    "total output value above money cap".to_string(),
                ))
            }
        };
    }

    for (i, input) in tx.inputs.iter().enumerate() {
        if input.script_sig.len() > MAX_SCRIPT_SIZE {
            return Ok(ValidationResult::Invalid(format!(
                "input {i} script too large"
            )));
        }
    }
    for (i, output) in tx.outputs.iter().enumerate() {
        if output.script_pubkey.len() > MAX_SCRIPT_SIZE {
            return Ok(ValidationResult::Invalid(format!(
                "output {i} script too large"
            )));
        }
    }

    if tx.has_witness() && tx.witnesses.len() != tx.inputs.len() {
        return Ok(ValidationResult::Invalid(format!(
            "{} witness stacks for {} inputs",
            tx.witnesses.len(),
            tx.inputs.len()
        )));
    }

    if codec::serialize_transaction(tx)?.len() > MAX_TX_SIZE {
        return Ok(ValidationResult::Invalid(
            "serialized transaction too large".to_string(),
        ));
    }

    Ok(ValidationResult::Valid)
}
