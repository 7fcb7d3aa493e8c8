//! Public-key handling on secp256k1
//!
//! Point decompression recovers the y-coordinate from a compressed key via
//! the square-root machinery in [`crate::field`]; signing keys wrap the
//! `secp256k1` crate and form the wallet boundary (how the secret scalar was
//! derived is the wallet's business, not ours).

use num_bigint::BigUint;
use num_traits::Zero;
use rand::rngs::OsRng;
use rand::RngCore;
use secp256k1::{PublicKey, Secp256k1, SecretKey};

use crate::error::{CoreError, Result};
use crate::field::tonelli_shanks;
use crate::hashing::hash160;

/// secp256k1 field prime p
pub const FIELD_PRIME_HEX: &str =
    "fffffffffffffffffffffffffffffffffffffffffffffffffffffffefffffc2f";

/// secp256k1 group order n
pub const GROUP_ORDER_HEX: &str =
    "fffffffffffffffffffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141";

/// Curve equation constant: y² = x³ + 7
const CURVE_B: u32 = 7;

pub fn field_prime() -> BigUint {
    BigUint::parse_bytes(FIELD_PRIME_HEX.as_bytes(), 16).expect("valid curve constant")
}

pub fn group_order() -> BigUint {
    BigUint::parse_bytes(GROUP_ORDER_HEX.as_bytes(), 16).expect("valid curve constant")
}

/// Whether (x, y) satisfies y² ≡ x³ + 7 (mod p).
pub fn point_on_curve(x: &BigUint, y: &BigUint) -> bool {
    let p = field_prime();
    if x >= &p || y >= &p {
        return false;
    }
    let lhs = y.modpow(&BigUint::from(2u32), &p);
    let rhs = (x.modpow(&BigUint::from(3u32), &p) + CURVE_B) % &p;
    lhs == rhs
}

/// Recover the full (x, y) point from a 33-byte compressed public key.
///
/// The prefix byte encodes y-parity (0x02 even, 0x03 odd). The candidate y
/// is the square root of x³ + 7 mod p; the root with the wrong parity is
/// negated mod p. Errors on a bad prefix, an x outside the field, or an x
/// with no corresponding curve point.
pub fn decompress_public_key(compressed: &[u8; 33]) -> Result<[u8; 65]> {
    let want_even = match compressed[0] {
        0x02 => true,
        0x03 => false,
        b => {
            return Err(CoreError::Key(format!(
                "invalid compression prefix 0x{b:02x}"
            )))
        }
    };

    let p = field_prime();
    let x = BigUint::from_bytes_be(&compressed[1..]);
    if x >= p {
        return Err(CoreError::Key("x-coordinate outside field range".to_string()));
    }

    let rhs = (x.modpow(&BigUint::from(3u32), &p) + CURVE_B) % &p;
    let root = tonelli_shanks(&rhs, &p)
        .ok_or_else(|| CoreError::Key("x-coordinate is not on the curve".to_string()))?;

    let y = if (&root % 2u32).is_zero() == want_even {
        root
    } else {
        &p - &root
    };

    let mut out = [0u8; 65];
    out[0] = 0x04;
    let xb = x.to_bytes_be();
    out[1 + (32 - xb.len())..33].copy_from_slice(&xb);
    let yb = y.to_bytes_be();
    out[33 + (32 - yb.len())..65].copy_from_slice(&yb);
    Ok(out)
}

/// Compress a 65-byte uncompressed public key to prefix + x form.
pub fn compress_public_key(uncompressed: &[u8; 65]) -> Result<[u8; 33]> {
    if uncompressed[0] != 0x04 {
        return Err(CoreError::Key(format!(
            "invalid uncompressed prefix 0x{:02x}",
            uncompressed[0]
        )));
    }
    let y_is_even = uncompressed[64] & 1 == 0;
    let mut out = [0u8; 33];
    out[0] = if y_is_even { 0x02 } else { 0x03 };
    out[1..].copy_from_slice(&uncompressed[1..33]);
    Ok(out)
}

/// A secret scalar and its public point.
///
/// This is the wallet boundary: seed-phrase derivation lives outside the
/// core, which only consumes the resulting key bytes.
#[derive(Clone)]
pub struct Keypair {
    secret: SecretKey,
    public: PublicKey,
}

impl Keypair {
    /// Fresh random keypair from the OS entropy source.
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let mut buf = [0u8; 32];
        loop {
            OsRng.fill_bytes(&mut buf);
            // Rejected only for 0 or >= group order; retry is effectively free.
            if let Ok(secret) = SecretKey::from_slice(&buf) {
                let public = PublicKey::from_secret_key(&secp, &secret);
                return Self { secret, public };
            }
        }
    }

    /// Keypair from externally derived secret bytes.
    pub fn from_secret_bytes(bytes: &[u8; 32]) -> Result<Self> {
        let secp = Secp256k1::new();
        let secret = SecretKey::from_slice(bytes)
            .map_err(|e| CoreError::Key(format!("invalid secret scalar: {e}")))?;
        let public = PublicKey::from_secret_key(&secp, &secret);
        Ok(Self { secret, public })
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// 33-byte prefix + x form.
    pub fn compressed_public_key(&self) -> [u8; 33] {
        self.public.serialize()
    }

    /// 65-byte 0x04 + x + y form.
    pub fn uncompressed_public_key(&self) -> [u8; 65] {
        self.public.serialize_uncompressed()
    }

    /// hash160 of the compressed key, as committed to by P2PKH locking scripts.
    pub fn public_key_hash(&self) -> [u8; 20] {
        hash160(&self.compressed_public_key())
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keypair")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}
