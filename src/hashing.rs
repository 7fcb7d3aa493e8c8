//! Digest primitives used throughout spend validation
//!
//! Two fixed digest algorithms: hash256, the 32-byte double-SHA256 used for
//! transaction ids and signature pre-images, and hash160, the 20-byte
//! RIPEMD160-of-SHA256 used for public-key commitments in locking scripts.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// SHA256(SHA256(data)) - transaction and pre-image identity
pub fn hash256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    let mut out = [0u8; 32];
    out.copy_from_slice(&second);
    out
}

/// RIPEMD160(SHA256(data)) - address-style commitment to a public key
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let sha = Sha256::digest(data);
    let ripe = Ripemd160::digest(sha);
    let mut out = [0u8; 20];
    out.copy_from_slice(&ripe);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin_hashes::{sha256d, Hash as BitcoinHash};

    #[test]
    fn test_hash256_matches_sha256d() {
        for msg in [&b""[..], b"abc", b"spend-proof"] {
            let ours = hash256(msg);
            let theirs = sha256d::Hash::hash(msg);
            assert_eq!(ours[..], theirs[..]);
        }
    }

    #[test]
    fn test_hash256_deterministic() {
        assert_eq!(hash256(b"x"), hash256(b"x"));
        assert_ne!(hash256(b"x"), hash256(b"y"));
    }

    #[test]
    fn test_hash160_length_and_vector() {
        let digest = hash160(b"");
        assert_eq!(digest.len(), 20);
        // RIPEMD160(SHA256("")) - fixed vector
        assert_eq!(
            hex::encode(digest),
            "b472a266d0bd89c13706a4132ccfb16f7c3b9fcb"
        );
    }
}
