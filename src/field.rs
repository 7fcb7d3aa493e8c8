//! Modular-arithmetic primitives for curve point recovery
//!
//! Quadratic-residue classification and square roots modulo an odd prime.
//! All arithmetic is arbitrary-precision: the moduli in use are curve-sized
//! (256 bits), so fixed-width integers are never acceptable here.

use num_bigint::BigUint;
use num_traits::{One, Zero};

/// Legendre symbol (r | p) for an odd prime p.
///
/// Returns 0 if r ≡ 0 (mod p), 1 if r is a quadratic residue mod p,
/// -1 otherwise. Computed by Euler's criterion: r^((p-1)/2) mod p, where a
/// result of p-1 maps to -1.
pub fn legendre_symbol(r: &BigUint, p: &BigUint) -> i32 {
    if (r % p).is_zero() {
        return 0;
    }
    let exp = (p - 1u32) >> 1;
    let criterion = r.modpow(&exp, p);
    if criterion == p - 1u32 {
        -1
    } else {
        1
    }
}

/// True unless (n | p) is exactly -1. Zero counts as a residue.
pub fn is_quadratic_residue(n: &BigUint, p: &BigUint) -> bool {
    legendre_symbol(n, p) != -1
}

/// Tonelli-Shanks: a root r with r² ≡ n (mod p), or `None` when n is a
/// quadratic non-residue mod the odd prime p.
///
/// Fast paths: n ≡ 0 yields 0, and p ≡ 3 (mod 4) yields n^((p+1)/4)
/// directly. The general case factors p-1 = 2^s·q with q odd, picks the
/// first non-residue z ≥ 2, and refines (m, c, t, r) until t == 1. The
/// refinement terminates because m strictly decreases; if the least i with
/// t^(2^i) ≡ 1 ever reaches m the invariants are broken and we fail closed
/// rather than loop.
pub fn tonelli_shanks(n: &BigUint, p: &BigUint) -> Option<BigUint> {
    if !is_quadratic_residue(n, p) {
        return None;
    }

    if (n % p).is_zero() {
        return Some(BigUint::zero());
    }

    if p % 4u32 == BigUint::from(3u32) {
        let exp = (p + 1u32) >> 2;
        return Some(n.modpow(&exp, p));
    }

    // 1) p - 1 = 2^s * q with q odd
    let mut q = p - 1u32;
    let mut s = 0u32;
    while (&q % 2u32).is_zero() {
        q >>= 1;
        s += 1;
    }

    // 2) first quadratic non-residue, by linear scan from 2
    let mut z = BigUint::from(2u32);
    while is_quadratic_residue(&z, p) {
        z += 1u32;
    }

    // 3) initial state
    let mut m = s;
    let mut c = z.modpow(&q, p);
    let mut t = n.modpow(&q, p);
    let mut r = n.modpow(&((&q + 1u32) >> 1), p);

    // 4) refine until t == 1
    while !t.is_one() {
        // least i with t^(2^i) ≡ 1 (mod p), by repeated squaring
        let mut i = 0u32;
        let mut factor = t.clone();
        while !factor.is_one() {
            i += 1;
            if i >= m {
                return None;
            }
            factor = &factor * &factor % p;
        }

        let exp = BigUint::one() << (m - i - 1);
        let b = c.modpow(&exp, p);
        m = i;
        c = &b * &b % p;
        t = t * &c % p;
        r = r * &b % p;
    }

    Some(r)
}
