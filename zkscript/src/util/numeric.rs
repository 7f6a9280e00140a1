//! Build-time integer helpers for the curve constant tables.

use num_bigint::BigInt;
use num_traits::{One, Signed, Zero};

/// Little-endian `u64` limbs to a big integer.
pub fn limbs_to_bigint(limbs: &[u64]) -> BigInt {
    let mut out = BigInt::zero();
    for &limb in limbs.iter().rev() {
        out = (out << 64usize) + limb;
    }
    out
}

/// Convert a 768-bit Montgomery representation (little-endian limbs, with
/// `R = 2^768`) back to the underlying field element.
pub fn from_montgomery_768(limbs: &[u64], modulus: &BigInt) -> BigInt {
    let value = limbs_to_bigint(limbs);
    let r = BigInt::one() << 768usize;
    // q is prime, so R^-1 = R^(q-2) mod q
    let r_inv = (r % modulus).modpow(&(modulus - 2), modulus);
    (value * r_inv) % modulus
}

/// Non-adjacent-form expansion: signed digits in `{-1, 0, 1}`,
/// least-significant digit first, most-significant digit always `1`.
pub fn to_naf(n: &BigInt) -> Vec<i8> {
    debug_assert!(n.is_positive());
    let mut n = n.clone();
    let mut digits = Vec::new();
    let two = BigInt::from(2);
    let four = BigInt::from(4);
    while n.is_positive() {
        if (&n % &two).is_one() {
            let rem = &n % &four;
            let digit: i8 = if rem == BigInt::from(3) { -1 } else { 1 };
            digits.push(digit);
            n -= BigInt::from(digit);
        } else {
            digits.push(0);
        }
        n /= &two;
    }
    digits
}

/// Value-level arithmetic in `F_q^2 = F_q[u]/(u^2 - non_residue)`, used
/// only to derive Frobenius constants at table-construction time.
pub fn fq2_value_mul(
    a: &[BigInt; 2],
    b: &[BigInt; 2],
    modulus: &BigInt,
    non_residue: &BigInt,
) -> [BigInt; 2] {
    let c0 = (&a[0] * &b[0] + non_residue * &a[1] * &b[1]) % modulus;
    let c1 = (&a[0] * &b[1] + &a[1] * &b[0]) % modulus;
    [c0.mod_floor_positive(modulus), c1.mod_floor_positive(modulus)]
}

/// `base^exp` in `F_q^2` by square-and-multiply.
pub fn fq2_value_pow(
    base: &[BigInt; 2],
    exp: &BigInt,
    modulus: &BigInt,
    non_residue: &BigInt,
) -> [BigInt; 2] {
    let mut result = [BigInt::one(), BigInt::zero()];
    let mut acc = base.clone();
    let mut e = exp.clone();
    let two = BigInt::from(2);
    while e.is_positive() {
        if (&e % &two).is_one() {
            result = fq2_value_mul(&result, &acc, modulus, non_residue);
        }
        acc = fq2_value_mul(&acc, &acc, modulus, non_residue);
        e /= &two;
    }
    result
}

trait ModFloorPositive {
    fn mod_floor_positive(self, modulus: &BigInt) -> BigInt;
}

impl ModFloorPositive for BigInt {
    fn mod_floor_positive(self, modulus: &BigInt) -> BigInt {
        let r = self % modulus;
        if r.is_negative() {
            r + modulus
        } else {
            r
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limbs_roundtrip() {
        let n = limbs_to_bigint(&[0x1, 0x2]);
        assert_eq!(n, (BigInt::from(2) << 64usize) + 1);
    }

    #[test]
    fn naf_has_no_adjacent_digits() {
        let n = BigInt::from(0xd201000000010000u64);
        let naf = to_naf(&n);
        assert_eq!(*naf.last().unwrap(), 1);
        for pair in naf.windows(2) {
            assert!(pair[0] == 0 || pair[1] == 0);
        }
        // reconstruct
        let mut acc = BigInt::zero();
        for (i, &d) in naf.iter().enumerate() {
            acc += BigInt::from(d) << i;
        }
        assert_eq!(acc, n);
    }

    #[test]
    fn fq2_pow_small_field() {
        // F_19^2 with u^2 = -1; (u)^2 = -1 = 18
        let q = BigInt::from(19);
        let nr = BigInt::from(-1);
        let u = [BigInt::zero(), BigInt::one()];
        let sq = fq2_value_pow(&u, &BigInt::from(2), &q, &nr);
        assert_eq!(sq, [BigInt::from(18), BigInt::zero()]);
    }

    #[test]
    fn montgomery_conversion_small() {
        // with modulus 19: R = 2^768 mod 19; value v stored as v*R mod 19
        let q = BigInt::from(19);
        let r = (BigInt::one() << 768) % &q;
        let stored: BigInt = (BigInt::from(7) * r) % &q;
        let limbs: Vec<u64> = {
            let (_, digits) = stored.to_u64_digits();
            digits
        };
        assert_eq!(from_montgomery_768(&limbs, &q), BigInt::from(7));
    }
}
