//! secp256k1 constants for the `E(F_q)` script builders.

use num_bigint::BigInt;
use once_cell::sync::Lazy;

use crate::curves::{EllipticCurveAffine, EllipticCurveFq, EllipticCurveFqProjective};
use crate::fields::Fq;

fn hex(digits: &str) -> BigInt {
    BigInt::parse_bytes(digits.as_bytes(), 16).expect("valid hex constant")
}

/// Field characteristic `q = 2^256 - 2^32 - 977`.
pub static MODULUS: Lazy<BigInt> = Lazy::new(|| {
    hex("fffffffffffffffffffffffffffffffffffffffffffffffffffffffefffffc2f")
});

/// Group order `r`.
pub static ORDER: Lazy<BigInt> = Lazy::new(|| {
    hex("fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141")
});

/// Curve coefficients: `y^2 = x^3 + 7`.
pub static CURVE_A: Lazy<BigInt> = Lazy::new(|| BigInt::from(0));
pub static CURVE_B: Lazy<BigInt> = Lazy::new(|| BigInt::from(7));

/// The generator point.
pub static GENERATOR: Lazy<[BigInt; 2]> = Lazy::new(|| {
    [
        hex("79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798"),
        hex("483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8"),
    ]
});

/// Affine script builder for secp256k1.
pub fn curve_affine() -> EllipticCurveFq {
    EllipticCurveAffine::new(Fq::new(MODULUS.clone()), vec![CURVE_A.clone()])
}

/// Projective script builder for secp256k1.
pub fn curve_projective() -> EllipticCurveFqProjective {
    EllipticCurveFqProjective::new(MODULUS.clone(), CURVE_A.clone(), CURVE_B.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    #[test]
    fn modulus_shape() {
        let one = BigInt::from(1);
        let expected = (&one << 256usize) - (&one << 32usize) - BigInt::from(977);
        assert_eq!(*MODULUS, expected);
    }

    #[test]
    fn generator_is_on_the_curve() {
        let [x, y] = GENERATOR.clone();
        let lhs = (&y * &y) % &*MODULUS;
        let rhs = (&x * &x * &x + &*CURVE_B) % &*MODULUS;
        assert_eq!(lhs, rhs);
    }
}
