//! BLS12-381 bindings: curve constants and the pairing operation record.
//!
//! The pairing target field is `F_q^12`, built as
//! `F_q^2 = F_q[u]/(u^2 + 1)`, `F_q^6 = F_q^2[v]/(v^3 - (1 + u))`,
//! `F_q^12 = F_q^6[w]/(w^2 - v)`; `G2` lives on the `M`-type sextic twist
//! `y^2 = x^3 + 4(1 + u)`.

mod fields;
mod final_exponentiation;
mod line_functions;
mod miller_output_operations;
mod pairing;
mod size_estimation;

pub use fields::{fq12_script, fq2_script, fq6_script};
pub use line_functions::LineFunctions;
pub use miller_output_operations::MillerOutputOperations;
pub use pairing::Bls12_381;
pub use size_estimation::size_estimation_miller_loop;

use num_bigint::BigInt;
use once_cell::sync::Lazy;

use crate::util::{fq2_value_pow, to_naf};

fn hex(digits: &str) -> BigInt {
    BigInt::parse_bytes(digits.as_bytes(), 16).expect("valid hex constant")
}

/// Field characteristic.
pub static MODULUS: Lazy<BigInt> = Lazy::new(|| {
    hex(
        "1a0111ea397fe69a4b1ba7b6434bacd764774b84f38512bf6730d2a0f6b0f6241eabfffeb153ffff\
         b9feffffffffaaab",
    )
});

/// Subgroup order.
pub static ORDER: Lazy<BigInt> = Lazy::new(|| {
    hex("73eda753299d7d483339d80809a1d80553bda402fffe5bfeffffffff00000001")
});

/// Quadratic non-residue of `F_q` defining `F_q^2`.
pub static NON_RESIDUE: Lazy<BigInt> = Lazy::new(|| BigInt::from(-1));

/// Short-Weierstrass coefficients of `E(F_q)`.
pub static CURVE_A: Lazy<BigInt> = Lazy::new(|| BigInt::from(0));
pub static CURVE_B: Lazy<BigInt> = Lazy::new(|| BigInt::from(4));

/// Twisted-curve coefficients over `F_q^2`.
pub static TWIST_A: Lazy<[BigInt; 2]> = Lazy::new(|| [BigInt::from(0), BigInt::from(0)]);
pub static TWIST_B: Lazy<[BigInt; 2]> = Lazy::new(|| [BigInt::from(4), BigInt::from(4)]);

/// `G1` generator.
pub static G1_GENERATOR: Lazy<[BigInt; 2]> = Lazy::new(|| {
    [
        hex(
            "17f1d3a73197d7942695638c4fa9ac0fc3688c4f9774b905a14e3a3f171bac586c55e83ff97a1aef\
             fb3af00adb22c6bb",
        ),
        hex(
            "08b3f481e3aaa0f1a09e30ed741d8ae4fcf5e095d5d00af600db18cb2c04b3edd03cc744a2888ae4\
             0caa232946c5e7e1",
        ),
    ]
});

/// `G2` generator, coordinates as `(x0, x1, y0, y1)` over `F_q`.
pub static G2_GENERATOR: Lazy<[BigInt; 4]> = Lazy::new(|| {
    [
        hex(
            "024aa2b2f08f0a91260805272dc51051c6e47ad4fa403b02b4510b647ae3d1770bac0326a805bbef\
             d48056c8c121bdb8",
        ),
        hex(
            "13e02b6052719f607dacd3a088274f65596bd0d09920b61ab5da61bbdc7f5049334cf11213945d57\
             e5ac7d055d042b7e",
        ),
        hex(
            "0ce5d527727d6e118cc9cdc6da2e351aadfd9baa8cbdd3a76d429a695160d12c923ac9cc3baca289\
             e193548608b82801",
        ),
        hex(
            "0606c4a02ea734cc32acd2b02bc28b99cb3e287e85a763af267492ab572e99ab3f370d275cec1da1\
             aaa9075ff05f79be",
        ),
    ]
});

/// Absolute value of the curve parameter `x` (the Miller scalar; `x` is
/// negative, a shared convention with the witness generator).
pub static MILLER_SCALAR: Lazy<BigInt> = Lazy::new(|| hex("d201000000010000"));

/// Signed-digit expansion of the Miller scalar, least-significant digit
/// first. The hard part of the final exponentiation walks the same digits.
pub static EXP_MILLER_LOOP: Lazy<Vec<i8>> = Lazy::new(|| to_naf(&MILLER_SCALAR));

/// Frobenius twist constants for `F_q^12`:
/// `gammas[n-1][k-1] = xi^(k (q^n - 1) / 6)` over `F_q^2`, with
/// `xi = 1 + u`, for `n = 1..3` and `k = 1..5`.
pub static GAMMAS: Lazy<Vec<Vec<[BigInt; 2]>>> = Lazy::new(|| {
    let q = &*MODULUS;
    let xi = [BigInt::from(1), BigInt::from(1)];
    let mut q_power = BigInt::from(1);
    (1..=3u32)
        .map(|_| {
            q_power *= q;
            let base_exponent = (&q_power - BigInt::from(1)) / BigInt::from(6);
            (1..=5u32)
                .map(|k| {
                    fq2_value_pow(&xi, &(&base_exponent * BigInt::from(k)), q, &NON_RESIDUE)
                })
                .collect()
        })
        .collect()
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::fq2_value_mul;
    use num_traits::Zero;

    #[test]
    fn moduli_have_expected_sizes() {
        assert_eq!(MODULUS.bits(), 381);
        assert_eq!(ORDER.bits(), 255);
    }

    #[test]
    fn g1_generator_is_on_the_curve() {
        let [x, y] = G1_GENERATOR.clone();
        let q = &*MODULUS;
        assert_eq!((&y * &y) % q, (&x * &x * &x + &*CURVE_B) % q);
    }

    #[test]
    fn g2_generator_is_on_the_twist() {
        let q = &*MODULUS;
        let nr = &*NON_RESIDUE;
        let [x0, x1, y0, y1] = G2_GENERATOR.clone();
        let x = [x0, x1];
        let y = [y0, y1];
        let y2 = fq2_value_mul(&y, &y, q, nr);
        let x2 = fq2_value_mul(&x, &x, q, nr);
        let x3 = fq2_value_mul(&x2, &x, q, nr);
        let rhs = [(&x3[0] + &TWIST_B[0]) % q, (&x3[1] + &TWIST_B[1]) % q];
        assert_eq!(y2, rhs);
    }

    #[test]
    fn miller_expansion_reconstructs_the_scalar() {
        let mut acc = BigInt::zero();
        for (i, &d) in EXP_MILLER_LOOP.iter().enumerate() {
            acc += BigInt::from(d) << i;
        }
        assert_eq!(acc, *MILLER_SCALAR);
    }

    #[test]
    fn gamma_tables_are_consistent() {
        // gamma_{1,1}^6 = xi^(q-1); and gamma_{1,2} = gamma_{1,1}^2
        let q = &*MODULUS;
        let nr = &*NON_RESIDUE;
        let g11 = &GAMMAS[0][0];
        let g12 = &GAMMAS[0][1];
        assert_eq!(&fq2_value_mul(g11, g11, q, nr), g12);
        // every table entry is a non-zero field element
        for row in GAMMAS.iter() {
            for entry in row {
                assert!(!(entry[0].is_zero() && entry[1].is_zero()));
            }
        }
    }
}
