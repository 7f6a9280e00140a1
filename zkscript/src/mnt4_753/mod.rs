//! MNT4-753 bindings: curve constants and the pairing operation record.
//!
//! The pairing target field is `F_q^4`, built as a quadratic extension of
//! `F_q^2 = F_q[u]/(u^2 - 13)`.

mod fields;
mod final_exponentiation;
mod line_functions;
mod miller_output_operations;
mod pairing;
mod size_estimation;

pub use fields::{fq2_script, fq4_script};
pub use line_functions::LineFunctions;
pub use miller_output_operations::MillerOutputOperations;
pub use pairing::Mnt4_753;
pub use size_estimation::size_estimation_miller_loop;

use num_bigint::BigInt;
use once_cell::sync::Lazy;

use crate::util::{from_montgomery_768, limbs_to_bigint, to_naf};

fn hex(digits: &str) -> BigInt {
    BigInt::parse_bytes(digits.as_bytes(), 16).expect("valid hex constant")
}

/// Field characteristic.
pub static MODULUS: Lazy<BigInt> = Lazy::new(|| {
    hex(
        "01C4C62D92C41110229022EEE2CDADB7F997505B8FAFED5EB7E8F96C97D87307FDB925E8A0ED8D99\
         D124D9A15AF79DB117E776F218059DB80F0DA5CB537E38685ACCE9767254A4638810719AC425F0E3\
         9D54522CDD119F5E9063DE245E8001",
    )
});

/// Subgroup order.
pub static ORDER: Lazy<BigInt> = Lazy::new(|| {
    hex(
        "01C4C62D92C41110229022EEE2CDADB7F997505B8FAFED5EB7E8F96C97D87307FDB925E8A0ED8D99\
         D124D9A15AF79DB26C5C28C859A99B3EEBCA9429212636B9DFF97634993AA4D6C381BC3F0057974E\
         A099170FA13A4FD90776E240000001",
    )
});

/// Quadratic non-residue of `F_q` defining `F_q^2`.
pub static NON_RESIDUE: Lazy<BigInt> = Lazy::new(|| BigInt::from(13));

/// Short-Weierstrass `a` coefficient of `E(F_q)`.
pub static CURVE_A: Lazy<BigInt> = Lazy::new(|| BigInt::from(2));

/// Short-Weierstrass `b` coefficient of `E(F_q)`.
pub static CURVE_B: Lazy<BigInt> = Lazy::new(|| {
    from_montgomery_768(
        &[
            2672638521926201442,
            17587766986973859626,
            1309143029066506763,
            1756412671449422902,
            5395165286423163724,
            589638022240022974,
            7360845090332416697,
            9829497896347590557,
            9341553552113883496,
            5888515763059971584,
            10173739464651404689,
            456607542322059,
        ],
        &MODULUS,
    )
});

/// Twisted-curve coefficients over `F_q^2`: `a' = a * u^2 = (26, 0)`,
/// `b' = (0, b * 13)`.
pub static TWIST_A: Lazy<[BigInt; 2]> = Lazy::new(|| [BigInt::from(26), BigInt::from(0)]);

pub static TWIST_B: Lazy<[BigInt; 2]> = Lazy::new(|| {
    [
        BigInt::from(0),
        (&*CURVE_B * &*NON_RESIDUE) % &*MODULUS,
    ]
});

/// `G1` generator.
pub static G1_GENERATOR: Lazy<[BigInt; 2]> = Lazy::new(|| {
    [
        from_montgomery_768(
            &[
                8680369219962409717,
                12497683146525997170,
                15236963532390397985,
                105054743605190980,
                11580223711797947725,
                5964558218084543687,
                1974179831852844611,
                13386218610606908614,
                9905737029079781539,
                3769381095189112747,
                1226496298859043045,
                409264833279765,
            ],
            &MODULUS,
        ),
        from_montgomery_768(
            &[
                8458069647833709466,
                16863815841372543189,
                7230518365128572001,
                17250077086581959530,
                15519583030873909149,
                3465247978511199450,
                5738818931561455055,
                12688417287395938373,
                3681991682605141223,
                10698656566578986929,
                10160396483421745615,
                127251255182962,
            ],
            &MODULUS,
        ),
    ]
});

/// `G2` generator, coordinates as `(x0, x1, y0, y1)` over `F_q`.
pub static G2_GENERATOR: Lazy<[BigInt; 4]> = Lazy::new(|| {
    [
        BigInt::parse_bytes(b"22367666623321080720060256844679369841450849258634485122226826668687008928557241162389052587294939105987791589807198701072089850184203060629036090027206884547397819080026926412256978135536735656049173059573120822105654153939204", 10).expect("decimal"),
        BigInt::parse_bytes(b"19674349354065582663569886390557105215375764356464013910804136534831880915742161945711267871023918136941472003751075703860943205026648847064247080124670799190998395234694182621794580160576822167228187443851233972049521455293042", 10).expect("decimal"),
        BigInt::parse_bytes(b"6945425020677398967988875731588951175743495235863391886533295045397037605326535330657361771765903175481062759367498970743022872494546449436815843306838794729313050998681159000579427733029709987073254733976366326071957733646574", 10).expect("decimal"),
        BigInt::parse_bytes(b"17406100775489352738678485154027036191618283163679980195193677896785273172506466216232026037788788436442188057889820014276378772936042638717710384987239430912364681046070625200474931975266875995282055499803236813013874788622488", 10).expect("decimal"),
    ]
});

/// Absolute value of the ate loop count (`|trace - 1|`; the sign is a
/// shared convention with the witness generator).
pub static MILLER_SCALAR: Lazy<BigInt> = Lazy::new(|| {
    limbs_to_bigint(&[
        8824542903220142080,
        7711082599397206192,
        8303354903384568230,
        5874150271971943936,
        9717849827920685054,
        95829799234282493,
    ])
});

/// Signed-digit expansion of the Miller scalar, least-significant digit
/// first. The hard part of the final exponentiation walks the same digits.
pub static EXP_MILLER_LOOP: Lazy<Vec<i8>> = Lazy::new(|| to_naf(&MILLER_SCALAR));

/// Frobenius twist constants `gamma_n = u^((q^n - 1)/2)` over `F_q^2`, for
/// `n = 1..3`.
pub static GAMMAS: Lazy<Vec<[BigInt; 2]>> = Lazy::new(|| {
    let q = &*MODULUS;
    let two = BigInt::from(2);
    let mut q_power = BigInt::from(1);
    (1..=3u32)
        .map(|_| {
            q_power *= q;
            let exponent = (&q_power - BigInt::from(1)) / &two;
            let scalar = NON_RESIDUE.modpow(&(&exponent / &two), q);
            if (&exponent % &two) == BigInt::from(0) {
                [scalar, BigInt::from(0)]
            } else {
                [BigInt::from(0), scalar]
            }
        })
        .collect()
});

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::Zero;

    #[test]
    fn moduli_have_expected_sizes() {
        assert_eq!(MODULUS.bits(), 753);
        assert_eq!(ORDER.bits(), 753);
    }

    #[test]
    fn g1_generator_is_on_the_curve() {
        let [x, y] = G1_GENERATOR.clone();
        let q = &*MODULUS;
        let lhs = (&y * &y) % q;
        let rhs = (&x * &x * &x + &*CURVE_A * &x + &*CURVE_B) % q;
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn g2_generator_is_on_the_twist() {
        // y^2 = x^3 + a'x + b' over F_q^2 with u^2 = 13
        let q = &*MODULUS;
        let nr = &*NON_RESIDUE;
        let [x0, x1, y0, y1] = G2_GENERATOR.clone();
        let mul = |a: &[BigInt; 2], b: &[BigInt; 2]| -> [BigInt; 2] {
            crate::util::fq2_value_mul(a, b, q, nr)
        };
        let x = [x0, x1];
        let y = [y0, y1];
        let y2 = mul(&y, &y);
        let x3 = mul(&mul(&x, &x), &x);
        let ax = mul(&[TWIST_A[0].clone(), TWIST_A[1].clone()], &x);
        let rhs = [
            (&x3[0] + &ax[0] + &TWIST_B[0]) % q,
            (&x3[1] + &ax[1] + &TWIST_B[1]) % q,
        ];
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
    fn gammas_square_consistency() {
        // gamma_1^2 = u^(q-1) = 13^((q-1)/2)-ish: check gamma_2 relation
        // gamma_2 = u^((q^2-1)/2) must be a scalar (second coordinate zero)
        assert!(GAMMAS[1][1].is_zero());
    }
}
