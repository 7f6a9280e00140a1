use num_bigint::BigInt;

use crate::pairing::SizeEstimate;

/// Reduction scheduling for the BLS12-381 Miller loops.
///
/// Sextic-twist arithmetic bounds each accumulator fold by a factor `32`
/// on top of one characteristic, and each point update by a factor `6`:
/// the next iteration costs `log q + 5` bits per folded evaluation and
/// `log q + 3` bits per point update.
pub fn size_estimation_miller_loop(
    modulus: &BigInt,
    modulo_threshold: u64,
    ix: usize,
    exp_miller_loop: &[i8],
    f_size: u64,
    point_size: u64,
    is_triple: bool,
) -> SizeEstimate {
    if ix == 0 {
        return SizeEstimate {
            take_modulo_f: true,
            take_modulo_point: true,
            f_size: 0,
            point_size: 0,
        };
    }

    let lq = modulus.bits();
    let digit = exp_miller_loop[ix - 1];
    let folds: u64 = match (digit == 0, is_triple) {
        (true, false) => 1,
        (true, true) => 3,
        (false, false) => 2,
        (false, true) => 6,
    };

    let mut future_f = f_size;
    for _ in 0..folds {
        future_f += lq + 5;
    }
    let mut future_point = lq + point_size + 3;
    if digit != 0 {
        future_point = lq + future_point + 3;
    }

    let (take_modulo_f, f_size) = if future_f > modulo_threshold {
        (true, lq)
    } else {
        (false, future_f)
    };
    let (take_modulo_point, point_size) = if future_point > modulo_threshold {
        (true, lq)
    } else {
        (false, future_point)
    };

    SizeEstimate {
        take_modulo_f,
        take_modulo_point,
        f_size,
        point_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bls12_381::MODULUS;

    #[test]
    fn final_iteration_always_reduces() {
        let est = size_estimation_miller_loop(&MODULUS, 100_000, 0, &[1, 0, 1], 1, 1, true);
        assert!(est.take_modulo_f && est.take_modulo_point);
        assert_eq!(est.f_size, 0);
    }

    #[test]
    fn growth_is_linear_in_the_fold_count() {
        let single =
            size_estimation_miller_loop(&MODULUS, u64::MAX, 4, &[0, 0, 0, 1, 1], 381, 381, false);
        let triple =
            size_estimation_miller_loop(&MODULUS, u64::MAX, 4, &[0, 0, 0, 1, 1], 381, 381, true);
        assert!(triple.f_size > single.f_size);
        assert!(!single.take_modulo_f);
    }
}
