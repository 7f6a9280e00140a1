use num_bigint::BigInt;

use crate::pairing::SizeEstimate;

/// Reduction scheduling for the MNT4-753 Miller loops.
///
/// The quartic arithmetic bounds the per-iteration growth of the
/// accumulator by a factor `52` on top of the squaring, so the estimate
/// tracks `log2(52) + 2 |f|` plus one characteristic per folded
/// evaluation; the running point grows by one characteristic (plus a
/// small constant) per update.
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
    let log_growth = 6; // ceil(log2(52))
    let digit = exp_miller_loop[ix - 1];
    let folds: u64 = match (digit == 0, is_triple) {
        (true, false) => 1,
        (true, true) => 3,
        (false, false) => 2,
        (false, true) => 6,
    };

    let mut future_f = log_growth + 2 * f_size;
    future_f += folds * (lq + log_growth);

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
    use crate::mnt4_753::MODULUS;

    #[test]
    fn final_iteration_always_reduces() {
        let est = size_estimation_miller_loop(&MODULUS, 10_000, 0, &[1, 0, 1], 999, 999, false);
        assert!(est.take_modulo_f && est.take_modulo_point);
    }

    #[test]
    fn tight_threshold_forces_reduction() {
        let est = size_estimation_miller_loop(&MODULUS, 800, 5, &[0; 16], 753, 753, false);
        assert!(est.take_modulo_f);
        assert_eq!(est.f_size, 753);
    }

    #[test]
    fn loose_threshold_defers_reduction() {
        let est =
            size_estimation_miller_loop(&MODULUS, 1_000_000, 5, &[0; 16], 753, 753, true);
        assert!(!est.take_modulo_f);
        assert!(est.f_size > 753);
    }
}
