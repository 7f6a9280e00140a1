//! Elliptic-curve script builders over `F_q` and `F_q^2`, in affine and
//! projective coordinates.
//!
//! Affine arithmetic consumes precomputed gradients supplied on the stack
//! and verifies them in-script; projective arithmetic computes everything
//! on-stack. The point at infinity is the sentinel `0x00 0x00` in affine
//! encoding and `0x00 0x00 0x00` in projective encoding.

pub mod affine;
pub mod projective;
pub mod projective_fq2;
pub mod secp256k1;

pub use affine::{EllipticCurveAffine, EllipticCurveFq, EllipticCurveFq2};
pub use projective::EllipticCurveFqProjective;
pub use projective_fq2::EllipticCurveFq2Projective;

use num_bigint::BigInt;
use num_traits::Zero;
use txscript::{Opcode, Script};

use crate::util::{mod_from_altstack, mod_top, pick, roll};

/// Double the degree-`n` element on top of the stack, coordinate-wise.
pub(crate) fn double_top(n: usize) -> Script {
    scale_top(n, &BigInt::from(2))
}

/// Multiply the degree-`n` element on top of the stack by a small integer
/// constant, coordinate-wise.
pub(crate) fn scale_top(n: usize, k: &BigInt) -> Script {
    let mut out = Script::new();
    for _ in 0..n - 1 {
        out.push_int(k);
        out.push_opcode(Opcode::OP_MUL);
        out.push_opcode(Opcode::OP_TOALTSTACK);
    }
    out.push_int(k);
    out.push_opcode(Opcode::OP_MUL);
    for _ in 0..n - 1 {
        out.push_opcode(Opcode::OP_FROMALTSTACK);
    }
    out
}

/// Subtract a constant coefficient vector from the degree-`n` element on
/// top of the stack. Zero coefficients emit nothing.
pub(crate) fn sub_constant_top(n: usize, constant: &[BigInt]) -> Script {
    let mut out = Script::new();
    for i in (1..n).rev() {
        if !constant[i].is_zero() {
            out.push_int(&constant[i]);
            out.push_opcode(Opcode::OP_SUB);
        }
        out.push_opcode(Opcode::OP_TOALTSTACK);
    }
    if !constant[0].is_zero() {
        out.push_int(&constant[0]);
        out.push_opcode(Opcode::OP_SUB);
    }
    for _ in 1..n {
        out.push_opcode(Opcode::OP_FROMALTSTACK);
    }
    out
}

/// Fail the script unless the degree-`n` element on top reduces to zero
/// modulo the bottom constant. Consumes the element.
pub(crate) fn verify_zero_mod(n: usize) -> Script {
    let mut out = Script::new();
    for _ in 0..n {
        out += pick(-1, 1);
        out += mod_top(true, false);
        out.push_opcode(Opcode::OP_0);
        out.push_opcode(Opcode::OP_EQUALVERIFY);
    }
    out
}

/// Batched reduction of the `total` scalars on top of the stack against the
/// bottom constant.
pub(crate) fn reduce_in_place(
    total: usize,
    positive: bool,
    clean_constant: bool,
    is_constant_reused: bool,
) -> Script {
    let mut out = Script::new();
    for _ in 0..total - 1 {
        out.push_opcode(Opcode::OP_TOALTSTACK);
    }
    out += if clean_constant {
        roll(-1, 1)
    } else {
        pick(-1, 1)
    };
    if total == 1 {
        return out + mod_top(positive, is_constant_reused);
    }
    out += mod_top(positive, true);
    for _ in 0..total - 2 {
        out += mod_from_altstack(positive, true);
    }
    out + mod_from_altstack(positive, is_constant_reused)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(text: &str) -> Script {
        Script::parse_string(text).unwrap()
    }

    #[test]
    fn scale_and_double() {
        assert_eq!(double_top(1), s("OP_2 OP_MUL"));
        assert_eq!(
            double_top(2),
            s("OP_2 OP_MUL OP_TOALTSTACK OP_2 OP_MUL OP_FROMALTSTACK")
        );
        assert_eq!(scale_top(1, &BigInt::from(3)), s("OP_3 OP_MUL"));
    }

    #[test]
    fn sub_constant_skips_zeros() {
        let a = [BigInt::from(0), BigInt::from(5)];
        assert_eq!(
            sub_constant_top(2, &a),
            s("5 OP_SUB OP_TOALTSTACK OP_FROMALTSTACK")
        );
    }

    #[test]
    fn zero_check_consumes_element() {
        let script = verify_zero_mod(1);
        assert_eq!(
            script,
            s("OP_DEPTH OP_1SUB OP_PICK OP_TUCK OP_MOD OP_OVER OP_ADD OP_SWAP OP_MOD \
               OP_0 OP_EQUALVERIFY")
        );
    }
}
