use num_bigint::BigInt;
use num_traits::Zero;
use txscript::{Opcode, Script};

use crate::fields::{constant_guard, Fq};
use crate::stack::{
    check_order, StackEllipticCurvePointProjective, StackFiniteFieldElement, StackNumber,
};
use crate::util::{
    bitmask_to_boolean_list, is_mod_equal_to, mod_from_altstack, mod_top, move_element,
    move_slice, nums_to_script, pick, roll, MoveMode,
};
use crate::{BuildOptions, ScriptError};

/// Projective-coordinate arithmetic over `E(F_q)`.
///
/// Points are `[x, y, z]` triples; the point at infinity is the sentinel
/// `0x00 0x00 0x00`. No gradient witnesses are needed: everything is
/// computed on-stack.
#[derive(Clone, Debug)]
pub struct EllipticCurveFqProjective {
    field: Fq,
    curve_a: BigInt,
    curve_b: BigInt,
}

impl EllipticCurveFqProjective {
    pub fn new(modulus: BigInt, curve_a: BigInt, curve_b: BigInt) -> Self {
        EllipticCurveFqProjective {
            field: Fq::new(modulus),
            curve_a,
            curve_b,
        }
    }

    pub fn modulus(&self) -> &BigInt {
        self.field.modulus()
    }

    pub fn curve_a(&self) -> &BigInt {
        &self.curve_a
    }

    pub fn curve_b(&self) -> &BigInt {
        &self.curve_b
    }

    /// Addition `P_ + Q_` of finite, distinct, non-opposite points.
    ///
    /// `Q` must be rolled and sit on top of the stack (position 2); `P` may
    /// live anywhere below and be picked or rolled.
    pub fn point_algebraic_addition(
        &self,
        opts: &BuildOptions,
        p: StackEllipticCurvePointProjective,
        q: StackEllipticCurvePointProjective,
        rolling_options: u32,
    ) -> Result<Script, ScriptError> {
        check_order(&[&p, &q])?;
        let (clean_constant, is_constant_reused) = opts.modulo_flags()?;
        let rolled = bitmask_to_boolean_list(rolling_options, 2);
        let (is_p_rolled, is_q_rolled) = (rolled[0], rolled[1]);
        if !is_q_rolled {
            return Err(ScriptError::UnsupportedConfiguration(
                "projective addition only supports rolling Q".into(),
            ));
        }
        if q.x.position != 2 {
            return Err(ScriptError::UnsupportedConfiguration(
                "projective addition only supports Q on top of the stack".into(),
            ));
        }
        let fq = &self.field;
        let none = BuildOptions::default().with_positive_modulo(false);

        let mut out = constant_guard(opts, fq.modulus());

        // stack in:  [x1, y1, z1, .., x2, y2, z2]
        // stack out: [x1, y1, .., (x2*z1), (y2*z1), z2, (z1*z2)]
        out += Script::parse_string("OP_TOALTSTACK OP_TOALTSTACK").expect("static");
        out += move_element(&p.z.shift(-2), MoveMode::from_bool(is_p_rolled));
        out += Script::parse_string("OP_TUCK OP_MUL").expect("static");
        out += Script::parse_string("OP_SWAP OP_FROMALTSTACK OP_OVER OP_MUL").expect("static");
        out += Script::parse_string("OP_SWAP OP_FROMALTSTACK OP_TUCK OP_MUL").expect("static");
        // stack out: [(x2*z1), (z1*z2), (x1*z2), (y1*z2), u := ±y2*z1 - (±y1*z2)]
        out += move_slice(
            &p.shift(1 - i64::from(is_p_rolled)),
            MoveMode::from_bool(is_p_rolled),
            0,
            2,
        );
        out += roll(3, 1);
        out += Script::parse_string("OP_TUCK OP_MUL OP_TOALTSTACK OP_MUL OP_ROT OP_FROMALTSTACK")
            .expect("static");
        out.push_opcode(Opcode::OP_TUCK);
        out += fq.algebraic_sum(
            &none,
            StackFiniteFieldElement::new(1, q.negate(), 1),
            StackFiniteFieldElement::new(0, !p.negate(), 1),
            3,
        )?;
        // stack out: [(z1*z2), (y1*z2), u, (x1*z2), v := x2*z1 - x1*z2, v^3, v^3]
        out += roll(2, 1);
        out += roll(4, 1);
        out += pick(1, 1);
        out.push_opcode(Opcode::OP_SUB);
        out += Script::parse_string("OP_DUP OP_2DUP OP_MUL OP_MUL OP_DUP").expect("static");
        // altstack out: [v^3*z1*z2]
        out += roll(6, 1);
        out += Script::parse_string("OP_TUCK OP_MUL OP_TOALTSTACK").expect("static");
        // stack out: [(x1*z2), v, v^3, (y1*z2), u, (z1*z2*u^2)]
        out += roll(5, 2);
        out += roll(2, 1);
        out += pick(1, 1);
        out += Script::parse_string("OP_DUP OP_MUL OP_MUL").expect("static");
        // stack out: [u, (z1*z2*u^2), v, (x1*z2*v^2), v^3]
        // altstack out: [(v^3*z1*z2), (v^3*y1*z2)]
        out += roll(5, 2);
        out += Script::parse_string("OP_TUCK OP_DUP OP_MUL OP_MUL").expect("static");
        out += roll(5, 2);
        out += pick(1, 1);
        out += Script::parse_string("OP_MUL OP_TOALTSTACK").expect("static");
        // stack out: [u, v, (x1*z2*v^2), A := u^2*z1*z2 - v^3 - 2*v^2*x1*z2]
        out += pick(1, 1);
        out += Script::parse_string("OP_2 OP_MUL OP_ADD").expect("static");
        out += roll(3, 1);
        out += Script::parse_string("OP_SUB OP_NEGATE").expect("static");
        // stack out: [vA]
        // altstack out: [(v^3*z1*z2), u * (v^2*x1*z2 - A) - v^3*y1*z2]
        out += Script::parse_string("OP_TUCK OP_SUB").expect("static");
        out += roll(3, 1);
        out += Script::parse_string("OP_MUL OP_FROMALTSTACK").expect("static");
        out += fq.algebraic_sum(
            &none,
            StackFiniteFieldElement::new(1, false, 1),
            StackFiniteFieldElement::new(0, !p.negate(), 1),
            3,
        )?;
        out += Script::parse_string("OP_TOALTSTACK OP_MUL").expect("static");

        if opts.take_modulo {
            out += move_element(&StackNumber::bottom(), MoveMode::from_bool(clean_constant));
            out += mod_top(opts.positive_modulo, true);
            out += mod_from_altstack(opts.positive_modulo, true);
            out += mod_from_altstack(opts.positive_modulo, is_constant_reused);
        } else {
            out += Script::parse_string("OP_FROMALTSTACK OP_FROMALTSTACK").expect("static");
        }
        Ok(out)
    }

    /// Doubling `2 P_` of a finite point.
    pub fn point_algebraic_doubling(
        &self,
        opts: &BuildOptions,
        p: StackEllipticCurvePointProjective,
        rolled: bool,
    ) -> Result<Script, ScriptError> {
        let (clean_constant, is_constant_reused) = opts.modulo_flags()?;
        let fq = &self.field;
        let mut out = constant_guard(opts, fq.modulus());

        // work on [x1, y1, z1] on top
        out += move_element(&p, MoveMode::from_bool(rolled));

        if !self.curve_a.is_zero() {
            // stack out: [x1, y1, (z1^2 * a), s := y1 * z1]
            out += pick(1, 2);
            out += pick(0, 1);
            out += nums_to_script(&[self.curve_a.clone()]);
            out += Script::parse_string("OP_MUL OP_MUL").expect("static");
            out += roll(3, 2);
            out.push_opcode(Opcode::OP_MUL);
            // altstack out: [8s^3]
            out += Script::parse_string("OP_DUP OP_2DUP OP_8 OP_MUL OP_MUL OP_MUL OP_TOALTSTACK")
                .expect("static");
            // stack out: [x1, y1, (z1^2 * a), s, B := x1 * y1 * s]
            out += pick(3, 2);
            out += Script::parse_string("OP_MUL OP_OVER OP_MUL").expect("static");
            // stack out: [y1, s, B, w := z1^2 * a + 3*x1^2]
            out += roll(2, 1);
            out += roll(4, 1);
            out += Script::parse_string("OP_DUP OP_3 OP_MUL OP_MUL OP_ADD").expect("static");
        } else {
            // stack out: [x1, y1, s], altstack out: [8s^3]
            out += Script::parse_string(
                "OP_OVER OP_MUL OP_DUP OP_2DUP OP_8 OP_MUL OP_MUL OP_MUL OP_TOALTSTACK",
            )
            .expect("static");
            // stack out: [x1, y1, s, B]
            out += pick(0, 1);
            out += pick(3, 2);
            out += Script::parse_string("OP_MUL OP_MUL").expect("static");
            // stack out: [y1, s, B, w]
            out += roll(3, 1);
            out += Script::parse_string("OP_DUP OP_3 OP_MUL OP_MUL").expect("static");
        }
        // stack out: [y1, s, B, w, h := w^2 - 8B]
        out += pick(1, 2);
        out += Script::parse_string("OP_DUP OP_MUL OP_SWAP OP_8 OP_MUL OP_SUB").expect("static");
        // altstack out: [8s^3, w * (4B - h) - 8 * s^2 * y1^2]
        out += roll(2, 1);
        out += Script::parse_string("OP_4 OP_MUL OP_OVER OP_SUB OP_ROT OP_MUL").expect("static");
        out += pick(3, 2);
        out += Script::parse_string("OP_MUL OP_DUP OP_MUL OP_8 OP_MUL OP_SUB OP_TOALTSTACK")
            .expect("static");
        // stack out: [2sh]
        out += Script::parse_string("OP_MUL OP_2 OP_MUL OP_NIP").expect("static");
        if p.negate() {
            out.push_opcode(Opcode::OP_NEGATE);
        }

        if opts.take_modulo {
            out += move_element(&StackNumber::bottom(), MoveMode::from_bool(clean_constant));
            out += mod_top(opts.positive_modulo, true);
            out += mod_from_altstack(opts.positive_modulo, true);
            let prep = if p.negate() {
                Script::parse_string("OP_FROMALTSTACK OP_NEGATE OP_ROT").expect("static")
            } else {
                Script::parse_string("OP_FROMALTSTACK OP_ROT").expect("static")
            };
            out += crate::util::mod_with_preparation(
                prep,
                opts.positive_modulo,
                is_constant_reused,
            );
        } else if p.negate() {
            out += Script::parse_string("OP_FROMALTSTACK OP_NEGATE OP_ROT").expect("static");
        } else {
            out += Script::parse_string("OP_FROMALTSTACK OP_ROT").expect("static");
        }
        Ok(out)
    }

    /// Unrolled double-and-add multiplication `a * P`.
    ///
    /// Stack in: `[q, .., step markers, marker_a_is_zero, P]`; each step is
    /// guarded by markers rolled from depth 6 (`marker_doubling`, then
    /// `marker_addition` inside the doubling branch). Stack out:
    /// `[q, .., P, a*P]`, with the sentinel when `a = 0`.
    ///
    /// With `fixed_length_unlock` the unlocking data is padded per step and
    /// the skip branch drops the padding marker.
    pub fn unrolled_multiplication(
        &self,
        max_multiplier: &BigInt,
        opts: &BuildOptions,
        fixed_length_unlock: bool,
    ) -> Result<Script, ScriptError> {
        opts.modulo_flags()?;
        let clean_constant = opts.clean_constant.unwrap_or(false);
        let steps = (max_multiplier.bits() as usize).saturating_sub(1);

        let mut out = constant_guard(opts, self.field.modulus());
        out.push_opcode(Opcode::OP_3DUP);

        for i in (0..steps).rev() {
            let step_opts = BuildOptions {
                take_modulo: true,
                positive_modulo: opts.positive_modulo && i == 0,
                check_constant: false,
                clean_constant: Some(false),
                is_constant_reused: Some(false),
            };
            out += roll(6, 1);
            out.push_opcode(Opcode::OP_IF);
            out += self.point_algebraic_doubling(
                &step_opts,
                StackEllipticCurvePointProjective::on_top(1),
                true,
            )?;
            out += roll(6, 1);
            out.push_opcode(Opcode::OP_IF);
            out += self.point_algebraic_addition(
                &step_opts,
                StackEllipticCurvePointProjective::new(
                    StackFiniteFieldElement::new(5, false, 1),
                    StackFiniteFieldElement::new(4, false, 1),
                    StackFiniteFieldElement::new(3, false, 1),
                ),
                StackEllipticCurvePointProjective::on_top(1),
                2,
            )?;
            if fixed_length_unlock {
                out += Script::parse_string("OP_ENDIF OP_ELSE").expect("static");
                out += roll(6, 1);
                out += Script::parse_string("OP_DROP OP_ENDIF").expect("static");
            } else {
                out += Script::parse_string("OP_ENDIF OP_ENDIF").expect("static");
            }
        }

        // a = 0 short-circuits to the sentinel
        out += roll(6, 1);
        out += Script::parse_string("OP_IF OP_DROP OP_2DROP 0x00 0x00 0x00 OP_ENDIF")
            .expect("static");

        if clean_constant {
            out += Script::parse_string("OP_DEPTH OP_1SUB OP_ROLL OP_DROP").expect("static");
        }
        Ok(out)
    }

    /// Conversion to affine coordinates with a witnessed `z^-1`.
    ///
    /// Emits `(x z^-1, y z^-1)`, then verifies in-script that `z != 0` and
    /// `z * z^-1 = 1 (mod q)`, aborting otherwise.
    pub fn to_affine(
        &self,
        opts: &BuildOptions,
        z_inverse: StackFiniteFieldElement,
        p: StackEllipticCurvePointProjective,
        rolling_options: u32,
    ) -> Result<Script, ScriptError> {
        check_order(&[&z_inverse, &p])?;
        opts.modulo_flags()?;
        let clean_constant = opts.clean_constant.unwrap_or(false);
        let rolled = bitmask_to_boolean_list(rolling_options, 2);
        let (is_z_inverse_rolled, is_p_rolled) = (rolled[0], rolled[1]);

        let mut out = constant_guard(opts, self.field.modulus());

        // stack out: [.., x*z_inv, y*z_inv], altstack out: [z, z_inv, ..]
        out += move_element(&p, MoveMode::from_bool(is_p_rolled));
        out.push_opcode(Opcode::OP_TOALTSTACK);
        out += move_element(
            &z_inverse.shift(2 - 3 * i64::from(is_p_rolled)),
            MoveMode::from_bool(is_z_inverse_rolled),
        );
        out += Script::parse_string("OP_DUP OP_TOALTSTACK OP_TUCK OP_MUL OP_TOALTSTACK OP_MUL")
            .expect("static");

        if opts.take_modulo {
            out += move_element(&StackNumber::bottom(), MoveMode::from_bool(false));
            out += mod_top(opts.positive_modulo, true);
            out += mod_from_altstack(opts.positive_modulo, true);
            // stack: [x_affine, q, y_affine], altstack: [z, z_inv]
            out += Script::parse_string("OP_FROMALTSTACK OP_FROMALTSTACK").expect("static");
            out += Script::parse_string("OP_DUP OP_0 OP_EQUAL OP_NOT OP_VERIFY").expect("static");
            out.push_opcode(Opcode::OP_MUL);
            out += roll(2, 1);
            if clean_constant {
                // drop the bottom original as well
                out += roll(-1, 1);
                out.push_opcode(Opcode::OP_DROP);
            }
            out += mod_top(true, false);
            out += Script::parse_string("OP_1 OP_EQUALVERIFY").expect("static");
        } else {
            out += Script::parse_string("OP_FROMALTSTACK OP_FROMALTSTACK OP_FROMALTSTACK")
                .expect("static");
            // stack: [x_affine, y_affine, z_inv, z]
            out += Script::parse_string("OP_DUP OP_0 OP_EQUAL OP_NOT OP_VERIFY").expect("static");
            out.push_opcode(Opcode::OP_MUL);
            out += move_element(&StackNumber::bottom(), MoveMode::from_bool(clean_constant));
            out += mod_top(true, false);
            out += Script::parse_string("OP_1 OP_EQUALVERIFY").expect("static");
        }
        Ok(out)
    }

    /// Sentinel-aware addition of two projective points on top of the
    /// stack. The result is `Q + P` (the representatives differ from
    /// `P + Q`, the classes agree).
    pub fn point_addition_with_unknown_points(
        &self,
        opts: &BuildOptions,
    ) -> Result<Script, ScriptError> {
        opts.modulo_flags()?;
        let clean_constant = opts.clean_constant.unwrap_or(false);
        let inner_opts = BuildOptions {
            check_constant: false,
            clean_constant: Some(false),
            is_constant_reused: Some(false),
            ..*opts
        };
        let zero = BigInt::from(0);

        let mut out = constant_guard(opts, self.field.modulus());

        // branch on Q being the sentinel
        out += pick(2, 3);
        out += Script::parse_string("OP_CAT OP_CAT 0x000000 OP_EQUAL OP_NOT OP_IF")
            .expect("static");

        // branch on P being the sentinel; P and Q swap places
        out += roll(5, 3);
        out += pick(2, 3);
        out += Script::parse_string("OP_CAT OP_CAT 0x000000 OP_EQUAL OP_NOT OP_IF")
            .expect("static");

        // branch on P = -Q: xP*zQ = xQ*zP and yP*zQ + yQ*zP = 0 (mod q)
        out += pick(2, 3);
        out.push_opcode(Opcode::OP_TUCK);
        out += pick(8, 2);
        out += Script::parse_string(
            "OP_DUP OP_TOALTSTACK OP_TOALTSTACK OP_MUL OP_SWAP OP_FROMALTSTACK OP_MUL OP_ADD",
        )
        .expect("static");
        out += is_mod_equal_to(&StackNumber::bottom(), &zero, false, false, true);
        out += Script::parse_string("OP_FROMALTSTACK OP_2SWAP").expect("static");
        out += pick(9, 1);
        out += Script::parse_string("OP_MUL OP_ROT OP_ROT OP_MUL OP_SUB").expect("static");
        out += is_mod_equal_to(&StackNumber::bottom(), &zero, false, false, true);
        out += Script::parse_string("OP_BOOLAND OP_NOT OP_IF").expect("static");

        out += self.point_algebraic_addition(
            &inner_opts,
            StackEllipticCurvePointProjective::new(
                StackFiniteFieldElement::new(5, false, 1),
                StackFiniteFieldElement::new(4, false, 1),
                StackFiniteFieldElement::new(3, false, 1),
            ),
            StackEllipticCurvePointProjective::on_top(1),
            3,
        )?;

        out += Script::parse_string(
            "OP_ELSE OP_2DROP OP_2DROP OP_2DROP 0x00 0x00 0x00 OP_ENDIF",
        )
        .expect("static");
        out += Script::parse_string("OP_ELSE OP_DROP OP_2DROP OP_ENDIF").expect("static");
        out += Script::parse_string("OP_ELSE OP_DROP OP_2DROP OP_ENDIF").expect("static");

        if clean_constant {
            out += roll(-1, 1);
            out.push_opcode(Opcode::OP_DROP);
        }
        Ok(out)
    }

    /// Fold points parked on the stack and the altstack into one sum, with
    /// a reduction every third addition and an infinity-guarded final
    /// reduction.
    pub fn multi_addition(
        &self,
        n_points_on_stack: usize,
        n_points_on_altstack: usize,
        opts: &BuildOptions,
    ) -> Result<Script, ScriptError> {
        opts.modulo_flags()?;
        let clean_constant = opts.clean_constant.unwrap_or(false);
        let inner = |take: bool| BuildOptions {
            take_modulo: take,
            positive_modulo: false,
            check_constant: false,
            clean_constant: Some(false),
            is_constant_reused: Some(false),
        };

        let mut out = constant_guard(opts, self.field.modulus());
        let mut n_on_altstack = n_points_on_altstack;

        for i in 0..n_points_on_stack.saturating_sub(1) {
            out += self.point_addition_with_unknown_points(&inner(i % 3 == 2))?;
        }
        if n_points_on_stack == 0 {
            out += Script::parse_string("OP_FROMALTSTACK OP_FROMALTSTACK OP_FROMALTSTACK")
                .expect("static");
            n_on_altstack = n_on_altstack.saturating_sub(1);
        }
        for i in 0..n_on_altstack {
            out += Script::parse_string("OP_FROMALTSTACK OP_FROMALTSTACK OP_FROMALTSTACK")
                .expect("static");
            out += self.point_addition_with_unknown_points(&inner(i % 3 == 2))?;
        }

        if opts.take_modulo {
            out += Script::parse_string("OP_3DUP OP_CAT OP_CAT 0x000000 OP_EQUAL OP_NOT OP_IF")
                .expect("static");
            out += Script::parse_string("OP_TOALTSTACK OP_TOALTSTACK").expect("static");
            out += pick(-1, 1);
            out += mod_top(opts.positive_modulo, true);
            out += mod_from_altstack(opts.positive_modulo, true);
            out += mod_from_altstack(opts.positive_modulo, false);
            out.push_opcode(Opcode::OP_ENDIF);
        }
        if clean_constant {
            out += roll(-1, 1);
            out.push_opcode(Opcode::OP_DROP);
        }
        Ok(out)
    }

    /// Fixed-base multi-scalar multiplication: one unrolled multiplication
    /// per hard-coded base, partial products parked on the altstack, then a
    /// sentinel-aware summation.
    ///
    /// The first `extractable_scalars` multiplications use fixed-length
    /// unlocking data so the scalars can be recovered from the witness.
    #[tracing::instrument(level = "debug", skip_all, fields(bases = bases.len()))]
    pub fn msm_with_fixed_bases(
        &self,
        bases: &[Vec<BigInt>],
        max_multipliers: &[BigInt],
        opts: &BuildOptions,
        extractable_scalars: usize,
    ) -> Result<Script, ScriptError> {
        if bases.len() != max_multipliers.len() {
            return Err(ScriptError::UnsupportedConfiguration(
                "one max multiplier is needed per base".into(),
            ));
        }
        opts.modulo_flags()?;
        let clean_constant = opts.clean_constant.unwrap_or(false);
        let inner = BuildOptions {
            take_modulo: false,
            positive_modulo: false,
            check_constant: false,
            clean_constant: Some(false),
            is_constant_reused: Some(false),
        };

        let mut out = constant_guard(opts, self.field.modulus());
        for (i, (base, multiplier)) in bases.iter().zip(max_multipliers).enumerate() {
            debug_assert!(base.len() == 2 || base.len() == 3);
            out += nums_to_script(base);
            if base.len() == 2 {
                out.push_opcode(Opcode::OP_1);
            }
            out += self.unrolled_multiplication(multiplier, &inner, i < extractable_scalars)?;
            out += Script::parse_string("OP_TOALTSTACK OP_TOALTSTACK OP_TOALTSTACK").expect("static");
            out += Script::parse_string("OP_DROP OP_2DROP").expect("static");
        }
        out += self.multi_addition(
            0,
            bases.len(),
            &BuildOptions {
                check_constant: false,
                clean_constant: Some(clean_constant),
                ..*opts
            },
        )?;
        tracing::debug!(items = out.len(), "emitted projective fixed-base msm");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve() -> EllipticCurveFqProjective {
        // secp256k1-shaped: a = 0
        EllipticCurveFqProjective::new(BigInt::from(19), BigInt::from(0), BigInt::from(7))
    }

    fn top() -> StackEllipticCurvePointProjective {
        StackEllipticCurvePointProjective::on_top(1)
    }

    fn second() -> StackEllipticCurvePointProjective {
        StackEllipticCurvePointProjective::new(
            StackFiniteFieldElement::new(5, false, 1),
            StackFiniteFieldElement::new(4, false, 1),
            StackFiniteFieldElement::new(3, false, 1),
        )
    }

    #[test]
    fn addition_requires_q_on_top() {
        let shifted = top().shift(1);
        assert!(matches!(
            curve().point_algebraic_addition(&BuildOptions::default(), second().shift(1), shifted, 3),
            Err(ScriptError::UnsupportedConfiguration(_))
        ));
    }

    #[test]
    fn addition_requires_q_rolled() {
        assert!(matches!(
            curve().point_algebraic_addition(&BuildOptions::default(), second(), top(), 1),
            Err(ScriptError::UnsupportedConfiguration(_))
        ));
    }

    #[test]
    fn doubling_branches_on_curve_a() {
        let with_a = EllipticCurveFqProjective::new(BigInt::from(19), BigInt::from(5), BigInt::from(7));
        let s0 = curve()
            .point_algebraic_doubling(&BuildOptions::default(), top(), true)
            .unwrap();
        let s5 = with_a
            .point_algebraic_doubling(&BuildOptions::default(), top(), true)
            .unwrap();
        assert_ne!(s0, s5);
        assert!(s0.count_op(Opcode::OP_MUL) > 0);
    }

    #[test]
    fn unrolled_multiplication_shape() {
        let opts = BuildOptions::default().with_clean_constant(false);
        let script = curve()
            .unrolled_multiplication(&BigInt::from(16), &opts, false)
            .unwrap();
        // ceil(log2(16)) = 4 steps, two branches each, plus the a == 0 branch
        assert_eq!(script.count_op(Opcode::OP_IF), 9);
        assert!(script.to_string().contains("0x00 0x00 0x00"));
    }

    #[test]
    fn fixed_length_unlock_adds_drop_branches() {
        let opts = BuildOptions::default().with_clean_constant(false);
        let variable = curve()
            .unrolled_multiplication(&BigInt::from(16), &opts, false)
            .unwrap();
        let fixed = curve()
            .unrolled_multiplication(&BigInt::from(16), &opts, true)
            .unwrap();
        assert_eq!(fixed.count_op(Opcode::OP_ELSE), variable.count_op(Opcode::OP_ELSE) + 4);
    }

    #[test]
    fn unknown_points_handles_all_branches() {
        let script = curve()
            .point_addition_with_unknown_points(&BuildOptions::default().with_clean_constant(false))
            .unwrap();
        assert_eq!(script.count_op(Opcode::OP_IF), 3);
        assert_eq!(script.count_op(Opcode::OP_ELSE), 3);
        assert_eq!(script.count_op(Opcode::OP_BOOLAND), 1);
    }

    #[test]
    fn msm_parks_each_product() {
        let bases = vec![
            vec![BigInt::from(1), BigInt::from(2)],
            vec![BigInt::from(3), BigInt::from(4)],
        ];
        let multipliers = vec![BigInt::from(8), BigInt::from(8)];
        let opts = BuildOptions::default().with_clean_constant(false);
        let script = curve()
            .msm_with_fixed_bases(&bases, &multipliers, &opts, 0)
            .unwrap();
        assert!(script.count_op(Opcode::OP_TOALTSTACK) >= 6);
    }

    #[test]
    fn to_affine_verifies_inverse() {
        let opts = BuildOptions::default()
            .with_take_modulo(true)
            .with_clean_constant(false)
            .with_constant_reused(false);
        let script = curve()
            .to_affine(&opts, StackFiniteFieldElement::new(3, false, 1), top(), 3)
            .unwrap();
        let text = script.to_string();
        assert!(text.contains("OP_1 OP_EQUALVERIFY"));
        assert!(text.contains("OP_0 OP_EQUAL OP_NOT OP_VERIFY"));
    }
}
