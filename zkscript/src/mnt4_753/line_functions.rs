use num_bigint::BigInt;
use txscript::{Opcode, Script};

use crate::curves::{double_top, reduce_in_place, scale_top};
use crate::fields::{constant_guard, Fq2, PrimeFieldExtension};
use crate::stack::{
    check_order, StackEllipticCurvePoint, StackEllipticCurvePointProjective,
    StackFiniteFieldElement,
};
use crate::util::{
    bitmask_to_boolean_list, mod_from_altstack, mod_top, move_element, pick, roll, MoveMode, Slots,
};
use crate::{BuildOptions, ScriptError};

/// Line evaluations for MNT4-753.
///
/// The evaluation of the line through `T` and `Q` (tangent when `T = Q`)
/// at an affine `P` on the base curve is the sparse `F_q^4` element
///
/// ```text
/// ev = (-yQ + lambda * (xQ - xP * u)) + yP * s
/// ```
///
/// pushed as three scalars; the vanishing `us` coordinate is omitted.
#[derive(Clone, Debug)]
pub struct LineFunctions {
    fq2: Fq2,
    twist_a: [BigInt; 2],
}

impl LineFunctions {
    pub fn new(fq2: Fq2, twist_a: [BigInt; 2]) -> Self {
        LineFunctions { fq2, twist_a }
    }

    fn negate_top_pair() -> Script {
        Script::parse_string("OP_NEGATE OP_SWAP OP_NEGATE OP_SWAP").expect("static")
    }

    /// Rational-form line evaluation with a projective running point:
    /// the gradient is computed on-stack, no witness is consumed.
    ///
    /// Tangent (`q = None`):
    /// `N = (3X^2 + a'Z^2)(X - xP u Z) - 2Y^2 Z`, `D = 2YZ^2`; chord
    /// against an affine `Q`: `N = (Y - yQ Z)(xQ - xP u) - yQ (X - xQ Z)`,
    /// `D = X - xQ Z`. The emitted element is `[N * conj(D), yP * |D|,
    /// |D|]` (four scalars), so the running denominator stays in `F_q`.
    /// The operands are copied, never consumed.
    pub fn line_evaluation_proj(
        &self,
        opts: &BuildOptions,
        t: StackEllipticCurvePointProjective,
        q: Option<StackEllipticCurvePoint>,
        p: StackEllipticCurvePoint,
    ) -> Result<Script, ScriptError> {
        let (clean_constant, is_constant_reused) = opts.modulo_flags()?;
        let fq2 = &self.fq2;
        let none = BuildOptions::default();
        let mut out = constant_guard(opts, fq2.modulus());

        let mut slots = Slots::new(2);
        let tx = slots.register_wide(t.x.position, 2);
        let ty = slots.register_wide(t.y.position, 2);
        let tz = slots.register_wide(t.z.position, 2);
        let q_regs = q.map(|point| {
            (
                slots.register_wide(point.x.position, 2),
                slots.register_wide(point.y.position, 2),
                point.negate(),
            )
        });
        let px = slots.register_wide(p.x.position, 1);
        let py = slots.register_wide(p.y.position, 1);

        let (numerator, d) = match q_regs {
            None => {
                // lambda numerator: 3X^2 + a'Z^2
                let t1 = fq2.square_slot(&mut out, &mut slots, tx, false)?;
                out += scale_top(2, &BigInt::from(3));
                let t2 = fq2.square_slot(&mut out, &mut slots, tz, false)?;
                let t2a =
                    fq2.mul_by_constant_slot(&mut out, &mut slots, t2, &self.twist_a, false, true)?;
                let lam = fq2.sum_slots(&mut out, &mut slots, t1, t2a, false, false, true, true)?;
                // X - xP u Z
                let w = fq2.scalar_mul_slot(&mut out, &mut slots, tz, px, false, false)?;
                out += fq2.mul_by_u(&none, StackFiniteFieldElement::new(1, false, 2), true)?;
                let s = fq2.sum_slots(&mut out, &mut slots, tx, w, false, true, false, true)?;
                let m1 = fq2.mul_slots(&mut out, &mut slots, lam, s, true, true)?;
                // 2 Y^2 Z
                let y2 = fq2.square_slot(&mut out, &mut slots, ty, false)?;
                let yz = fq2.mul_slots(&mut out, &mut slots, tz, y2, false, true)?;
                out += double_top(2);
                let numerator =
                    fq2.sum_slots(&mut out, &mut slots, m1, yz, false, true, true, true)?;
                // D = 2 Y Z^2
                let z2 = fq2.square_slot(&mut out, &mut slots, tz, false)?;
                let d = fq2.mul_slots(&mut out, &mut slots, ty, z2, false, true)?;
                out += double_top(2);
                (numerator, d)
            }
            Some((qx, qy, q_negate)) => {
                // lambda numerator: Y - yQ_ Z
                let m = fq2.mul_slots(&mut out, &mut slots, tz, qy, false, false)?;
                if q_negate {
                    out += Self::negate_top_pair();
                }
                let lam = fq2.sum_slots(&mut out, &mut slots, ty, m, false, true, false, true)?;
                // D = X - xQ Z
                let m2 = fq2.mul_slots(&mut out, &mut slots, tz, qx, false, false)?;
                let d = fq2.sum_slots(&mut out, &mut slots, tx, m2, false, true, false, true)?;
                // xQ - xP u
                out += pick(slots.get(qx), 2);
                let v = slots.alloc_on_top_wide(2);
                out += pick(slots.get(px), 1);
                out.push_opcode(Opcode::OP_SUB);
                let m3 = fq2.mul_slots(&mut out, &mut slots, lam, v, true, true)?;
                // yQ_ (X - xQ Z)
                let m4 = fq2.mul_slots(&mut out, &mut slots, qy, d, false, false)?;
                if q_negate {
                    out += Self::negate_top_pair();
                }
                let numerator =
                    fq2.sum_slots(&mut out, &mut slots, m3, m4, false, true, true, true)?;
                (numerator, d)
            }
        };

        // fold the denominator into its F_q norm
        let nd = fq2.norm_slot(&mut out, &mut slots, d)?;
        let conj_d = fq2.conjugate_roll_slot(&mut out, &mut slots, d)?;
        let ab = fq2.mul_slots(&mut out, &mut slots, numerator, conj_d, true, true)?;
        // yP * |D|
        out += pick(slots.get(py), 1);
        out += pick(slots.get(nd) + 1, 1);
        out.push_opcode(Opcode::OP_MUL);
        slots.lift(1);
        let c = slots.register_wide(0, 1);

        // assemble [a, b, c, |D|]
        for &slot in &[ab, c, nd] {
            let width = slots.width(slot);
            out += roll(slots.get(slot), width);
            slots.consume(slot);
            slots.alloc_on_top_wide(width);
        }

        if opts.take_modulo {
            out += reduce_in_place(4, opts.positive_modulo, clean_constant, is_constant_reused);
        }
        Ok(out)
    }

    /// The gradient is a witness: it is *not* validated here, only by the
    /// paired point-update operations.
    pub fn line_evaluation(
        &self,
        opts: &BuildOptions,
        lambda: StackFiniteFieldElement,
        q: StackEllipticCurvePoint,
        p: StackEllipticCurvePoint,
        rolling_options: u32,
    ) -> Result<Script, ScriptError> {
        check_order(&[&lambda, &q, &p])?;
        let (clean_constant, is_constant_reused) = opts.modulo_flags()?;
        let rolled = bitmask_to_boolean_list(rolling_options, 3);
        let fq2 = &self.fq2;

        let mut out = constant_guard(opts, fq2.modulus());

        // normalise to [lambda, xQ, yQ, xP, yP] on top
        out += move_element(&lambda, MoveMode::from_bool(rolled[0]));
        out += move_element(&q.shift(2), MoveMode::from_bool(rolled[1]));
        out += move_element(&p.shift(6), MoveMode::from_bool(rolled[2]));
        if q.negate() {
            // flip the sign of yQ in place
            out += Script::parse_string(
                "OP_2SWAP OP_NEGATE OP_SWAP OP_NEGATE OP_SWAP OP_2SWAP",
            )
            .expect("static");
        }

        // second component: yP -> altstack
        out += Script::parse_string("OP_TOALTSTACK").expect("static");
        // first component: -yQ + lambda * (xQ - xP*u)
        out += Script::parse_string("OP_TOALTSTACK").expect("static");
        out += Script::parse_string("OP_2SWAP OP_FROMALTSTACK OP_SUB").expect("static");
        out += Script::parse_string("OP_2ROT").expect("static");
        out += fq2.mul(
            &BuildOptions::default(),
            StackFiniteFieldElement::new(3, false, 2),
            StackFiniteFieldElement::new(1, false, 2),
            3,
        )?;
        out += Script::parse_string("OP_ROT OP_SUB OP_TOALTSTACK").expect("static");
        out += Script::parse_string("OP_SWAP OP_SUB").expect("static");

        if opts.take_modulo {
            let fetch = if clean_constant {
                roll(-1, 1)
            } else {
                pick(-1, 1)
            };
            out += fetch;
            out += mod_top(opts.positive_modulo, true);
            out += mod_from_altstack(opts.positive_modulo, true);
            out += mod_from_altstack(opts.positive_modulo, is_constant_reused);
        } else {
            out += Script::parse_string("OP_FROMALTSTACK OP_FROMALTSTACK").expect("static");
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mnt4_753::fields::fq2_script;
    use txscript::Opcode;

    fn on_top_args() -> (
        StackFiniteFieldElement,
        StackEllipticCurvePoint,
        StackEllipticCurvePoint,
    ) {
        let lambda = StackFiniteFieldElement::new(7, false, 2);
        let q = StackEllipticCurvePoint::new(
            StackFiniteFieldElement::new(5, false, 2),
            StackFiniteFieldElement::new(3, false, 2),
        );
        let p = StackEllipticCurvePoint::new(
            StackFiniteFieldElement::new(1, false, 1),
            StackFiniteFieldElement::new(0, false, 1),
        );
        (lambda, q, p)
    }

    #[test]
    fn evaluation_is_three_scalars_with_reduction() {
        let (lambda, q, p) = on_top_args();
        let opts = BuildOptions::default()
            .with_take_modulo(true)
            .with_clean_constant(false)
            .with_constant_reused(false);
        let script = LineFunctions::new(fq2_script(), crate::mnt4_753::TWIST_A.clone())
            .line_evaluation(&opts, lambda, q, p, 7)
            .unwrap();
        // three output coordinates reduced positively
        assert_eq!(script.count_op(Opcode::OP_MOD), 6);
    }

    #[test]
    fn negated_q_changes_the_emission() {
        let (lambda, q, p) = on_top_args();
        let lf = LineFunctions::new(fq2_script(), crate::mnt4_753::TWIST_A.clone());
        let plain = lf
            .line_evaluation(&BuildOptions::default(), lambda, q, p, 7)
            .unwrap();
        let negated = lf
            .line_evaluation(&BuildOptions::default(), lambda, q.set_negate(true), p, 7)
            .unwrap();
        assert_ne!(plain, negated);
    }
}
