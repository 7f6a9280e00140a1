use num_bigint::BigInt;
use txscript::{Opcode, Script};

use crate::curves::{double_top, reduce_in_place, scale_top};
use crate::fields::{constant_guard, Fq2, PrimeFieldExtension};
use crate::stack::{
    check_order, StackEllipticCurvePoint, StackEllipticCurvePointProjective,
    StackFiniteFieldElement,
};
use crate::util::{bitmask_to_boolean_list, move_element, pick, roll, MoveMode, Slots};
use crate::{BuildOptions, ScriptError};

/// Line evaluations for BLS12-381.
///
/// With the `M`-twist embedding, the line through `T` and `Q` (tangent
/// when `T = Q`) evaluated at an affine `P` on the base curve is the
/// sparse `F_q^12` element with `w`-weights `{0, 2, 3}`:
///
/// ```text
/// ev = (lambda * xQ - yQ)  +  (-lambda * xP) v  +  yP w
/// ```
///
/// pushed as five scalars (the `u`-component of the `w`-coordinate
/// vanishes).
#[derive(Clone, Debug)]
pub struct LineFunctions {
    fq2: Fq2,
}

impl LineFunctions {
    pub fn new(fq2: Fq2) -> Self {
        LineFunctions { fq2 }
    }

    fn negate_top_pair() -> Script {
        Script::parse_string("OP_NEGATE OP_SWAP OP_NEGATE OP_SWAP").expect("static")
    }

    /// Rational-form line evaluation with a projective running point: the
    /// gradient is computed on-stack, no witness is consumed.
    ///
    /// Tangent (`q = None`, `a' = 0`): `a00 = 3X^3 - 2Y^2 Z`,
    /// `a01 = -3X^2 xP Z`, `D = 2YZ^2`; chord against an affine `Q`:
    /// `a00 = (Y - yQ Z) xQ - yQ (X - xQ Z)`, `a01 = -(Y - yQ Z) xP`,
    /// `D = X - xQ Z`. The emitted element is `[a00 conj(D),
    /// a01 conj(D), yP |D|, |D|]` (six scalars), keeping the running
    /// denominator in `F_q`. The operands are copied, never consumed.
    pub fn line_evaluation_proj(
        &self,
        opts: &BuildOptions,
        t: StackEllipticCurvePointProjective,
        q: Option<StackEllipticCurvePoint>,
        p: StackEllipticCurvePoint,
    ) -> Result<Script, ScriptError> {
        let (clean_constant, is_constant_reused) = opts.modulo_flags()?;
        let fq2 = &self.fq2;
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

        let (a00n, a01n, d) = match q_regs {
            None => {
                // lambda numerator: 3X^2
                let lam = fq2.square_slot(&mut out, &mut slots, tx, false)?;
                out += scale_top(2, &BigInt::from(3));
                // a00 numerator: lam*X - 2Y^2 Z
                let m = fq2.mul_slots(&mut out, &mut slots, lam, tx, false, false)?;
                let y2 = fq2.square_slot(&mut out, &mut slots, ty, false)?;
                let yz = fq2.mul_slots(&mut out, &mut slots, tz, y2, false, true)?;
                out += double_top(2);
                let a00n = fq2.sum_slots(&mut out, &mut slots, m, yz, false, true, true, true)?;
                // a01 numerator: -lam * xP * Z
                let w = fq2.scalar_mul_slot(&mut out, &mut slots, tz, px, true, false)?;
                let a01n = fq2.mul_slots(&mut out, &mut slots, lam, w, true, true)?;
                // D = 2YZ^2
                let z2 = fq2.square_slot(&mut out, &mut slots, tz, false)?;
                let d = fq2.mul_slots(&mut out, &mut slots, ty, z2, false, true)?;
                out += double_top(2);
                (a00n, a01n, d)
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
                // a00 numerator: lam*xQ - yQ_*D
                let m3 = fq2.mul_slots(&mut out, &mut slots, lam, qx, false, false)?;
                let m4 = fq2.mul_slots(&mut out, &mut slots, qy, d, false, false)?;
                if q_negate {
                    out += Self::negate_top_pair();
                }
                let a00n = fq2.sum_slots(&mut out, &mut slots, m3, m4, false, true, true, true)?;
                // a01 numerator: -lam * xP
                let a01n = fq2.scalar_mul_slot(&mut out, &mut slots, lam, px, true, true)?;
                (a00n, a01n, d)
            }
        };

        // fold the denominator into its F_q norm
        let nd = fq2.norm_slot(&mut out, &mut slots, d)?;
        let conj_d = fq2.conjugate_roll_slot(&mut out, &mut slots, d)?;
        let a00 = fq2.mul_slots(&mut out, &mut slots, a00n, conj_d, true, false)?;
        let a01 = fq2.mul_slots(&mut out, &mut slots, a01n, conj_d, true, true)?;
        // yP * |D|
        out += pick(slots.get(py), 1);
        out += pick(slots.get(nd) + 1, 1);
        out.push_opcode(Opcode::OP_MUL);
        slots.lift(1);
        let c = slots.register_wide(0, 1);

        // assemble [a00, a01, c, |D|]
        for &slot in &[a00, a01, c, nd] {
            let width = slots.width(slot);
            out += roll(slots.get(slot), width);
            slots.consume(slot);
            slots.alloc_on_top_wide(width);
        }

        if opts.take_modulo {
            out += reduce_in_place(6, opts.positive_modulo, clean_constant, is_constant_reused);
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
        let none = BuildOptions::default();
        let el = |position: i64, negate: bool, degree: usize| {
            StackFiniteFieldElement::new(position, negate, degree)
        };

        let mut out = constant_guard(opts, fq2.modulus());

        // normalise to [lambda, xQ, yQ, xP, yP] on top
        out += move_element(&lambda, MoveMode::from_bool(rolled[0]));
        out += move_element(&q.shift(2), MoveMode::from_bool(rolled[1]));
        out += move_element(&p.shift(6), MoveMode::from_bool(rolled[2]));

        // a00 = lambda * xQ - yQ_ (the sign of yQ follows the descriptor)
        out += fq2.mul(&none, el(7, false, 2), el(5, false, 2), 2)?;
        out += fq2.algebraic_sum(&none, el(5, !q.negate(), 2), el(1, false, 2), 3)?;
        // a01 = -lambda * xP
        out += fq2.base_field_scalar_mul(
            &none,
            el(5, false, 2),
            el(3, true, 1),
            3,
        )?;
        // restore the flat coordinate order [a00, a01, yP]
        out += roll(4, 1);

        if opts.take_modulo {
            out += reduce_in_place(5, opts.positive_modulo, clean_constant, is_constant_reused);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bls12_381::fields::fq2_script;
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
    fn evaluation_reduces_five_scalars() {
        let (lambda, q, p) = on_top_args();
        let opts = BuildOptions::default()
            .with_take_modulo(true)
            .with_clean_constant(false)
            .with_constant_reused(false);
        let script = LineFunctions::new(fq2_script())
            .line_evaluation(&opts, lambda, q, p, 7)
            .unwrap();
        assert_eq!(script.count_op(Opcode::OP_MOD), 10);
    }

    #[test]
    fn negated_q_changes_the_emission() {
        let (lambda, q, p) = on_top_args();
        let lf = LineFunctions::new(fq2_script());
        let plain = lf
            .line_evaluation(&BuildOptions::default(), lambda, q, p, 7)
            .unwrap();
        let negated = lf
            .line_evaluation(&BuildOptions::default(), lambda, q.set_negate(true), p, 7)
            .unwrap();
        assert_ne!(plain, negated);
    }
}
