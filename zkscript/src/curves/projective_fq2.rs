use num_bigint::BigInt;
use num_traits::Zero;
use txscript::{Opcode, Script};

use crate::curves::reduce_in_place;
use crate::fields::{constant_guard, Fq2, PrimeFieldExtension};
use crate::stack::{check_order, StackEllipticCurvePointProjective, StackFiniteFieldElement};
use crate::util::{bitmask_to_boolean_list, move_element, MoveMode, Slots};
use crate::{BuildOptions, ScriptError};

/// Projective-coordinate arithmetic on the twisted curve `E'(F_q^2)`.
///
/// Implements the complete addition identities
///
/// ```text
/// A = a X X' + 3b (X'Z + X Z') - a^2 Z Z'
/// B = a (X'Z + X Z') + 3b Z Z'
/// C = 3 X X' + a Z Z'
/// X'' = (X Y' + X' Y)(Y Y' - B) - A (Y Z' + Y' Z)
/// Y'' = A C + (Y Y' + B)(Y Y' - B)
/// Z'' = (Y Z' + Y' Z)(Y Y' + B) + C (X Y' + X' Y)
/// ```
///
/// with doubling and mixed addition as specialisations. No gradients are
/// consumed; the precomputed curve constants `3b` and `a^2` are pushed as
/// literals.
#[derive(Clone, Debug)]
pub struct EllipticCurveFq2Projective {
    fq2: Fq2,
    curve_a: [BigInt; 2],
    three_b: [BigInt; 2],
    a_squared: [BigInt; 2],
}

impl EllipticCurveFq2Projective {
    /// `curve_a` and `curve_b` are the twisted-curve coefficients as
    /// coefficient pairs over `F_q`; `3b` and `a^2` are derived here once.
    pub fn new(fq2: Fq2, curve_a: [BigInt; 2], curve_b: [BigInt; 2]) -> Self {
        let q = fq2.modulus().clone();
        let r = fq2.non_residue().clone();
        let three_b = [
            (&curve_b[0] * 3u8) % &q,
            (&curve_b[1] * 3u8) % &q,
        ];
        let a_squared = [
            (&curve_a[0] * &curve_a[0] + &r * &curve_a[1] * &curve_a[1]) % &q,
            (&curve_a[0] * &curve_a[1] * 2u8) % &q,
        ];
        EllipticCurveFq2Projective {
            fq2,
            curve_a,
            three_b,
            a_squared,
        }
    }

    pub fn fq2(&self) -> &Fq2 {
        &self.fq2
    }

    pub fn curve_a(&self) -> &[BigInt; 2] {
        &self.curve_a
    }

    fn el(position: i64, negate: bool) -> StackFiniteFieldElement {
        StackFiniteFieldElement::new(position, negate, 2)
    }

    /// Negate the `y` pair of the 6-scalar point on top of the stack.
    fn negate_top_y() -> Script {
        Script::parse_string(
            "OP_2SWAP OP_NEGATE OP_SWAP OP_NEGATE OP_SWAP OP_2SWAP",
        )
        .expect("static")
    }

    /// Fold a linear combination of slots with constant coefficients; zero
    /// coefficients are skipped.
    #[allow(clippy::type_complexity)]
    fn linear_combination(
        &self,
        out: &mut Script,
        slots: &mut Slots,
        terms: &[(usize, [BigInt; 2], bool, bool)],
    ) -> Result<usize, ScriptError> {
        let mut produced: Vec<usize> = Vec::new();
        for (slot, constant, negate, rolled) in terms {
            if constant[0].is_zero() && constant[1].is_zero() {
                if *rolled {
                    // drop the unused source
                    let x = Self::el(slots.get(*slot), false);
                    *out += move_element(&x, MoveMode::Roll);
                    out.push_opcode(Opcode::OP_2DROP);
                    slots.consume(*slot);
                }
                continue;
            }
            produced.push(self.fq2.mul_by_constant_slot(out, slots, *slot, constant, *negate, *rolled)?);
        }
        debug_assert!(!produced.is_empty());
        let mut acc = produced[0];
        for &next in &produced[1..] {
            acc = self.fq2.sum_slots(out, slots, acc, next, false, false, true, true)?;
        }
        Ok(acc)
    }

    /// From `[t1, t2, t3, t4, t5, t6]` on top of the stack (the six
    /// symmetric bilinear intermediates) to `[X'', Y'', Z'']`.
    fn combine(&self, out: &mut Script) -> Result<(), ScriptError> {
        let three = [BigInt::from(3), BigInt::from(0)];

        let mut slots = Slots::new(2);
        let mut ts = Vec::new();
        for k in 0..6i64 {
            ts.push(slots.register(11 - 2 * k));
        }
        let (t1, t2, t3, t4, t5, t6) = (ts[0], ts[1], ts[2], ts[3], ts[4], ts[5]);

        // A = a*t1 + 3b*t3 - a^2*t2
        let a_slot = self.linear_combination(
            out,
            &mut slots,
            &[
                (t1, self.curve_a.clone(), false, false),
                (t3, self.three_b.clone(), false, false),
                (t2, self.a_squared.clone(), true, false),
            ],
        )?;
        // B = a*t3 + 3b*t2
        let b_slot = self.linear_combination(
            out,
            &mut slots,
            &[
                (t3, self.curve_a.clone(), false, true),
                (t2, self.three_b.clone(), false, false),
            ],
        )?;
        // C = 3*t1 + a*t2
        let c_slot = self.linear_combination(
            out,
            &mut slots,
            &[
                (t1, three, false, true),
                (t2, self.curve_a.clone(), false, true),
            ],
        )?;

        // d1 = t4 - B, d2 = t4 + B
        let d1 = self.fq2.sum_slots(out, &mut slots, t4, b_slot, false, true, false, false)?;
        let d2 = self.fq2.sum_slots(out, &mut slots, t4, b_slot, false, false, true, true)?;

        // X'' = t5*d1 - A*t6 -> altstack
        let m1 = self.fq2.mul_slots(out, &mut slots, t5, d1, false, false)?;
        let m2 = self.fq2.mul_slots(out, &mut slots, a_slot, t6, false, false)?;
        self.fq2.sum_slots(out, &mut slots, m1, m2, false, true, true, true)?;
        *out += Script::parse_string("OP_TOALTSTACK OP_TOALTSTACK").expect("static");
        slots.lift(-2);

        // Y'' = A*C + d2*d1 -> altstack
        let m3 = self.fq2.mul_slots(out, &mut slots, a_slot, c_slot, true, false)?;
        let m4 = self.fq2.mul_slots(out, &mut slots, d2, d1, false, true)?;
        self.fq2.sum_slots(out, &mut slots, m3, m4, false, false, true, true)?;
        *out += Script::parse_string("OP_TOALTSTACK OP_TOALTSTACK").expect("static");
        slots.lift(-2);

        // Z'' = t6*d2 + C*t5
        let m5 = self.fq2.mul_slots(out, &mut slots, t6, d2, true, true)?;
        let m6 = self.fq2.mul_slots(out, &mut slots, c_slot, t5, true, true)?;
        self.fq2.sum_slots(out, &mut slots, m5, m6, false, false, true, true)?;

        // restore [X'', Y'', Z''] ordering
        *out += Script::parse_string("OP_FROMALTSTACK OP_FROMALTSTACK").expect("static");
        *out += Script::parse_string("OP_FROMALTSTACK OP_FROMALTSTACK").expect("static");
        *out += Script::parse_string("OP_2ROT OP_2ROT OP_2SWAP").expect("static");
        Ok(())
    }

    /// Park the intermediates, drop the original coordinates, restore the
    /// intermediates.
    fn drop_originals(intermediate_scalars: usize, original_pairs: usize) -> Script {
        let mut out = Script::new();
        for _ in 0..intermediate_scalars {
            out.push_opcode(Opcode::OP_TOALTSTACK);
        }
        for _ in 0..original_pairs {
            out.push_opcode(Opcode::OP_2DROP);
        }
        for _ in 0..intermediate_scalars {
            out.push_opcode(Opcode::OP_FROMALTSTACK);
        }
        out
    }

    /// Doubling `2 P_` of a finite point in projective coordinates.
    pub fn point_algebraic_doubling(
        &self,
        opts: &BuildOptions,
        p: StackEllipticCurvePointProjective,
        rolled: bool,
    ) -> Result<Script, ScriptError> {
        let (clean_constant, is_constant_reused) = opts.modulo_flags()?;
        let fq2 = &self.fq2;
        let none = BuildOptions::default();

        let mut out = constant_guard(opts, fq2.modulus());
        out += move_element(&p, MoveMode::from_bool(rolled));
        if p.negate() {
            out += Self::negate_top_y();
        }

        // stack: [X, Y, Z]; intermediates t1..t6 by picks
        out += fq2.square(&none, Self::el(5, false), false)?; // t1 = X^2
        out += fq2.square(&none, Self::el(3, false), false)?; // t2 = Z^2
        out += fq2.mul(&none, Self::el(9, false), Self::el(5, false), 0)?;
        out += crate::curves::double_top(2); // t3 = 2XZ
        out += fq2.square(&none, Self::el(9, false), false)?; // t4 = Y^2
        out += fq2.mul(&none, Self::el(13, false), Self::el(11, false), 0)?;
        out += crate::curves::double_top(2); // t5 = 2XY
        out += fq2.mul(&none, Self::el(13, false), Self::el(11, false), 0)?;
        out += crate::curves::double_top(2); // t6 = 2YZ

        out += Self::drop_originals(12, 3);
        self.combine(&mut out)?;

        if opts.take_modulo {
            out += reduce_in_place(6, opts.positive_modulo, clean_constant, is_constant_reused);
        }
        Ok(out)
    }

    /// Addition `P_ + Q_` of finite points in projective coordinates.
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
        let fq2 = &self.fq2;
        let none = BuildOptions::default();

        let mut out = constant_guard(opts, fq2.modulus());
        out += move_element(&p, MoveMode::from_bool(rolled[0]));
        if p.negate() {
            out += Self::negate_top_y();
        }
        out += move_element(&q.shift(6), MoveMode::from_bool(rolled[1]));
        if q.negate() {
            out += Self::negate_top_y();
        }

        // stack: [X, Y, Z, X', Y', Z']
        out += fq2.mul(&none, Self::el(11, false), Self::el(5, false), 0)?; // t1 = XX'
        out += fq2.mul(&none, Self::el(9, false), Self::el(3, false), 0)?; // t2 = ZZ'
        out += fq2.mul(&none, Self::el(11, false), Self::el(9, false), 0)?; // X'Z
        out += fq2.mul(&none, Self::el(17, false), Self::el(7, false), 0)?; // XZ'
        out += fq2.add(&none, Self::el(3, false), Self::el(1, false), 3)?; // t3
        out += fq2.mul(&none, Self::el(15, false), Self::el(9, false), 0)?; // t4 = YY'
        out += fq2.mul(&none, Self::el(19, false), Self::el(11, false), 0)?; // XY'
        out += fq2.mul(&none, Self::el(19, false), Self::el(15, false), 0)?; // X'Y
        out += fq2.add(&none, Self::el(3, false), Self::el(1, false), 3)?; // t5
        out += fq2.mul(&none, Self::el(19, false), Self::el(11, false), 0)?; // YZ'
        out += fq2.mul(&none, Self::el(19, false), Self::el(15, false), 0)?; // Y'Z
        out += fq2.add(&none, Self::el(3, false), Self::el(1, false), 3)?; // t6

        out += Self::drop_originals(12, 6);
        self.combine(&mut out)?;

        if opts.take_modulo {
            out += reduce_in_place(6, opts.positive_modulo, clean_constant, is_constant_reused);
        }
        Ok(out)
    }

    /// Mixed addition: projective `P`, affine `Q'`. One level of
    /// `Z`-dependence drops out (`Z' = 1`).
    ///
    /// The affine point sits deeper on the stack than the projective one
    /// (the layout of the Miller loops, where the running points live on
    /// top of the pinned `Q`s).
    pub fn point_algebraic_mixed_addition(
        &self,
        opts: &BuildOptions,
        p: StackEllipticCurvePointProjective,
        q_x: StackFiniteFieldElement,
        q_y: StackFiniteFieldElement,
        rolling_options: u32,
    ) -> Result<Script, ScriptError> {
        check_order(&[&q_x, &q_y, &p])?;
        let (clean_constant, is_constant_reused) = opts.modulo_flags()?;
        let rolled = bitmask_to_boolean_list(rolling_options, 2);
        let fq2 = &self.fq2;
        let none = BuildOptions::default();

        let mut out = constant_guard(opts, fq2.modulus());
        out += move_element(&p, MoveMode::from_bool(rolled[0]));
        if p.negate() {
            out += Self::negate_top_y();
        }
        // rolling `p` removes its scalars from above the affine point, so
        // only a picked `p` lifts it
        let lift = if rolled[0] { 0 } else { 6 };
        out += move_element(&q_x.shift(lift), MoveMode::from_bool(rolled[1]));
        out += move_element(&q_y.shift(lift + 2), MoveMode::from_bool(rolled[1]));
        if q_y.negate {
            out += Script::parse_string("OP_NEGATE OP_SWAP OP_NEGATE OP_SWAP").expect("static");
        }

        // stack: [X, Y, Z, X', Y']
        out += fq2.mul(&none, Self::el(9, false), Self::el(3, false), 0)?; // t1 = XX'
        out += crate::util::pick(7, 2); // t2 = Z
        out += fq2.mul(&none, Self::el(9, false), Self::el(7, false), 0)?; // X'Z
        out += fq2.add(&none, Self::el(15, false), Self::el(1, false), 2)?; // t3 = X + X'Z
        out += fq2.mul(&none, Self::el(13, false), Self::el(7, false), 0)?; // t4 = YY'
        out += fq2.mul(&none, Self::el(17, false), Self::el(9, false), 0)?; // XY'
        out += fq2.mul(&none, Self::el(17, false), Self::el(13, false), 0)?; // X'Y
        out += fq2.add(&none, Self::el(3, false), Self::el(1, false), 3)?; // t5
        out += fq2.mul(&none, Self::el(15, false), Self::el(11, false), 0)?; // Y'Z
        out += fq2.add(&none, Self::el(19, false), Self::el(1, false), 2)?; // t6 = Y + Y'Z

        out += Self::drop_originals(12, 5);
        self.combine(&mut out)?;

        if opts.take_modulo {
            out += reduce_in_place(6, opts.positive_modulo, clean_constant, is_constant_reused);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::TowerNonResidue;

    fn curve_zero_a() -> EllipticCurveFq2Projective {
        let fq2 = Fq2::new(BigInt::from(19), BigInt::from(-1), TowerNonResidue::OnePlusU);
        EllipticCurveFq2Projective::new(
            fq2,
            [BigInt::from(0), BigInt::from(0)],
            [BigInt::from(4), BigInt::from(4)],
        )
    }

    fn curve_nonzero_a() -> EllipticCurveFq2Projective {
        let fq2 = Fq2::new(BigInt::from(19), BigInt::from(13), TowerNonResidue::U);
        EllipticCurveFq2Projective::new(
            fq2,
            [BigInt::from(2), BigInt::from(0)],
            [BigInt::from(5), BigInt::from(3)],
        )
    }

    fn top() -> StackEllipticCurvePointProjective {
        StackEllipticCurvePointProjective::on_top(2)
    }

    #[test]
    fn derived_constants_are_reduced() {
        let curve = curve_nonzero_a();
        assert_eq!(curve.three_b, [BigInt::from(15), BigInt::from(9)]);
        // a^2 = (2 + 0u)^2 = 4
        assert_eq!(curve.a_squared, [BigInt::from(4), BigInt::from(0)]);
    }

    #[test]
    fn doubling_emits_for_both_coefficient_shapes() {
        for curve in [curve_zero_a(), curve_nonzero_a()] {
            let script = curve
                .point_algebraic_doubling(&BuildOptions::default(), top(), true)
                .unwrap();
            assert!(!script.is_empty());
            // deterministic
            let again = curve
                .point_algebraic_doubling(&BuildOptions::default(), top(), true)
                .unwrap();
            assert_eq!(script, again);
        }
    }

    #[test]
    fn addition_reduces_six_coordinates() {
        let opts = BuildOptions::default()
            .with_take_modulo(true)
            .with_clean_constant(false)
            .with_constant_reused(false);
        let p = top().shift(6);
        let script = curve_zero_a()
            .point_algebraic_addition(&opts, p, top(), 3)
            .unwrap();
        assert_eq!(script.count_op(Opcode::OP_MOD), 12);
    }

    #[test]
    fn negated_doubling_differs() {
        let plain = curve_zero_a()
            .point_algebraic_doubling(&BuildOptions::default(), top(), true)
            .unwrap();
        let negated = curve_zero_a()
            .point_algebraic_doubling(&BuildOptions::default(), top().set_negate(true), true)
            .unwrap();
        assert_ne!(plain, negated);
    }

    #[test]
    fn mixed_addition_builds() {
        // the affine point is pinned below the running projective point
        let q_x = StackFiniteFieldElement::new(9, false, 2);
        let q_y = StackFiniteFieldElement::new(7, false, 2);
        let script = curve_zero_a()
            .point_algebraic_mixed_addition(&BuildOptions::default(), top(), q_x, q_y, 3)
            .unwrap();
        assert!(!script.is_empty());
    }
}
