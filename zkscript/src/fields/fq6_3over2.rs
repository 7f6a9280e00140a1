use num_bigint::BigInt;
use txscript::{Opcode, Script};

use crate::fields::{bring_pair_to_top, bring_to_top, constant_guard, Fq2, PrimeFieldExtension};
use crate::stack::{check_order, StackFiniteFieldElement};
use crate::util::{bitmask_to_boolean_list, roll};
use crate::{BuildOptions, ScriptError};

/// Script builder for `F_q^6 = F_q^2[v] / (v^3 - xi)`, where `xi` is the
/// towering non-residue of the base field (for BLS12-381, `xi = 1 + u`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fq6 {
    modulus: BigInt,
    base_field: Fq2,
}

impl PrimeFieldExtension for Fq6 {
    fn modulus(&self) -> &BigInt {
        &self.modulus
    }

    fn extension_degree(&self) -> usize {
        6
    }
}

impl Fq6 {
    pub fn new(modulus: BigInt, base_field: Fq2) -> Self {
        Fq6 {
            modulus,
            base_field,
        }
    }

    pub fn base_field(&self) -> &Fq2 {
        &self.base_field
    }

    fn validate(&self, x: &StackFiniteFieldElement) -> Result<(), ScriptError> {
        if x.extension_degree != 6 {
            return Err(ScriptError::ExtensionDegreeMismatch {
                expected: 6,
                got: x.extension_degree,
            });
        }
        Ok(())
    }

    /// Tail once the result sits as `[z0, z1]` on the stack with
    /// `[z5, z4, z3, z2]` on the altstack.
    fn split_tail(
        &self,
        opts: &BuildOptions,
        clean_constant: bool,
        is_constant_reused: bool,
    ) -> Script {
        let mut out = Script::new();
        if opts.take_modulo {
            out.push_opcode(Opcode::OP_TOALTSTACK);
            out += self.take_modulo(opts.positive_modulo, clean_constant, is_constant_reused);
        } else {
            for _ in 0..4 {
                out.push_opcode(Opcode::OP_FROMALTSTACK);
            }
        }
        out
    }

    /// Double the `F_q^2` element on top of the stack.
    fn double_top_pair() -> Script {
        Script::parse_string("OP_2 OP_MUL OP_SWAP OP_2 OP_MUL OP_SWAP").expect("static")
    }

    /// `x * y` with the schoolbook cubic expansion over `F_q^2`:
    ///
    /// `c0 = X0 Y0 + xi (X1 Y2 + X2 Y1)`,
    /// `c1 = X0 Y1 + X1 Y0 + xi X2 Y2`,
    /// `c2 = X0 Y2 + X1 Y1 + X2 Y0`.
    pub fn mul(
        &self,
        opts: &BuildOptions,
        x: StackFiniteFieldElement,
        y: StackFiniteFieldElement,
        rolling_options: u32,
    ) -> Result<Script, ScriptError> {
        self.validate(&x)?;
        self.validate(&y)?;
        check_order(&[&x, &y])?;
        let (clean_constant, is_constant_reused) = opts.modulo_flags()?;
        let rolled = bitmask_to_boolean_list(rolling_options, 2);
        let fq2 = &self.base_field;
        let none = BuildOptions::default();
        let el = |position: i64, negate: bool| StackFiniteFieldElement::new(position, negate, 2);

        let mut out = constant_guard(opts, &self.modulus);
        out += bring_pair_to_top(x, y, rolled[0], rolled[1]);

        // stack: [X0, X1, X2, Y0, Y1, Y2], deepest scalar at depth 11
        let (nx, ny) = (x.negate, y.negate);

        // c2 = X1*Y1 + X0*Y2 + X2*Y0 -> altstack
        out += fq2.mul(&none, el(9, nx), el(3, ny), 0)?;
        out += fq2.mul(&none, el(13, nx), el(3, ny), 0)?;
        out += fq2.mul(&none, el(11, nx), el(9, ny), 0)?;
        out += fq2.add_three(&none, el(5, false), el(3, false), el(1, false), 7)?;
        out += Script::parse_string("OP_TOALTSTACK OP_TOALTSTACK").expect("static");

        // c1 = X0*Y1 + xi*(X2*Y2) + X1*Y0 -> altstack
        out += fq2.mul(&none, el(11, nx), el(3, ny), 0)?;
        out += fq2.mul(&none, el(9, nx), el(3, ny), 0)?;
        out += fq2.mul_by_non_residue(&none, el(1, false), true)?;
        out += fq2.mul(&none, el(13, nx), el(9, ny), 0)?;
        out += fq2.add_three(&none, el(5, false), el(3, false), el(1, false), 7)?;
        out += Script::parse_string("OP_TOALTSTACK OP_TOALTSTACK").expect("static");

        // c0 = xi*(X1*Y2 + X2*Y1) + X0*Y0, consuming the operands
        out += fq2.mul(&none, el(9, nx), el(1, ny), 3)?;
        out += fq2.mul(&none, el(7, nx), el(3, ny), 3)?;
        out += fq2.add(&none, el(3, false), el(1, false), 3)?;
        out += fq2.mul_by_non_residue(&none, el(1, false), true)?;
        out += fq2.mul(&none, el(5, nx), el(3, ny), 3)?;
        out += fq2.add(&none, el(3, false), el(1, false), 3)?;

        Ok(out + self.split_tail(opts, clean_constant, is_constant_reused))
    }

    /// `x^2` with the Chung–Hasan expansion:
    ///
    /// `s1 = 2 A0 A1`, `s3 = 2 A1 A2`, `s4 = A2^2`, `s0 = A0^2`,
    /// `s2 = (A0 - A1 + A2)^2`, then `c0 = s0 + xi s3`,
    /// `c1 = s1 + xi s4`, `c2 = s1 + s2 + s3 - s0 - s4`.
    pub fn square(
        &self,
        opts: &BuildOptions,
        x: StackFiniteFieldElement,
        rolled: bool,
    ) -> Result<Script, ScriptError> {
        self.validate(&x)?;
        let (clean_constant, is_constant_reused) = opts.modulo_flags()?;
        let fq2 = &self.base_field;
        let none = BuildOptions::default();
        let el = |position: i64, negate: bool| StackFiniteFieldElement::new(position, negate, 2);
        let nx = x.negate;

        let mut out = constant_guard(opts, &self.modulus);
        out += bring_to_top(x, rolled);

        // stack: [A0, A1, A2], deepest scalar at depth 5
        out += fq2.mul(&none, el(5, false), el(3, false), 0)?;
        out += Self::double_top_pair(); // s1
        out += fq2.mul(&none, el(5, false), el(3, false), 0)?;
        out += Self::double_top_pair(); // s3
        out += fq2.square(&none, el(5, false), false)?; // s4
        out += fq2.square(&none, el(11, false), false)?; // s0
        // s2 = (A0 - A1 + A2)^2; the element is consumed here
        out += fq2.algebraic_sum(&none, el(13, nx), el(11, !nx), 3)?;
        out += fq2.algebraic_sum(&none, el(11, nx), el(1, false), 3)?;
        out += fq2.square(&none, el(1, false), true)?;

        // stack: [s1, s3, s4, s0, s2] at depths 9, 7, 5, 3, 1
        // c2 = (s1 + s3 + s2) - s0 - s4 -> altstack
        out += fq2.add_three(&none, el(9, false), el(7, false), el(1, false), 4)?;
        out += fq2.algebraic_sum(&none, el(3, true), el(1, false), 2)?;
        out += fq2.algebraic_sum(&none, el(5, true), el(1, false), 2)?;
        out += Script::parse_string("OP_TOALTSTACK OP_TOALTSTACK").expect("static");

        // stack: [s1, s3, s4, s0]; c1 = s1 + xi*s4 -> altstack
        out += fq2.mul_by_non_residue(&none, el(3, false), true)?;
        out += fq2.add(&none, el(7, false), el(1, false), 3)?;
        out += Script::parse_string("OP_TOALTSTACK OP_TOALTSTACK").expect("static");

        // stack: [s3, s0]; c0 = s0 + xi*s3
        out += fq2.mul_by_non_residue(&none, el(3, false), true)?;
        out += fq2.add(&none, el(3, false), el(1, false), 3)?;

        Ok(out + self.split_tail(opts, clean_constant, is_constant_reused))
    }

    /// `x * v`: `(e0, e1, e2) -> (xi e2, e0, e1)`, operating on the element
    /// on top of the stack.
    pub fn mul_by_v(
        &self,
        opts: &BuildOptions,
        x: StackFiniteFieldElement,
        rolled: bool,
    ) -> Result<Script, ScriptError> {
        self.validate(&x)?;
        let (clean_constant, is_constant_reused) = opts.modulo_flags()?;
        let fq2 = &self.base_field;
        let none = BuildOptions::default();

        let mut out = constant_guard(opts, &self.modulus);
        out += bring_to_top(x, rolled);
        out += fq2.mul_by_non_residue(&none, StackFiniteFieldElement::new(1, x.negate, 2), true)?;
        if x.negate {
            // the two untouched coordinates still need their sign flipped
            out += roll(5, 2);
            out += Script::parse_string("OP_NEGATE OP_SWAP OP_NEGATE OP_SWAP").expect("static");
            out += roll(5, 2);
            out += Script::parse_string("OP_NEGATE OP_SWAP OP_NEGATE OP_SWAP").expect("static");
        } else {
            out += roll(5, 2);
            out += roll(5, 2);
        }
        Ok(out + self.tail_in_place(opts, clean_constant, is_constant_reused))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::TowerNonResidue;

    fn fq6() -> Fq6 {
        let q = BigInt::from(19);
        let fq2 = Fq2::new(q.clone(), BigInt::from(-1), TowerNonResidue::OnePlusU);
        Fq6::new(q, fq2)
    }

    fn top() -> StackFiniteFieldElement {
        StackFiniteFieldElement::on_top(6)
    }

    fn second() -> StackFiniteFieldElement {
        StackFiniteFieldElement::new(11, false, 6)
    }

    #[test]
    fn mul_and_square_are_deterministic() {
        let mul_a = fq6().mul(&BuildOptions::default(), second(), top(), 3).unwrap();
        let mul_b = fq6().mul(&BuildOptions::default(), second(), top(), 3).unwrap();
        assert_eq!(mul_a, mul_b);
        let sq_a = fq6().square(&BuildOptions::default(), top(), true).unwrap();
        let sq_b = fq6().square(&BuildOptions::default(), top(), true).unwrap();
        assert_eq!(sq_a, sq_b);
    }

    #[test]
    fn reduced_mul_reduces_every_coordinate() {
        let opts = BuildOptions::default()
            .with_take_modulo(true)
            .with_clean_constant(false)
            .with_constant_reused(false);
        let script = fq6().mul(&opts, second(), top(), 3).unwrap();
        // six coordinates, two OP_MODs each under positive reduction
        assert_eq!(script.count_op(Opcode::OP_MOD), 12);
    }

    #[test]
    fn mul_by_v_rotates_coordinates() {
        let script = fq6()
            .mul_by_v(&BuildOptions::default(), top(), true)
            .unwrap();
        // xi = 1 + u multiplication then two pair rotations
        let expected = Script::parse_string(
            "OP_2DUP OP_ADD OP_TOALTSTACK OP_SUB OP_FROMALTSTACK OP_2ROT OP_2ROT",
        )
        .unwrap();
        assert_eq!(script, expected);
    }

    #[test]
    fn square_rejects_wrong_degree() {
        let bad = StackFiniteFieldElement::new(3, false, 4);
        assert!(fq6().square(&BuildOptions::default(), bad, true).is_err());
    }
}
