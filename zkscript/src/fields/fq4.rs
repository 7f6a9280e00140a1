use num_bigint::BigInt;
use txscript::{Opcode, Script};

use crate::fields::{bring_pair_to_top, bring_to_top, constant_guard, Fq2, PrimeFieldExtension};
use crate::stack::{check_order, StackFiniteFieldElement};
use crate::util::bitmask_to_boolean_list;
use crate::{BuildOptions, ScriptError};

/// Script builder for `F_q^4 = F_q^2[s] / (s^2 - u)`.
///
/// An element `x = (x0 + x1 u) + (x2 + x3 u) s` occupies four scalars,
/// `x0` deepest. The Frobenius gammas are the constants
/// `gamma_n = s^(q^n - 1)` expressed over `F_q^2`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fq4 {
    modulus: BigInt,
    base_field: Fq2,
    gammas_frobenius: Vec<[BigInt; 2]>,
}

impl PrimeFieldExtension for Fq4 {
    fn modulus(&self) -> &BigInt {
        &self.modulus
    }

    fn extension_degree(&self) -> usize {
        4
    }
}

impl Fq4 {
    pub fn new(modulus: BigInt, base_field: Fq2, gammas_frobenius: Vec<[BigInt; 2]>) -> Self {
        Fq4 {
            modulus,
            base_field,
            gammas_frobenius,
        }
    }

    pub fn base_field(&self) -> &Fq2 {
        &self.base_field
    }

    fn validate(&self, x: &StackFiniteFieldElement) -> Result<(), ScriptError> {
        if x.extension_degree != 4 {
            return Err(ScriptError::ExtensionDegreeMismatch {
                expected: 4,
                got: x.extension_degree,
            });
        }
        Ok(())
    }

    /// Reduction or altstack drain once the result sits split as
    /// `[z0, z1]` on the stack with `[z3, z2]` parked on the altstack.
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
            out.push_opcode(Opcode::OP_FROMALTSTACK);
            out.push_opcode(Opcode::OP_FROMALTSTACK);
        }
        out
    }

    /// `x * y`.
    ///
    /// With `x = (X0, X1)`, `y = (Y0, Y1)` over `F_q^2`:
    /// `c0 = X0 Y0 + u X1 Y1`, `c1 = X0 Y1 + X1 Y0`.
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

        let mut out = constant_guard(opts, &self.modulus);
        out += bring_pair_to_top(x, y, rolled[0], rolled[1]);

        // stack: [X0, X1, Y0, Y1] as Fq2 pairs, deepest scalar at depth 7
        let x0 = StackFiniteFieldElement::new(7, x.negate, 2);
        let x1 = StackFiniteFieldElement::new(5, x.negate, 2);
        let y0 = StackFiniteFieldElement::new(3, y.negate, 2);
        let y1 = StackFiniteFieldElement::new(1, y.negate, 2);

        // c1 = X0*Y1 + X1*Y0 -> altstack
        out += fq2.mul(&none, x0, y1, 0)?;
        out += fq2.mul(&none, x1.shift(2), y0.shift(2), 0)?;
        out += fq2.add(
            &none,
            StackFiniteFieldElement::new(3, false, 2),
            StackFiniteFieldElement::new(1, false, 2),
            3,
        )?;
        out.push_opcode(Opcode::OP_TOALTSTACK);
        out.push_opcode(Opcode::OP_TOALTSTACK);

        // c0 = X0*Y0 + u*(X1*Y1), consuming the operands
        out += fq2.mul(&none, x1, y1, 3)?;
        out += fq2.mul_by_u(&none, StackFiniteFieldElement::new(1, false, 2), true)?;
        // rolling X1 and Y1 lowered X0 by two scalars; Y0 is unaffected
        out += fq2.mul(&none, x0.shift(-2), y0, 3)?;
        out += fq2.add(
            &none,
            StackFiniteFieldElement::new(3, false, 2),
            StackFiniteFieldElement::new(1, false, 2),
            3,
        )?;

        Ok(out + self.split_tail(opts, clean_constant, is_constant_reused))
    }

    /// `x^2`, the dedicated quartic expansion over the base prime field.
    ///
    /// With `x = x0 + x1 u + x2 s + x3 us` and `u^2 = r`:
    /// `(x^2)_0 = x0^2 + (x1^2 + 2 x2 x3) r`, `(x^2)_1 = 2 x0 x1 + x2^2 +
    /// x3^2 r`, `(x^2)_2 = 2 (x0 x2 + x1 x3 r)`, `(x^2)_3 = 2 (x1 x2 + x0
    /// x3)`.
    pub fn square(
        &self,
        opts: &BuildOptions,
        x: StackFiniteFieldElement,
        rolled: bool,
    ) -> Result<Script, ScriptError> {
        self.validate(&x)?;
        let (clean_constant, is_constant_reused) = opts.modulo_flags()?;
        let r = self.base_field.non_residue().clone();

        let mut out = constant_guard(opts, &self.modulus);
        out += bring_to_top(x, rolled);

        // fourth component: 2*(x1*x2 + x0*x3)
        out += Script::parse_string(
            "OP_2OVER OP_2OVER OP_TOALTSTACK OP_MUL OP_SWAP OP_FROMALTSTACK OP_MUL \
             OP_ADD OP_2 OP_MUL OP_TOALTSTACK",
        )
        .expect("static");
        // third component: 2*(x0*x2 + x1*x3*r)
        out += Script::parse_string("OP_2OVER OP_2OVER OP_ROT OP_MUL").expect("static");
        out.push_int(&r);
        out += Script::parse_string("OP_MUL OP_ROT OP_ROT OP_MUL OP_ADD OP_2 OP_MUL OP_TOALTSTACK")
            .expect("static");
        // second component: 2*x0*x1 + x2^2 + x3^2*r
        out += Script::parse_string("OP_2OVER OP_2OVER OP_DUP OP_MUL").expect("static");
        out.push_int(&r);
        out += Script::parse_string(
            "OP_MUL OP_SWAP OP_DUP OP_MUL OP_ADD OP_ROT OP_ROT OP_2 OP_MUL OP_MUL OP_ADD \
             OP_TOALTSTACK",
        )
        .expect("static");
        // first component: x0^2 + (x1^2 + 2*x2*x3)*r
        out += Script::parse_string("OP_2 OP_MUL OP_MUL OP_SWAP OP_DUP OP_MUL OP_ADD")
            .expect("static");
        out.push_int(&r);
        out += Script::parse_string("OP_MUL OP_SWAP OP_DUP OP_MUL OP_ADD").expect("static");

        if opts.take_modulo {
            Ok(out + self.take_modulo(opts.positive_modulo, clean_constant, is_constant_reused))
        } else {
            Ok(out + self.from_altstack())
        }
    }

    /// Conjugation over `F_q^2`: `(a + b s) -> (a - b s)`.
    ///
    /// On the cyclotomic subgroup this is the inverse, which is what the
    /// final-exponentiation builders use it for.
    pub fn conjugate(
        &self,
        opts: &BuildOptions,
        x: StackFiniteFieldElement,
        rolled: bool,
    ) -> Result<Script, ScriptError> {
        self.validate(&x)?;
        let (clean_constant, is_constant_reused) = opts.modulo_flags()?;
        let mut out = constant_guard(opts, &self.modulus);
        out += bring_to_top(x, rolled);
        // negate the s-coordinate pair on top
        out += Script::parse_string("OP_NEGATE OP_SWAP OP_NEGATE OP_SWAP").expect("static");
        Ok(out + self.tail_in_place(opts, clean_constant, is_constant_reused))
    }

    /// Frobenius `phi^n` for odd `n`: conjugate both `F_q^2` coordinates
    /// and twist the `s`-coordinate by `gamma_n`.
    pub fn frobenius_odd(
        &self,
        opts: &BuildOptions,
        n: usize,
        x: StackFiniteFieldElement,
        rolled: bool,
    ) -> Result<Script, ScriptError> {
        debug_assert!(n % 2 == 1);
        self.validate(&x)?;
        let (clean_constant, is_constant_reused) = opts.modulo_flags()?;
        let gamma = &self.gammas_frobenius[(n % 4) - 1];
        let fq2 = &self.base_field;
        let none = BuildOptions::default();

        let mut out = constant_guard(opts, &self.modulus);
        out += bring_to_top(x, rolled);
        // stack: [A, B]; B -> conj(B) * gamma_n
        out += fq2.conjugate(&none, StackFiniteFieldElement::new(1, false, 2), true)?;
        out += fq2.mul_by_constant(&none, StackFiniteFieldElement::new(1, false, 2), gamma, true)?;
        // A -> conj(A), then restore coordinate order
        out += fq2.conjugate(&none, StackFiniteFieldElement::new(3, false, 2), true)?;
        out += Script::parse_string("OP_2SWAP").expect("static");
        Ok(out + self.tail_in_place(opts, clean_constant, is_constant_reused))
    }

    /// Frobenius `phi^n` for even `n`: the identity on the real coordinate,
    /// a `gamma_n` twist on the `s`-coordinate (`n = 0 mod 4` collapses to
    /// the identity).
    pub fn frobenius_even(
        &self,
        opts: &BuildOptions,
        n: usize,
        x: StackFiniteFieldElement,
        rolled: bool,
    ) -> Result<Script, ScriptError> {
        debug_assert!(n % 2 == 0);
        self.validate(&x)?;
        let (clean_constant, is_constant_reused) = opts.modulo_flags()?;
        let fq2 = &self.base_field;
        let none = BuildOptions::default();

        let mut out = constant_guard(opts, &self.modulus);
        out += bring_to_top(x, rolled);
        if n % 4 != 0 {
            let gamma = &self.gammas_frobenius[(n % 4) - 1];
            out += fq2.mul_by_constant(
                &none,
                StackFiniteFieldElement::new(1, false, 2),
                gamma,
                true,
            )?;
        }
        Ok(out + self.tail_in_place(opts, clean_constant, is_constant_reused))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::TowerNonResidue;

    fn fq4() -> Fq4 {
        let q = BigInt::from(19);
        let fq2 = Fq2::new(q.clone(), BigInt::from(13), TowerNonResidue::U);
        Fq4::new(
            q,
            fq2,
            vec![
                [BigInt::from(2), BigInt::from(0)],
                [BigInt::from(3), BigInt::from(0)],
                [BigInt::from(5), BigInt::from(0)],
            ],
        )
    }

    fn top() -> StackFiniteFieldElement {
        StackFiniteFieldElement::on_top(4)
    }

    #[test]
    fn square_matches_reference_emission() {
        let script = fq4()
            .square(&BuildOptions::default(), top(), true)
            .unwrap();
        let expected = Script::parse_string(
            "OP_2OVER OP_2OVER OP_TOALTSTACK OP_MUL OP_SWAP OP_FROMALTSTACK OP_MUL \
             OP_ADD OP_2 OP_MUL OP_TOALTSTACK \
             OP_2OVER OP_2OVER OP_ROT OP_MUL 13 OP_MUL OP_ROT OP_ROT OP_MUL OP_ADD \
             OP_2 OP_MUL OP_TOALTSTACK \
             OP_2OVER OP_2OVER OP_DUP OP_MUL 13 OP_MUL OP_SWAP OP_DUP OP_MUL OP_ADD \
             OP_ROT OP_ROT OP_2 OP_MUL OP_MUL OP_ADD OP_TOALTSTACK \
             OP_2 OP_MUL OP_MUL OP_SWAP OP_DUP OP_MUL OP_ADD 13 OP_MUL \
             OP_SWAP OP_DUP OP_MUL OP_ADD \
             OP_FROMALTSTACK OP_FROMALTSTACK OP_FROMALTSTACK",
        )
        .unwrap();
        assert_eq!(script, expected);
    }

    #[test]
    fn square_with_reduction_has_modulo_tail() {
        let opts = BuildOptions::default()
            .with_take_modulo(true)
            .with_clean_constant(true)
            .with_constant_reused(false);
        let script = fq4().square(&opts, top(), true).unwrap();
        assert_eq!(script.count_op(Opcode::OP_MOD), 8);
        // constant rolled from the bottom exactly once
        assert_eq!(script.count_op(Opcode::OP_ROLL), 1);
    }

    #[test]
    fn mul_is_deterministic() {
        let x = StackFiniteFieldElement::new(7, false, 4);
        let y = StackFiniteFieldElement::new(3, false, 4);
        let a = fq4().mul(&BuildOptions::default(), x, y, 3).unwrap();
        let b = fq4().mul(&BuildOptions::default(), x, y, 3).unwrap();
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn frobenius_even_order_four_is_identity() {
        let script = fq4()
            .frobenius_even(&BuildOptions::default(), 4, top(), true)
            .unwrap();
        assert_eq!(script, Script::new());
    }

    #[test]
    fn degree_is_validated() {
        let bad = StackFiniteFieldElement::new(5, false, 3);
        assert!(matches!(
            fq4().square(&BuildOptions::default(), bad, true),
            Err(ScriptError::ExtensionDegreeMismatch { expected: 4, got: 3 })
        ));
    }
}
