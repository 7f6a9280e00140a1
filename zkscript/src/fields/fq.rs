use num_bigint::BigInt;
use txscript::{Opcode, Script};

use crate::fields::constant_guard;
use crate::stack::{check_order, StackFiniteFieldElement};
use crate::util::{bitmask_to_boolean_list, mod_top, move_element, pick, roll, MoveMode};
use crate::{BuildOptions, ScriptError};

/// Script builder for arithmetic in the prime field `F_q`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fq {
    modulus: BigInt,
}

impl Fq {
    pub fn new(modulus: BigInt) -> Self {
        Fq { modulus }
    }

    pub fn modulus(&self) -> &BigInt {
        &self.modulus
    }

    /// The reduction tail shared by the degree-1 operations: fetch the
    /// bottom constant (rolling it when it is being cleaned) and reduce the
    /// top of the stack.
    fn reduction_tail(
        &self,
        positive_modulo: bool,
        clean_constant: bool,
        is_constant_reused: bool,
    ) -> Script {
        let fetch = if clean_constant {
            roll(-1, 1)
        } else {
            pick(-1, 1)
        };
        fetch + mod_top(positive_modulo, is_constant_reused)
    }

    fn unary_prologue(
        &self,
        opts: &BuildOptions,
        x: &StackFiniteFieldElement,
        rolled: bool,
    ) -> Result<(Script, bool, bool), ScriptError> {
        if x.extension_degree != 1 {
            return Err(ScriptError::ExtensionDegreeMismatch {
                expected: 1,
                got: x.extension_degree,
            });
        }
        let (clean_constant, is_constant_reused) = opts.modulo_flags()?;
        let mut out = constant_guard(opts, &self.modulus);
        out += move_element(x, MoveMode::from_bool(rolled));
        Ok((out, clean_constant, is_constant_reused))
    }

    /// `± x ± y`, signs taken from the descriptors.
    pub fn algebraic_sum(
        &self,
        opts: &BuildOptions,
        x: StackFiniteFieldElement,
        y: StackFiniteFieldElement,
        rolling_options: u32,
    ) -> Result<Script, ScriptError> {
        for operand in [&x, &y] {
            if operand.extension_degree != 1 {
                return Err(ScriptError::ExtensionDegreeMismatch {
                    expected: 1,
                    got: operand.extension_degree,
                });
            }
        }
        check_order(&[&x, &y])?;
        let (clean_constant, is_constant_reused) = opts.modulo_flags()?;
        let rolled = bitmask_to_boolean_list(rolling_options, 2);
        let (x_rolled, y_rolled) = (rolled[0], rolled[1]);

        let mut out = constant_guard(opts, &self.modulus);
        out += move_element(&y, MoveMode::from_bool(y_rolled));
        out += move_element(&x.shift(1 - i64::from(y_rolled)), MoveMode::from_bool(x_rolled));
        // stack: [.., y, x]; OP_SUB computes y - x
        out.push_opcode(if x.negate != y.negate {
            Opcode::OP_SUB
        } else {
            Opcode::OP_ADD
        });
        if y.negate {
            out.push_opcode(Opcode::OP_NEGATE);
        }
        if opts.take_modulo {
            out += self.reduction_tail(opts.positive_modulo, clean_constant, is_constant_reused);
        }
        Ok(out)
    }

    /// `x + y`.
    pub fn add(
        &self,
        opts: &BuildOptions,
        x: StackFiniteFieldElement,
        y: StackFiniteFieldElement,
        rolling_options: u32,
    ) -> Result<Script, ScriptError> {
        self.algebraic_sum(opts, x.set_negate(false), y.set_negate(false), rolling_options)
    }

    /// `x - y`.
    pub fn subtract(
        &self,
        opts: &BuildOptions,
        x: StackFiniteFieldElement,
        y: StackFiniteFieldElement,
        rolling_options: u32,
    ) -> Result<Script, ScriptError> {
        self.algebraic_sum(opts, x.set_negate(false), y.set_negate(true), rolling_options)
    }

    /// `x * y`, sign flipped when exactly one operand carries a negate flag.
    pub fn mul(
        &self,
        opts: &BuildOptions,
        x: StackFiniteFieldElement,
        y: StackFiniteFieldElement,
        rolling_options: u32,
    ) -> Result<Script, ScriptError> {
        for operand in [&x, &y] {
            if operand.extension_degree != 1 {
                return Err(ScriptError::ExtensionDegreeMismatch {
                    expected: 1,
                    got: operand.extension_degree,
                });
            }
        }
        check_order(&[&x, &y])?;
        let (clean_constant, is_constant_reused) = opts.modulo_flags()?;
        let rolled = bitmask_to_boolean_list(rolling_options, 2);
        let (x_rolled, y_rolled) = (rolled[0], rolled[1]);

        let mut out = constant_guard(opts, &self.modulus);
        out += move_element(&y, MoveMode::from_bool(y_rolled));
        out += move_element(&x.shift(1 - i64::from(y_rolled)), MoveMode::from_bool(x_rolled));
        out.push_opcode(Opcode::OP_MUL);
        if x.negate != y.negate {
            out.push_opcode(Opcode::OP_NEGATE);
        }
        if opts.take_modulo {
            out += self.reduction_tail(opts.positive_modulo, clean_constant, is_constant_reused);
        }
        Ok(out)
    }

    /// `x^2`.
    pub fn square(
        &self,
        opts: &BuildOptions,
        x: StackFiniteFieldElement,
        rolled: bool,
    ) -> Result<Script, ScriptError> {
        let (mut out, clean_constant, is_constant_reused) = self.unary_prologue(opts, &x, rolled)?;
        out.push_opcode(Opcode::OP_DUP);
        out.push_opcode(Opcode::OP_MUL);
        if opts.take_modulo {
            out += self.reduction_tail(opts.positive_modulo, clean_constant, is_constant_reused);
        }
        Ok(out)
    }

    /// `-x` (or `x` when the descriptor is already negated).
    pub fn negate(
        &self,
        opts: &BuildOptions,
        x: StackFiniteFieldElement,
        rolled: bool,
    ) -> Result<Script, ScriptError> {
        let (mut out, clean_constant, is_constant_reused) = self.unary_prologue(opts, &x, rolled)?;
        if !x.negate {
            out.push_opcode(Opcode::OP_NEGATE);
        }
        if opts.take_modulo {
            out += self.reduction_tail(opts.positive_modulo, clean_constant, is_constant_reused);
        }
        Ok(out)
    }

    /// `2x`.
    pub fn double(
        &self,
        opts: &BuildOptions,
        x: StackFiniteFieldElement,
        rolled: bool,
    ) -> Result<Script, ScriptError> {
        let (mut out, clean_constant, is_constant_reused) = self.unary_prologue(opts, &x, rolled)?;
        out.push_opcode(Opcode::OP_2);
        out.push_opcode(Opcode::OP_MUL);
        if x.negate {
            out.push_opcode(Opcode::OP_NEGATE);
        }
        if opts.take_modulo {
            out += self.reduction_tail(opts.positive_modulo, clean_constant, is_constant_reused);
        }
        Ok(out)
    }

    /// `c * x` for an integer constant pushed as a literal.
    pub fn mul_by_constant(
        &self,
        opts: &BuildOptions,
        x: StackFiniteFieldElement,
        constant: &BigInt,
        rolled: bool,
    ) -> Result<Script, ScriptError> {
        let (mut out, clean_constant, is_constant_reused) = self.unary_prologue(opts, &x, rolled)?;
        out.push_int(constant);
        out.push_opcode(Opcode::OP_MUL);
        if x.negate {
            out.push_opcode(Opcode::OP_NEGATE);
        }
        if opts.take_modulo {
            out += self.reduction_tail(opts.positive_modulo, clean_constant, is_constant_reused);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(text: &str) -> Script {
        Script::parse_string(text).unwrap()
    }

    fn fq() -> Fq {
        Fq::new(BigInt::from(19))
    }

    fn top() -> StackFiniteFieldElement {
        StackFiniteFieldElement::on_top(1)
    }

    fn second() -> StackFiniteFieldElement {
        StackFiniteFieldElement::new(1, false, 1)
    }

    #[test]
    fn add_brings_x_above_y() {
        let script = fq()
            .add(&BuildOptions::default(), second(), top(), 3)
            .unwrap();
        assert_eq!(script, s("OP_SWAP OP_ADD"));
    }

    #[test]
    fn signs_follow_negate_flags() {
        let opts = BuildOptions::default();
        // -x + y: stack ends as [y, x], OP_SUB computes y - x
        let script = fq()
            .algebraic_sum(&opts, second().set_negate(true), top(), 3)
            .unwrap();
        assert_eq!(script, s("OP_SWAP OP_SUB"));
        // x - y
        let script = fq()
            .algebraic_sum(&opts, second(), top().set_negate(true), 3)
            .unwrap();
        assert_eq!(script, s("OP_SWAP OP_SUB OP_NEGATE"));
        // -x - y
        let script = fq()
            .algebraic_sum(&opts, second().set_negate(true), top().set_negate(true), 3)
            .unwrap();
        assert_eq!(script, s("OP_SWAP OP_ADD OP_NEGATE"));
    }

    #[test]
    fn mul_with_reduction() {
        let opts = BuildOptions::default()
            .with_take_modulo(true)
            .with_clean_constant(true)
            .with_constant_reused(false);
        let script = fq().mul(&opts, second(), top(), 3).unwrap();
        assert_eq!(
            script,
            s("OP_SWAP OP_MUL OP_DEPTH OP_1SUB OP_ROLL OP_TUCK OP_MOD OP_OVER OP_ADD OP_SWAP OP_MOD")
        );
    }

    #[test]
    fn picked_operands_are_copied() {
        let script = fq()
            .mul(&BuildOptions::default(), second(), top(), 0)
            .unwrap();
        // y picked (OP_DUP), x now one deeper (OP_2 OP_PICK)
        assert_eq!(script, s("OP_DUP 2 OP_PICK OP_MUL"));
    }

    #[test]
    fn guard_is_prepended() {
        let opts = BuildOptions::default().with_check_constant(true);
        let script = fq().square(&opts, top(), true).unwrap();
        assert_eq!(
            script,
            s("OP_DEPTH OP_1SUB OP_PICK 19 OP_EQUALVERIFY OP_DUP OP_MUL")
        );
    }

    #[test]
    fn undecided_modulo_flags_rejected() {
        let opts = BuildOptions::default().with_take_modulo(true);
        assert!(matches!(
            fq().mul(&opts, second(), top(), 3),
            Err(ScriptError::InvalidFlagCombination(_))
        ));
    }

    #[test]
    fn misordered_operands_rejected() {
        assert!(matches!(
            fq().add(&BuildOptions::default(), top(), second(), 3),
            Err(ScriptError::MisorderedOperands(_))
        ));
    }

    #[test]
    fn degree_mismatch_rejected() {
        let wide = StackFiniteFieldElement::new(3, false, 2);
        assert!(matches!(
            fq().add(&BuildOptions::default(), wide, top(), 3),
            Err(ScriptError::ExtensionDegreeMismatch { expected: 1, got: 2 })
        ));
    }
}
