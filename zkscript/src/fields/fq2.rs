use num_bigint::BigInt;
use num_traits::Zero;
use txscript::{Opcode, Script};

use crate::fields::{bring_pair_to_top, bring_to_top, constant_guard, PrimeFieldExtension};
use crate::stack::{check_order, StackFiniteFieldElement};
use crate::util::{bitmask_to_boolean_list, Slots};
use crate::{BuildOptions, ScriptError};

/// The action used when this `F_q^2` is the base of a higher tower level:
/// multiplication by the tower's non-residue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TowerNonResidue {
    /// The tower extends by `s` with `s^2 = u` (MNT4-style quartic tower).
    U,
    /// The tower extends by `v` with `v^3 = 1 + u` (BLS12-style sextic
    /// tower).
    OnePlusU,
}

/// Script builder for `F_q^2 = F_q[u] / (u^2 - non_residue)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fq2 {
    modulus: BigInt,
    non_residue: BigInt,
    tower_non_residue: TowerNonResidue,
}

impl PrimeFieldExtension for Fq2 {
    fn modulus(&self) -> &BigInt {
        &self.modulus
    }

    fn extension_degree(&self) -> usize {
        2
    }
}

impl Fq2 {
    pub fn new(modulus: BigInt, non_residue: BigInt, tower_non_residue: TowerNonResidue) -> Self {
        Fq2 {
            modulus,
            non_residue,
            tower_non_residue,
        }
    }

    pub fn non_residue(&self) -> &BigInt {
        &self.non_residue
    }

    fn validate_unary(&self, x: &StackFiniteFieldElement) -> Result<(), ScriptError> {
        if x.extension_degree != 2 {
            return Err(ScriptError::ExtensionDegreeMismatch {
                expected: 2,
                got: x.extension_degree,
            });
        }
        Ok(())
    }

    fn validate_binary(
        &self,
        x: &StackFiniteFieldElement,
        y: &StackFiniteFieldElement,
    ) -> Result<(), ScriptError> {
        self.validate_unary(x)?;
        self.validate_unary(y)?;
        check_order(&[x, y])
    }

    /// Multiply the top stack item by the non-residue, `OP_NEGATE` when it
    /// is `-1`.
    fn mul_top_by_non_residue(&self) -> Script {
        let mut out = Script::new();
        if self.non_residue == BigInt::from(-1) {
            out.push_opcode(Opcode::OP_NEGATE);
        } else {
            out.push_int(&self.non_residue);
            out.push_opcode(Opcode::OP_MUL);
        }
        out
    }

    fn tail(
        &self,
        opts: &BuildOptions,
        clean_constant: bool,
        is_constant_reused: bool,
    ) -> Script {
        if opts.take_modulo {
            self.take_modulo(opts.positive_modulo, clean_constant, is_constant_reused)
        } else {
            self.from_altstack()
        }
    }

    /// `x * y`.
    ///
    /// `(x0 + x1 u)(y0 + y1 u) = (x0 y0 + r x1 y1) + (x0 y1 + x1 y0) u`.
    pub fn mul(
        &self,
        opts: &BuildOptions,
        x: StackFiniteFieldElement,
        y: StackFiniteFieldElement,
        rolling_options: u32,
    ) -> Result<Script, ScriptError> {
        self.validate_binary(&x, &y)?;
        let (clean_constant, is_constant_reused) = opts.modulo_flags()?;
        let rolled = bitmask_to_boolean_list(rolling_options, 2);
        let flip_sign = x.negate != y.negate;

        let mut out = constant_guard(opts, &self.modulus);
        out += bring_pair_to_top(x, y, rolled[0], rolled[1]);

        // stack: [x0, x1, y0, y1]
        // second component: x0*y1 + x1*y0 -> altstack
        out += Script::parse_string("OP_2DUP 5 OP_PICK OP_MUL OP_SWAP 4 OP_PICK OP_MUL OP_ADD")
            .expect("static");
        if flip_sign {
            out.push_opcode(Opcode::OP_NEGATE);
        }
        out.push_opcode(Opcode::OP_TOALTSTACK);
        // first component: x0*y0 + r*x1*y1
        out += Script::parse_string("OP_ROT OP_MUL").expect("static");
        out += self.mul_top_by_non_residue();
        out += Script::parse_string("OP_ROT OP_ROT OP_MUL OP_ADD").expect("static");
        if flip_sign {
            out.push_opcode(Opcode::OP_NEGATE);
        }

        Ok(out + self.tail(opts, clean_constant, is_constant_reused))
    }

    /// `x^2`, Karatsuba-style when the non-residue is `-1`.
    pub fn square(
        &self,
        opts: &BuildOptions,
        x: StackFiniteFieldElement,
        rolled: bool,
    ) -> Result<Script, ScriptError> {
        self.validate_unary(&x)?;
        let (clean_constant, is_constant_reused) = opts.modulo_flags()?;

        let mut out = constant_guard(opts, &self.modulus);
        out += bring_to_top(x, rolled);

        // second component: 2*x0*x1 -> altstack
        out += Script::parse_string("OP_2DUP OP_MUL OP_2 OP_MUL OP_TOALTSTACK").expect("static");
        if self.non_residue == BigInt::from(-1) {
            // first component: (x0 + x1)(x0 - x1)
            out += Script::parse_string("OP_2DUP OP_ADD OP_ROT OP_ROT OP_SUB OP_MUL")
                .expect("static");
        } else {
            // first component: x0^2 + r*x1^2
            out += Script::parse_string("OP_DUP OP_MUL").expect("static");
            out += self.mul_top_by_non_residue();
            out += Script::parse_string("OP_SWAP OP_DUP OP_MUL OP_ADD").expect("static");
        }

        Ok(out + self.tail(opts, clean_constant, is_constant_reused))
    }

    /// `x + y + z`, all three operands brought to the top.
    pub fn add_three(
        &self,
        opts: &BuildOptions,
        x: StackFiniteFieldElement,
        y: StackFiniteFieldElement,
        z: StackFiniteFieldElement,
        rolling_options: u32,
    ) -> Result<Script, ScriptError> {
        self.validate_unary(&x)?;
        self.validate_unary(&y)?;
        self.validate_unary(&z)?;
        check_order(&[&x, &y, &z])?;
        let (clean_constant, is_constant_reused) = opts.modulo_flags()?;
        let rolled = bitmask_to_boolean_list(rolling_options, 3);

        let mut out = constant_guard(opts, &self.modulus);
        // normalise to [x, y, z] on top
        let default_layout = x.position == 5 && y.position == 3 && z.position == 1;
        if !(default_layout && rolled.iter().all(|&b| b)) {
            out += bring_pair_to_top(x, y, rolled[0], rolled[1]);
            out += bring_to_top(z.shift(4), rolled[2]);
        }

        // stack: [x0, x1, y0, y1, z0, z1]
        out += Script::parse_string(
            "OP_ROT OP_ADD 3 OP_ROLL OP_ADD OP_TOALTSTACK OP_ADD OP_ADD",
        )
        .expect("static");

        Ok(out + self.tail(opts, clean_constant, is_constant_reused))
    }

    /// `x * u`: `(x0 + x1 u) u = r x1 + x0 u`.
    pub fn mul_by_u(
        &self,
        opts: &BuildOptions,
        x: StackFiniteFieldElement,
        rolled: bool,
    ) -> Result<Script, ScriptError> {
        self.validate_unary(&x)?;
        let (clean_constant, is_constant_reused) = opts.modulo_flags()?;

        let mut out = constant_guard(opts, &self.modulus);
        out += bring_to_top(x, rolled);
        // [x0, x1] -> [r*x1, x0]
        out += self.mul_top_by_non_residue();
        if x.negate {
            out += Script::parse_string("OP_NEGATE OP_SWAP OP_NEGATE").expect("static");
        } else {
            out.push_opcode(Opcode::OP_SWAP);
        }
        out.push_opcode(Opcode::OP_TOALTSTACK);

        Ok(out + self.tail(opts, clean_constant, is_constant_reused))
    }

    /// `x * (1 + u)`: `(x0 + r x1) + (x0 + x1) u`.
    pub fn mul_by_one_plus_u(
        &self,
        opts: &BuildOptions,
        x: StackFiniteFieldElement,
        rolled: bool,
    ) -> Result<Script, ScriptError> {
        self.validate_unary(&x)?;
        let (clean_constant, is_constant_reused) = opts.modulo_flags()?;

        let mut out = constant_guard(opts, &self.modulus);
        out += bring_to_top(x, rolled);
        // [x0, x1]: second component x0 + x1 -> altstack
        out += Script::parse_string("OP_2DUP OP_ADD").expect("static");
        if x.negate {
            out.push_opcode(Opcode::OP_NEGATE);
        }
        out.push_opcode(Opcode::OP_TOALTSTACK);
        // first component: x0 + r*x1
        if self.non_residue == BigInt::from(-1) {
            out.push_opcode(Opcode::OP_SUB);
        } else {
            out += self.mul_top_by_non_residue();
            out.push_opcode(Opcode::OP_ADD);
        }
        if x.negate {
            out.push_opcode(Opcode::OP_NEGATE);
        }

        Ok(out + self.tail(opts, clean_constant, is_constant_reused))
    }

    /// Multiplication by the non-residue of the tower level above.
    pub fn mul_by_non_residue(
        &self,
        opts: &BuildOptions,
        x: StackFiniteFieldElement,
        rolled: bool,
    ) -> Result<Script, ScriptError> {
        match self.tower_non_residue {
            TowerNonResidue::U => self.mul_by_u(opts, x, rolled),
            TowerNonResidue::OnePlusU => self.mul_by_one_plus_u(opts, x, rolled),
        }
    }

    /// `conj(x) = x0 - x1 u`.
    pub fn conjugate(
        &self,
        opts: &BuildOptions,
        x: StackFiniteFieldElement,
        rolled: bool,
    ) -> Result<Script, ScriptError> {
        self.validate_unary(&x)?;
        let (clean_constant, is_constant_reused) = opts.modulo_flags()?;

        let mut out = constant_guard(opts, &self.modulus);
        out += bring_to_top(x, rolled);
        if x.negate {
            // -(x0 - x1 u) = -x0 + x1 u
            out += Script::parse_string("OP_TOALTSTACK OP_NEGATE").expect("static");
        } else {
            out += Script::parse_string("OP_NEGATE OP_TOALTSTACK").expect("static");
        }

        Ok(out + self.tail(opts, clean_constant, is_constant_reused))
    }

    /// Frobenius `phi^n`: conjugation for odd `n`, the identity for even
    /// `n`.
    pub fn frobenius(
        &self,
        opts: &BuildOptions,
        n: usize,
        x: StackFiniteFieldElement,
        rolled: bool,
    ) -> Result<Script, ScriptError> {
        if n % 2 == 1 {
            return self.conjugate(opts, x, rolled);
        }
        self.validate_unary(&x)?;
        let (clean_constant, is_constant_reused) = opts.modulo_flags()?;
        let mut out = constant_guard(opts, &self.modulus);
        out += bring_to_top(x, rolled);
        if x.negate {
            out += Script::parse_string("OP_NEGATE OP_TOALTSTACK OP_NEGATE").expect("static");
        } else {
            out.push_opcode(Opcode::OP_TOALTSTACK);
        }
        Ok(out + self.tail(opts, clean_constant, is_constant_reused))
    }

    /// `x * c` for a constant `c = c0 + c1 u` pushed as literals.
    pub fn mul_by_constant(
        &self,
        opts: &BuildOptions,
        x: StackFiniteFieldElement,
        constant: &[BigInt; 2],
        rolled: bool,
    ) -> Result<Script, ScriptError> {
        self.validate_unary(&x)?;
        let (clean_constant, is_constant_reused) = opts.modulo_flags()?;

        let mut out = constant_guard(opts, &self.modulus);
        out += bring_to_top(x, rolled);

        if constant[1].is_zero() {
            // scalar constant: (x0 c0, x1 c0)
            out.push_int(&constant[0]);
            out += Script::parse_string("OP_TUCK OP_MUL").expect("static");
            if x.negate {
                out.push_opcode(Opcode::OP_NEGATE);
            }
            out += Script::parse_string("OP_TOALTSTACK OP_MUL").expect("static");
            if x.negate {
                out.push_opcode(Opcode::OP_NEGATE);
            }
        } else {
            // second component: x0 c1 + x1 c0 -> altstack
            out.push_opcode(Opcode::OP_2DUP);
            out.push_int(&constant[0]);
            out += Script::parse_string("OP_MUL OP_SWAP").expect("static");
            out.push_int(&constant[1]);
            out += Script::parse_string("OP_MUL OP_ADD").expect("static");
            if x.negate {
                out.push_opcode(Opcode::OP_NEGATE);
            }
            out.push_opcode(Opcode::OP_TOALTSTACK);
            // first component: x0 c0 + r x1 c1
            out.push_int(&constant[1]);
            out.push_opcode(Opcode::OP_MUL);
            out += self.mul_top_by_non_residue();
            out += Script::parse_string("OP_SWAP").expect("static");
            out.push_int(&constant[0]);
            out += Script::parse_string("OP_MUL OP_ADD").expect("static");
            if x.negate {
                out.push_opcode(Opcode::OP_NEGATE);
            }
        }

        Ok(out + self.tail(opts, clean_constant, is_constant_reused))
    }
}

/// Slot-level helpers for emissions juggling several `F_q^2`
/// intermediates: each wraps one field operation and keeps the
/// [`Slots`] bookkeeping in step with the emitted stack traffic.
impl Fq2 {
    fn el_at(slots: &Slots, i: usize, negate: bool) -> StackFiniteFieldElement {
        StackFiniteFieldElement::new(slots.get(i), negate, 2)
    }

    /// `t_i * t_j` pushed on top (operand order by depth).
    pub(crate) fn mul_slots(
        &self,
        out: &mut Script,
        slots: &mut Slots,
        i: usize,
        j: usize,
        rolled_i: bool,
        rolled_j: bool,
    ) -> Result<usize, ScriptError> {
        let (deep, shallow, roll_deep, roll_shallow) = if slots.get(i) > slots.get(j) {
            (i, j, rolled_i, rolled_j)
        } else {
            (j, i, rolled_j, rolled_i)
        };
        let x = Self::el_at(slots, deep, false);
        let y = Self::el_at(slots, shallow, false);
        let mask = u32::from(roll_deep) | (u32::from(roll_shallow) << 1);
        *out += self.mul(&BuildOptions::default(), x, y, mask)?;
        if roll_shallow {
            slots.consume(shallow);
        }
        if roll_deep {
            slots.consume(deep);
        }
        Ok(slots.alloc_on_top_wide(2))
    }

    /// `±t_i ± t_j` pushed on top.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn sum_slots(
        &self,
        out: &mut Script,
        slots: &mut Slots,
        i: usize,
        j: usize,
        negate_i: bool,
        negate_j: bool,
        rolled_i: bool,
        rolled_j: bool,
    ) -> Result<usize, ScriptError> {
        let (deep, shallow, n_deep, n_shallow, roll_deep, roll_shallow) =
            if slots.get(i) > slots.get(j) {
                (i, j, negate_i, negate_j, rolled_i, rolled_j)
            } else {
                (j, i, negate_j, negate_i, rolled_j, rolled_i)
            };
        let x = Self::el_at(slots, deep, n_deep);
        let y = Self::el_at(slots, shallow, n_shallow);
        let mask = u32::from(roll_deep) | (u32::from(roll_shallow) << 1);
        *out += self.algebraic_sum(&BuildOptions::default(), x, y, mask)?;
        if roll_shallow {
            slots.consume(shallow);
        }
        if roll_deep {
            slots.consume(deep);
        }
        Ok(slots.alloc_on_top_wide(2))
    }

    /// `t_i^2` pushed on top.
    pub(crate) fn square_slot(
        &self,
        out: &mut Script,
        slots: &mut Slots,
        i: usize,
        rolled: bool,
    ) -> Result<usize, ScriptError> {
        let x = Self::el_at(slots, i, false);
        *out += self.square(&BuildOptions::default(), x, rolled)?;
        if rolled {
            slots.consume(i);
        }
        Ok(slots.alloc_on_top_wide(2))
    }

    /// `c * t_i` pushed on top.
    pub(crate) fn mul_by_constant_slot(
        &self,
        out: &mut Script,
        slots: &mut Slots,
        i: usize,
        constant: &[BigInt; 2],
        negate: bool,
        rolled: bool,
    ) -> Result<usize, ScriptError> {
        let x = Self::el_at(slots, i, negate);
        *out += self.mul_by_constant(&BuildOptions::default(), x, constant, rolled)?;
        if rolled {
            slots.consume(i);
        }
        Ok(slots.alloc_on_top_wide(2))
    }

    /// `±scalar * t_pair` pushed on top; the scalar is always copied, the
    /// pair copied or consumed per `rolled_pair`.
    pub(crate) fn scalar_mul_slot(
        &self,
        out: &mut Script,
        slots: &mut Slots,
        pair: usize,
        scalar: usize,
        negate_scalar: bool,
        rolled_pair: bool,
    ) -> Result<usize, ScriptError> {
        debug_assert_eq!(slots.width(scalar), 1);
        if slots.get(pair) > slots.get(scalar) && !rolled_pair {
            let x = Self::el_at(slots, pair, false);
            let s = StackFiniteFieldElement::new(slots.get(scalar), negate_scalar, 1);
            *out += self.base_field_scalar_mul(&BuildOptions::default(), x, s, 0)?;
            return Ok(slots.alloc_on_top_wide(2));
        }
        // bring the pair on top, then a scalar copy, and use the
        // default-layout emission
        if rolled_pair {
            *out += crate::util::roll(slots.get(pair), 2);
            slots.consume(pair);
        } else {
            *out += crate::util::pick(slots.get(pair), 2);
        }
        let moved = slots.alloc_on_top_wide(2);
        *out += crate::util::pick(slots.get(scalar), 1);
        *out += self.base_field_scalar_mul(
            &BuildOptions::default(),
            StackFiniteFieldElement::new(2, false, 2),
            StackFiniteFieldElement::new(0, negate_scalar, 1),
            3,
        )?;
        slots.consume(moved);
        Ok(slots.alloc_on_top_wide(2))
    }

    /// Norm `t_i * conj(t_i)` (an `F_q` scalar) pushed on top; the source
    /// is copied.
    pub(crate) fn norm_slot(
        &self,
        out: &mut Script,
        slots: &mut Slots,
        i: usize,
    ) -> Result<usize, ScriptError> {
        *out += crate::util::pick(slots.get(i), 2);
        out.push_opcode(Opcode::OP_DUP);
        out.push_opcode(Opcode::OP_MUL);
        *out += self.mul_top_by_non_residue();
        *out += Script::parse_string("OP_SWAP OP_DUP OP_MUL OP_SWAP OP_SUB").expect("static");
        slots.lift(1);
        Ok(slots.register_wide(0, 1))
    }

    /// Roll `t_i` to the top and conjugate it in place.
    pub(crate) fn conjugate_roll_slot(
        &self,
        out: &mut Script,
        slots: &mut Slots,
        i: usize,
    ) -> Result<usize, ScriptError> {
        let x = Self::el_at(slots, i, false);
        *out += self.conjugate(&BuildOptions::default(), x, true)?;
        slots.consume(i);
        Ok(slots.alloc_on_top_wide(2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::StackFiniteFieldElement as El;

    fn s(text: &str) -> Script {
        Script::parse_string(text).unwrap()
    }

    fn fq2() -> Fq2 {
        Fq2::new(BigInt::from(19), BigInt::from(-1), TowerNonResidue::OnePlusU)
    }

    fn fq2_nr13() -> Fq2 {
        Fq2::new(BigInt::from(19), BigInt::from(13), TowerNonResidue::U)
    }

    #[test]
    fn mul_default_layout_has_no_normalisation() {
        let x = El::new(3, false, 2);
        let y = El::new(1, false, 2);
        let script = fq2().mul(&BuildOptions::default(), x, y, 3).unwrap();
        assert_eq!(
            script,
            s("OP_2DUP 5 OP_PICK OP_MUL OP_SWAP 4 OP_PICK OP_MUL OP_ADD OP_TOALTSTACK \
               OP_ROT OP_MUL OP_NEGATE OP_ROT OP_ROT OP_MUL OP_ADD OP_FROMALTSTACK")
        );
    }

    #[test]
    fn mul_general_non_residue_pushes_literal() {
        let x = El::new(3, false, 2);
        let y = El::new(1, false, 2);
        let script = fq2_nr13().mul(&BuildOptions::default(), x, y, 3).unwrap();
        assert_eq!(
            script,
            s("OP_2DUP 5 OP_PICK OP_MUL OP_SWAP 4 OP_PICK OP_MUL OP_ADD OP_TOALTSTACK \
               OP_ROT OP_MUL 13 OP_MUL OP_ROT OP_ROT OP_MUL OP_ADD OP_FROMALTSTACK")
        );
    }

    #[test]
    fn square_karatsuba_for_minus_one() {
        let x = El::new(1, false, 2);
        let script = fq2().square(&BuildOptions::default(), x, true).unwrap();
        assert_eq!(
            script,
            s("OP_2DUP OP_MUL OP_2 OP_MUL OP_TOALTSTACK \
               OP_2DUP OP_ADD OP_ROT OP_ROT OP_SUB OP_MUL OP_FROMALTSTACK")
        );
    }

    #[test]
    fn mul_by_u_and_one_plus_u() {
        let x = El::new(1, false, 2);
        let script = fq2().mul_by_u(&BuildOptions::default(), x, true).unwrap();
        assert_eq!(script, s("OP_NEGATE OP_SWAP OP_TOALTSTACK OP_FROMALTSTACK"));
        let script = fq2()
            .mul_by_one_plus_u(&BuildOptions::default(), x, true)
            .unwrap();
        assert_eq!(
            script,
            s("OP_2DUP OP_ADD OP_TOALTSTACK OP_SUB OP_FROMALTSTACK")
        );
    }

    #[test]
    fn conjugate_with_reduction() {
        let opts = BuildOptions::default()
            .with_take_modulo(true)
            .with_clean_constant(false)
            .with_constant_reused(false);
        let x = El::new(1, false, 2);
        let script = fq2().conjugate(&opts, x, true).unwrap();
        assert_eq!(
            script,
            s("OP_NEGATE OP_TOALTSTACK \
               OP_DEPTH OP_1SUB OP_PICK \
               OP_TUCK OP_MOD OP_OVER OP_ADD OP_OVER OP_MOD \
               OP_FROMALTSTACK OP_ROT OP_TUCK OP_MOD OP_OVER OP_ADD OP_SWAP OP_MOD")
        );
    }

    #[test]
    fn operands_must_not_overlap() {
        let x = El::new(2, false, 2);
        let y = El::new(1, false, 2);
        assert!(matches!(
            fq2().mul(&BuildOptions::default(), x, y, 3),
            Err(ScriptError::MisorderedOperands(_))
        ));
    }

    #[test]
    fn degree_checked() {
        let x = El::new(3, false, 3);
        let y = El::new(1, false, 2);
        assert!(fq2().mul(&BuildOptions::default(), x, y, 3).is_err());
    }
}
