use num_bigint::BigInt;
use txscript::{Opcode, Script};

use crate::fields::{bring_pair_to_top, bring_to_top, constant_guard, Fq6, PrimeFieldExtension};
use crate::stack::{check_order, StackFiniteFieldElement};
use crate::util::bitmask_to_boolean_list;
use crate::{BuildOptions, ScriptError};

/// Script builder for `F_q^12 = F_q^6[w] / (w^2 - v)`, the target field of
/// the BLS12-381 pairing.
///
/// An element `(a0, a1)` over `F_q^6` occupies twelve scalars. In the flat
/// layout the `F_q^2` coordinate at pair index `(i, j)` (coefficient of
/// `v^j w^i`) carries the `w`-weight `k = 2j + i`; the Frobenius tables are
/// indexed by that weight: `gammas[n-1][k-1] = xi^(k (q^n - 1) / 6)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fq12 {
    modulus: BigInt,
    fq6: Fq6,
    gammas_frobenius: Vec<Vec<[BigInt; 2]>>,
}

impl PrimeFieldExtension for Fq12 {
    fn modulus(&self) -> &BigInt {
        &self.modulus
    }

    fn extension_degree(&self) -> usize {
        12
    }
}

impl Fq12 {
    pub fn new(modulus: BigInt, fq6: Fq6, gammas_frobenius: Vec<Vec<[BigInt; 2]>>) -> Self {
        Fq12 {
            modulus,
            fq6,
            gammas_frobenius,
        }
    }

    pub fn fq6(&self) -> &Fq6 {
        &self.fq6
    }

    fn validate(&self, x: &StackFiniteFieldElement) -> Result<(), ScriptError> {
        if x.extension_degree != 12 {
            return Err(ScriptError::ExtensionDegreeMismatch {
                expected: 12,
                got: x.extension_degree,
            });
        }
        Ok(())
    }

    /// Tail once the result sits whole on top with the other half element
    /// already parked on the altstack.
    fn half_split_tail(
        &self,
        opts: &BuildOptions,
        clean_constant: bool,
        is_constant_reused: bool,
    ) -> Script {
        let mut out = Script::new();
        if opts.take_modulo {
            for _ in 0..5 {
                out.push_opcode(Opcode::OP_TOALTSTACK);
            }
            out += self.take_modulo(opts.positive_modulo, clean_constant, is_constant_reused);
        } else {
            for _ in 0..6 {
                out.push_opcode(Opcode::OP_FROMALTSTACK);
            }
        }
        out
    }

    /// `x * y`: `c0 = A0 B0 + v A1 B1`, `c1 = A0 B1 + A1 B0`.
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
        let fq6 = &self.fq6;
        let none = BuildOptions::default();
        let el = |position: i64, negate: bool| StackFiniteFieldElement::new(position, negate, 6);

        let mut out = constant_guard(opts, &self.modulus);
        out += bring_pair_to_top(x, y, rolled[0], rolled[1]);

        // stack: [A0, A1, B0, B1] as Fq6 chunks, deepest scalar at depth 23
        let (nx, ny) = (x.negate, y.negate);

        // c1 = A0*B1 + A1*B0 -> altstack
        out += fq6.mul(&none, el(23, nx), el(5, ny), 0)?;
        out += fq6.mul(&none, el(23, nx), el(17, ny), 0)?;
        out += fq6.add(&none, el(11, false), el(5, false), 3)?;
        for _ in 0..6 {
            out.push_opcode(Opcode::OP_TOALTSTACK);
        }

        // c0 = A0*B0 + v*(A1*B1), consuming the operands
        out += fq6.mul(&none, el(17, nx), el(5, ny), 3)?;
        out += fq6.mul_by_v(&none, el(5, false), true)?;
        out += fq6.mul(&none, el(17, nx), el(11, ny), 3)?;
        out += fq6.add(&none, el(11, false), el(5, false), 3)?;

        Ok(out + self.half_split_tail(opts, clean_constant, is_constant_reused))
    }

    /// `x^2`: `c0 = A0^2 + v A1^2`, `c1 = 2 A0 A1`.
    pub fn square(
        &self,
        opts: &BuildOptions,
        x: StackFiniteFieldElement,
        rolled: bool,
    ) -> Result<Script, ScriptError> {
        self.validate(&x)?;
        let (clean_constant, is_constant_reused) = opts.modulo_flags()?;
        let fq6 = &self.fq6;
        let none = BuildOptions::default();
        let el = |position: i64, negate: bool| StackFiniteFieldElement::new(position, negate, 6);

        let mut out = constant_guard(opts, &self.modulus);
        out += bring_to_top(x, rolled);

        // stack: [A0, A1], deepest scalar at depth 11
        // c1 = 2*A0*A1 -> altstack
        out += fq6.mul(&none, el(11, false), el(5, false), 0)?;
        for _ in 0..5 {
            out += Script::parse_string("OP_2 OP_MUL OP_TOALTSTACK").expect("static");
        }
        out += Script::parse_string("OP_2 OP_MUL").expect("static");
        for _ in 0..5 {
            out.push_opcode(Opcode::OP_FROMALTSTACK);
        }
        for _ in 0..6 {
            out.push_opcode(Opcode::OP_TOALTSTACK);
        }

        // c0 = A0^2 + v*A1^2
        out += fq6.square(&none, el(5, false), true)?;
        out += fq6.mul_by_v(&none, el(5, false), true)?;
        out += fq6.square(&none, el(11, false), true)?;
        out += fq6.add(&none, el(11, false), el(5, false), 3)?;

        Ok(out + self.half_split_tail(opts, clean_constant, is_constant_reused))
    }

    /// Conjugation `(a0, a1) -> (a0, -a1)`: the cyclotomic inverse on the
    /// unit subgroup.
    pub fn conjugate(
        &self,
        opts: &BuildOptions,
        x: StackFiniteFieldElement,
        rolled: bool,
    ) -> Result<Script, ScriptError> {
        self.validate(&x)?;
        let (clean_constant, is_constant_reused) = opts.modulo_flags()?;
        let fq6 = &self.fq6;
        let none = BuildOptions::default();

        let mut out = constant_guard(opts, &self.modulus);
        out += bring_to_top(x, rolled);
        out += fq6.negate(&none, StackFiniteFieldElement::new(5, false, 6), true)?;
        Ok(out + self.tail_in_place(opts, clean_constant, is_constant_reused))
    }

    /// Frobenius `phi^n`.
    ///
    /// Every `F_q^2` coordinate is conjugated when `n` is odd and twisted
    /// by the gamma constant matching its `w`-weight.
    pub fn frobenius(
        &self,
        opts: &BuildOptions,
        n: usize,
        x: StackFiniteFieldElement,
        rolled: bool,
    ) -> Result<Script, ScriptError> {
        self.validate(&x)?;
        let (clean_constant, is_constant_reused) = opts.modulo_flags()?;
        let fq2 = self.fq6.base_field();
        let none = BuildOptions::default();
        let n_mod = n % 12;
        if n_mod == 0 {
            let mut out = constant_guard(opts, &self.modulus);
            out += bring_to_top(x, rolled);
            return Ok(out + self.tail_in_place(opts, clean_constant, is_constant_reused));
        }
        let gammas = &self.gammas_frobenius[n_mod - 1];
        let odd = n_mod % 2 == 1;

        let mut out = constant_guard(opts, &self.modulus);
        out += bring_to_top(x, rolled);

        // w-weights of the flat coordinates, processed from the top of the
        // stack (a12, a11, a10, a02, a01, a00)
        for &weight in &[5usize, 3, 1, 4, 2, 0] {
            let coord = StackFiniteFieldElement::new(1, false, 2);
            if odd {
                out += fq2.conjugate(&none, coord, true)?;
            }
            if weight > 0 {
                out += fq2.mul_by_constant(&none, coord, &gammas[weight - 1], true)?;
            }
            out.push_opcode(Opcode::OP_TOALTSTACK);
            out.push_opcode(Opcode::OP_TOALTSTACK);
        }
        for _ in 0..12 {
            out.push_opcode(Opcode::OP_FROMALTSTACK);
        }

        Ok(out + self.tail_in_place(opts, clean_constant, is_constant_reused))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{Fq2, TowerNonResidue};

    fn fq12() -> Fq12 {
        let q = BigInt::from(19);
        let fq2 = Fq2::new(q.clone(), BigInt::from(-1), TowerNonResidue::OnePlusU);
        let fq6 = Fq6::new(q.clone(), fq2);
        let gammas = (1..=3)
            .map(|n| {
                (1..=5)
                    .map(|k| [BigInt::from(n * 10 + k), BigInt::from(0)])
                    .collect::<Vec<_>>()
            })
            .collect();
        Fq12::new(q, fq6, gammas)
    }

    fn top() -> StackFiniteFieldElement {
        StackFiniteFieldElement::on_top(12)
    }

    fn second() -> StackFiniteFieldElement {
        StackFiniteFieldElement::new(23, false, 12)
    }

    #[test]
    fn mul_square_deterministic() {
        let f = fq12();
        let opts = BuildOptions::default();
        assert_eq!(
            f.mul(&opts, second(), top(), 3).unwrap(),
            f.mul(&opts, second(), top(), 3).unwrap()
        );
        assert_eq!(
            f.square(&opts, top(), true).unwrap(),
            f.square(&opts, top(), true).unwrap()
        );
    }

    #[test]
    fn reduced_square_touches_all_coordinates() {
        let opts = BuildOptions::default()
            .with_take_modulo(true)
            .with_clean_constant(false)
            .with_constant_reused(false);
        let script = fq12().square(&opts, top(), true).unwrap();
        assert_eq!(script.count_op(Opcode::OP_MOD), 24);
    }

    #[test]
    fn frobenius_identity_power() {
        let script = fq12()
            .frobenius(&BuildOptions::default(), 12, top(), true)
            .unwrap();
        assert_eq!(script, Script::new());
    }

    #[test]
    fn frobenius_odd_conjugates() {
        let script = fq12()
            .frobenius(&BuildOptions::default(), 1, top(), true)
            .unwrap();
        // each of the 12 scalars passes through the altstack once, plus the
        // pairwise round-trips inside the constant multiplications
        assert!(script.count_op(Opcode::OP_FROMALTSTACK) >= 12);
        assert!(script.count_op(Opcode::OP_NEGATE) >= 6);
    }
}
