use num_bigint::BigInt;
use txscript::{Opcode, Script};

use crate::fields::{constant_guard, Fq4, PrimeFieldExtension};
use crate::stack::StackFiniteFieldElement;
use crate::util::pick;
use crate::{BuildOptions, ScriptError};

/// Products between Miller-loop intermediates for MNT4-753.
///
/// Line evaluations are sparse `F_q^4` elements `a + b u + c s` (the `us`
/// coordinate vanishes), stored as three scalars. Products are emitted by
/// a table-driven expansion over the basis `{1, u, s, us}` with
/// `u^2 = 13`, `s^2 = u`.
#[derive(Clone, Debug)]
pub struct MillerOutputOperations {
    fq4: Fq4,
}

/// `BASIS_MUL[i][j] = (k, extra_power_of_13)` for basis indices
/// `0 = 1, 1 = u, 2 = s, 3 = us`.
const BASIS_MUL: [[(usize, bool); 4]; 4] = [
    [(0, false), (1, false), (2, false), (3, false)],
    [(1, false), (0, true), (3, false), (2, true)],
    [(2, false), (3, false), (1, false), (0, true)],
    [(3, false), (2, true), (0, true), (1, true)],
];

/// A sparse element: the basis indices of its present coordinates, in
/// stack order (deepest first).
const EVAL: &[usize] = &[0, 1, 2];
const DENSE: &[usize] = &[0, 1, 2, 3];

impl MillerOutputOperations {
    pub fn new(fq4: Fq4) -> Self {
        MillerOutputOperations { fq4 }
    }

    pub fn fq4(&self) -> &Fq4 {
        &self.fq4
    }

    /// Table-driven product of the two sparse elements on top of the
    /// stack (`a` below `b`), always yielding a dense element.
    fn sparse_mul(
        &self,
        opts: &BuildOptions,
        a: &[usize],
        b: &[usize],
    ) -> Result<Script, ScriptError> {
        let (clean_constant, is_constant_reused) = opts.modulo_flags()?;
        let la = a.len();
        let lb = b.len();
        let non_residue = BigInt::from(13);

        let mut out = constant_guard(opts, self.fq4.modulus());

        // coordinates are computed top-down (k = 3 first) and parked on the
        // altstack so the batched reduction can drain them in order
        let mut parked = 0usize;
        for k in (0..4).rev() {
            let mut first = true;
            for (m, &ia) in a.iter().enumerate() {
                for (n, &ib) in b.iter().enumerate() {
                    let (target, by_13) = BASIS_MUL[ia][ib];
                    if target != k {
                        continue;
                    }
                    // positions of the operand scalars above the current
                    // accumulation (one scalar when a term is in progress)
                    let above = if first { 0 } else { 1 };
                    let pa = (la - 1 - m + lb + above) as i64;
                    let pb = (lb - 1 - n + above) as i64;
                    out += pick(pa, 1);
                    out += pick(pb + 1, 1);
                    out.push_opcode(Opcode::OP_MUL);
                    if by_13 {
                        out.push_int(&non_residue);
                        out.push_opcode(Opcode::OP_MUL);
                    }
                    if first {
                        first = false;
                    } else {
                        out.push_opcode(Opcode::OP_ADD);
                    }
                }
            }
            if first {
                // no term feeds this coordinate
                out.push_opcode(Opcode::OP_0);
            }
            if k != 0 {
                out.push_opcode(Opcode::OP_TOALTSTACK);
                parked += 1;
            }
        }
        debug_assert_eq!(parked, 3);

        // drop the operands, which sit below the surviving coordinate
        out.push_opcode(Opcode::OP_TOALTSTACK);
        for _ in 0..(la + lb) / 2 {
            out.push_opcode(Opcode::OP_2DROP);
        }
        if (la + lb) % 2 == 1 {
            out.push_opcode(Opcode::OP_DROP);
        }
        out.push_opcode(Opcode::OP_FROMALTSTACK);

        if opts.take_modulo {
            out += self
                .fq4
                .take_modulo(opts.positive_modulo, clean_constant, is_constant_reused);
        } else {
            out += self.fq4.from_altstack();
        }
        Ok(out)
    }

    /// `ev * ev` of two line evaluations; the result is dense.
    pub fn line_eval_times_eval(&self, opts: &BuildOptions) -> Result<Script, ScriptError> {
        self.sparse_mul(opts, EVAL, EVAL)
    }

    /// `(ev * ev) * ev`.
    pub fn line_eval_times_eval_times_eval(
        &self,
        opts: &BuildOptions,
    ) -> Result<Script, ScriptError> {
        self.sparse_mul(opts, DENSE, EVAL)
    }

    /// `(ev * ev) * (ev * ev)`: both operands already dense.
    pub fn line_eval_times_eval_times_eval_times_eval(
        &self,
        opts: &BuildOptions,
    ) -> Result<Script, ScriptError> {
        self.mul(opts)
    }

    /// `(ev * ev) * f` for a dense accumulator.
    pub fn line_eval_times_eval_times_miller_loop_output(
        &self,
        opts: &BuildOptions,
    ) -> Result<Script, ScriptError> {
        self.mul(opts)
    }

    /// `f * ev` for the accumulator below a sparse evaluation.
    pub fn miller_loop_output_times_eval(
        &self,
        opts: &BuildOptions,
    ) -> Result<Script, ScriptError> {
        self.sparse_mul(opts, DENSE, EVAL)
    }

    /// `f * (ev * ev)`: the product of evaluations is already dense.
    pub fn miller_loop_output_times_eval_times_eval(
        &self,
        opts: &BuildOptions,
    ) -> Result<Script, ScriptError> {
        self.mul(opts)
    }

    /// Dense squaring, the dedicated quartic expansion.
    pub fn square(&self, opts: &BuildOptions) -> Result<Script, ScriptError> {
        self.fq4
            .square(opts, StackFiniteFieldElement::on_top(4), true)
    }

    /// Dense multiplication.
    pub fn mul(&self, opts: &BuildOptions) -> Result<Script, ScriptError> {
        self.fq4.mul(
            opts,
            StackFiniteFieldElement::new(7, false, 4),
            StackFiniteFieldElement::on_top(4),
            3,
        )
    }

    /// Pad a bare evaluation with its vanishing `us` coordinate.
    pub fn pad_eval_to_miller_output(&self) -> Script {
        Script::from_opcode(Opcode::OP_0)
    }

    /// A product of two evaluations is already dense.
    pub fn pad_eval_times_eval_to_miller_output(&self) -> Script {
        Script::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mnt4_753::fields::fq4_script;

    fn ops() -> MillerOutputOperations {
        MillerOutputOperations::new(fq4_script())
    }

    #[test]
    fn eval_product_is_deterministic_and_nonempty() {
        let a = ops().line_eval_times_eval(&BuildOptions::default()).unwrap();
        let b = ops().line_eval_times_eval(&BuildOptions::default()).unwrap();
        assert_eq!(a, b);
        assert!(a.count_op(Opcode::OP_MUL) >= 9);
    }

    #[test]
    fn sparse_dense_product_reduces_four_coordinates() {
        let opts = BuildOptions::default()
            .with_take_modulo(true)
            .with_clean_constant(false)
            .with_constant_reused(false);
        let script = ops().miller_loop_output_times_eval(&opts).unwrap();
        assert_eq!(script.count_op(Opcode::OP_MOD), 8);
    }

    #[test]
    fn pads() {
        assert_eq!(ops().pad_eval_to_miller_output().len(), 1);
        assert!(ops().pad_eval_times_eval_to_miller_output().is_empty());
    }
}
