use txscript::{Opcode, Script};

use crate::curves::reduce_in_place;
use crate::fields::{constant_guard, Fq12, Fq2, PrimeFieldExtension};
use crate::stack::StackFiniteFieldElement;
use crate::util::pick;
use crate::{BuildOptions, ScriptError};

/// Products between Miller-loop intermediates for BLS12-381.
///
/// Elements of `F_q^12` are handled as six `F_q^2` coordinates indexed by
/// their `w`-weight (`w^6 = xi`); sparse shapes list the present
/// coordinates as `(weight, scalar width)` pairs in stack order. Products
/// are emitted by folding weight pairs, twisting wrapped weights by `xi`.
#[derive(Clone, Debug)]
pub struct MillerOutputOperations {
    fq2: Fq2,
    fq12: Fq12,
}

/// A line evaluation: weights `{0, 2, 3}`, the last with a vanishing
/// `u`-component.
const EVAL: &[(usize, usize)] = &[(0, 2), (2, 2), (3, 1)];

/// A product of two line evaluations: only the `w`-weight `1` coordinate
/// vanishes. Listed in the flat `F_q^12` coordinate order.
const EVAL_TIMES_EVAL: &[(usize, usize)] = &[(0, 2), (2, 2), (4, 2), (3, 2), (5, 2)];

/// A dense element in the flat coordinate order
/// `[a00, a01, a02, a10, a11, a12]` (weights `0, 2, 4, 1, 3, 5`).
const DENSE: &[(usize, usize)] = &[(0, 2), (2, 2), (4, 2), (1, 2), (3, 2), (5, 2)];

fn width(pattern: &[(usize, usize)]) -> usize {
    pattern.iter().map(|(_, w)| w).sum()
}

impl MillerOutputOperations {
    pub fn new(fq2: Fq2, fq12: Fq12) -> Self {
        MillerOutputOperations { fq2, fq12 }
    }

    /// Weight-folding product of the two sparse elements on top of the
    /// stack (`a` below `b`), producing `out_pattern`.
    fn sparse_mul(
        &self,
        opts: &BuildOptions,
        a: &[(usize, usize)],
        b: &[(usize, usize)],
        out_pattern: &[(usize, usize)],
    ) -> Result<Script, ScriptError> {
        let (clean_constant, is_constant_reused) = opts.modulo_flags()?;
        let la = width(a);
        let lb = width(b);
        let total_out = width(out_pattern);
        let fq2 = &self.fq2;
        let none = BuildOptions::default();

        // scalar offsets of each listed coordinate
        let offsets = |pattern: &[(usize, usize)]| -> Vec<usize> {
            let mut acc = 0;
            pattern
                .iter()
                .map(|(_, w)| {
                    let at = acc;
                    acc += w;
                    at
                })
                .collect()
        };
        let offs_a = offsets(a);
        let offs_b = offsets(b);

        let mut out = constant_guard(opts, self.fq12.modulus());

        for &(k, wout) in out_pattern.iter().rev() {
            debug_assert_eq!(wout, 2, "folded coordinates are full pairs");
            let mut first = true;
            for (m, &(ka, wa)) in a.iter().enumerate() {
                for (n, &(kb, wb)) in b.iter().enumerate() {
                    if (ka + kb) % 6 != k {
                        continue;
                    }
                    let above = if first { 0 } else { 2 };
                    let pa = (la - 1 - offs_a[m] + lb + above) as i64;
                    let pb = (lb - 1 - offs_b[n] + above) as i64;
                    match (wa, wb) {
                        (2, 2) => {
                            out += fq2.mul(
                                &none,
                                StackFiniteFieldElement::new(pa, false, 2),
                                StackFiniteFieldElement::new(pb, false, 2),
                                0,
                            )?;
                        }
                        (2, 1) | (1, 2) => {
                            // copy the pair, then the scalar, and use the
                            // default-layout scalar multiplication
                            let (p_pair, p_scalar) = if wa == 2 { (pa, pb) } else { (pb, pa) };
                            out += pick(p_pair, 2);
                            out += pick(p_scalar + 2, 1);
                            out += fq2.base_field_scalar_mul(
                                &none,
                                StackFiniteFieldElement::new(2, false, 2),
                                StackFiniteFieldElement::new(0, false, 1),
                                3,
                            )?;
                        }
                        _ => {
                            out += pick(pa, 1);
                            out += pick(pb + 1, 1);
                            out.push_opcode(Opcode::OP_MUL);
                            out.push_opcode(Opcode::OP_0);
                        }
                    }
                    if ka + kb >= 6 {
                        out += fq2.mul_by_one_plus_u(
                            &none,
                            StackFiniteFieldElement::new(1, false, 2),
                            true,
                        )?;
                    }
                    if first {
                        first = false;
                    } else {
                        out += fq2.add(
                            &none,
                            StackFiniteFieldElement::new(3, false, 2),
                            StackFiniteFieldElement::new(1, false, 2),
                            3,
                        )?;
                    }
                }
            }
            if first {
                out += Script::parse_string("OP_0 OP_0").expect("static");
            }
            out += Script::parse_string("OP_TOALTSTACK OP_TOALTSTACK").expect("static");
        }

        // drop the operands and restore the folded coordinates
        for _ in 0..(la + lb) / 2 {
            out.push_opcode(Opcode::OP_2DROP);
        }
        if (la + lb) % 2 == 1 {
            out.push_opcode(Opcode::OP_DROP);
        }
        for _ in 0..total_out {
            out.push_opcode(Opcode::OP_FROMALTSTACK);
        }

        if opts.take_modulo {
            out += reduce_in_place(
                total_out,
                opts.positive_modulo,
                clean_constant,
                is_constant_reused,
            );
        }
        Ok(out)
    }

    /// `ev * ev`: the `w`-weight `1` coordinate of the result vanishes.
    pub fn line_eval_times_eval(&self, opts: &BuildOptions) -> Result<Script, ScriptError> {
        self.sparse_mul(opts, EVAL, EVAL, EVAL_TIMES_EVAL)
    }

    /// `(ev * ev) * ev` -> dense.
    pub fn line_eval_times_eval_times_eval(
        &self,
        opts: &BuildOptions,
    ) -> Result<Script, ScriptError> {
        self.sparse_mul(opts, EVAL_TIMES_EVAL, EVAL, DENSE)
    }

    /// `(ev * ev) * (ev * ev)` -> dense.
    pub fn line_eval_times_eval_times_eval_times_eval(
        &self,
        opts: &BuildOptions,
    ) -> Result<Script, ScriptError> {
        self.sparse_mul(opts, EVAL_TIMES_EVAL, EVAL_TIMES_EVAL, DENSE)
    }

    /// `(ev * ev) * f` for a dense `f` on top.
    pub fn line_eval_times_eval_times_miller_loop_output(
        &self,
        opts: &BuildOptions,
    ) -> Result<Script, ScriptError> {
        self.sparse_mul(opts, EVAL_TIMES_EVAL, DENSE, DENSE)
    }

    /// `f * ev` for the dense accumulator below a sparse evaluation.
    pub fn miller_loop_output_times_eval(
        &self,
        opts: &BuildOptions,
    ) -> Result<Script, ScriptError> {
        self.sparse_mul(opts, DENSE, EVAL, DENSE)
    }

    /// `f * (ev * ev)`.
    pub fn miller_loop_output_times_eval_times_eval(
        &self,
        opts: &BuildOptions,
    ) -> Result<Script, ScriptError> {
        self.sparse_mul(opts, DENSE, EVAL_TIMES_EVAL, DENSE)
    }

    /// Dense squaring.
    pub fn square(&self, opts: &BuildOptions) -> Result<Script, ScriptError> {
        self.fq12
            .square(opts, StackFiniteFieldElement::on_top(12), true)
    }

    /// Dense multiplication.
    pub fn mul(&self, opts: &BuildOptions) -> Result<Script, ScriptError> {
        self.fq12.mul(
            opts,
            StackFiniteFieldElement::new(23, false, 12),
            StackFiniteFieldElement::on_top(12),
            3,
        )
    }

    /// Pad a bare evaluation `[a00, a01, yP]` to the dense layout.
    pub fn pad_eval_to_miller_output(&self) -> Script {
        Script::parse_string(
            "OP_TOALTSTACK OP_0 OP_0 OP_0 OP_0 OP_FROMALTSTACK OP_0 OP_0 OP_0",
        )
        .expect("static")
    }

    /// Pad a two-evaluation product with its vanishing `a10` coordinate.
    pub fn pad_eval_times_eval_to_miller_output(&self) -> Script {
        Script::parse_string(
            "OP_TOALTSTACK OP_TOALTSTACK OP_TOALTSTACK OP_TOALTSTACK \
             OP_0 OP_0 \
             OP_FROMALTSTACK OP_FROMALTSTACK OP_FROMALTSTACK OP_FROMALTSTACK",
        )
        .expect("static")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bls12_381::fields::{fq12_script, fq2_script};

    fn ops() -> MillerOutputOperations {
        MillerOutputOperations::new(fq2_script(), fq12_script())
    }

    #[test]
    fn eval_product_is_deterministic() {
        let a = ops().line_eval_times_eval(&BuildOptions::default()).unwrap();
        let b = ops().line_eval_times_eval(&BuildOptions::default()).unwrap();
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn dense_sparse_product_reduces_all_coordinates() {
        let opts = BuildOptions::default()
            .with_take_modulo(true)
            .with_clean_constant(false)
            .with_constant_reused(false);
        let script = ops().miller_loop_output_times_eval(&opts).unwrap();
        assert_eq!(script.count_op(Opcode::OP_MOD), 24);
    }

    #[test]
    fn pads_have_matching_lengths() {
        // 5 sparse scalars + 7 zeros = 12
        assert_eq!(ops().pad_eval_to_miller_output().count_op(Opcode::OP_0), 7);
        assert_eq!(
            ops()
                .pad_eval_times_eval_to_miller_output()
                .count_op(Opcode::OP_0),
            2
        );
    }
}
