use txscript::{Opcode, Script};

use crate::curves::EllipticCurveFq2Projective;
use crate::fields::{constant_guard, Fq2};
use crate::pairing::PairingOps;
use crate::stack::{
    StackEllipticCurvePoint, StackEllipticCurvePointProjective, StackFiniteFieldElement,
    StackNumber,
};
use crate::util::{is_mod_equal_to, pick, roll};
use crate::{BuildOptions, ScriptError};

/// The projective extension of a pairing record: twisted-curve arithmetic
/// without gradient witnesses and line evaluations that compute their own
/// gradients on-stack.
///
/// Projective line evaluations are kept in rational form: the sparse
/// numerator shares the affine evaluation shape, while the denominators
/// are folded into a single running `F_q` norm.
pub trait ProjectivePairingOps: PairingOps {
    fn fq2(&self) -> &Fq2;

    fn twisted_curve_projective(&self) -> &EllipticCurveFq2Projective;

    /// Tangent (`q = None`) or chord evaluation with a projective running
    /// point, leaving `[numerator, denominator-norm]` on top of the stack.
    fn line_eval_proj(
        &self,
        opts: &BuildOptions,
        t: StackEllipticCurvePointProjective,
        q: Option<StackEllipticCurvePoint>,
        p: StackEllipticCurvePoint,
    ) -> Result<Script, ScriptError>;

    /// Multiply the dense accumulator by the `F_q` scalar on top of the
    /// stack (the rational-form conversion step).
    fn scalar_mul_miller_output(&self, opts: &BuildOptions) -> Result<Script, ScriptError>;
}

/// The fully-unrolled product of three Miller loops in projective
/// coordinates: no gradient witnesses, one witnessed `F_q` inversion at
/// the very end to leave the rational accumulator as a plain element.
pub trait TripleMillerLoopProjective: ProjectivePairingOps {
    /// Stack in: `[q, .., inverse_denominator, P1, P2, P3, Q1, Q2, Q3]`.
    /// Stack out: `[q?, .., f]`.
    #[tracing::instrument(level = "debug", skip_all)]
    fn triple_miller_loop_proj(
        &self,
        opts: &BuildOptions,
        modulo_threshold: u64,
    ) -> Result<Script, ScriptError> {
        opts.modulo_flags()?;
        let clean_constant = opts.clean_constant.unwrap_or(false);
        let w = self.exp_miller_loop().to_vec();
        debug_assert!(w.len() >= 2 && *w.last().unwrap() != 0);

        let np = self.n_points_curve();
        let ntw = self.n_points_twist();
        let nl = ntw / 2;
        let nproj = 3 * nl; // scalars per projective running point
        let nev = self.n_elements_evaluation_output();
        let nexx = self.n_elements_evaluation_times_evaluation();
        let nmill = self.n_elements_miller_output();
        let none = BuildOptions::default();
        let reduce = |take: bool, positive: bool| BuildOptions {
            take_modulo: take,
            positive_modulo: positive,
            check_constant: false,
            clean_constant: Some(false),
            is_constant_reused: Some(false),
        };

        // `extra` counts scalars stacked above the T region
        let t_at = move |extra: usize, k: usize| {
            let x = (extra + (4 - k) * nproj) as i64 - 1;
            StackEllipticCurvePointProjective::new(
                StackFiniteFieldElement::new(x, false, nl),
                StackFiniteFieldElement::new(x - nl as i64, false, nl),
                StackFiniteFieldElement::new(x - 2 * nl as i64, false, nl),
            )
        };
        let q_at = move |extra: usize, k: usize, negate: bool| {
            let x = (extra + 3 * nproj + (4 - k) * ntw) as i64 - 1;
            StackEllipticCurvePoint::new(
                StackFiniteFieldElement::new(x, false, nl),
                StackFiniteFieldElement::new(x - nl as i64, negate, nl),
            )
        };
        let p_at = move |extra: usize, k: usize| {
            let x = (extra + 3 * nproj + 3 * ntw + (4 - k) * np) as i64 - 1;
            StackEllipticCurvePoint::new(
                StackFiniteFieldElement::new(x, false, 1),
                StackFiniteFieldElement::new(x - 1, false, 1),
            )
        };

        let mut out = constant_guard(opts, self.modulus());

        // T_k <- Q_k as [x, y, (1, 0)]
        for k in 0..3i64 {
            out += pick(3 * ntw as i64 - 1 + (nproj as i64 - ntw as i64) * k, ntw);
            out.push_opcode(Opcode::OP_1);
            out.push_opcode(Opcode::OP_0);
        }

        let q_bits = self.modulus().bits();
        let mut f_size = q_bits;
        let mut point_size = q_bits;
        // accumulator state: none before the first iteration, afterwards
        // [F (nmill), G (1)] on top
        let mut have_f = false;

        for i in (0..=w.len() - 2).rev() {
            let digit = w[i];
            let estimate =
                self.size_estimation_miller_loop(modulo_threshold, i, f_size, point_size, true);
            let positive = opts.positive_modulo && i == 0;
            let eval_opts = reduce(true, false);
            // F <- F^2, G <- G^2
            if have_f {
                out += Script::parse_string("OP_DUP OP_MUL OP_TOALTSTACK").expect("static");
                out += self.miller_loop_output_square(&none)?;
                out.push_opcode(Opcode::OP_FROMALTSTACK);
            }

            // park G while the numerators accumulate
            if have_f {
                out.push_opcode(Opcode::OP_TOALTSTACK);
            } else {
                // seed G = 1
                out.push_opcode(Opcode::OP_1);
                out.push_opcode(Opcode::OP_TOALTSTACK);
            }
            let f_len = if have_f { nmill } else { 0 };

            // ev1, ev2, fold, ev3 — denominators multiplied into the
            // parked G right after each evaluation
            let glue_denominator = |out: &mut Script| {
                out.push_opcode(Opcode::OP_FROMALTSTACK);
                out.push_opcode(Opcode::OP_MUL);
                out.push_opcode(Opcode::OP_TOALTSTACK);
            };

            out += self.line_eval_proj(&eval_opts, t_at(f_len, 1), None, p_at(f_len, 1))?;
            glue_denominator(&mut out);
            out += self.line_eval_proj(&eval_opts, t_at(f_len + nev, 2), None, p_at(f_len + nev, 2))?;
            glue_denominator(&mut out);
            out += self.line_eval_times_eval(&none)?;
            out += self.line_eval_proj(&eval_opts, t_at(f_len + nexx, 3), None, p_at(f_len + nexx, 3))?;
            glue_denominator(&mut out);

            if digit == 0 {
                out += self.line_eval_times_eval_times_eval(&none)?;
                if have_f {
                    out += self.miller_loop_output_times_eval_times_eval_times_eval(&reduce(
                        estimate.take_modulo_f,
                        positive,
                    ))?;
                }
            } else {
                out += self.line_eval_proj(
                    &eval_opts,
                    t_at(f_len + nexx + nev, 1),
                    Some(q_at(f_len + nexx + nev, 1, digit < 0)),
                    p_at(f_len + nexx + nev, 1),
                )?;
                glue_denominator(&mut out);
                out += self.line_eval_times_eval(&none)?;
                out += self.line_eval_proj(
                    &eval_opts,
                    t_at(f_len + 2 * nexx, 2),
                    Some(q_at(f_len + 2 * nexx, 2, digit < 0)),
                    p_at(f_len + 2 * nexx, 2),
                )?;
                glue_denominator(&mut out);
                out += self.line_eval_proj(
                    &eval_opts,
                    t_at(f_len + 2 * nexx + nev, 3),
                    Some(q_at(f_len + 2 * nexx + nev, 3, digit < 0)),
                    p_at(f_len + 2 * nexx + nev, 3),
                )?;
                glue_denominator(&mut out);
                out += self.line_eval_times_eval(&none)?;
                out += self.line_eval_times_eval_times_eval_times_eval(&none)?;
                out += self.line_eval_times_eval_times_miller_loop_output(&none)?;
                if have_f {
                    out += self.miller_loop_output_times_six_evals(&reduce(
                        estimate.take_modulo_f,
                        positive,
                    ))?;
                }
            }

            // park the numerator accumulator with G still on the altstack,
            // update the running points, then restore [F, G]
            for _ in 0..nmill {
                out.push_opcode(Opcode::OP_TOALTSTACK);
            }
            let curve = self.twisted_curve_projective();
            for _ in 0..3 {
                out += curve.point_algebraic_doubling(
                    &reduce(estimate.take_modulo_point, positive),
                    t_at(0, 1),
                    true,
                )?;
            }
            if digit != 0 {
                for k in 1..=3 {
                    out += curve.point_algebraic_mixed_addition(
                        &reduce(estimate.take_modulo_point, positive),
                        t_at(0, 1),
                        q_at(0, k, digit < 0).x,
                        q_at(0, k, digit < 0).y,
                        0b01,
                    )?;
                }
            }
            for _ in 0..nmill {
                out.push_opcode(Opcode::OP_FROMALTSTACK);
            }
            out.push_opcode(Opcode::OP_FROMALTSTACK);

            have_f = true;
            f_size = estimate.f_size;
            point_size = estimate.point_size;
        }

        // drop the points, keep [F, G]
        for _ in 0..nmill + 1 {
            out.push_opcode(Opcode::OP_TOALTSTACK);
        }
        for _ in 0..(3 * nproj + 3 * ntw + 3 * np) / 2 {
            out.push_opcode(Opcode::OP_2DROP);
        }
        for _ in 0..nmill + 1 {
            out.push_opcode(Opcode::OP_FROMALTSTACK);
        }

        // convert the rational accumulator with the witnessed inverse:
        // verify G * G_inv = 1 (mod q), then F <- F * G_inv
        out += roll(nmill as i64 + 1, 1);
        out += Script::parse_string("OP_2DUP OP_MUL").expect("static");
        out += is_mod_equal_to(
            &StackNumber::bottom(),
            &num_bigint::BigInt::from(1),
            false,
            true,
            true,
        );
        out += Script::parse_string("OP_SWAP OP_DROP").expect("static");
        out += self.scalar_mul_miller_output(&reduce(true, opts.positive_modulo))?;

        if clean_constant {
            out += roll(-1, 1);
            out.push_opcode(Opcode::OP_DROP);
        }
        tracing::debug!(items = out.len(), "emitted projective triple miller loop");
        Ok(out)
    }
}

impl<T: ProjectivePairingOps + ?Sized> TripleMillerLoopProjective for T {}
