use txscript::{Opcode, Script};

use crate::fields::constant_guard;
use crate::pairing::PairingOps;
use crate::stack::{StackEllipticCurvePoint, StackFiniteFieldElement};
use crate::util::{pick, roll};
use crate::{BuildOptions, ScriptError};

/// The fully-unrolled product of three Miller loops,
/// `miller(P1,Q1) * miller(P2,Q2) * miller(P3,Q3)`.
///
/// Implemented for every [`PairingOps`] record. One shared walk of the
/// signed-digit expansion squares the accumulator once per iteration and
/// folds three (or six, on non-zero digits) line evaluations before the
/// three running points are updated in parallel.
pub trait TripleMillerLoop: PairingOps {
    /// Stack in: `[q, .., gradients, P1, P2, P3, Q1, Q2, Q3]`; gradient
    /// witnesses are stacked so that at any step the next consumed gradient
    /// is the shallowest (tangent gradients for the three pairs first, then
    /// chord gradients on non-zero digits). Stack out: `[q?, .., f]`.
    #[tracing::instrument(level = "debug", skip_all)]
    fn triple_miller_loop(
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

        // descriptor constructors; `extra` counts the scalars stacked above
        // the T region, `j` is 1-based from the shallowest
        let lambda_at = move |extra: usize, j: usize| {
            StackFiniteFieldElement::new((extra + 6 * ntw + 3 * np + j * nl) as i64 - 1, false, nl)
        };
        let t_at = move |extra: usize, k: usize| {
            let x = (extra + (4 - k) * ntw) as i64 - 1;
            StackEllipticCurvePoint::new(
                StackFiniteFieldElement::new(x, false, nl),
                StackFiniteFieldElement::new(x - nl as i64, false, nl),
            )
        };
        let q_at = move |extra: usize, k: usize, negate: bool| {
            let x = (extra + 3 * ntw + (4 - k) * ntw) as i64 - 1;
            StackEllipticCurvePoint::new(
                StackFiniteFieldElement::new(x, false, nl),
                StackFiniteFieldElement::new(x - nl as i64, negate, nl),
            )
        };
        let p_at = move |extra: usize, k: usize| {
            let x = (extra + 6 * ntw + (4 - k) * np) as i64 - 1;
            StackEllipticCurvePoint::new(
                StackFiniteFieldElement::new(x, false, 1),
                StackFiniteFieldElement::new(x - 1, false, 1),
            )
        };

        let mut out = constant_guard(opts, self.modulus());

        // T_k <- Q_k
        out += pick(3 * ntw as i64 - 1, 3 * ntw);

        let q_bits = self.modulus().bits();
        let mut f_size = q_bits;
        let mut point_size = q_bits;
        let mut f_len = 0usize;

        for (idx, i) in (0..=w.len() - 2).rev().enumerate() {
            let digit = w[i];
            let estimate =
                self.size_estimation_miller_loop(modulo_threshold, i, f_size, point_size, true);
            let positive = opts.positive_modulo && i == 0;
            let eval_opts = reduce(true, false);

            if idx > 0 {
                out += self.miller_loop_output_square(&none)?;
            }

            // three tangent-line evaluations, folded pairwise
            out += self.line_eval(
                &eval_opts,
                lambda_at(f_len, 1),
                t_at(f_len, 1),
                p_at(f_len, 1),
                0,
            )?;
            out += self.line_eval(
                &eval_opts,
                lambda_at(f_len + nev, 2),
                t_at(f_len + nev, 2),
                p_at(f_len + nev, 2),
                0,
            )?;
            out += self.line_eval_times_eval(&none)?;
            out += self.line_eval(
                &eval_opts,
                lambda_at(f_len + nexx, 3),
                t_at(f_len + nexx, 3),
                p_at(f_len + nexx, 3),
                0,
            )?;

            if digit == 0 {
                // t = ev1*ev2*ev3, dense
                out += self.line_eval_times_eval_times_eval(&none)?;
                if idx > 0 {
                    out += self.miller_loop_output_times_eval_times_eval_times_eval(&reduce(
                        estimate.take_modulo_f,
                        positive,
                    ))?;
                }
            } else {
                // three chord-line evaluations against ±Q_k
                out += self.line_eval(
                    &eval_opts,
                    lambda_at(f_len + nexx + nev, 4),
                    q_at(f_len + nexx + nev, 1, digit < 0),
                    p_at(f_len + nexx + nev, 1),
                    0,
                )?;
                out += self.line_eval_times_eval(&none)?;
                out += self.line_eval(
                    &eval_opts,
                    lambda_at(f_len + 2 * nexx, 5),
                    q_at(f_len + 2 * nexx, 2, digit < 0),
                    p_at(f_len + 2 * nexx, 2),
                    0,
                )?;
                out += self.line_eval(
                    &eval_opts,
                    lambda_at(f_len + 2 * nexx + nev, 6),
                    q_at(f_len + 2 * nexx + nev, 3, digit < 0),
                    p_at(f_len + 2 * nexx + nev, 3),
                    0,
                )?;
                out += self.line_eval_times_eval(&none)?;
                // t4 = t2*t3 (dense), total = t1*t4, fold
                out += self.line_eval_times_eval_times_eval_times_eval(&none)?;
                out += self.line_eval_times_eval_times_miller_loop_output(&none)?;
                if idx > 0 {
                    out += self
                        .miller_loop_output_times_six_evals(&reduce(estimate.take_modulo_f, positive))?;
                }
            }

            // park the accumulator while the points are updated
            for _ in 0..nmill {
                out.push_opcode(Opcode::OP_TOALTSTACK);
            }
            // each doubling rolls the deepest running point and restacks it
            // on top, so the rotation preserves the T1, T2, T3 order
            for _ in 0..3 {
                out += self.point_doubling_twisted_curve(
                    &reduce(estimate.take_modulo_point, positive),
                    lambda_at(0, 1),
                    t_at(0, 1),
                    3,
                )?;
            }
            if digit != 0 {
                for k in 1..=3 {
                    out += self.point_addition_twisted_curve(
                        &reduce(estimate.take_modulo_point, positive),
                        lambda_at(0, 1),
                        q_at(0, k, digit < 0),
                        t_at(0, 1),
                        0b101,
                    )?;
                }
            }
            for _ in 0..nmill {
                out.push_opcode(Opcode::OP_FROMALTSTACK);
            }

            f_len = nmill;
            f_size = estimate.f_size;
            point_size = estimate.point_size;
        }

        // drop the points, keep the accumulator
        for _ in 0..nmill {
            out.push_opcode(Opcode::OP_TOALTSTACK);
        }
        for _ in 0..(6 * ntw + 3 * np) / 2 {
            out.push_opcode(Opcode::OP_2DROP);
        }
        for _ in 0..nmill {
            out.push_opcode(Opcode::OP_FROMALTSTACK);
        }

        if clean_constant {
            out += roll(-1, 1);
            out.push_opcode(Opcode::OP_DROP);
        }
        tracing::debug!(items = out.len(), "emitted triple miller loop");
        Ok(out)
    }
}

impl<T: PairingOps + ?Sized> TripleMillerLoop for T {}
