use txscript::{Opcode, Script};

use crate::fields::constant_guard;
use crate::pairing::PairingOps;
use crate::stack::{StackEllipticCurvePoint, StackFiniteFieldElement};
use crate::util::{pick, roll};
use crate::{BuildOptions, ScriptError};

/// The fully-unrolled single Miller loop.
///
/// Implemented for every [`PairingOps`] record.
pub trait MillerLoop: PairingOps {
    /// Build the script computing `miller(P, Q)`.
    ///
    /// Stack in: `[q, .., gradients, P, Q]`, where the gradient witnesses
    /// for the `w*Q` updates are stacked with the first consumed gradient
    /// shallowest (directly below `P`). Stack out: `[q?, .., miller(P,Q)]`.
    ///
    /// The loop walks the signed-digit expansion of the Miller scalar from
    /// its most-significant digit; every iteration squares the
    /// accumulator, folds in the tangent-line evaluation, doubles the
    /// running point, and on non-zero digits folds a second, chord-line
    /// evaluation and adds `±Q`. Reductions are inserted when the size
    /// estimator crosses `modulo_threshold`.
    #[tracing::instrument(level = "debug", skip_all)]
    fn miller_loop(
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
        let nmill = self.n_elements_miller_output();
        let none = BuildOptions::default();
        let reduce = |take: bool, positive: bool| BuildOptions {
            take_modulo: take,
            positive_modulo: positive,
            check_constant: false,
            clean_constant: Some(false),
            is_constant_reused: Some(false),
        };

        let mut out = constant_guard(opts, self.modulus());

        // T <- Q
        out += pick(ntw as i64 - 1, ntw);

        let q_bits = self.modulus().bits();
        let mut f_size = q_bits;
        let mut point_size = q_bits;
        let mut f_len = 0usize;

        for (idx, i) in (0..=w.len() - 2).rev().enumerate() {
            let digit = w[i];
            let estimate =
                self.size_estimation_miller_loop(modulo_threshold, i, f_size, point_size, false);
            let positive = opts.positive_modulo && i == 0;

            // f <- f^2
            if idx > 0 {
                out += self.miller_loop_output_square(&none)?;
            }

            // helpers for the descriptor positions above the gradient area
            let lambda_at = |extra: usize| {
                StackFiniteFieldElement::new(
                    (extra + 2 * ntw + np + nl) as i64 - 1,
                    false,
                    nl,
                )
            };
            let t_at = |extra: usize| {
                StackEllipticCurvePoint::new(
                    StackFiniteFieldElement::new((extra + ntw) as i64 - 1, false, nl),
                    StackFiniteFieldElement::new((extra + nl) as i64 - 1, false, nl),
                )
            };
            let q_at = |extra: usize, negate: bool| {
                StackEllipticCurvePoint::new(
                    StackFiniteFieldElement::new((extra + 2 * ntw) as i64 - 1, false, nl),
                    StackFiniteFieldElement::new((extra + ntw + nl) as i64 - 1, negate, nl),
                )
            };
            let p_at = |extra: usize| {
                StackEllipticCurvePoint::new(
                    StackFiniteFieldElement::new((extra + 2 * ntw + np) as i64 - 1, false, 1),
                    StackFiniteFieldElement::new((extra + 2 * ntw + np) as i64 - 2, false, 1),
                )
            };

            // tangent-line evaluation at T
            out += self.line_eval(
                &reduce(true, false),
                lambda_at(f_len),
                t_at(f_len),
                p_at(f_len),
                0,
            )?;

            // T <- 2T, then bring f and the evaluation back on top
            out += self.point_doubling_twisted_curve(
                &reduce(estimate.take_modulo_point, positive),
                lambda_at(f_len + nev),
                t_at(f_len + nev),
                3,
            )?;
            out += roll((ntw + f_len + nev) as i64 - 1, f_len + nev);

            if digit != 0 {
                // chord-line evaluation at (2T, ±Q)
                out += self.line_eval(
                    &reduce(true, false),
                    lambda_at(f_len + nev),
                    q_at(f_len + nev, digit < 0),
                    p_at(f_len + nev),
                    0,
                )?;

                // T <- 2T ± Q
                out += self.point_addition_twisted_curve(
                    &reduce(estimate.take_modulo_point, positive),
                    lambda_at(f_len + 2 * nev),
                    q_at(f_len + 2 * nev, digit < 0),
                    t_at(f_len + 2 * nev),
                    0b101,
                )?;
                out += roll((ntw + f_len + 2 * nev) as i64 - 1, f_len + 2 * nev);

                // fold both evaluations into the accumulator
                out += self.line_eval_times_eval(&none)?;
                if idx == 0 {
                    out += self.pad_eval_times_eval_to_miller_output();
                } else {
                    out += self
                        .miller_loop_output_times_eval_times_eval(&reduce(
                            estimate.take_modulo_f,
                            positive,
                        ))?;
                }
            } else if idx == 0 {
                out += self.pad_eval_to_miller_output();
            } else {
                out += self
                    .miller_loop_output_times_eval(&reduce(estimate.take_modulo_f, positive))?;
            }

            f_len = nmill;
            f_size = estimate.f_size;
            point_size = estimate.point_size;
        }

        // drop T, Q and P, keeping the accumulator
        for _ in 0..nmill {
            out.push_opcode(Opcode::OP_TOALTSTACK);
        }
        for _ in 0..(2 * ntw + np) / 2 {
            out.push_opcode(Opcode::OP_2DROP);
        }
        if (2 * ntw + np) % 2 == 1 {
            out.push_opcode(Opcode::OP_DROP);
        }
        for _ in 0..nmill {
            out.push_opcode(Opcode::OP_FROMALTSTACK);
        }

        if clean_constant {
            out += roll(-1, 1);
            out.push_opcode(Opcode::OP_DROP);
        }
        tracing::debug!(items = out.len(), "emitted miller loop");
        Ok(out)
    }

    /// `miller(P, Q)` followed by the final exponentiation: the full
    /// pairing check script.
    ///
    /// Stack in: `[q, .., inverse_miller_output, gradients, P, Q]`; the
    /// witnessed inverse feeds the easy part of the final exponentiation.
    #[tracing::instrument(level = "debug", skip_all)]
    fn pairing(&self, opts: &BuildOptions, modulo_threshold: u64) -> Result<Script, ScriptError> {
        opts.modulo_flags()?;
        let clean_constant = opts.clean_constant.unwrap_or(false);
        let inner = BuildOptions {
            take_modulo: true,
            positive_modulo: true,
            check_constant: false,
            clean_constant: Some(false),
            is_constant_reused: Some(false),
        };

        let mut out = constant_guard(opts, self.modulus());
        out += self.miller_loop(&inner.clone().with_take_modulo(true), modulo_threshold)?;
        out += self.easy_exponentiation_with_inverse_check(&inner)?;
        out += self.hard_exponentiation(
            &BuildOptions {
                clean_constant: Some(clean_constant),
                ..inner
            },
            modulo_threshold,
        )?;
        Ok(out)
    }
}

impl<T: PairingOps + ?Sized> MillerLoop for T {}
