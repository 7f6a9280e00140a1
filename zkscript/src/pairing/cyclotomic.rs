use txscript::Script;

use crate::fields::constant_guard;
use crate::pairing::PairingOps;
use crate::stack::StackFiniteFieldElement;
use crate::util::pick;
use crate::{BuildOptions, ScriptError};

/// Exponentiation on the cyclotomic subgroup of the target field by a
/// signed-digit exponent, the workhorse of the hard part of the final
/// exponentiation.
///
/// Inversion is free on the subgroup (a conjugation), so digits `-1`
/// multiply by a prepared copy of the inverse instead of the base.
pub trait CyclotomicExponentiation: PairingOps {
    /// Build the script computing `x^e` for the element on top of the
    /// stack, with `e` given by `exp_e` (least-significant digit first,
    /// digits in `{-1, 0, 1}`, leading digit non-zero).
    ///
    /// The copies of `x` and `x^-1` consumed by the square-and-multiply
    /// walk are laid out up-front; reductions are inserted whenever the
    /// squared size estimate crosses `modulo_threshold`.
    fn cyclotomic_exponentiation(
        &self,
        exp_e: &[i8],
        opts: &BuildOptions,
        modulo_threshold: u64,
    ) -> Result<Script, ScriptError> {
        opts.modulo_flags()?;
        let clean_constant = opts.clean_constant.unwrap_or(false);
        debug_assert!(!exp_e.is_empty() && *exp_e.last().unwrap() != 0);
        let n = self.n_elements_miller_output();
        let ni = n as i64;
        let none = BuildOptions::default();
        let bit_size_q = self.modulus().bits();
        let log_overhead = 5; // log2 bound of the coefficient growth per product

        let mut out = constant_guard(opts, self.modulus());

        // Prepare the copies of x and x^-1 the walk will consume, from the
        // lowest digit up; the element itself stands in for the first
        // non-zero digit seen.
        let mut ever_seen_base = false;
        let mut ever_seen_inverse = false;
        let mut prev = 0i8;
        let mut count_prev = 0i64;
        for &digit in exp_e {
            match digit {
                1 => {
                    if prev == 1 {
                        out += pick(ni - 1, n);
                        count_prev += 1;
                    } else if prev == -1 {
                        if ever_seen_base {
                            out += pick(ni + ni * count_prev - 1, n);
                            count_prev = 1;
                            prev = 1;
                        } else {
                            out += pick(ni - 1, n);
                            out += self.cyclotomic_inverse(
                                &none,
                                StackFiniteFieldElement::on_top(n),
                                true,
                            )?;
                            prev = 1;
                            count_prev = 1;
                            ever_seen_base = true;
                        }
                    } else {
                        prev = 1;
                        count_prev = 1;
                        ever_seen_base = true;
                    }
                }
                -1 => {
                    if prev == 1 {
                        if ever_seen_inverse {
                            out += pick(ni + ni * count_prev - 1, n);
                            prev = -1;
                            count_prev = 1;
                        } else {
                            out += pick(ni - 1, n);
                            out += self.cyclotomic_inverse(
                                &none,
                                StackFiniteFieldElement::on_top(n),
                                true,
                            )?;
                            prev = -1;
                            count_prev = 1;
                            ever_seen_inverse = true;
                        }
                    } else if prev == -1 {
                        out += pick(ni - 1, n);
                        count_prev += 1;
                    } else {
                        out += self.cyclotomic_inverse(
                            &none,
                            StackFiniteFieldElement::on_top(n),
                            true,
                        )?;
                        prev = -1;
                        count_prev = 1;
                        ever_seen_inverse = true;
                    }
                }
                _ => {}
            }
        }

        // Square-and-multiply from the second-most-significant digit down.
        let mut current_size = bit_size_q;
        for i in (0..=exp_e.len() - 2).rev() {
            let mut modulo_square = false;
            let mut modulo_multiplication = false;
            let clean_constant_final = i == 0 && clean_constant;

            if i == 0 && opts.take_modulo {
                modulo_square = true;
                if exp_e[0] != 0 {
                    modulo_multiplication = true;
                }
            } else if exp_e[i] != 0 {
                let after_square = log_overhead + current_size * 2;
                let after_multiplication = log_overhead + after_square + bit_size_q;
                if after_multiplication > modulo_threshold {
                    modulo_square = true;
                    current_size = log_overhead + bit_size_q * 2;
                } else if log_overhead + after_multiplication * 2 > modulo_threshold {
                    modulo_multiplication = true;
                    current_size = bit_size_q;
                } else {
                    current_size = after_multiplication;
                }
            } else {
                let after_square = log_overhead + current_size * 2;
                if log_overhead + after_square * 2 > modulo_threshold {
                    modulo_square = true;
                    current_size = bit_size_q;
                } else {
                    current_size = after_square;
                }
            }

            let square_opts = BuildOptions {
                take_modulo: modulo_square,
                positive_modulo: opts.positive_modulo && i == 0,
                check_constant: false,
                clean_constant: Some(clean_constant_final && exp_e[i] == 0),
                is_constant_reused: Some(false),
            };
            out += self.miller_loop_output_square(&square_opts)?;
            if exp_e[i] != 0 {
                let mul_opts = BuildOptions {
                    take_modulo: modulo_multiplication,
                    positive_modulo: opts.positive_modulo && i == 0,
                    check_constant: false,
                    clean_constant: Some(clean_constant_final),
                    is_constant_reused: Some(false),
                };
                out += self.miller_loop_output_mul(&mul_opts)?;
            }
        }

        Ok(out)
    }
}

impl<T: PairingOps + ?Sized> CyclotomicExponentiation for T {}
