use num_bigint::BigInt;
use txscript::Script;

use crate::curves::{EllipticCurveAffine, EllipticCurveFq2Projective};
use crate::fields::{Fq2, Fq4, PrimeFieldExtension};
use crate::pairing::{PairingOps, ProjectivePairingOps, SizeEstimate};
use crate::stack::{
    StackEllipticCurvePoint, StackEllipticCurvePointProjective, StackFiniteFieldElement,
};
use crate::{BuildOptions, ScriptError};

use super::fields::{fq2_script, fq4_script};
use super::final_exponentiation::FinalExponentiation;
use super::line_functions::LineFunctions;
use super::miller_output_operations::MillerOutputOperations;
use super::{EXP_MILLER_LOOP, MODULUS, TWIST_A, TWIST_B};

/// The MNT4-753 pairing operation record.
///
/// Wires the quartic tower, the twisted-curve arithmetic over `F_q^2`, the
/// sparse Miller-output products and the final exponentiation into the
/// generic [`PairingOps`] surface.
#[derive(Clone, Debug)]
#[allow(non_camel_case_types)]
pub struct Mnt4_753 {
    fq2: Fq2,
    fq4: Fq4,
    twisted_curve: EllipticCurveAffine<Fq2>,
    twisted_curve_proj: EllipticCurveFq2Projective,
    line_functions: LineFunctions,
    miller_output: MillerOutputOperations,
    final_exponentiation: FinalExponentiation,
    exp_miller_loop: Vec<i8>,
}

impl Mnt4_753 {
    pub fn new() -> Self {
        let fq4 = fq4_script();
        Mnt4_753 {
            fq2: fq2_script(),
            twisted_curve: EllipticCurveAffine::new(fq2_script(), TWIST_A.to_vec()),
            twisted_curve_proj: EllipticCurveFq2Projective::new(
                fq2_script(),
                TWIST_A.clone(),
                TWIST_B.clone(),
            ),
            line_functions: LineFunctions::new(fq2_script(), TWIST_A.clone()),
            miller_output: MillerOutputOperations::new(fq4.clone()),
            final_exponentiation: FinalExponentiation::new(fq4.clone()),
            fq4,
            exp_miller_loop: EXP_MILLER_LOOP.clone(),
        }
    }

    pub fn fq4(&self) -> &Fq4 {
        &self.fq4
    }
}

impl Default for Mnt4_753 {
    fn default() -> Self {
        Self::new()
    }
}

impl PairingOps for Mnt4_753 {
    fn modulus(&self) -> &BigInt {
        &MODULUS
    }

    fn exp_miller_loop(&self) -> &[i8] {
        &self.exp_miller_loop
    }

    fn n_points_curve(&self) -> usize {
        2
    }

    fn n_points_twist(&self) -> usize {
        4
    }

    fn n_elements_miller_output(&self) -> usize {
        4
    }

    fn n_elements_evaluation_output(&self) -> usize {
        3
    }

    fn n_elements_evaluation_times_evaluation(&self) -> usize {
        4
    }

    fn line_eval(
        &self,
        opts: &BuildOptions,
        lambda: StackFiniteFieldElement,
        q: StackEllipticCurvePoint,
        p: StackEllipticCurvePoint,
        rolling_options: u32,
    ) -> Result<Script, ScriptError> {
        self.line_functions
            .line_evaluation(opts, lambda, q, p, rolling_options)
    }

    fn line_eval_times_eval(&self, opts: &BuildOptions) -> Result<Script, ScriptError> {
        self.miller_output.line_eval_times_eval(opts)
    }

    fn line_eval_times_eval_times_eval(
        &self,
        opts: &BuildOptions,
    ) -> Result<Script, ScriptError> {
        self.miller_output.line_eval_times_eval_times_eval(opts)
    }

    fn line_eval_times_eval_times_eval_times_eval(
        &self,
        opts: &BuildOptions,
    ) -> Result<Script, ScriptError> {
        self.miller_output
            .line_eval_times_eval_times_eval_times_eval(opts)
    }

    fn line_eval_times_eval_times_miller_loop_output(
        &self,
        opts: &BuildOptions,
    ) -> Result<Script, ScriptError> {
        self.miller_output
            .line_eval_times_eval_times_miller_loop_output(opts)
    }

    fn miller_loop_output_square(&self, opts: &BuildOptions) -> Result<Script, ScriptError> {
        self.miller_output.square(opts)
    }

    fn miller_loop_output_mul(&self, opts: &BuildOptions) -> Result<Script, ScriptError> {
        self.miller_output.mul(opts)
    }

    fn miller_loop_output_times_eval(
        &self,
        opts: &BuildOptions,
    ) -> Result<Script, ScriptError> {
        self.miller_output.miller_loop_output_times_eval(opts)
    }

    fn miller_loop_output_times_eval_times_eval(
        &self,
        opts: &BuildOptions,
    ) -> Result<Script, ScriptError> {
        self.miller_output
            .miller_loop_output_times_eval_times_eval(opts)
    }

    fn pad_eval_to_miller_output(&self) -> Script {
        self.miller_output.pad_eval_to_miller_output()
    }

    fn pad_eval_times_eval_to_miller_output(&self) -> Script {
        self.miller_output.pad_eval_times_eval_to_miller_output()
    }

    fn point_doubling_twisted_curve(
        &self,
        opts: &BuildOptions,
        lambda: StackFiniteFieldElement,
        t: StackEllipticCurvePoint,
        rolling_options: u32,
    ) -> Result<Script, ScriptError> {
        self.twisted_curve
            .point_algebraic_doubling(opts, lambda, t, rolling_options)
    }

    fn point_addition_twisted_curve(
        &self,
        opts: &BuildOptions,
        lambda: StackFiniteFieldElement,
        q: StackEllipticCurvePoint,
        t: StackEllipticCurvePoint,
        rolling_options: u32,
    ) -> Result<Script, ScriptError> {
        self.twisted_curve
            .point_algebraic_addition(opts, lambda, q, t, rolling_options)
    }

    fn point_negation_twisted_curve(
        &self,
        opts: &BuildOptions,
        p: StackEllipticCurvePoint,
        rolled: bool,
    ) -> Result<Script, ScriptError> {
        self.twisted_curve.point_negation(opts, p, rolled)
    }

    fn cyclotomic_inverse(
        &self,
        opts: &BuildOptions,
        x: StackFiniteFieldElement,
        rolled: bool,
    ) -> Result<Script, ScriptError> {
        self.fq4.conjugate(opts, x, rolled)
    }

    fn easy_exponentiation_with_inverse_check(
        &self,
        opts: &BuildOptions,
    ) -> Result<Script, ScriptError> {
        self.final_exponentiation
            .easy_exponentiation_with_inverse_check(opts)
    }

    fn hard_exponentiation(
        &self,
        opts: &BuildOptions,
        modulo_threshold: u64,
    ) -> Result<Script, ScriptError> {
        self.final_exponentiation
            .hard_exponentiation(self, opts, modulo_threshold)
    }

    fn size_estimation_miller_loop(
        &self,
        modulo_threshold: u64,
        ix: usize,
        f_size: u64,
        point_size: u64,
        is_triple: bool,
    ) -> SizeEstimate {
        super::size_estimation::size_estimation_miller_loop(
            &MODULUS,
            modulo_threshold,
            ix,
            &self.exp_miller_loop,
            f_size,
            point_size,
            is_triple,
        )
    }
}

impl ProjectivePairingOps for Mnt4_753 {
    fn fq2(&self) -> &Fq2 {
        &self.fq2
    }

    fn twisted_curve_projective(&self) -> &EllipticCurveFq2Projective {
        &self.twisted_curve_proj
    }

    fn line_eval_proj(
        &self,
        opts: &BuildOptions,
        t: StackEllipticCurvePointProjective,
        q: Option<StackEllipticCurvePoint>,
        p: StackEllipticCurvePoint,
    ) -> Result<Script, ScriptError> {
        self.line_functions.line_evaluation_proj(opts, t, q, p)
    }

    fn scalar_mul_miller_output(&self, opts: &BuildOptions) -> Result<Script, ScriptError> {
        self.fq4.base_field_scalar_mul(
            opts,
            StackFiniteFieldElement::new(4, false, 4),
            StackFiniteFieldElement::new(0, false, 1),
            3,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pairing::{MillerLoop, TripleMillerLoop};

    #[test]
    fn miller_loop_emits_deterministically() {
        let ops = Mnt4_753::new();
        let opts = BuildOptions::default().with_clean_constant(false);
        let a = ops.miller_loop(&opts, 4000).unwrap();
        let b = ops.miller_loop(&opts, 4000).unwrap();
        assert_eq!(a, b);
        assert!(a.len() > 1000);
    }

    #[test]
    fn projective_triple_miller_loop_builds() {
        use crate::pairing::TripleMillerLoopProjective;
        let ops = Mnt4_753::new();
        let opts = BuildOptions::default().with_clean_constant(false);
        let script = ops.triple_miller_loop_proj(&opts, 4000).unwrap();
        assert!(script.len() > 1000);
    }

    #[test]
    fn triple_miller_loop_is_larger_than_single() {
        let ops = Mnt4_753::new();
        let opts = BuildOptions::default().with_clean_constant(false);
        let single = ops.miller_loop(&opts, 4000).unwrap();
        let triple = ops.triple_miller_loop(&opts, 4000).unwrap();
        assert!(triple.len() > single.len());
    }
}
