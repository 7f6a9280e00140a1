//! Generic pairing machinery: the per-curve operation record and the
//! Miller-loop, cyclotomic-exponentiation and pairing builders composed on
//! top of it.

pub mod cyclotomic;
pub mod miller_loop;
pub mod triple_miller_loop;
pub mod triple_miller_loop_proj;

pub use cyclotomic::CyclotomicExponentiation;
pub use miller_loop::MillerLoop;
pub use triple_miller_loop::TripleMillerLoop;
pub use triple_miller_loop_proj::{ProjectivePairingOps, TripleMillerLoopProjective};

use num_bigint::BigInt;
use txscript::Script;

use crate::stack::{StackEllipticCurvePoint, StackFiniteFieldElement};
use crate::{BuildOptions, ScriptError};

/// The reduction decisions for one Miller-loop iteration, together with the
/// post-iteration size book-keeping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SizeEstimate {
    /// Reduce the Miller accumulator after this iteration's updates.
    pub take_modulo_f: bool,
    /// Reduce the running point after this iteration's updates.
    pub take_modulo_point: bool,
    /// Bit size of the accumulator after the iteration.
    pub f_size: u64,
    /// Bit size of the running point coordinates after the iteration.
    pub point_size: u64,
}

/// The per-curve operation record consumed by the generic pairing builders.
///
/// One implementation exists per curve family; the Miller-loop and
/// final-exponentiation builders are generic over this interface, so no
/// per-opcode dispatch happens at emission time.
pub trait PairingOps {
    /// The field characteristic.
    fn modulus(&self) -> &BigInt;

    /// Signed-digit expansion of the Miller scalar, least-significant digit
    /// first (most-significant digit last, always non-zero).
    fn exp_miller_loop(&self) -> &[i8];

    /// Scalars per base-curve point.
    fn n_points_curve(&self) -> usize;

    /// Scalars per twisted-curve point.
    fn n_points_twist(&self) -> usize;

    /// Scalars per Miller-accumulator element (the target field).
    fn n_elements_miller_output(&self) -> usize;

    /// Scalars per sparse line-evaluation output.
    fn n_elements_evaluation_output(&self) -> usize;

    /// Scalars per product of two line evaluations.
    fn n_elements_evaluation_times_evaluation(&self) -> usize;

    /// Tangent/chord evaluation `ev_(l_(T,Q))(P)`; `Q = T` for tangents.
    /// Consumes per the rolling bitmask (bit 0: lambda, bit 1: Q, bit 2:
    /// P); the sparse result lands on top of the stack.
    fn line_eval(
        &self,
        opts: &BuildOptions,
        lambda: StackFiniteFieldElement,
        q: StackEllipticCurvePoint,
        p: StackEllipticCurvePoint,
        rolling_options: u32,
    ) -> Result<Script, ScriptError>;

    /// `ev * ev` of the two sparse evaluations on top of the stack.
    fn line_eval_times_eval(&self, opts: &BuildOptions) -> Result<Script, ScriptError>;

    /// `(ev * ev) * ev` -> dense element.
    fn line_eval_times_eval_times_eval(&self, opts: &BuildOptions)
        -> Result<Script, ScriptError>;

    /// `(ev * ev) * (ev * ev)` -> dense element.
    fn line_eval_times_eval_times_eval_times_eval(
        &self,
        opts: &BuildOptions,
    ) -> Result<Script, ScriptError>;

    /// `(ev * ev) * dense` -> dense element.
    fn line_eval_times_eval_times_miller_loop_output(
        &self,
        opts: &BuildOptions,
    ) -> Result<Script, ScriptError>;

    /// Squaring of the Miller accumulator on top of the stack.
    fn miller_loop_output_square(&self, opts: &BuildOptions) -> Result<Script, ScriptError>;

    /// Dense multiplication of the two accumulators on top of the stack.
    fn miller_loop_output_mul(&self, opts: &BuildOptions) -> Result<Script, ScriptError>;

    /// `f * ev` for the accumulator below a sparse evaluation.
    fn miller_loop_output_times_eval(&self, opts: &BuildOptions)
        -> Result<Script, ScriptError>;

    /// `f * (ev * ev)` for the accumulator below a two-evaluation product.
    fn miller_loop_output_times_eval_times_eval(
        &self,
        opts: &BuildOptions,
    ) -> Result<Script, ScriptError>;

    /// `f * (ev*ev*ev)`: the three-evaluation product is already dense.
    fn miller_loop_output_times_eval_times_eval_times_eval(
        &self,
        opts: &BuildOptions,
    ) -> Result<Script, ScriptError> {
        self.miller_loop_output_mul(opts)
    }

    /// `f * (six evaluations)`: the six-fold product is already dense.
    fn miller_loop_output_times_six_evals(
        &self,
        opts: &BuildOptions,
    ) -> Result<Script, ScriptError> {
        self.miller_loop_output_mul(opts)
    }

    /// Pad a bare sparse evaluation to a dense accumulator.
    fn pad_eval_to_miller_output(&self) -> Script;

    /// Pad a two-evaluation product to a dense accumulator.
    fn pad_eval_times_eval_to_miller_output(&self) -> Script;

    /// Gradient-witnessed doubling on the twisted curve.
    fn point_doubling_twisted_curve(
        &self,
        opts: &BuildOptions,
        lambda: StackFiniteFieldElement,
        t: StackEllipticCurvePoint,
        rolling_options: u32,
    ) -> Result<Script, ScriptError>;

    /// Gradient-witnessed addition on the twisted curve.
    fn point_addition_twisted_curve(
        &self,
        opts: &BuildOptions,
        lambda: StackFiniteFieldElement,
        q: StackEllipticCurvePoint,
        t: StackEllipticCurvePoint,
        rolling_options: u32,
    ) -> Result<Script, ScriptError>;

    /// Negation on the twisted curve.
    fn point_negation_twisted_curve(
        &self,
        opts: &BuildOptions,
        p: StackEllipticCurvePoint,
        rolled: bool,
    ) -> Result<Script, ScriptError>;

    /// Inverse on the cyclotomic subgroup (a conjugation).
    fn cyclotomic_inverse(
        &self,
        opts: &BuildOptions,
        x: StackFiniteFieldElement,
        rolled: bool,
    ) -> Result<Script, ScriptError>;

    /// Easy part of the final exponentiation, with the witnessed inverse
    /// checked in-script.
    fn easy_exponentiation_with_inverse_check(
        &self,
        opts: &BuildOptions,
    ) -> Result<Script, ScriptError>;

    /// Hard part of the final exponentiation.
    fn hard_exponentiation(
        &self,
        opts: &BuildOptions,
        modulo_threshold: u64,
    ) -> Result<Script, ScriptError>;

    /// Per-iteration reduction decision for the Miller loops. `ix` is the
    /// iteration index (`0` is the last executed iteration).
    fn size_estimation_miller_loop(
        &self,
        modulo_threshold: u64,
        ix: usize,
        f_size: u64,
        point_size: u64,
        is_triple: bool,
    ) -> SizeEstimate;
}
