use num_bigint::BigInt;
use txscript::{Opcode, Script};

use crate::curves::{double_top, reduce_in_place, scale_top, sub_constant_top, verify_zero_mod};
use crate::fields::{constant_guard, FieldScriptOps, Fq, Fq2, PrimeFieldExtension};
use crate::stack::{
    check_order, StackEllipticCurvePoint, StackFiniteFieldElement, StackNumber,
};
use crate::util::{
    bitmask_to_boolean_list, is_mod_equal_to, mod_from_altstack, mod_top, move_element,
    nums_to_script, pick, roll, MoveMode,
};
use crate::{BuildOptions, ScriptError};

/// Affine elliptic-curve arithmetic over a coordinate field `F`.
///
/// Chord-and-tangent formulas with the gradient supplied as a stack
/// witness: the emitted fragments first verify the gradient against the
/// operands modulo `q` and abort on mismatch, then compute the result.
/// Neither bare operation handles the point at infinity or `P = ±Q`; the
/// [`EllipticCurveAffine::point_addition_with_unknown_points`] wrapper
/// (over `F_q`) covers those cases.
#[derive(Clone, Debug)]
pub struct EllipticCurveAffine<F: FieldScriptOps> {
    field: F,
    curve_a: Vec<BigInt>,
}

/// Affine arithmetic over `E(F_q)`.
pub type EllipticCurveFq = EllipticCurveAffine<Fq>;

/// Affine arithmetic over the twisted curve `E'(F_q^2)`.
pub type EllipticCurveFq2 = EllipticCurveAffine<Fq2>;

impl<F: FieldScriptOps> EllipticCurveAffine<F> {
    /// `curve_a` is the Short-Weierstrass `a` coefficient, given by its
    /// coefficient vector over `F_q`.
    pub fn new(field: F, curve_a: Vec<BigInt>) -> Self {
        debug_assert_eq!(curve_a.len(), field.extension_degree());
        EllipticCurveAffine { field, curve_a }
    }

    pub fn field(&self) -> &F {
        &self.field
    }

    fn degree(&self) -> usize {
        self.field.extension_degree()
    }

    /// Bring `lambda`, `P` (and optionally `Q`) into the canonical
    /// top-of-stack layout, honouring the rolling options.
    fn normalize(
        &self,
        lambda: &StackFiniteFieldElement,
        points: &[&StackEllipticCurvePoint],
        rolled: &[bool],
    ) -> Result<Script, ScriptError> {
        let n = self.degree() as i64;
        for point in points {
            if !point.is_contiguous() {
                return Err(ScriptError::UnsupportedConfiguration(
                    "affine operations need contiguous point coordinates".into(),
                ));
            }
        }
        let mut out = move_element(lambda, MoveMode::from_bool(rolled[0]));
        let mut lifted = n;
        for (i, point) in points.iter().enumerate() {
            out += move_element(&point.shift(lifted), MoveMode::from_bool(rolled[i + 1]));
            lifted += 2 * n;
        }
        Ok(out)
    }

    /// Gradient-witnessed addition `R = P_ + Q_` (`P_ = -P` when the
    /// descriptor negates `P`, likewise `Q_`).
    ///
    /// Verifies `lambda * (xQ - xP) = yQ_ - yP_ (mod q)` and aborts the
    /// script on mismatch, then emits `xR = lambda^2 - xP - xQ`,
    /// `yR = lambda (xP - xR) - yP_`.
    pub fn point_algebraic_addition(
        &self,
        opts: &BuildOptions,
        lambda: StackFiniteFieldElement,
        p: StackEllipticCurvePoint,
        q: StackEllipticCurvePoint,
        rolling_options: u32,
    ) -> Result<Script, ScriptError> {
        let n = self.degree();
        check_order(&[&lambda, &p, &q])?;
        let (clean_constant, is_constant_reused) = opts.modulo_flags()?;
        let rolled = bitmask_to_boolean_list(rolling_options, 3);
        let field = &self.field;
        let none = BuildOptions::default();
        let el = |position: i64, negate: bool| {
            StackFiniteFieldElement::new(position, negate, n)
        };
        let ni = n as i64;
        let (np, nq) = (p.negate(), q.negate());

        let mut out = constant_guard(opts, field.modulus());
        out += self.normalize(&lambda, &[&p, &q], &rolled)?;

        // stack: [lambda, xP, yP, xQ, yQ]
        // gradient check: lambda*(xQ - xP) - (yQ_ - yP_) = 0 (mod q)
        out += field.algebraic_sum(&none, el(3 * ni - 1, !np), el(ni - 1, nq), 2)?;
        out += field.algebraic_sum(&none, el(4 * ni - 1, true), el(2 * ni - 1, false), 0)?;
        out += field.mul(&none, el(6 * ni - 1, lambda.negate), el(ni - 1, false), 2)?;
        out += field.algebraic_sum(&none, el(2 * ni - 1, true), el(ni - 1, false), 3)?;
        out += verify_zero_mod(n);

        // stack: [lambda, xP, yP, xQ]
        // xR = lambda^2 - xP - xQ, consuming xQ
        out += field.square(&none, el(4 * ni - 1, false), false)?;
        out += field.algebraic_sum(&none, el(4 * ni - 1, true), el(2 * ni - 1, true), 2)?;
        out += field.algebraic_sum(&none, el(2 * ni - 1, false), el(ni - 1, false), 3)?;

        // stack: [lambda, xP, yP, xR]
        // yR = lambda*(xP - xR) - yP_, consuming the rest
        out += field.algebraic_sum(&none, el(3 * ni - 1, false), el(ni - 1, true), 1)?;
        out += field.mul(&none, el(4 * ni - 1, lambda.negate), el(ni - 1, false), 3)?;
        out += field.algebraic_sum(&none, el(3 * ni - 1, !np), el(ni - 1, false), 3)?;

        if opts.take_modulo {
            out += reduce_in_place(2 * n, opts.positive_modulo, clean_constant, is_constant_reused);
        }
        Ok(out)
    }

    /// Gradient-witnessed doubling `R = 2 P_`.
    ///
    /// Verifies `2 yP_ lambda = 3 xP^2 + a (mod q)`, then emits
    /// `xR = lambda^2 - 2 xP`, `yR = lambda (xP - xR) - yP_`.
    pub fn point_algebraic_doubling(
        &self,
        opts: &BuildOptions,
        lambda: StackFiniteFieldElement,
        p: StackEllipticCurvePoint,
        rolling_options: u32,
    ) -> Result<Script, ScriptError> {
        let n = self.degree();
        check_order(&[&lambda, &p])?;
        let (clean_constant, is_constant_reused) = opts.modulo_flags()?;
        let rolled = bitmask_to_boolean_list(rolling_options, 2);
        let field = &self.field;
        let none = BuildOptions::default();
        let el = |position: i64, negate: bool| {
            StackFiniteFieldElement::new(position, negate, n)
        };
        let ni = n as i64;
        let np = p.negate();

        let mut out = constant_guard(opts, field.modulus());
        out += self.normalize(&lambda, &[&p], &rolled)?;

        // stack: [lambda, xP, yP]
        // gradient check: 2*yP_*lambda - 3*xP^2 - a = 0 (mod q)
        out += field.mul(&none, el(3 * ni - 1, lambda.negate), el(ni - 1, np), 0)?;
        out += double_top(n);
        out += field.square(&none, el(3 * ni - 1, false), false)?;
        out += scale_top(n, &BigInt::from(3));
        out += field.algebraic_sum(&none, el(2 * ni - 1, false), el(ni - 1, true), 3)?;
        out += sub_constant_top(n, &self.curve_a);
        out += verify_zero_mod(n);

        // stack: [lambda, xP, yP]
        // xR = lambda^2 - 2*xP
        out += field.square(&none, el(3 * ni - 1, false), false)?;
        out += pick(4 * ni - 1, n);
        out += double_top(n);
        out += field.algebraic_sum(&none, el(2 * ni - 1, false), el(ni - 1, true), 3)?;

        // stack: [lambda, xP, yP, xR]
        out += field.algebraic_sum(&none, el(3 * ni - 1, false), el(ni - 1, true), 1)?;
        out += field.mul(&none, el(4 * ni - 1, lambda.negate), el(ni - 1, false), 3)?;
        out += field.algebraic_sum(&none, el(3 * ni - 1, !np), el(ni - 1, false), 3)?;

        if opts.take_modulo {
            out += reduce_in_place(2 * n, opts.positive_modulo, clean_constant, is_constant_reused);
        }
        Ok(out)
    }

    /// `P -> -P`: negate the `y` coordinate.
    pub fn point_negation(
        &self,
        opts: &BuildOptions,
        p: StackEllipticCurvePoint,
        rolled: bool,
    ) -> Result<Script, ScriptError> {
        let n = self.degree();
        let (clean_constant, is_constant_reused) = opts.modulo_flags()?;
        if !p.is_contiguous() {
            return Err(ScriptError::UnsupportedConfiguration(
                "affine operations need contiguous point coordinates".into(),
            ));
        }
        let field = &self.field;
        let mut out = constant_guard(opts, field.modulus());
        out += move_element(&p, MoveMode::from_bool(rolled));
        out += field.negate(
            &BuildOptions::default(),
            StackFiniteFieldElement::new(n as i64 - 1, false, n),
            true,
        )?;
        if opts.take_modulo {
            out += reduce_in_place(2 * n, opts.positive_modulo, clean_constant, is_constant_reused);
        }
        Ok(out)
    }
}

impl EllipticCurveFq {
    /// Sentinel-aware addition over `E(F_q)`.
    ///
    /// Expects `[q, .., lambda, P, Q]` on the stack, where `lambda` is the
    /// chord gradient witness (a dummy value when either operand is the
    /// infinity sentinel `0x00 0x00` or `P = -Q`; it is dropped on those
    /// branches). Always resolves to a well-defined group element.
    pub fn point_addition_with_unknown_points(
        &self,
        opts: &BuildOptions,
    ) -> Result<Script, ScriptError> {
        opts.modulo_flags()?;
        let clean_constant = opts.clean_constant.unwrap_or(false);
        let field = &self.field;
        let inner_opts = BuildOptions {
            check_constant: false,
            clean_constant: Some(false),
            is_constant_reused: Some(false),
            ..*opts
        };

        let mut out = constant_guard(opts, field.modulus());

        // branch on Q being the infinity sentinel
        out += pick(1, 2);
        out += Script::parse_string("OP_CAT 0x0000 OP_EQUAL OP_NOT OP_IF").expect("static");

        // branch on P being the infinity sentinel; P and Q swap places
        out += roll(3, 2);
        out += pick(1, 2);
        out += Script::parse_string("OP_CAT 0x0000 OP_EQUAL OP_NOT OP_IF").expect("static");

        // branch on P = -Q: xP = xQ and yP + yQ = 0 (mod q)
        out += Script::parse_string("OP_DUP 3 OP_PICK OP_ADD").expect("static");
        out += is_mod_equal_to(&StackNumber::bottom(), &BigInt::from(0), false, false, true);
        out += Script::parse_string("2 OP_PICK 5 OP_PICK OP_SUB").expect("static");
        out += is_mod_equal_to(&StackNumber::bottom(), &BigInt::from(0), false, false, true);
        out += Script::parse_string("OP_BOOLAND OP_NOT OP_IF").expect("static");

        // generic chord addition, everything consumed
        out += self.point_algebraic_addition(
            &inner_opts,
            StackFiniteFieldElement::new(4, false, 1),
            StackEllipticCurvePoint::new(
                StackFiniteFieldElement::new(3, false, 1),
                StackFiniteFieldElement::new(2, false, 1),
            ),
            StackEllipticCurvePoint::new(
                StackFiniteFieldElement::new(1, false, 1),
                StackFiniteFieldElement::new(0, false, 1),
            ),
            7,
        )?;

        // P = -Q: drop everything, emit the sentinel
        out += Script::parse_string(
            "OP_ELSE OP_2DROP OP_2DROP OP_DROP 0x00 0x00 OP_ENDIF",
        )
        .expect("static");

        // P infinite: keep Q, drop P and the gradient
        out += Script::parse_string("OP_ELSE OP_2DROP OP_ROT OP_DROP OP_ENDIF").expect("static");

        // Q infinite: keep P, drop Q and the gradient
        out += Script::parse_string("OP_ELSE OP_2DROP OP_ROT OP_DROP OP_ENDIF").expect("static");

        if clean_constant {
            out += roll(-1, 1);
            out.push_opcode(Opcode::OP_DROP);
        }
        Ok(out)
    }

    /// Unrolled double-and-add multiplication `a * P` over `E(F_q)`.
    ///
    /// Stack in: `[q, .., step_blocks, marker_a_is_zero, P]`. Each step
    /// block is consumed from the fixed depth 4 and holds (top first) a
    /// doubling marker, the doubling gradient when the marker is set, then
    /// an addition marker and addition gradient when the scalar bit is
    /// set. Stack out: `[q, .., P, a*P]`, with the infinity sentinel
    /// replacing `a*P` when `a = 0`.
    pub fn unrolled_multiplication(
        &self,
        max_multiplier: &BigInt,
        opts: &BuildOptions,
    ) -> Result<Script, ScriptError> {
        opts.modulo_flags()?;
        let clean_constant = opts.clean_constant.unwrap_or(false);
        let steps = (max_multiplier.bits() as usize).saturating_sub(1);
        let field = &self.field;

        let mut out = constant_guard(opts, field.modulus());

        // T <- P
        out.push_opcode(Opcode::OP_2DUP);

        for i in (0..steps).rev() {
            let step_opts = BuildOptions {
                take_modulo: true,
                positive_modulo: opts.positive_modulo && i == 0,
                check_constant: false,
                clean_constant: Some(false),
                is_constant_reused: Some(false),
            };
            // stack: [.., gradients?, marker_doubling, P, T]
            out += roll(4, 1);
            out.push_opcode(Opcode::OP_IF);
            // doubling gradient now sits at depth 4
            out += self.point_algebraic_doubling(
                &step_opts,
                StackFiniteFieldElement::new(4, false, 1),
                StackEllipticCurvePoint::on_top(1),
                3,
            )?;
            out += roll(4, 1);
            out.push_opcode(Opcode::OP_IF);
            // addition gradient at depth 4; P is copied, T consumed
            out += self.point_algebraic_addition(
                &step_opts,
                StackFiniteFieldElement::new(4, false, 1),
                StackEllipticCurvePoint::new(
                    StackFiniteFieldElement::new(3, false, 1),
                    StackFiniteFieldElement::new(2, false, 1),
                ),
                StackEllipticCurvePoint::on_top(1),
                5,
            )?;
            out += Script::parse_string("OP_ENDIF OP_ENDIF").expect("static");
        }

        // a = 0 short-circuits to the infinity sentinel
        out += roll(4, 1);
        out += Script::parse_string("OP_IF OP_2DROP 0x00 0x00 OP_ENDIF").expect("static");

        if clean_constant {
            out += roll(-1, 1);
            out.push_opcode(Opcode::OP_DROP);
        }
        Ok(out)
    }

    /// Sum points parked on the stack and the altstack with
    /// sentinel-aware additions.
    ///
    /// One gradient witness per addition is consumed from below the
    /// accumulator (dummy values on infinity branches). A reduction is
    /// inserted every third addition.
    pub fn multi_addition(
        &self,
        n_points_on_stack: usize,
        n_points_on_altstack: usize,
        opts: &BuildOptions,
    ) -> Result<Script, ScriptError> {
        opts.modulo_flags()?;
        let clean_constant = opts.clean_constant.unwrap_or(false);
        let field = &self.field;
        let inner = |take: bool| BuildOptions {
            take_modulo: take,
            positive_modulo: false,
            check_constant: false,
            clean_constant: Some(false),
            is_constant_reused: Some(false),
        };

        let mut out = constant_guard(opts, field.modulus());
        let mut n_on_altstack = n_points_on_altstack;

        for i in 0..n_points_on_stack.saturating_sub(1) {
            out += self.point_addition_with_unknown_points(&inner(i % 3 == 2))?;
        }
        if n_points_on_stack == 0 {
            out += Script::parse_string("OP_FROMALTSTACK OP_FROMALTSTACK").expect("static");
            n_on_altstack = n_on_altstack.saturating_sub(1);
        }
        for i in 0..n_on_altstack {
            // the addition expects [.., lambda, acc, P]; the gradient for
            // this addition is the shallowest one remaining below acc
            out += Script::parse_string("OP_FROMALTSTACK OP_FROMALTSTACK").expect("static");
            out += self.point_addition_with_unknown_points(&inner(i % 3 == 2))?;
        }

        if opts.take_modulo {
            out += Script::parse_string("OP_2DUP OP_CAT 0x0000 OP_EQUAL OP_NOT OP_IF")
                .expect("static");
            out.push_opcode(Opcode::OP_TOALTSTACK);
            out += pick(-1, 1);
            out += mod_top(opts.positive_modulo, true);
            out += mod_from_altstack(opts.positive_modulo, false);
            out.push_opcode(Opcode::OP_ENDIF);
        }
        if clean_constant {
            out += roll(-1, 1);
            out.push_opcode(Opcode::OP_DROP);
        }
        Ok(out)
    }

    /// Fixed-base multi-scalar multiplication over `E(F_q)`.
    ///
    /// For each base the point is pushed as a literal, multiplied by the
    /// stack-supplied unrolled-multiplication witness, and parked on the
    /// altstack; the partial products are then folded with sentinel-aware
    /// additions whose gradients are likewise stack-supplied.
    #[tracing::instrument(level = "debug", skip_all, fields(bases = bases.len()))]
    pub fn msm_with_fixed_bases(
        &self,
        bases: &[[BigInt; 2]],
        max_multipliers: &[BigInt],
        opts: &BuildOptions,
    ) -> Result<Script, ScriptError> {
        if bases.len() != max_multipliers.len() {
            return Err(ScriptError::UnsupportedConfiguration(
                "one max multiplier is needed per base".into(),
            ));
        }
        opts.modulo_flags()?;
        let clean_constant = opts.clean_constant.unwrap_or(false);
        let field = &self.field;
        let inner = BuildOptions {
            take_modulo: true,
            positive_modulo: false,
            check_constant: false,
            clean_constant: Some(false),
            is_constant_reused: Some(false),
        };

        let mut out = constant_guard(opts, field.modulus());
        for (base, multiplier) in bases.iter().zip(max_multipliers) {
            out += nums_to_script(base);
            out += self.unrolled_multiplication(multiplier, &inner)?;
            out += Script::parse_string("OP_TOALTSTACK OP_TOALTSTACK OP_2DROP").expect("static");
        }
        out += self.multi_addition(
            0,
            bases.len(),
            &BuildOptions {
                check_constant: false,
                clean_constant: Some(clean_constant),
                ..*opts
            },
        )?;
        tracing::debug!(items = out.len(), "emitted fixed-base msm");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::TowerNonResidue;

    fn curve() -> EllipticCurveFq {
        EllipticCurveAffine::new(Fq::new(BigInt::from(19)), vec![BigInt::from(0)])
    }

    fn lambda() -> StackFiniteFieldElement {
        StackFiniteFieldElement::new(4, false, 1)
    }

    fn p_point() -> StackEllipticCurvePoint {
        StackEllipticCurvePoint::new(
            StackFiniteFieldElement::new(3, false, 1),
            StackFiniteFieldElement::new(2, false, 1),
        )
    }

    fn q_point() -> StackEllipticCurvePoint {
        StackEllipticCurvePoint::on_top(1)
    }

    #[test]
    fn addition_verifies_gradient_and_reduces() {
        let opts = BuildOptions::default()
            .with_take_modulo(true)
            .with_clean_constant(false)
            .with_constant_reused(false);
        let script = curve()
            .point_algebraic_addition(&opts, lambda(), p_point(), q_point(), 7)
            .unwrap();
        // one gradient equation checked, two output coordinates reduced
        assert_eq!(script.count_op(Opcode::OP_EQUALVERIFY), 1);
        assert!(script.count_op(Opcode::OP_MOD) >= 3);
    }

    #[test]
    fn doubling_checks_curve_coefficient() {
        let curve_a3 = EllipticCurveAffine::new(Fq::new(BigInt::from(19)), vec![BigInt::from(3)]);
        let p = StackEllipticCurvePoint::on_top(1);
        let l = StackFiniteFieldElement::new(2, false, 1);
        let with_a = curve_a3
            .point_algebraic_doubling(&BuildOptions::default(), l, p, 3)
            .unwrap();
        let without_a = curve()
            .point_algebraic_doubling(&BuildOptions::default(), l, p, 3)
            .unwrap();
        assert_ne!(with_a, without_a);
    }

    #[test]
    fn fq2_instantiation_builds() {
        let fq2 = Fq2::new(BigInt::from(19), BigInt::from(-1), TowerNonResidue::OnePlusU);
        let curve = EllipticCurveAffine::new(fq2, vec![BigInt::from(0), BigInt::from(0)]);
        let l = StackFiniteFieldElement::new(9, false, 2);
        let p = StackEllipticCurvePoint::new(
            StackFiniteFieldElement::new(7, false, 2),
            StackFiniteFieldElement::new(5, false, 2),
        );
        let q = StackEllipticCurvePoint::new(
            StackFiniteFieldElement::new(3, false, 2),
            StackFiniteFieldElement::new(1, false, 2),
        );
        let script = curve
            .point_algebraic_addition(&BuildOptions::default(), l, p, q, 7)
            .unwrap();
        assert!(!script.is_empty());
    }

    #[test]
    fn unknown_points_has_three_branches() {
        let script = curve()
            .point_addition_with_unknown_points(&BuildOptions::default().with_clean_constant(false))
            .unwrap();
        assert_eq!(script.count_op(Opcode::OP_IF), 3);
        assert_eq!(script.count_op(Opcode::OP_ELSE), 3);
        assert_eq!(script.count_op(Opcode::OP_ENDIF), 3);
    }

    #[test]
    fn msm_rejects_mismatched_multiplier_count() {
        let bases = vec![[BigInt::from(1), BigInt::from(2)]; 3];
        let multipliers = vec![BigInt::from(8); 2];
        let opts = BuildOptions::default()
            .with_take_modulo(true)
            .with_clean_constant(false)
            .with_constant_reused(false);
        assert!(matches!(
            curve().msm_with_fixed_bases(&bases, &multipliers, &opts),
            Err(ScriptError::UnsupportedConfiguration(_))
        ));
    }

    #[test]
    fn unrolled_multiplication_step_count() {
        let opts = BuildOptions::default()
            .with_clean_constant(false)
            .with_constant_reused(false);
        let script = curve()
            .unrolled_multiplication(&BigInt::from(8), &opts)
            .unwrap();
        // ceil(log2(8)) = 3 doubling steps, one a == 0 branch
        assert_eq!(script.count_op(Opcode::OP_IF), 3 * 2 + 1);
    }

    #[test]
    fn zero_scalar_sentinel_is_emitted() {
        let opts = BuildOptions::default()
            .with_clean_constant(false)
            .with_constant_reused(false);
        let script = curve()
            .unrolled_multiplication(&BigInt::from(4), &opts)
            .unwrap();
        let text = script.to_string();
        assert!(text.ends_with("OP_IF OP_2DROP 0x00 0x00 OP_ENDIF"));
    }
}
