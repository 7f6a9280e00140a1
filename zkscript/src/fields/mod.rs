//! Script builders for prime-field and tower-field arithmetic.
//!
//! Every operation follows the uniform contract of [`crate::BuildOptions`]:
//! operands are addressed by [`crate::stack::StackFiniteFieldElement`]
//! descriptors, a rolling bitmask decides which operands are consumed, and
//! an optional batched modular-reduction tail normalises the result.
//!
//! Elements of `F_{q^n}` occupy `n` consecutive stack scalars, low
//! coordinate pushed first.

pub mod fq;
pub mod fq12_2over3over2;
pub mod fq2;
pub mod fq4;
pub mod fq6_3over2;

pub use fq::Fq;
pub use fq12_2over3over2::Fq12;
pub use fq2::{Fq2, TowerNonResidue};
pub use fq4::Fq4;
pub use fq6_3over2::Fq6;

use num_bigint::BigInt;
use txscript::{Opcode, Script};

use crate::stack::{check_order, StackFiniteFieldElement};
use crate::util::{
    bitmask_to_boolean_list, mod_from_altstack, mod_top, move_element, pick, roll,
    verify_bottom_constant, MoveMode,
};
use crate::{BuildOptions, ScriptError};

/// Arithmetic over an extension of the prime field, one provided method per
/// coordinate-wise operation.
///
/// Implementors supply the characteristic and the extension degree; the
/// provided methods cover the operations whose emission is uniform across
/// every tower level. Layer-specific multiplication, squaring and Frobenius
/// live on the concrete types.
pub trait PrimeFieldExtension {
    /// The characteristic of the prime field.
    fn modulus(&self) -> &BigInt;

    /// The number of scalars encoding one element.
    fn extension_degree(&self) -> usize;

    /// The script builder for the underlying prime field.
    fn prime_field(&self) -> Fq {
        Fq::new(self.modulus().clone())
    }

    /// The element of this degree sitting on top of the stack.
    fn top_element(&self) -> StackFiniteFieldElement {
        StackFiniteFieldElement::on_top(self.extension_degree())
    }

    /// The element of this degree sitting directly below [`Self::top_element`].
    fn second_element(&self) -> StackFiniteFieldElement {
        self.top_element().shift(self.extension_degree() as i64)
    }

    /// Batched modular reduction of an element split between the stack and
    /// the altstack.
    ///
    /// Stack in: `[q-at-bottom, .., x0]`, altstack `[x_{n-1}, .., x1]`;
    /// stack out: `[.., x0 % q, .., x_{n-1} % q]`, altstack empty.
    fn take_modulo(
        &self,
        positive_modulo: bool,
        clean_constant: bool,
        is_constant_reused: bool,
    ) -> Script {
        let n = self.extension_degree();
        let mut out = if clean_constant {
            roll(-1, 1)
        } else {
            pick(-1, 1)
        };
        if n == 1 {
            return out + mod_top(positive_modulo, is_constant_reused);
        }
        out += mod_top(positive_modulo, true);
        for _ in 0..n - 2 {
            out += mod_from_altstack(positive_modulo, true);
        }
        out + mod_from_altstack(positive_modulo, is_constant_reused)
    }

    /// Reduction tail for builders that finish with the whole element on the
    /// stack: park all but the deepest coordinate on the altstack, then run
    /// the batched reduction. Emits nothing when no reduction is requested.
    fn tail_in_place(
        &self,
        opts: &BuildOptions,
        clean_constant: bool,
        is_constant_reused: bool,
    ) -> Script {
        let mut out = Script::new();
        if opts.take_modulo {
            for _ in 0..self.extension_degree() - 1 {
                out.push_opcode(Opcode::OP_TOALTSTACK);
            }
            out += self.take_modulo(opts.positive_modulo, clean_constant, is_constant_reused);
        }
        out
    }

    /// Drain the altstack tail of an element when no reduction is requested.
    fn from_altstack(&self) -> Script {
        let mut out = Script::new();
        for _ in 0..self.extension_degree() - 1 {
            out.push_opcode(Opcode::OP_FROMALTSTACK);
        }
        out
    }

    /// `± x ± y`, signs taken from the descriptors' negate flags.
    fn algebraic_sum(
        &self,
        opts: &BuildOptions,
        x: StackFiniteFieldElement,
        y: StackFiniteFieldElement,
        rolling_options: u32,
    ) -> Result<Script, ScriptError> {
        let n = self.extension_degree();
        for operand in [&x, &y] {
            if operand.extension_degree != n {
                return Err(ScriptError::ExtensionDegreeMismatch {
                    expected: n,
                    got: operand.extension_degree,
                });
            }
        }
        check_order(&[&x, &y])?;
        let (clean_constant, is_constant_reused) = opts.modulo_flags()?;
        let rolled = bitmask_to_boolean_list(rolling_options, 2);
        let (x_rolled, y_rolled) = (rolled[0], rolled[1]);

        let mut out = if opts.check_constant {
            verify_bottom_constant(self.modulus())
        } else {
            Script::new()
        };

        // Components are consumed top-down; each iteration removes one
        // scalar of every rolled operand above the remaining ones.
        let fq = self.prime_field();
        let shrink = i64::from(x_rolled) + i64::from(y_rolled);
        for i in 0..n {
            let step = fq.algebraic_sum(
                &BuildOptions::default(),
                x.shift(-(i as i64) * shrink).extract_component(n - 1 - i),
                y.shift(-(i as i64) * i64::from(y_rolled))
                    .extract_component(n - 1 - i),
                rolling_options,
            )?;
            out += step;
            if i != n - 1 {
                out.push_opcode(Opcode::OP_TOALTSTACK);
            }
        }

        if opts.take_modulo {
            out += self.take_modulo(opts.positive_modulo, clean_constant, is_constant_reused);
        } else {
            out += self.from_altstack();
        }
        Ok(out)
    }

    /// `x + y`. Negate flags must be unset; use [`Self::algebraic_sum`] for
    /// signed variants.
    fn add(
        &self,
        opts: &BuildOptions,
        x: StackFiniteFieldElement,
        y: StackFiniteFieldElement,
        rolling_options: u32,
    ) -> Result<Script, ScriptError> {
        debug_assert!(!x.negate && !y.negate);
        self.algebraic_sum(opts, x, y, rolling_options)
    }

    /// `x - y`.
    fn subtract(
        &self,
        opts: &BuildOptions,
        x: StackFiniteFieldElement,
        y: StackFiniteFieldElement,
        rolling_options: u32,
    ) -> Result<Script, ScriptError> {
        debug_assert!(!x.negate && !y.negate);
        self.algebraic_sum(opts, x, y.set_negate(true), rolling_options)
    }

    /// `-x`, element brought to the top first.
    fn negate(
        &self,
        opts: &BuildOptions,
        x: StackFiniteFieldElement,
        rolled: bool,
    ) -> Result<Script, ScriptError> {
        let n = self.extension_degree();
        if x.extension_degree != n {
            return Err(ScriptError::ExtensionDegreeMismatch {
                expected: n,
                got: x.extension_degree,
            });
        }
        let (clean_constant, is_constant_reused) = opts.modulo_flags()?;
        let mut out = if opts.check_constant {
            verify_bottom_constant(self.modulus())
        } else {
            Script::new()
        };
        out += move_element(&x, MoveMode::from_bool(rolled));
        for _ in 0..n - 1 {
            out.push_opcode(Opcode::OP_NEGATE);
            out.push_opcode(Opcode::OP_TOALTSTACK);
        }
        out.push_opcode(Opcode::OP_NEGATE);
        if opts.take_modulo {
            out += self.take_modulo(opts.positive_modulo, clean_constant, is_constant_reused);
        } else {
            out += self.from_altstack();
        }
        Ok(out)
    }

    /// `scalar * x` for a stack-resident scalar in `F_q`.
    fn base_field_scalar_mul(
        &self,
        opts: &BuildOptions,
        x: StackFiniteFieldElement,
        scalar: StackFiniteFieldElement,
        rolling_options: u32,
    ) -> Result<Script, ScriptError> {
        let n = self.extension_degree();
        if scalar.extension_degree != 1 {
            return Err(ScriptError::ExtensionDegreeMismatch {
                expected: 1,
                got: scalar.extension_degree,
            });
        }
        if x.extension_degree != n {
            return Err(ScriptError::ExtensionDegreeMismatch {
                expected: n,
                got: x.extension_degree,
            });
        }
        check_order(&[&x, &scalar])?;
        let (clean_constant, is_constant_reused) = opts.modulo_flags()?;
        let rolled = bitmask_to_boolean_list(rolling_options, 2);
        let (x_rolled, scalar_rolled) = (rolled[0], rolled[1]);

        let mut out = if opts.check_constant {
            verify_bottom_constant(self.modulus())
        } else {
            Script::new()
        };

        let is_default_config =
            x.position == n as i64 && scalar.position == 0 && x_rolled && scalar_rolled;
        if is_default_config {
            if scalar.negate {
                out.push_opcode(Opcode::OP_NEGATE);
            }
            for _ in 0..n - 1 {
                out += Script::parse_string("OP_TUCK OP_MUL OP_TOALTSTACK").expect("static");
            }
            out.push_opcode(Opcode::OP_MUL);
        } else {
            out += move_element(&scalar, MoveMode::from_bool(scalar_rolled));
            if scalar.negate {
                out.push_opcode(Opcode::OP_NEGATE);
            }
            for i in (0..n).rev() {
                let component = x
                    .shift(1 - i64::from(scalar_rolled) - ((n - 1 - i) as i64) * i64::from(x_rolled))
                    .extract_component(i);
                out += move_element(&component, MoveMode::from_bool(x_rolled));
                if i != 0 {
                    out += Script::parse_string("OP_OVER OP_MUL OP_TOALTSTACK").expect("static");
                } else {
                    out.push_opcode(Opcode::OP_MUL);
                }
            }
        }

        if opts.take_modulo {
            out += self.take_modulo(opts.positive_modulo, clean_constant, is_constant_reused);
        } else {
            out += self.from_altstack();
        }
        Ok(out)
    }
}

/// The layer interface consumed by the elliptic-curve and pairing builders:
/// the operations every coordinate field exposes on top of the uniform
/// [`PrimeFieldExtension`] surface.
pub trait FieldScriptOps: PrimeFieldExtension {
    /// `x * y` under the uniform flag contract.
    fn mul(
        &self,
        opts: &BuildOptions,
        x: StackFiniteFieldElement,
        y: StackFiniteFieldElement,
        rolling_options: u32,
    ) -> Result<Script, ScriptError>;

    /// `x^2` under the uniform flag contract.
    fn square(
        &self,
        opts: &BuildOptions,
        x: StackFiniteFieldElement,
        rolled: bool,
    ) -> Result<Script, ScriptError>;

    /// `x * c` for a constant given by its coefficient vector over `F_q`.
    fn mul_by_constant(
        &self,
        opts: &BuildOptions,
        x: StackFiniteFieldElement,
        constant: &[BigInt],
        rolled: bool,
    ) -> Result<Script, ScriptError>;
}

impl PrimeFieldExtension for Fq {
    fn modulus(&self) -> &BigInt {
        Fq::modulus(self)
    }

    fn extension_degree(&self) -> usize {
        1
    }
}

impl FieldScriptOps for Fq {
    fn mul(
        &self,
        opts: &BuildOptions,
        x: StackFiniteFieldElement,
        y: StackFiniteFieldElement,
        rolling_options: u32,
    ) -> Result<Script, ScriptError> {
        Fq::mul(self, opts, x, y, rolling_options)
    }

    fn square(
        &self,
        opts: &BuildOptions,
        x: StackFiniteFieldElement,
        rolled: bool,
    ) -> Result<Script, ScriptError> {
        Fq::square(self, opts, x, rolled)
    }

    fn mul_by_constant(
        &self,
        opts: &BuildOptions,
        x: StackFiniteFieldElement,
        constant: &[BigInt],
        rolled: bool,
    ) -> Result<Script, ScriptError> {
        Fq::mul_by_constant(self, opts, x, &constant[0], rolled)
    }
}

impl FieldScriptOps for Fq2 {
    fn mul(
        &self,
        opts: &BuildOptions,
        x: StackFiniteFieldElement,
        y: StackFiniteFieldElement,
        rolling_options: u32,
    ) -> Result<Script, ScriptError> {
        Fq2::mul(self, opts, x, y, rolling_options)
    }

    fn square(
        &self,
        opts: &BuildOptions,
        x: StackFiniteFieldElement,
        rolled: bool,
    ) -> Result<Script, ScriptError> {
        Fq2::square(self, opts, x, rolled)
    }

    fn mul_by_constant(
        &self,
        opts: &BuildOptions,
        x: StackFiniteFieldElement,
        constant: &[BigInt],
        rolled: bool,
    ) -> Result<Script, ScriptError> {
        let pair = [
            constant[0].clone(),
            constant.get(1).cloned().unwrap_or_default(),
        ];
        Fq2::mul_by_constant(self, opts, x, &pair, rolled)
    }
}

/// Guard prefix shared by every builder: empty unless `check_constant` is
/// set.
pub(crate) fn constant_guard(opts: &BuildOptions, modulus: &BigInt) -> Script {
    if opts.check_constant {
        verify_bottom_constant(modulus)
    } else {
        Script::new()
    }
}

/// Bring a pair of operands into the default `[.., x, y]` top-of-stack
/// layout, honouring the rolling modes.
///
/// Returns the empty script when the operands already sit in the default
/// layout and are both consumed.
pub(crate) fn bring_pair_to_top(
    x: StackFiniteFieldElement,
    y: StackFiniteFieldElement,
    x_rolled: bool,
    y_rolled: bool,
) -> Script {
    let n = x.extension_degree as i64;
    let m = y.extension_degree as i64;
    let default_layout = x.position == n + m - 1 && y.position == m - 1;
    if default_layout && x_rolled && y_rolled {
        return Script::new();
    }
    // x first (it is deeper), then y, which now sits n scalars lower
    let mut out = move_element(&x, MoveMode::from_bool(x_rolled));
    out += move_element(&y.shift(n), MoveMode::from_bool(y_rolled));
    out
}

/// Bring a single operand on top, honouring the rolling mode.
pub(crate) fn bring_to_top(x: StackFiniteFieldElement, rolled: bool) -> Script {
    move_element(&x, MoveMode::from_bool(rolled))
}
