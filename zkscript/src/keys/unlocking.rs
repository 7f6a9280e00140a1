use num_bigint::BigInt;
use num_traits::Zero;
use txscript::Script;

use crate::pairing::PairingOps;
use crate::util::nums_to_script;
use crate::ScriptError;

/// The gradient witnesses of one executed double-and-add step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepGradient {
    /// Gradient of the tangent at the running point.
    pub doubling: BigInt,
    /// Gradient of the chord to the base point, present when the scalar
    /// bit is set.
    pub addition: Option<BigInt>,
}

/// Witness for one unrolled scalar multiplication `a * P`.
///
/// The locking script consumes, per unrolled step, a block of markers and
/// gradients from a fixed depth; blocks are stacked so the first executed
/// step sits shallowest, with the `a = 0` short-circuit marker at the
/// bottom.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnrolledMultiplicationUnlockingKey {
    pub scalar: BigInt,
    pub max_multiplier: BigInt,
    /// One entry per executed step, in execution order (most significant
    /// scalar bit first, the leading bit excluded).
    pub gradients: Vec<StepGradient>,
}

impl UnrolledMultiplicationUnlockingKey {
    /// The scalar bits driving the executed steps, most significant bit
    /// excluded.
    fn executed_bits(&self) -> Vec<bool> {
        if self.scalar.is_zero() {
            return Vec::new();
        }
        let (_, bytes) = self.scalar.to_radix_be(2);
        bytes.into_iter().skip(1).map(|b| b == 1).collect()
    }

    pub fn to_unlocking_script(&self) -> Result<Script, ScriptError> {
        let steps = (self.max_multiplier.bits() as usize).saturating_sub(1);
        let executed = self.executed_bits();
        if executed.len() > steps {
            return Err(ScriptError::UnsupportedConfiguration(
                "the scalar does not fit under the max multiplier".into(),
            ));
        }
        if executed.len() != self.gradients.len() {
            return Err(ScriptError::UnsupportedConfiguration(
                "one gradient entry is needed per executed step".into(),
            ));
        }

        let mut out = Script::new();
        // consumed last: the a = 0 short-circuit marker
        out.push_int(&BigInt::from(u8::from(self.scalar.is_zero())));

        // executed blocks, last-consumed pushed first
        for (bit, gradient) in executed.iter().zip(&self.gradients).rev() {
            if *bit {
                let addition = gradient.addition.as_ref().ok_or_else(|| {
                    ScriptError::UnsupportedConfiguration(
                        "a set scalar bit needs an addition gradient".into(),
                    )
                })?;
                out.push_int(addition);
                out.push_int(&BigInt::from(1));
            } else {
                out.push_int(&BigInt::from(0));
            }
            out.push_int(&gradient.doubling);
            out.push_int(&BigInt::from(1));
        }

        // skipped leading steps, consumed first
        for _ in 0..steps - executed.len() {
            out.push_int(&BigInt::from(0));
        }
        Ok(out)
    }
}

/// Witness for one unrolled scalar multiplication in projective
/// coordinates: markers only, since the point arithmetic needs no
/// gradients.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectiveUnrolledMultiplicationUnlockingKey {
    pub scalar: BigInt,
    pub max_multiplier: BigInt,
    /// Pad skipped steps so every step block has the same length,
    /// making the scalar recoverable from the witness.
    pub fixed_length: bool,
}

impl ProjectiveUnrolledMultiplicationUnlockingKey {
    pub fn to_unlocking_script(&self) -> Result<Script, ScriptError> {
        let steps = (self.max_multiplier.bits() as usize).saturating_sub(1);
        let executed: Vec<bool> = if self.scalar.is_zero() {
            Vec::new()
        } else {
            let (_, bits) = self.scalar.to_radix_be(2);
            bits.into_iter().skip(1).map(|b| b == 1).collect()
        };
        if executed.len() > steps {
            return Err(ScriptError::UnsupportedConfiguration(
                "the scalar does not fit under the max multiplier".into(),
            ));
        }

        let mut out = Script::new();
        out.push_int(&BigInt::from(u8::from(self.scalar.is_zero())));

        for bit in executed.iter().rev() {
            out.push_int(&BigInt::from(u8::from(*bit)));
            out.push_int(&BigInt::from(1));
        }
        for _ in 0..steps - executed.len() {
            if self.fixed_length {
                // the skip branch drops one padding marker
                out.push_int(&BigInt::from(0));
            }
            out.push_int(&BigInt::from(0));
        }
        Ok(out)
    }
}

/// Witness for a fixed-base multi-scalar multiplication in projective
/// coordinates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MsmWithFixedBasesProjectiveUnlockingKey {
    pub scalar_multiplications: Vec<ProjectiveUnrolledMultiplicationUnlockingKey>,
}

impl MsmWithFixedBasesProjectiveUnlockingKey {
    pub fn to_unlocking_script(&self) -> Result<Script, ScriptError> {
        let mut out = Script::new();
        for key in self.scalar_multiplications.iter().rev() {
            out += key.to_unlocking_script()?;
        }
        Ok(out)
    }
}

/// Witness for the projective triple Miller loop: the proof points plus
/// the inverse of the accumulated line-evaluation denominator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TripleMillerLoopProjUnlockingKey {
    pub p: [[BigInt; 2]; 3],
    pub q: [[BigInt; 4]; 3],
    pub inverse_denominator: BigInt,
}

impl TripleMillerLoopProjUnlockingKey {
    pub fn to_unlocking_script<P: PairingOps>(
        &self,
        pairing: &P,
        load_modulus: bool,
    ) -> Script {
        let mut out = if load_modulus {
            nums_to_script(&[pairing.modulus().clone()])
        } else {
            Script::new()
        };
        out.push_int(&self.inverse_denominator);
        for point in &self.p {
            out += nums_to_script(point);
        }
        for point in &self.q {
            out += nums_to_script(point);
        }
        out
    }
}

/// Witness for a fixed-base multi-scalar multiplication.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MsmWithFixedBasesUnlockingKey {
    /// One multiplication witness per base, in base order.
    pub scalar_multiplications: Vec<UnrolledMultiplicationUnlockingKey>,
    /// Gradients of the partial-sum additions, in execution order (dummy
    /// values where an operand is the point at infinity).
    pub addition_gradients: Vec<BigInt>,
}

impl MsmWithFixedBasesUnlockingKey {
    pub fn to_unlocking_script(&self) -> Result<Script, ScriptError> {
        let mut out = Script::new();
        // the summation gradients are consumed after every multiplication
        for gradient in self.addition_gradients.iter().rev() {
            out.push_int(gradient);
        }
        // the first base's blocks must end up shallowest
        for key in self.scalar_multiplications.iter().rev() {
            out += key.to_unlocking_script()?;
        }
        Ok(out)
    }
}

/// The per-iteration gradient witnesses of the triple Miller loop: one
/// tangent gradient per pairing, and one chord gradient per pairing on
/// non-zero digits. Gradients are coefficient vectors over `F_q`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepPairingGradients {
    pub tangent: [Vec<BigInt>; 3],
    pub chord: Option<[Vec<BigInt>; 3]>,
}

fn push_triple_gradients(out: &mut Script, steps: &[StepPairingGradients]) {
    // last-consumed step deepest; within a step the chord gradients are
    // consumed after the tangents, pair 1 always first
    for step in steps.iter().rev() {
        if let Some(chord) = &step.chord {
            for gradient in chord.iter().rev() {
                *out += nums_to_script(gradient);
            }
        }
        for gradient in step.tangent.iter().rev() {
            *out += nums_to_script(gradient);
        }
    }
}

/// Witness for the full Groth16 verifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Groth16UnlockingKey {
    pub a: [BigInt; 2],
    pub b: [BigInt; 4],
    pub c: [BigInt; 2],
    /// The inverse of
    /// `miller(A, B) * miller(sum, -gamma) * miller(C, -delta)`.
    pub inverse_miller_output: Vec<BigInt>,
    /// Gradients of the triple Miller loop, in execution order.
    pub gradients_pairings: Vec<StepPairingGradients>,
    /// Witnesses for `sum_i pub_i * gamma_abc[i+1]`.
    pub msm_key: MsmWithFixedBasesUnlockingKey,
    /// Gradient of the final `gamma_abc[0]` addition (a dummy value when
    /// either operand is the point at infinity).
    pub gamma_abc_zero_gradient: BigInt,
}

impl Groth16UnlockingKey {
    /// Push the witness in the order the verifier consumes it.
    pub fn to_unlocking_script<P: PairingOps>(
        &self,
        pairing: &P,
        load_modulus: bool,
    ) -> Result<Script, ScriptError> {
        if self.inverse_miller_output.len() != pairing.n_elements_miller_output() {
            return Err(ScriptError::UnsupportedConfiguration(
                "the inverse Miller output has the wrong coordinate count".into(),
            ));
        }
        let mut out = if load_modulus {
            nums_to_script(&[pairing.modulus().clone()])
        } else {
            Script::new()
        };
        out += nums_to_script(&self.inverse_miller_output);
        push_triple_gradients(&mut out, &self.gradients_pairings);
        out += nums_to_script(&self.a);
        out += nums_to_script(&self.c);
        out += nums_to_script(&self.b);
        out.push_int(&self.gamma_abc_zero_gradient);
        out += self.msm_key.to_unlocking_script()?;
        Ok(out)
    }
}

/// Witness for the precomputed-MSM verifier: the statement commitment is
/// supplied directly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Groth16UnlockingKeyWithPrecomputedMsm {
    pub a: [BigInt; 2],
    pub b: [BigInt; 4],
    pub c: [BigInt; 2],
    pub inverse_miller_output: Vec<BigInt>,
    pub gradients_pairings: Vec<StepPairingGradients>,
    /// The precomputed `gamma_abc[0] + sum_i pub_i * gamma_abc[i+1]`.
    pub precomputed_msm: [BigInt; 2],
}

impl Groth16UnlockingKeyWithPrecomputedMsm {
    pub fn to_unlocking_script<P: PairingOps>(
        &self,
        pairing: &P,
        load_modulus: bool,
    ) -> Script {
        let mut out = if load_modulus {
            nums_to_script(&[pairing.modulus().clone()])
        } else {
            Script::new()
        };
        out += nums_to_script(&self.inverse_miller_output);
        push_triple_gradients(&mut out, &self.gradients_pairings);
        out += nums_to_script(&self.a);
        out += nums_to_script(&self.c);
        out += nums_to_script(&self.b);
        out += nums_to_script(&self.precomputed_msm);
        out
    }
}

/// Witness for a standalone single Miller loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MillerLoopUnlockingKey {
    pub p: [BigInt; 2],
    pub q: [BigInt; 4],
    /// One entry per loop iteration, in execution order; gradients are
    /// coefficient vectors over `F_q`.
    pub gradients: Vec<MillerLoopStepGradients>,
}

/// Extension-field gradients of one single-loop step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MillerLoopStepGradients {
    pub tangent: Vec<BigInt>,
    pub chord: Option<Vec<BigInt>>,
}

impl MillerLoopUnlockingKey {
    pub fn to_unlocking_script<P: PairingOps>(
        &self,
        pairing: &P,
        load_modulus: bool,
    ) -> Script {
        let mut out = if load_modulus {
            nums_to_script(&[pairing.modulus().clone()])
        } else {
            Script::new()
        };
        for step in self.gradients.iter().rev() {
            if let Some(chord) = &step.chord {
                out += nums_to_script(chord);
            }
            out += nums_to_script(&step.tangent);
        }
        out += nums_to_script(&self.p);
        out += nums_to_script(&self.q);
        out
    }
}

/// Witness for a standalone pairing check: a Miller loop followed by the
/// final exponentiation with its witnessed inverse.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PairingUnlockingKey {
    pub p: [BigInt; 2],
    pub q: [BigInt; 4],
    pub gradients: Vec<MillerLoopStepGradients>,
    pub inverse_miller_output: Vec<BigInt>,
}

impl PairingUnlockingKey {
    pub fn to_unlocking_script<P: PairingOps>(
        &self,
        pairing: &P,
        load_modulus: bool,
    ) -> Script {
        let mut out = if load_modulus {
            nums_to_script(&[pairing.modulus().clone()])
        } else {
            Script::new()
        };
        out += nums_to_script(&self.inverse_miller_output);
        for step in self.gradients.iter().rev() {
            if let Some(chord) = &step.chord {
                out += nums_to_script(chord);
            }
            out += nums_to_script(&step.tangent);
        }
        out += nums_to_script(&self.p);
        out += nums_to_script(&self.q);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use txscript::{Opcode, ScriptItem};

    #[test]
    fn zero_scalar_is_markers_only() {
        let key = UnrolledMultiplicationUnlockingKey {
            scalar: BigInt::from(0),
            max_multiplier: BigInt::from(16),
            gradients: Vec::new(),
        };
        let script = key.to_unlocking_script().unwrap();
        // marker_a_is_zero = 1 plus four skipped-step markers
        assert_eq!(
            script.items(),
            &[
                ScriptItem::Op(Opcode::OP_1),
                ScriptItem::Op(Opcode::OP_0),
                ScriptItem::Op(Opcode::OP_0),
                ScriptItem::Op(Opcode::OP_0),
                ScriptItem::Op(Opcode::OP_0),
            ]
        );
    }

    #[test]
    fn executed_steps_carry_markers_and_gradients() {
        // scalar 5 = 0b101: steps for bits 0 and 1 after the leading bit
        let key = UnrolledMultiplicationUnlockingKey {
            scalar: BigInt::from(5),
            max_multiplier: BigInt::from(8),
            gradients: vec![
                StepGradient {
                    doubling: BigInt::from(11),
                    addition: None,
                },
                StepGradient {
                    doubling: BigInt::from(12),
                    addition: Some(BigInt::from(13)),
                },
            ],
        };
        let script = key.to_unlocking_script().unwrap();
        let text = script.to_string();
        // deepest-first: a != 0 marker, then the step for the low bit
        // (with its addition gradient), then the zero bit's step, then the
        // single skipped step
        assert_eq!(text, "OP_0 OP_13 OP_1 OP_12 OP_1 OP_0 OP_11 OP_1 OP_0");
    }

    #[test]
    fn projective_key_is_markers_only() {
        // scalar 5 = 0b101 over three steps: one skipped, then bits 0, 1
        let key = ProjectiveUnrolledMultiplicationUnlockingKey {
            scalar: BigInt::from(5),
            max_multiplier: BigInt::from(16),
            fixed_length: false,
        };
        assert_eq!(
            key.to_unlocking_script().unwrap().to_string(),
            "OP_0 OP_1 OP_1 OP_0 OP_1 OP_0 OP_0"
        );
        let fixed = ProjectiveUnrolledMultiplicationUnlockingKey {
            fixed_length: true,
            ..key
        };
        assert_eq!(
            fixed.to_unlocking_script().unwrap().to_string(),
            "OP_0 OP_1 OP_1 OP_0 OP_1 OP_0 OP_0 OP_0 OP_0"
        );
    }

    #[test]
    fn oversized_scalar_is_rejected() {
        let key = UnrolledMultiplicationUnlockingKey {
            scalar: BigInt::from(9),
            max_multiplier: BigInt::from(8),
            gradients: vec![
                StepGradient {
                    doubling: BigInt::from(1),
                    addition: None,
                };
                3
            ],
        };
        assert!(matches!(
            key.to_unlocking_script(),
            Err(ScriptError::UnsupportedConfiguration(_))
        ));
    }

    #[test]
    fn set_bit_without_addition_gradient_is_rejected() {
        let key = UnrolledMultiplicationUnlockingKey {
            scalar: BigInt::from(3),
            max_multiplier: BigInt::from(4),
            gradients: vec![StepGradient {
                doubling: BigInt::from(1),
                addition: None,
            }],
        };
        assert!(matches!(
            key.to_unlocking_script(),
            Err(ScriptError::UnsupportedConfiguration(_))
        ));
    }

    #[test]
    fn scalar_bit_count_must_match_gradients() {
        let bits = UnrolledMultiplicationUnlockingKey {
            scalar: BigInt::from(6),
            max_multiplier: BigInt::from(8),
            gradients: vec![
                StepGradient {
                    doubling: BigInt::from(1),
                    addition: Some(BigInt::from(2)),
                },
                StepGradient {
                    doubling: BigInt::from(3),
                    addition: None,
                },
            ],
        }
        .executed_bits();
        assert_eq!(bits, vec![true, false]);
    }
}
