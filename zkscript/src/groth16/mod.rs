//! Groth16 verifier composition.
//!
//! The locking script verifies the equation
//! `e(A, B) * e(sum, -gamma) * e(C, -delta) = alpha_beta`, where `sum` is
//! the fixed-base MSM over `gamma_abc` driven by the public inputs. The
//! unlocking script supplies the proof, the public-input multiplication
//! witnesses, the gradients for every curve operation, and the inverse of
//! the Miller product for the easy part of the final exponentiation.

use num_bigint::BigInt;
use txscript::{Opcode, Script};

use crate::curves::EllipticCurveFq;
use crate::fields::{constant_guard, Fq};
use crate::keys::{Groth16LockingKey, Groth16LockingKeyWithPrecomputedMsm};
use crate::pairing::{PairingOps, TripleMillerLoop};
use crate::util::{nums_to_script, roll};
use crate::{BuildOptions, ScriptError};

/// The Groth16 verifier builder over a pairing operation record.
pub struct Groth16<P: PairingOps> {
    pairing: P,
    base_curve: EllipticCurveFq,
    r: BigInt,
}

/// Verifier wired for BLS12-381.
pub fn bls12_381() -> Groth16<crate::bls12_381::Bls12_381> {
    Groth16::new(
        crate::bls12_381::Bls12_381::new(),
        EllipticCurveFq::new(
            Fq::new(crate::bls12_381::MODULUS.clone()),
            vec![crate::bls12_381::CURVE_A.clone()],
        ),
        crate::bls12_381::ORDER.clone(),
    )
}

/// Verifier wired for MNT4-753.
pub fn mnt4_753() -> Groth16<crate::mnt4_753::Mnt4_753> {
    Groth16::new(
        crate::mnt4_753::Mnt4_753::new(),
        EllipticCurveFq::new(
            Fq::new(crate::mnt4_753::MODULUS.clone()),
            vec![crate::mnt4_753::CURVE_A.clone()],
        ),
        crate::mnt4_753::ORDER.clone(),
    )
}

impl<P: PairingOps> Groth16<P> {
    pub fn new(pairing: P, base_curve: EllipticCurveFq, r: BigInt) -> Self {
        Groth16 {
            pairing,
            base_curve,
            r,
        }
    }

    pub fn pairing(&self) -> &P {
        &self.pairing
    }

    pub fn base_curve(&self) -> &EllipticCurveFq {
        &self.base_curve
    }

    pub fn r(&self) -> &BigInt {
        &self.r
    }

    /// From `[.., A, C, B, sum]` to `[.., A, sum, C, B]`, the layout the
    /// triple Miller loop expects below the pushed `-gamma` and `-delta`.
    fn arrange_pairing_inputs() -> Script {
        roll(5, 4) + roll(7, 2) + roll(5, 4)
    }

    /// The shared tail: triple Miller loop over
    /// `(A, B), (sum, -gamma), (C, -delta)`, the witnessed-inverse easy
    /// part, the hard part, and the comparison against `alpha_beta`.
    fn pairing_and_comparison(
        &self,
        minus_gamma: &[BigInt; 4],
        minus_delta: &[BigInt; 4],
        alpha_beta: &[BigInt],
        opts: &BuildOptions,
        modulo_threshold: u64,
    ) -> Result<Script, ScriptError> {
        let clean_constant = opts.clean_constant.unwrap_or(false);
        let inner = BuildOptions {
            take_modulo: true,
            positive_modulo: true,
            check_constant: false,
            clean_constant: Some(false),
            is_constant_reused: Some(false),
        };
        debug_assert_eq!(alpha_beta.len(), self.pairing.n_elements_miller_output());

        let mut out = Self::arrange_pairing_inputs();
        out += nums_to_script(minus_gamma);
        out += nums_to_script(minus_delta);
        out += self.pairing.triple_miller_loop(&inner, modulo_threshold)?;
        out += self.pairing.easy_exponentiation_with_inverse_check(&inner)?;
        out += self.pairing.hard_exponentiation(&inner, modulo_threshold)?;

        // compare against alpha_beta, top coordinate first
        for coordinate in alpha_beta.iter().skip(1).rev() {
            out.push_int(coordinate);
            out.push_opcode(Opcode::OP_EQUALVERIFY);
        }
        if clean_constant {
            out += roll(-1, 1);
            out.push_opcode(Opcode::OP_DROP);
        }
        out.push_int(&alpha_beta[0]);
        out.push_opcode(Opcode::OP_EQUAL);
        Ok(out)
    }

    /// The full locking script.
    ///
    /// Witness layout consumed from the top of the stack: the fixed-base
    /// MSM witnesses (per-input unrolled-multiplication blocks and
    /// addition gradients), then `B`, `C`, `A`, the triple-Miller-loop
    /// gradients, and finally the witnessed inverse of the Miller product.
    /// Fails at build time if the key asks for locking-script-resident
    /// pairing gradients.
    #[tracing::instrument(level = "debug", skip_all, fields(inputs = key.gamma_abc.len() - 1))]
    pub fn groth16_verifier(
        &self,
        key: &Groth16LockingKey,
        opts: &BuildOptions,
        modulo_threshold: u64,
        max_multipliers: Option<&[BigInt]>,
    ) -> Result<Script, ScriptError> {
        if key.has_precomputed_gradients {
            return Err(ScriptError::UnsupportedConfiguration(
                "pairing gradients embedded in the locking script are not supported".into(),
            ));
        }
        if key.gamma_abc.is_empty() {
            return Err(ScriptError::UnsupportedConfiguration(
                "gamma_abc must hold at least the constant term".into(),
            ));
        }
        opts.modulo_flags()?;
        let n_inputs = key.gamma_abc.len() - 1;
        let default_multipliers = vec![self.r.clone(); n_inputs];
        let multipliers = max_multipliers.unwrap_or(&default_multipliers);
        // a short slice would leave public inputs unconstrained
        if multipliers.len() != n_inputs {
            return Err(ScriptError::UnsupportedConfiguration(
                "max_multipliers length must match the number of public inputs".into(),
            ));
        }
        let msm_opts = BuildOptions {
            take_modulo: true,
            positive_modulo: true,
            check_constant: false,
            clean_constant: Some(false),
            is_constant_reused: Some(false),
        };

        let mut out = constant_guard(opts, self.pairing.modulus());

        // sum' = sum_i pub_i * gamma_abc[i+1]
        out += self
            .base_curve
            .msm_with_fixed_bases(&key.gamma_abc[1..], multipliers, &msm_opts)?;
        // sum = gamma_abc[0] + sum'
        out += nums_to_script(&key.gamma_abc[0]);
        out += self.base_curve.point_addition_with_unknown_points(&msm_opts)?;
        // the pairing phase needs a finite point
        out += Script::parse_string("OP_2DUP OP_CAT 0x0000 OP_EQUAL OP_NOT OP_VERIFY")
            .expect("static");

        out += self.pairing_and_comparison(
            &key.minus_gamma,
            &key.minus_delta,
            &key.alpha_beta,
            opts,
            modulo_threshold,
        )?;
        Ok(out)
    }

    /// The locking script with the MSM result supplied by the spender
    /// (the RefTx pattern): `gamma_abc` is elided from the key and the
    /// witness carries `sum` directly below the MSM-less proof data.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn groth16_verifier_with_precomputed_msm(
        &self,
        key: &Groth16LockingKeyWithPrecomputedMsm,
        opts: &BuildOptions,
        modulo_threshold: u64,
    ) -> Result<Script, ScriptError> {
        if key.has_precomputed_gradients {
            return Err(ScriptError::UnsupportedConfiguration(
                "pairing gradients embedded in the locking script are not supported".into(),
            ));
        }
        opts.modulo_flags()?;

        let mut out = constant_guard(opts, self.pairing.modulus());
        out += Script::parse_string("OP_2DUP OP_CAT 0x0000 OP_EQUAL OP_NOT OP_VERIFY")
            .expect("static");
        out += self.pairing_and_comparison(
            &key.minus_gamma,
            &key.minus_delta,
            &key.alpha_beta,
            opts,
            modulo_threshold,
        )?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mnt4_key(n_inputs: usize) -> Groth16LockingKey {
        let one = BigInt::from(1);
        Groth16LockingKey {
            alpha_beta: vec![one.clone(); 4],
            minus_gamma: [one.clone(), one.clone(), one.clone(), one.clone()],
            minus_delta: [one.clone(), one.clone(), one.clone(), one.clone()],
            gamma_abc: vec![[BigInt::from(2), BigInt::from(3)]; n_inputs + 1],
            gradients_pairings: Vec::new(),
            has_precomputed_gradients: false,
        }
    }

    #[test]
    fn rejects_locking_resident_gradients() {
        let verifier = mnt4_753();
        let mut key = mnt4_key(1);
        key.has_precomputed_gradients = true;
        let opts = BuildOptions::default().with_check_constant(true);
        assert!(matches!(
            verifier.groth16_verifier(&key, &opts, 5000, None),
            Err(ScriptError::UnsupportedConfiguration(_))
        ));
    }

    #[test]
    fn multiplier_count_must_match_inputs() {
        let verifier = mnt4_753();
        let key = mnt4_key(2);
        let opts = BuildOptions::default().with_check_constant(true);
        let short = vec![BigInt::from(16)];
        assert!(matches!(
            verifier.groth16_verifier(&key, &opts, 5000, Some(&short)),
            Err(ScriptError::UnsupportedConfiguration(_))
        ));
    }

    #[test]
    fn verifier_embeds_the_verification_key_constants() {
        let verifier = mnt4_753();
        let key = mnt4_key(2);
        let opts = BuildOptions::default()
            .with_check_constant(true)
            .with_clean_constant(true);
        // small multipliers keep the msm unrolling manageable in tests
        let multipliers = vec![BigInt::from(16), BigInt::from(16)];
        let script = verifier
            .groth16_verifier(&key, &opts, 5000, Some(&multipliers))
            .unwrap();
        assert!(script.len() > 10_000);
        // the final comparison ends the script
        let text = script.to_string();
        assert!(text.ends_with("OP_EQUAL"));
    }

    #[test]
    fn precomputed_msm_variant_is_smaller() {
        let verifier = mnt4_753();
        let key = mnt4_key(2);
        let small = Groth16LockingKeyWithPrecomputedMsm {
            alpha_beta: key.alpha_beta.clone(),
            minus_gamma: key.minus_gamma.clone(),
            minus_delta: key.minus_delta.clone(),
            has_precomputed_gradients: false,
        };
        let opts = BuildOptions::default().with_check_constant(true);
        let multipliers = vec![BigInt::from(16), BigInt::from(16)];
        let full = verifier
            .groth16_verifier(&key, &opts, 5000, Some(&multipliers))
            .unwrap();
        let lean = verifier
            .groth16_verifier_with_precomputed_msm(&small, &opts, 5000)
            .unwrap();
        assert!(lean.len() < full.len());
    }
}
