use txscript::{Opcode, Script};

use crate::fields::{constant_guard, Fq4, PrimeFieldExtension};
use crate::pairing::CyclotomicExponentiation;
use crate::stack::StackFiniteFieldElement;
use crate::util::pick;
use crate::{BuildOptions, ScriptError};

use super::pairing::Mnt4_753;

/// Final exponentiation for MNT4-753: `f -> f^((q^4 - 1)/r)`.
///
/// The easy part raises to `q^2 - 1` using a witnessed inverse; the hard
/// part raises to `q + u + 1` with a cyclotomic exponentiation driven by
/// the Miller-scalar digits.
#[derive(Clone, Debug)]
pub struct FinalExponentiation {
    fq4: Fq4,
}

impl FinalExponentiation {
    pub fn new(fq4: Fq4) -> Self {
        FinalExponentiation { fq4 }
    }

    /// Stack in: `[q, .., inverse(f), f]`. The script verifies
    /// `f * inverse(f) = 1` (aborting otherwise) and leaves
    /// `phi^2(f) * inverse(f) = f^(q^2 - 1)`.
    pub fn easy_exponentiation_with_inverse_check(
        &self,
        opts: &BuildOptions,
    ) -> Result<Script, ScriptError> {
        let fq4 = &self.fq4;
        let mut out = constant_guard(opts, fq4.modulus());

        // check the witnessed inverse
        out += pick(7, 4);
        out += pick(7, 4);
        out += fq4.mul(
            &BuildOptions::default()
                .with_take_modulo(true)
                .with_clean_constant(false)
                .with_constant_reused(false),
            StackFiniteFieldElement::new(7, false, 4),
            StackFiniteFieldElement::on_top(4),
            3,
        )?;
        for _ in 0..3 {
            out += Script::parse_string("OP_0 OP_EQUALVERIFY").expect("static");
        }
        out += Script::parse_string("OP_1 OP_EQUALVERIFY").expect("static");

        // phi^2(f) * inverse(f)
        out += fq4.frobenius_even(
            &BuildOptions::default(),
            2,
            StackFiniteFieldElement::on_top(4),
            true,
        )?;
        out += fq4.mul(
            opts,
            StackFiniteFieldElement::new(7, false, 4),
            StackFiniteFieldElement::on_top(4),
            3,
        )?;
        Ok(out)
    }

    /// Stack in: `[q, .., g]` with `g` the easy-part output. Leaves
    /// `g^(q + u + 1)`, where `u` is the Miller scalar.
    pub fn hard_exponentiation(
        &self,
        ops: &Mnt4_753,
        opts: &BuildOptions,
        modulo_threshold: u64,
    ) -> Result<Script, ScriptError> {
        opts.modulo_flags()?;
        let clean_constant = opts.clean_constant.unwrap_or(false);
        let fq4 = &self.fq4;
        let mut out = constant_guard(opts, fq4.modulus());

        // g^q -> altstack
        out += pick(3, 4);
        out += fq4.frobenius_odd(
            &BuildOptions::default(),
            1,
            StackFiniteFieldElement::on_top(4),
            true,
        )?;
        for _ in 0..4 {
            out.push_opcode(Opcode::OP_TOALTSTACK);
        }

        // g^u via the cyclotomic walk over the Miller-scalar digits
        out += pick(3, 4);
        out += ops.cyclotomic_exponentiation(
            &super::EXP_MILLER_LOOP,
            &BuildOptions::default()
                .with_take_modulo(true)
                .with_clean_constant(false)
                .with_constant_reused(false),
            modulo_threshold,
        )?;

        // g * g^u * g^q
        for _ in 0..4 {
            out.push_opcode(Opcode::OP_FROMALTSTACK);
        }
        out += fq4.mul(
            &BuildOptions::default(),
            StackFiniteFieldElement::new(7, false, 4),
            StackFiniteFieldElement::on_top(4),
            3,
        )?;
        out += fq4.mul(
            &BuildOptions {
                check_constant: false,
                clean_constant: Some(clean_constant),
                ..*opts
            },
            StackFiniteFieldElement::new(7, false, 4),
            StackFiniteFieldElement::on_top(4),
            3,
        )?;
        Ok(out)
    }
}
