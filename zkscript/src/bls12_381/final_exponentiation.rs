use txscript::Script;

use crate::fields::{constant_guard, Fq12, PrimeFieldExtension};
use crate::pairing::CyclotomicExponentiation;
use crate::stack::StackFiniteFieldElement;
use crate::util::{pick, roll, Slots};
use crate::{BuildOptions, ScriptError};

use super::pairing::Bls12_381;

/// Final exponentiation for BLS12-381: `f -> f^((q^12 - 1)/r)`.
///
/// The easy part raises to `(q^6 - 1)(q^2 + 1)` using a witnessed inverse;
/// the hard part follows the addition chain of eprint 2016/130 (table 1),
/// with every `x`-power computed by a cyclotomic walk over the
/// Miller-scalar digits followed by a conjugation (`x` is negative).
#[derive(Clone, Debug)]
pub struct FinalExponentiation {
    fq12: Fq12,
}

impl FinalExponentiation {
    pub fn new(fq12: Fq12) -> Self {
        FinalExponentiation { fq12 }
    }

    /// Stack in: `[q, .., inverse(f), f]`. The script verifies
    /// `f * inverse(f) = 1` (aborting otherwise) and leaves
    /// `f^((q^6 - 1)(q^2 + 1))`.
    pub fn easy_exponentiation_with_inverse_check(
        &self,
        opts: &BuildOptions,
    ) -> Result<Script, ScriptError> {
        let fq12 = &self.fq12;
        let none = BuildOptions::default();
        let mut out = constant_guard(opts, fq12.modulus());

        // check the witnessed inverse
        out += pick(23, 12);
        out += pick(23, 12);
        out += fq12.mul(
            &BuildOptions::default()
                .with_take_modulo(true)
                .with_clean_constant(false)
                .with_constant_reused(false),
            StackFiniteFieldElement::new(23, false, 12),
            StackFiniteFieldElement::on_top(12),
            3,
        )?;
        for _ in 0..11 {
            out += Script::parse_string("OP_0 OP_EQUALVERIFY").expect("static");
        }
        out += Script::parse_string("OP_1 OP_EQUALVERIFY").expect("static");

        // t = conj(f) * inverse(f) = f^(q^6 - 1)
        out += fq12.conjugate(&none, StackFiniteFieldElement::on_top(12), true)?;
        out += fq12.mul(
            &none,
            StackFiniteFieldElement::new(23, false, 12),
            StackFiniteFieldElement::on_top(12),
            3,
        )?;
        // phi^2(t) * t
        out += pick(11, 12);
        out += fq12.frobenius(&none, 2, StackFiniteFieldElement::on_top(12), true)?;
        out += fq12.mul(
            opts,
            StackFiniteFieldElement::new(23, false, 12),
            StackFiniteFieldElement::on_top(12),
            3,
        )?;
        Ok(out)
    }

    /// Stack in: `[q, .., r]` with `r` the easy-part output; leaves the
    /// hard-part result.
    pub fn hard_exponentiation(
        &self,
        ops: &Bls12_381,
        opts: &BuildOptions,
        modulo_threshold: u64,
    ) -> Result<Script, ScriptError> {
        opts.modulo_flags()?;
        let clean_constant = opts.clean_constant.unwrap_or(false);
        let fq12 = &self.fq12;
        let none = BuildOptions::default();
        let reduced = BuildOptions::default()
            .with_take_modulo(true)
            .with_clean_constant(false)
            .with_constant_reused(false);

        let mut out = constant_guard(opts, fq12.modulus());
        let mut slots = Slots::new(12);
        let r = slots.register(11);

        let top = StackFiniteFieldElement::on_top(12);
        // every emitted sub-script below consumes/creates whole 12-scalar
        // elements on top of the stack
        let pick_slot = |out: &mut Script, slots: &mut Slots, i: usize| {
            *out += pick(slots.get(i), 12);
            slots.alloc_on_top()
        };
        let roll_slot = |out: &mut Script, slots: &mut Slots, i: usize| {
            *out += roll(slots.get(i), 12);
            slots.consume(i);
            slots.alloc_on_top()
        };
        // an in-place update of the top element: net stack change zero
        let replace_top = |slots: &mut Slots, old: usize| {
            slots.consume(old);
            slots.alloc_on_top()
        };
        let merge_top2 = |slots: &mut Slots, deep: usize, shallow: usize| {
            slots.consume(shallow);
            slots.consume(deep);
            slots.alloc_on_top()
        };

        // exp_by_x: cyclotomic exponentiation by |x|, then conjugate
        let exp_by_x = |this: &Self, out: &mut Script, input: usize, slots: &mut Slots|
         -> Result<usize, ScriptError> {
            *out += ops.cyclotomic_exponentiation(
                &super::EXP_MILLER_LOOP,
                &reduced,
                modulo_threshold,
            )?;
            *out += this.fq12.conjugate(&none, top, true)?;
            Ok(replace_top(slots, input))
        };

        // a = conj(r^2)
        let a = pick_slot(&mut out, &mut slots, r);
        out += fq12.square(&reduced, top, true)?;
        out += fq12.conjugate(&none, top, true)?;
        let a = replace_top(&mut slots, a);
        // b = r^x
        let b = pick_slot(&mut out, &mut slots, r);
        let b = exp_by_x(self, &mut out, b, &mut slots)?;
        // c = b^2
        let c = pick_slot(&mut out, &mut slots, b);
        out += fq12.square(&reduced, top, true)?;
        let c = replace_top(&mut slots, c);
        // d = a * b
        let a = roll_slot(&mut out, &mut slots, a);
        let b_copy = pick_slot(&mut out, &mut slots, b);
        out += fq12.mul(&reduced, StackFiniteFieldElement::new(23, false, 12), top, 3)?;
        let d = merge_top2(&mut slots, a, b_copy);
        // e = d^x, g = e^x, h = g^x
        let e = pick_slot(&mut out, &mut slots, d);
        let e = exp_by_x(self, &mut out, e, &mut slots)?;
        let g = pick_slot(&mut out, &mut slots, e);
        let g = exp_by_x(self, &mut out, g, &mut slots)?;
        let h = pick_slot(&mut out, &mut slots, g);
        let h = exp_by_x(self, &mut out, h, &mut slots)?;
        // i = h * c
        let c = roll_slot(&mut out, &mut slots, c);
        out += fq12.mul(&reduced, StackFiniteFieldElement::new(23, false, 12), top, 3)?;
        let i = merge_top2(&mut slots, h, c);
        // j = i^x
        let j = pick_slot(&mut out, &mut slots, i);
        let j = exp_by_x(self, &mut out, j, &mut slots)?;
        // l = j * conj(d)
        let d = roll_slot(&mut out, &mut slots, d);
        out += fq12.conjugate(&none, top, true)?;
        out += fq12.mul(&reduced, StackFiniteFieldElement::new(23, false, 12), top, 3)?;
        let l = merge_top2(&mut slots, j, d);
        // m = l * r
        let r_copy = pick_slot(&mut out, &mut slots, r);
        out += fq12.mul(&reduced, StackFiniteFieldElement::new(23, false, 12), top, 3)?;
        let m = merge_top2(&mut slots, l, r_copy);
        // n = conj(r)
        let n = pick_slot(&mut out, &mut slots, r);
        out += fq12.conjugate(&none, top, true)?;
        let n = replace_top(&mut slots, n);
        // s = n * i, t = phi(s)
        let i = roll_slot(&mut out, &mut slots, i);
        out += fq12.mul(&reduced, StackFiniteFieldElement::new(23, false, 12), top, 3)?;
        let s = merge_top2(&mut slots, n, i);
        out += fq12.frobenius(&reduced, 1, top, true)?;
        let t = replace_top(&mut slots, s);
        // o = e * r, p = phi^3(o)
        let e = roll_slot(&mut out, &mut slots, e);
        let r = roll_slot(&mut out, &mut slots, r);
        out += fq12.mul(&reduced, StackFiniteFieldElement::new(23, false, 12), top, 3)?;
        let o = merge_top2(&mut slots, e, r);
        out += fq12.frobenius(&reduced, 3, top, true)?;
        let p = replace_top(&mut slots, o);
        // u = b * g, v = phi^2(u)
        let b = roll_slot(&mut out, &mut slots, b);
        let g = roll_slot(&mut out, &mut slots, g);
        out += fq12.mul(&reduced, StackFiniteFieldElement::new(23, false, 12), top, 3)?;
        let u_slot = merge_top2(&mut slots, b, g);
        out += fq12.frobenius(&reduced, 2, top, true)?;
        let v = replace_top(&mut slots, u_slot);
        // result = ((p * v) * t) * m
        let p = roll_slot(&mut out, &mut slots, p);
        out += fq12.mul(&reduced, StackFiniteFieldElement::new(23, false, 12), top, 3)?;
        let w = merge_top2(&mut slots, v, p);
        let t = roll_slot(&mut out, &mut slots, t);
        out += fq12.mul(&reduced, StackFiniteFieldElement::new(23, false, 12), top, 3)?;
        let x_slot = merge_top2(&mut slots, w, t);
        let m = roll_slot(&mut out, &mut slots, m);
        out += fq12.mul(
            &BuildOptions {
                check_constant: false,
                clean_constant: Some(clean_constant),
                ..*opts
            },
            StackFiniteFieldElement::new(23, false, 12),
            top,
            3,
        )?;
        let _result = merge_top2(&mut slots, x_slot, m);

        Ok(out)
    }
}
