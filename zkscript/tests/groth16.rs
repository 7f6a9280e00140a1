//! End-to-end assembly checks for the Groth16 locking and unlocking
//! builders: deterministic emission, witness layout invariants, and the
//! structural properties the stack machine relies on.

use num_bigint::BigInt;
use txscript::{encode_num, Opcode, ScriptItem};

use zkscript::curves::secp256k1;
use zkscript::groth16;
use zkscript::keys::{
    Groth16LockingKey, Groth16UnlockingKey, MsmWithFixedBasesUnlockingKey, StepGradient,
    StepPairingGradients, UnrolledMultiplicationUnlockingKey,
};
use zkscript::pairing::PairingOps;
use zkscript::BuildOptions;

fn bls_locking_key(n_inputs: usize) -> Groth16LockingKey {
    let p = |v: i64| BigInt::from(v);
    Groth16LockingKey {
        alpha_beta: (1..=12).map(p).collect(),
        minus_gamma: [p(1), p(2), p(3), p(4)],
        minus_delta: [p(5), p(6), p(7), p(8)],
        gamma_abc: (0..=n_inputs as i64)
            .map(|i| [p(10 + i), p(20 + i)])
            .collect(),
        gradients_pairings: Vec::new(),
        has_precomputed_gradients: false,
    }
}

#[test]
fn bls12_381_verifier_is_deterministic() {
    let verifier = groth16::bls12_381();
    let key = bls_locking_key(2);
    let opts = BuildOptions::default()
        .with_check_constant(true)
        .with_clean_constant(true);
    let multipliers = vec![BigInt::from(64), BigInt::from(64)];
    let a = verifier
        .groth16_verifier(&key, &opts, 40_000, Some(&multipliers))
        .unwrap();
    let b = verifier
        .groth16_verifier(&key, &opts, 40_000, Some(&multipliers))
        .unwrap();
    assert_eq!(a, b);
    assert_eq!(a.serialize(), b.serialize());
}

#[test]
fn bls12_381_verifier_guards_and_compares() {
    let verifier = groth16::bls12_381();
    let key = bls_locking_key(1);
    let opts = BuildOptions::default()
        .with_check_constant(true)
        .with_clean_constant(true);
    let multipliers = vec![BigInt::from(32)];
    let script = verifier
        .groth16_verifier(&key, &opts, 40_000, Some(&multipliers))
        .unwrap();
    let text = script.to_string();
    // modulus guard up front, final equality last
    assert!(text.starts_with("OP_DEPTH OP_1SUB OP_PICK"));
    assert!(text.ends_with("OP_EQUAL"));
    // eleven verified coordinates of alpha_beta before the final one
    assert!(script.count_op(Opcode::OP_EQUALVERIFY) >= 11);
}

#[test]
fn unlocking_key_layout_matches_the_verifier_expectations() {
    let pairing = zkscript::mnt4_753::Mnt4_753::new();
    let steps = vec![
        StepPairingGradients {
            tangent: [
                vec![BigInt::from(1), BigInt::from(2)],
                vec![BigInt::from(3), BigInt::from(4)],
                vec![BigInt::from(5), BigInt::from(6)],
            ],
            chord: None,
        };
        3
    ];
    let msm_key = MsmWithFixedBasesUnlockingKey {
        scalar_multiplications: vec![UnrolledMultiplicationUnlockingKey {
            scalar: BigInt::from(0),
            max_multiplier: BigInt::from(16),
            gradients: Vec::new(),
        }],
        addition_gradients: Vec::new(),
    };
    let key = Groth16UnlockingKey {
        a: [BigInt::from(1), BigInt::from(2)],
        b: [BigInt::from(3), BigInt::from(4), BigInt::from(5), BigInt::from(6)],
        c: [BigInt::from(7), BigInt::from(8)],
        inverse_miller_output: (1..=4).map(BigInt::from).collect(),
        gradients_pairings: steps,
        msm_key,
        gamma_abc_zero_gradient: BigInt::from(9),
    };
    let witness = key.to_unlocking_script(&pairing, true).unwrap();
    // modulus + 4 inverse coordinates + 3 steps * 3 tangent pairs
    // + A + C + B + the gamma_abc[0] gradient + msm markers (1 + 4)
    let expected_items = 1 + 4 + 3 * 3 * 2 + 2 + 2 + 4 + 1 + 5;
    assert_eq!(witness.len(), expected_items);
    // the modulus is the deepest item
    assert_eq!(
        witness.items()[0],
        ScriptItem::Push(encode_num(pairing.modulus()))
    );
}

#[test]
fn msm_with_one_zero_scalar_short_circuits_to_the_sentinel() {
    // four bases on secp256k1, one zero scalar: the witness for the zero
    // term is markers only and the locking script still folds four terms
    let curve = secp256k1::curve_affine();
    let bases: Vec<[BigInt; 2]> = (1..=4)
        .map(|i| [BigInt::from(i), BigInt::from(i + 10)])
        .collect();
    let multipliers = vec![BigInt::from(16); 4];
    let opts = BuildOptions::default()
        .with_take_modulo(true)
        .with_clean_constant(false)
        .with_constant_reused(false);
    let script = curve
        .msm_with_fixed_bases(&bases, &multipliers, &opts)
        .unwrap();
    // four unrolled multiplications, each with an a = 0 sentinel branch
    assert_eq!(script.to_string().matches("OP_2DROP 0x00 0x00").count(), 4);

    let zero_key = UnrolledMultiplicationUnlockingKey {
        scalar: BigInt::from(0),
        max_multiplier: BigInt::from(16),
        gradients: Vec::new(),
    };
    // markers only: no gradients in the witness of the zero term
    assert_eq!(zero_key.to_unlocking_script().unwrap().len(), 5);
}

#[test]
fn scalar_multiplication_witness_for_three_times_generator() {
    // a = 3 on secp256k1: one executed step with doubling and addition
    let key = UnrolledMultiplicationUnlockingKey {
        scalar: BigInt::from(3),
        max_multiplier: BigInt::from(4),
        gradients: vec![StepGradient {
            doubling: BigInt::from(41),
            addition: Some(BigInt::from(42)),
        }],
    };
    let witness = key.to_unlocking_script().unwrap();
    assert_eq!(witness.to_string(), "OP_0 0x2a OP_1 0x29 OP_1 OP_0");

    let curve = secp256k1::curve_affine();
    let opts = BuildOptions::default()
        .with_clean_constant(false)
        .with_constant_reused(false);
    let script = curve
        .unrolled_multiplication(&BigInt::from(4), &opts)
        .unwrap();
    // two unrolled steps and the zero-scalar branch
    assert_eq!(script.count_op(Opcode::OP_IF), 5);
}

#[test]
fn precomputed_msm_witness_carries_the_commitment() {
    let pairing = zkscript::mnt4_753::Mnt4_753::new();
    let key = zkscript::keys::Groth16UnlockingKeyWithPrecomputedMsm {
        a: [BigInt::from(1), BigInt::from(2)],
        b: [BigInt::from(3), BigInt::from(4), BigInt::from(5), BigInt::from(6)],
        c: [BigInt::from(7), BigInt::from(8)],
        inverse_miller_output: (1..=4).map(BigInt::from).collect(),
        gradients_pairings: Vec::new(),
        precomputed_msm: [BigInt::from(100), BigInt::from(200)],
    };
    let witness = key.to_unlocking_script(&pairing, true);
    let text = witness.to_string();
    assert!(text.ends_with("0x64 0xc800"));
}
