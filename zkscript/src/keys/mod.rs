//! Locking- and unlocking-key constructors.
//!
//! Locking keys carry the data baked into a verifier script at UTXO
//! creation time; unlocking keys assemble the spender's witness: proof
//! elements, public-input multiplication markers, precomputed gradients
//! and the inverse Miller output. All field and point values are plain
//! integers produced by the off-chain witness generator.

mod locking;
mod unlocking;

pub use locking::{Groth16LockingKey, Groth16LockingKeyWithPrecomputedMsm};
pub use unlocking::{
    Groth16UnlockingKey, Groth16UnlockingKeyWithPrecomputedMsm, MillerLoopStepGradients,
    MillerLoopUnlockingKey, MsmWithFixedBasesProjectiveUnlockingKey,
    MsmWithFixedBasesUnlockingKey, PairingUnlockingKey,
    ProjectiveUnrolledMultiplicationUnlockingKey, StepGradient, StepPairingGradients,
    TripleMillerLoopProjUnlockingKey, UnrolledMultiplicationUnlockingKey,
};
