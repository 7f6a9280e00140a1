use num_bigint::BigInt;

/// Data baked into a Groth16 locking script.
///
/// `gamma_abc[0] + sum_{i>=1} pub[i-1] * gamma_abc[i]` is the statement
/// commitment the verifier computes; `alpha_beta` is the precomputed
/// pairing of the verification key, the value the final exponentiation
/// output is compared against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Groth16LockingKey {
    /// The target-field element `e(alpha, beta)`.
    pub alpha_beta: Vec<BigInt>,
    /// `-gamma` as `(x0, x1, y0, y1)` on the twisted curve.
    pub minus_gamma: [BigInt; 4],
    /// `-delta` as `(x0, x1, y0, y1)` on the twisted curve.
    pub minus_delta: [BigInt; 4],
    /// The `G1` points of the common reference string.
    pub gamma_abc: Vec<[BigInt; 2]>,
    /// Gradients for `w * (-gamma)` and `w * (-delta)`, usable when the
    /// pairing gradients are baked into the locking script instead of the
    /// witness.
    pub gradients_pairings: Vec<Vec<[BigInt; 2]>>,
    /// Whether the gradients above are injected in the locking script.
    /// The canonical layout leaves them in the unlocking script.
    pub has_precomputed_gradients: bool,
}

/// [`Groth16LockingKey`] for the precomputed-MSM (RefTx-style) verifier:
/// the statement commitment is supplied by the spender, so `gamma_abc` is
/// elided.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Groth16LockingKeyWithPrecomputedMsm {
    pub alpha_beta: Vec<BigInt>,
    pub minus_gamma: [BigInt; 4],
    pub minus_delta: [BigInt; 4],
    pub has_precomputed_gradients: bool,
}
