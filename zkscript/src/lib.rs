//! A compiler from pairing-based verification statements to Bitcoin script.
//!
//! The crate builds locking and unlocking scripts for Groth16 proof
//! verification on a Bitcoin-like UTXO stack machine. It is organised as a
//! stack of algebraic builders, each emitting straight-line opcode fragments
//! parameterised by where their operands live on the evaluation stack:
//!
//! * [`stack`] — compile-time addresses for stack-resident operands;
//! * [`util`] — opcode-level stack manipulation primitives;
//! * [`fields`] — prime-field and tower-field arithmetic fragments;
//! * [`curves`] — elliptic-curve arithmetic in affine and projective
//!   coordinates over `F_q` and `F_q^2`;
//! * [`pairing`] — line evaluations, Miller loops, cyclotomic and final
//!   exponentiation;
//! * [`bls12_381`], [`mnt4_753`] — curve bindings wiring the generic models
//!   to concrete constants;
//! * [`groth16`] — the verifier composition;
//! * [`keys`] — locking- and unlocking-key constructors.
//!
//! Every builder is a pure function from operand descriptors and flags to a
//! [`txscript::Script`] fragment; emission is deterministic and all loops are
//! unrolled at compile time.

#![warn(unused, future_incompatible, nonstandard_style, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod bls12_381;
pub mod curves;
pub mod error;
pub mod fields;
pub mod groth16;
pub mod keys;
pub mod mnt4_753;
pub mod options;
pub mod pairing;
pub mod stack;
pub mod util;

pub use error::ScriptError;
pub use options::BuildOptions;
