//! A minimal Bitcoin-script value.
//!
//! This crate provides the stack-machine surface consumed by the `zkscript`
//! compiler: an [`Opcode`] set, a [`Script`] value supporting construction
//! from an opcode string, concatenation and raw byte serialisation, and the
//! script-number encoding used to push integer literals.
//!
//! The crate does not execute scripts; evaluation belongs to the stack
//! machine proper.

#![warn(unused, future_incompatible, nonstandard_style, rust_2018_idioms)]
#![deny(unsafe_code)]

mod num;
mod opcode;
mod script;

pub use num::{decode_num, encode_num};
pub use opcode::Opcode;
pub use script::{Script, ScriptItem, ScriptParseError};
