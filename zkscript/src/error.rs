use thiserror::Error;

/// Errors raised while building a script fragment.
///
/// These are compile-time failures: they are reported at the builder call
/// site and no partial fragment is observable. Failures of the *emitted*
/// scripts (bad modulus, wrong gradient, bad proof) surface as script
/// evaluation failures on the stack machine instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScriptError {
    /// Two operand descriptors overlap on the stack, or were supplied out of
    /// depth order.
    #[error("misordered operands: {0}")]
    MisorderedOperands(String),

    /// A binary operation was given operands of different extension degrees,
    /// or an operand of a degree the builder does not accept.
    #[error("extension degree mismatch: expected {expected}, got {got}")]
    ExtensionDegreeMismatch {
        /// Degree the builder operates at.
        expected: usize,
        /// Degree of the offending operand.
        got: usize,
    },

    /// `take_modulo` was requested without deciding both `clean_constant`
    /// and `is_constant_reused`, leaving the emitted `OP_MOD` tail undefined.
    #[error("invalid flag combination: {0}")]
    InvalidFlagCombination(&'static str),

    /// The builder only supports operands in certain stack positions or
    /// rolling configurations.
    #[error("unsupported configuration: {0}")]
    UnsupportedConfiguration(String),
}
