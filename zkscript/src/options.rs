use crate::ScriptError;

/// The uniform flag contract shared by every arithmetic builder.
///
/// * `take_modulo` — reduce each output coordinate modulo `q` before leaving
///   it on the stack;
/// * `positive_modulo` — normalise reduced coordinates into `[0, q)` rather
///   than keeping the sign of the intermediate result;
/// * `check_constant` — prepend a guard verifying the stack-bottom prime;
/// * `clean_constant` — remove the prime from the bottom of the stack on
///   exit (only meaningful together with `take_modulo`);
/// * `is_constant_reused` — leave the prime one below the top of the stack,
///   to be consumed by the next operation, instead of dropping the fetched
///   copy.
///
/// `clean_constant` and `is_constant_reused` are tri-state: `None` means
/// "not decided", which is an error whenever `take_modulo` is set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuildOptions {
    pub take_modulo: bool,
    pub positive_modulo: bool,
    pub check_constant: bool,
    pub clean_constant: Option<bool>,
    pub is_constant_reused: Option<bool>,
}

impl Default for BuildOptions {
    /// No reduction, no guard: the configuration used for intermediate
    /// fragments inside larger compositions.
    fn default() -> Self {
        BuildOptions {
            take_modulo: false,
            positive_modulo: true,
            check_constant: false,
            clean_constant: None,
            is_constant_reused: None,
        }
    }
}

impl BuildOptions {
    /// Reduce the result, keep the constant at the bottom.
    pub fn reduced() -> Self {
        BuildOptions {
            take_modulo: true,
            positive_modulo: true,
            check_constant: false,
            clean_constant: Some(false),
            is_constant_reused: Some(false),
        }
    }

    /// Guard the bottom constant, reduce the result, and clean the constant:
    /// the configuration of a top-level, self-contained script.
    pub fn checked_top_level() -> Self {
        BuildOptions {
            take_modulo: true,
            positive_modulo: true,
            check_constant: true,
            clean_constant: Some(true),
            is_constant_reused: Some(false),
        }
    }

    pub fn with_take_modulo(mut self, take_modulo: bool) -> Self {
        self.take_modulo = take_modulo;
        self
    }

    pub fn with_positive_modulo(mut self, positive_modulo: bool) -> Self {
        self.positive_modulo = positive_modulo;
        self
    }

    pub fn with_check_constant(mut self, check_constant: bool) -> Self {
        self.check_constant = check_constant;
        self
    }

    pub fn with_clean_constant(mut self, clean_constant: bool) -> Self {
        self.clean_constant = Some(clean_constant);
        self
    }

    pub fn with_constant_reused(mut self, is_constant_reused: bool) -> Self {
        self.is_constant_reused = Some(is_constant_reused);
        self
    }

    /// Check the tri-state flags and return the decided
    /// `(clean_constant, is_constant_reused)` pair.
    ///
    /// Fails with [`ScriptError::InvalidFlagCombination`] when `take_modulo`
    /// is set but either flag is undecided. When `take_modulo` is unset the
    /// pair is irrelevant and defaults to `(false, false)`.
    pub fn modulo_flags(&self) -> Result<(bool, bool), ScriptError> {
        if !self.take_modulo {
            return Ok((false, false));
        }
        match (self.clean_constant, self.is_constant_reused) {
            (Some(clean), Some(reused)) => Ok((clean, reused)),
            _ => Err(ScriptError::InvalidFlagCombination(
                "take_modulo requires clean_constant and is_constant_reused to be decided",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undecided_flags_rejected() {
        let opts = BuildOptions::default().with_take_modulo(true);
        assert!(matches!(
            opts.modulo_flags(),
            Err(ScriptError::InvalidFlagCombination(_))
        ));
        let opts = opts.with_clean_constant(true);
        assert!(opts.modulo_flags().is_err());
        let opts = opts.with_constant_reused(false);
        assert_eq!(opts.modulo_flags(), Ok((true, false)));
    }

    #[test]
    fn flags_irrelevant_without_take_modulo() {
        assert_eq!(BuildOptions::default().modulo_flags(), Ok((false, false)));
    }
}
