use crate::fst::InputType;

/// Errors raised by [`crate::builder::Builder`] for caller contract
/// violations. All of these fail fast; none is recoverable by retrying the
/// same call.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// Inputs must arrive in non-decreasing lexicographic order over the
    /// label domain. Also covers an empty input after any non-empty input.
    #[error("input {input:?} is not >= previous input {last:?}")]
    InputOutOfOrder { input: Vec<u32>, last: Vec<u32> },

    /// The same input was added twice in a row but the output algebra does
    /// not define `merge`.
    #[error("duplicate input requires an output algebra that supports merge")]
    DuplicateWithoutMerge,

    /// A label exceeds the configured input-type domain.
    #[error("label {label:#x} out of range for input type {input_type:?}")]
    LabelOutOfRange { label: u32, input_type: InputType },
}
