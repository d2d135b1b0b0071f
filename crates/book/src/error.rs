//! Book error types.

use lob_core::ParseError;

/// Errors that can occur during book operations.
///
/// Unknown order ids are not errors: they are logged and reported through
/// the `bool` result of the tracked-book mutators.
#[derive(Debug, thiserror::Error)]
pub enum BookError {
    /// A price, volume or sequence field is not a valid number.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Compact snapshot text is structurally invalid.
    #[error("malformed snapshot: {reason}")]
    MalformedSnapshot { reason: String },

    /// Compact snapshot text does not have exactly 7 comma-separated fields.
    #[error("snapshot has {found} comma-separated fields, expected 7")]
    FieldCount { found: usize },

    /// A delta batch did not advance the sequence (strict sequencing only).
    #[error("out-of-order batch: sequence {received} does not advance past {current}")]
    OutOfOrder { current: u64, received: u64 },
}

impl BookError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedSnapshot {
            reason: reason.into(),
        }
    }
}
