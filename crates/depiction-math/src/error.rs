//! Error types for math kernel operations.

/// Errors raised by math operations that refuse to produce an answer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MathError {
    /// The operation has no double-precision implementation.
    ///
    /// Returned instead of a plausible-looking wrong value.
    #[error("unsupported operation: {operation}")]
    Unsupported { operation: &'static str },
}

impl MathError {
    pub(crate) fn unsupported(operation: &'static str) -> Self {
        Self::Unsupported { operation }
    }
}
