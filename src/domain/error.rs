//! Domain errors

use thiserror::Error;

/// Errors raised while constructing domain values.
///
/// Construction fails fast: no half-valid identifier or status ever
/// escapes a factory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// Text does not match the identifier grammar.
    #[error("Invalid {kind} '{value}': {reason}")]
    Format {
        kind: &'static str,
        value: String,
        reason: &'static str,
    },

    /// Major/minor status pair that the protocol forbids.
    #[error("Illegal status combination: major '{major}' with minor '{minor}'")]
    IllegalStatusCombination { major: String, minor: String },

    /// Caller supplied an argument outside the operation's contract.
    #[error("Invalid argument '{name}': {reason}")]
    Argument {
        name: &'static str,
        reason: &'static str,
    },
}

impl DomainError {
    pub(crate) fn format(kind: &'static str, value: impl Into<String>, reason: &'static str) -> Self {
        Self::Format {
            kind,
            value: value.into(),
            reason,
        }
    }

    /// Whether the error concerns an identifier's grammar.
    pub fn is_format(&self) -> bool {
        matches!(self, Self::Format { .. })
    }
}

/// Result type for domain construction
pub type DomainResult<T> = Result<T, DomainError>;
