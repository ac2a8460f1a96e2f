//! Decode errors

use thiserror::Error;

use super::result::ResultCode;
use crate::domain::DomainError;

/// Wire payload does not match the expected message structure.
///
/// Every variant names the offending element.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Malformed XML: {0}")]
    Xml(String),

    #[error("Expected <{expected}>, found <{found}>")]
    UnexpectedElement { expected: &'static str, found: String },

    #[error("Missing <{name}> in <{parent}>")]
    MissingElement { parent: String, name: &'static str },

    #[error("Missing attribute '{name}' on <{element}>")]
    MissingAttribute { element: String, name: &'static str },

    #[error("Invalid value '{value}' in <{element}>: {reason}")]
    InvalidValue {
        element: String,
        value: String,
        reason: String,
    },

    #[error("Invalid identifier in <{element}>: {source}")]
    InvalidIdentifier { element: String, source: DomainError },

    #[error("Invalid status in <{element}>: {source}")]
    InvalidStatus { element: String, source: DomainError },

    #[error("<{parent}> requires at least {min} <{name}>")]
    Cardinality {
        parent: String,
        name: &'static str,
        min: usize,
    },
}

impl DecodeError {
    pub(crate) fn invalid_value(
        element: &str,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            element: element.to_string(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Protocol result reported to the peer for this failure.
    pub fn result_code(&self) -> ResultCode {
        match self {
            Self::InvalidIdentifier { .. } => ResultCode::InvalidId,
            _ => ResultCode::Format,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_failures_map_to_invalid_id() {
        let err = DecodeError::InvalidIdentifier {
            element: "evseId".into(),
            source: DomainError::format("EVSE id", "x", "bad"),
        };
        assert_eq!(err.result_code(), ResultCode::InvalidId);
        assert!(err.to_string().contains("evseId"));
    }

    #[test]
    fn structural_failures_map_to_format() {
        let err = DecodeError::MissingElement {
            parent: "SelectEvseRequest".into(),
            name: "evseId",
        };
        assert_eq!(err.result_code(), ResultCode::Format);
    }
}
