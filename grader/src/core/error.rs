//! Error taxonomy for descriptors, the structural codec and the loader contract.

use thiserror::Error;

/// Errors raised while building descriptors or converting values.
///
/// Every variant is terminal for the evaluation run; messages name the
/// offending type or edge so a failing question can be diagnosed from the
/// verdict text alone.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Descriptor names a type outside the fixed vocabulary.
    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    /// Composite descriptor without an element descriptor.
    #[error("type {0} requires type_children")]
    MissingChildType(String),

    /// Scalar descriptor carrying an element descriptor.
    #[error("scalar type {0} must not have type_children")]
    UnexpectedChildType(String),

    /// Tree, list and graph payloads are restricted to integers.
    #[error("{kind} can only be of type Integer, got {child}")]
    InvalidChildType { kind: String, child: String },

    /// Value does not have the shape the descriptor asks for.
    #[error("type mismatch: expected {expected}, got {found}")]
    TypeMismatch { expected: String, found: String },

    /// Graph edge entry that is not exactly `[u, v]`.
    #[error("malformed edge {edge}: each edge must have exactly two elements")]
    MalformedEdge { edge: String },

    /// Listy text that is not valid JSON.
    #[error("failed to parse listy input {text}: {reason}")]
    MalformedListy { text: String, reason: String },
}

impl CodecError {
    pub(crate) fn mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        CodecError::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// Failures surfaced by a compiler/loader service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoaderError {
    #[error("compilation failed: {0}")]
    Compile(String),

    #[error("callable not found")]
    NotFound,

    #[error("runtime error: {0}")]
    Runtime(String),

    /// The loader itself could not operate (workspace, spawn, protocol).
    #[error("loader failure: {0}")]
    Io(String),
}

pub type CodecResult<T> = Result<T, CodecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_offending_type() {
        let err = CodecError::UnsupportedType("Set".to_string());
        assert_eq!(err.to_string(), "unsupported type: Set");

        let err = CodecError::InvalidChildType {
            kind: "TreeNode".to_string(),
            child: "String".to_string(),
        };
        assert!(err.to_string().contains("TreeNode"));
        assert!(err.to_string().contains("String"));
    }

    #[test]
    fn loader_messages_match_verdict_wording() {
        assert_eq!(
            LoaderError::Compile("x".to_string()).to_string(),
            "compilation failed: x"
        );
        assert_eq!(LoaderError::NotFound.to_string(), "callable not found");
        assert_eq!(
            LoaderError::Runtime("boom".to_string()).to_string(),
            "runtime error: boom"
        );
    }
}
