//! Evaluation error types.

use polyform_core::Phase;
use polyform_storage::StorageError;

use crate::context::PathError;
use crate::table::TableError;
use crate::validate::ValidationError;
use crate::value::Value;

/// Failure inside a single verb call.
#[derive(Debug, thiserror::Error)]
pub enum VerbError {
    #[error("{verb}: expected {expected} argument(s), got {got}")]
    Arity {
        verb: String,
        expected: String,
        got: usize,
    },

    #[error("{verb}: {message}")]
    Argument { verb: String, message: String },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error("{verb}: {message}")]
    Codec { verb: String, message: String },

    #[error(transparent)]
    Path(#[from] PathError),

    #[error("verb `{verb}` is not supported by this host")]
    Unsupported { verb: String },

    #[error("{verb}: {message}")]
    Host { verb: String, message: String },
}

impl VerbError {
    pub fn argument(verb: &str, message: impl Into<String>) -> Self {
        VerbError::Argument {
            verb: verb.to_owned(),
            message: message.into(),
        }
    }

    pub fn codec(verb: &str, message: impl std::fmt::Display) -> Self {
        VerbError::Codec {
            verb: verb.to_owned(),
            message: message.to_string(),
        }
    }
}

/// What went wrong in a contract statement.
#[derive(Debug, thiserror::Error)]
pub enum ContractErrorKind {
    #[error("contract violation: statement produced falsy value {value}")]
    Violation { value: Value },

    #[error("unknown verb `{verb}`")]
    UnknownVerb { verb: String },

    #[error("unsupported verb `{verb}`")]
    UnsupportedVerb { verb: String },

    #[error("unbound reference `{reference}`")]
    UnboundReference { reference: String },

    #[error(transparent)]
    Verb(VerbError),
}

/// A failed statement, tagged with where it sits in its program.
#[derive(Debug, thiserror::Error)]
#[error("{form} {phase} statement {index} `{expression}`: {kind}")]
pub struct ContractError {
    pub form: String,
    pub phase: Phase,
    /// 1-based statement index.
    pub index: usize,
    /// Canonical rendering of the compiled statement.
    pub expression: String,
    /// The logical statement as written.
    pub source_text: String,
    #[source]
    pub kind: ContractErrorKind,
}

impl ContractError {
    pub fn is_violation(&self) -> bool {
        matches!(self.kind, ContractErrorKind::Violation { .. })
    }
}
