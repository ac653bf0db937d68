//! Error types for contract compilation, schema parsing and form assembly.

use serde::{Deserialize, Serialize};

use crate::ast::Phase;

/// Malformed contract source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum CompileError {
    /// A line continuation marker was the last token of the source.
    #[error("unexpected end of input: line {line} ends with a continuation marker")]
    UnexpectedEndOfInput { line: u32 },

    /// A statement matched neither the call nor the literal grammar.
    #[error("syntax error at column {column} in `{statement}`: {message}")]
    Syntax {
        statement: String,
        column: usize,
        message: String,
    },

    /// `= expr` with nothing on the left-hand side.
    #[error("empty assignment target in `{statement}`")]
    EmptyAssignmentTarget { statement: String },

    /// A dotted/bracketed path could not be parsed.
    #[error("invalid path `{path}`: {message}")]
    InvalidPath { path: String, message: String },
}

/// Malformed type schema source, positioned at the offending token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("schema syntax error at {line}:{column}: {message}")]
pub struct SchemaSyntaxError {
    pub line: u32,
    pub column: u32,
    pub message: String,
}

impl SchemaSyntaxError {
    pub fn new(line: u32, column: u32, message: impl Into<String>) -> Self {
        SchemaSyntaxError {
            line,
            column,
            message: message.into(),
        }
    }
}

/// Errors raised while assembling forms from declared configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormError {
    #[error("missing required key `{key}`")]
    MissingKey { key: String },

    #[error("unrecognized keyword at {path}.{keyword}")]
    UnrecognizedKeyword { path: String, keyword: String },

    #[error("{path}: {message}")]
    InvalidField { path: String, message: String },

    #[error("form `{form}` extends unknown form `{parent}`")]
    UnknownParent { form: String, parent: String },

    #[error("inheritance cycle: {}", cycle.join(" -> "))]
    InheritanceCycle { cycle: Vec<String> },

    #[error("forms.{form}.authentication={scheme}: scheme not defined at resources.authentication.{scheme}")]
    UndefinedAuthScheme { form: String, scheme: String },

    #[error("forms.{form}.interface: {source}")]
    Schema {
        form: String,
        #[source]
        source: SchemaSyntaxError,
    },

    #[error("forms.{form}.{phase}: {source}")]
    Compile {
        form: String,
        phase: Phase,
        #[source]
        source: CompileError,
    },
}
