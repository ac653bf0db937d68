#![allow(clippy::result_large_err)]
//! polyform-eval: runs compiled contract programs.
//!
//! The evaluator walks each statement's call tree against an
//! [`ExecutionContext`], dispatching to the built-in verb table and then to
//! an injected [`HostLookup`]. Collaborators ([`StorageBackend`],
//! [`Sanitizer`], [`HostLookup`]) are passed in at construction; nothing is
//! read from the process environment.
//!
//! [`StorageBackend`]: polyform_storage::StorageBackend

pub mod context;
pub mod error;
pub mod evaluator;
pub mod host;
pub mod invocation;
pub mod sanitize;
pub mod table;
pub mod validate;
pub mod value;
pub mod verbs;

pub use context::{ExecutionContext, PathError};
pub use error::{ContractError, ContractErrorKind, VerbError};
pub use evaluator::{EvalScope, Evaluator};
pub use host::{HostLookup, HostVerb, StaticHostLookup};
pub use invocation::{Invocation, InvocationError};
pub use sanitize::{ColumnSanitizer, Sanitizer};
pub use table::{Table, TableError};
pub use validate::{validate, validate_json, ValidationError};
pub use value::Value;
