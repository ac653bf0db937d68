#![allow(clippy::result_large_err)]
//! polyform-core: contract compiler, type schema parser and form assembly.
//!
//! Everything in this crate is pure: no I/O, no shared mutable state apart
//! from the opt-in [`ProgramCache`].
//!
//! # Public API
//!
//! - [`compile()`] -- contract source to a [`ContractProgram`]
//! - [`parse_schema()`] -- schema source to a [`TypeSchema`]
//! - [`Polyform::from_value`] -- a configuration document to resolved,
//!   compiled [`Form`]s
//! - AST types: [`Path`], [`Call`], [`Expr`], [`ContextRef`],
//!   [`ContractExpression`]

pub mod ast;
pub mod cache;
pub mod compiler;
pub mod error;
pub mod form;
pub mod lexer;
pub mod polyform;
pub mod schema;

// ── Convenience re-exports: key types ────────────────────────────────

pub use ast::{
    Call, ContextRef, ContractExpression, ContractProgram, Expr, Literal, Path, PathSegment,
    Phase, Scope,
};
pub use cache::ProgramCache;
pub use error::{CompileError, FormError, SchemaSyntaxError};
pub use form::{Dimensions, Form, FormKind, FormSpec};
pub use polyform::Polyform;
pub use schema::{FieldSpec, TypeSchema};

// ── Convenience re-exports: entry points ─────────────────────────────

pub use compiler::{compile, compile_source, compile_statement};
pub use lexer::logical_statements;
pub use schema::parse_schema;
