//! Type schema: a closed-world subset of a typed interface language.
//!
//! ```text
//! type Name {
//!     field: Type      # nullable
//!     field: Type!     # required
//! }
//! ```
//!
//! Fields may be separated by newlines, commas or semicolons. `Input` and
//! `Output` always resolve: a schema that omits either gets an empty object
//! type in its place and a diagnostic is recorded.

mod lexer;
mod parser;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::SchemaSyntaxError;

pub const INPUT: &str = "Input";
pub const OUTPUT: &str = "Output";

/// Built-in scalar types. They have no fields and are checked structurally.
pub const SCALARS: &[&str] = &[
    "Int",
    "Float",
    "String",
    "Boolean",
    "ID",
    "ISO8601Date",
    "Date",
    "DateTime",
    "Table",
];

pub fn is_scalar(name: &str) -> bool {
    SCALARS.contains(&name)
}

/// One declared field: its type and whether it may be absent or null.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(rename = "type")]
    pub type_name: String,
    pub nullable: bool,
}

impl FieldSpec {
    pub fn required(type_name: impl Into<String>) -> Self {
        FieldSpec {
            type_name: type_name.into(),
            nullable: false,
        }
    }

    pub fn optional(type_name: impl Into<String>) -> Self {
        FieldSpec {
            type_name: type_name.into(),
            nullable: true,
        }
    }
}

/// Parsed type table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSchema {
    pub types: BTreeMap<String, BTreeMap<String, FieldSpec>>,
    /// Names of types filled in because the source did not declare them.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub synthesized: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<String>,
}

impl TypeSchema {
    /// Schema with only the synthesized `Input`/`Output` object types.
    pub fn empty() -> Self {
        let mut schema = TypeSchema::default();
        schema.ensure_interface_types();
        schema
    }

    /// Fields of an object type; `None` for scalars and unknown names.
    pub fn get(&self, name: &str) -> Option<&BTreeMap<String, FieldSpec>> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        is_scalar(name) || self.types.contains_key(name)
    }

    pub fn is_synthesized(&self, name: &str) -> bool {
        self.synthesized.contains(name)
    }

    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    /// Names referenced by a field but never declared.
    pub fn undefined_references(&self) -> Vec<(String, String, String)> {
        let mut out = Vec::new();
        for (ty, fields) in &self.types {
            for (field, spec) in fields {
                if !self.contains(&spec.type_name) {
                    out.push((ty.clone(), field.clone(), spec.type_name.clone()));
                }
            }
        }
        out
    }

    /// Declared types of both schemas; fields of `other` win on conflict.
    pub fn union(&self, other: &TypeSchema) -> TypeSchema {
        let mut types = BTreeMap::new();
        for schema in [self, other] {
            for (name, fields) in &schema.types {
                if schema.is_synthesized(name) {
                    continue;
                }
                let entry: &mut BTreeMap<String, FieldSpec> = types.entry(name.clone()).or_default();
                entry.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
        let mut merged = TypeSchema {
            types,
            ..TypeSchema::default()
        };
        merged.ensure_interface_types();
        merged
    }

    /// Render declared (non-synthesized) types back to schema source.
    pub fn to_source(&self) -> String {
        let mut out = String::new();
        for (name, fields) in &self.types {
            if self.is_synthesized(name) {
                continue;
            }
            out.push_str(&format!("type {} {{\n", name));
            for (field, spec) in fields {
                let bang = if spec.nullable { "" } else { "!" };
                out.push_str(&format!("    {}: {}{}\n", field, spec.type_name, bang));
            }
            out.push_str("}\n");
        }
        out
    }

    fn ensure_interface_types(&mut self) {
        for name in [INPUT, OUTPUT] {
            if !self.types.contains_key(name) {
                let msg = format!("no {} type declared; using an empty object", name);
                tracing::warn!(type_name = name, "{}", msg);
                self.types.insert(name.to_owned(), BTreeMap::new());
                self.synthesized.insert(name.to_owned());
                self.diagnostics.push(msg);
            }
        }
    }
}

/// Parse schema source into a [`TypeSchema`].
pub fn parse_schema(src: &str) -> Result<TypeSchema, SchemaSyntaxError> {
    let tokens = lexer::lex(src)?;
    let types = parser::Parser::new(&tokens).parse()?;
    let mut schema = TypeSchema {
        types,
        ..TypeSchema::default()
    };
    schema.ensure_interface_types();
    Ok(schema)
}
