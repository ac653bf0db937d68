//! Form declarations, dimensions and inheritance merging.
//!
//! A form is declared as a keyword map. [`FormSpec::from_fields`] is the only
//! constructor: forms with a parent are built by exporting both declarations,
//! deep-merging them and replaying the merged map through the same function.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ast::{ContractExpression, ContractProgram, Path, Phase};
use crate::cache::ProgramCache;
use crate::error::FormError;
use crate::schema::{self, TypeSchema};

// ──────────────────────────────────────────────
// Field helpers
// ──────────────────────────────────────────────

fn type_label(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}

fn invalid(path: &str, message: impl Into<String>) -> FormError {
    FormError::InvalidField {
        path: path.to_owned(),
        message: message.into(),
    }
}

pub(crate) fn opt_string(path: &str, value: &Value) -> Result<Option<String>, FormError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        other => Err(invalid(
            path,
            format!("must be a string, not {}", type_label(other)),
        )),
    }
}

/// Contract source given either as one text block or a list of entries.
fn contract_lines(path: &str, value: &Value) -> Result<Vec<String>, FormError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::String(s) => Ok(vec![s.clone()]),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::String(s) => Ok(s.clone()),
                other => Err(invalid(
                    &format!("{}[{}]", path, i),
                    format!("contract entries must be strings, not {}", type_label(other)),
                )),
            })
            .collect(),
        other => Err(invalid(
            path,
            format!("must be contract source text or a list, not {}", type_label(other)),
        )),
    }
}

fn string_list(path: &str, value: &Value) -> Result<Vec<String>, FormError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::String(s) => Ok(vec![s.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                other => Err(invalid(
                    path,
                    format!("entries must be strings, not {}", type_label(other)),
                )),
            })
            .collect(),
        other => Err(invalid(
            path,
            format!("must be a list of strings, not {}", type_label(other)),
        )),
    }
}

/// Keyword entries given as a map or as a list of single-key maps.
fn keyword_entries(path: &str, value: &Value) -> Result<Vec<(String, Value)>, FormError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Object(map) => Ok(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
        Value::Array(items) => {
            let mut out = Vec::new();
            for item in items {
                match item {
                    Value::Object(map) if map.len() == 1 => {
                        out.extend(map.iter().map(|(k, v)| (k.clone(), v.clone())));
                    }
                    other => {
                        return Err(invalid(
                            path,
                            format!(
                                "list entries must be single-key maps, not {}",
                                type_label(other)
                            ),
                        ))
                    }
                }
            }
            Ok(out)
        }
        other => Err(invalid(
            path,
            format!("must be a map, not {}", type_label(other)),
        )),
    }
}

fn strings_value(items: &[String]) -> Value {
    Value::Array(items.iter().cloned().map(Value::String).collect())
}

// ──────────────────────────────────────────────
// Deep merge
// ──────────────────────────────────────────────

/// Merge `child` over `parent`.
///
/// Maps merge key by key, lists concatenate parent-first, any other child
/// value replaces the parent's. A null child value never overrides.
pub fn deep_merge(parent: &Value, child: &Value) -> Value {
    match (parent, child) {
        (_, Value::Null) => parent.clone(),
        (Value::Object(p), Value::Object(c)) => {
            let mut merged = p.clone();
            for (key, value) in c {
                let next = match p.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), next);
            }
            Value::Object(merged)
        }
        (Value::Array(p), Value::Array(c)) => {
            Value::Array(p.iter().chain(c.iter()).cloned().collect())
        }
        _ => child.clone(),
    }
}

// ──────────────────────────────────────────────
// Form kind, dimensions, dependencies
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormKind {
    #[default]
    Runtime,
    Training,
    /// Only usable as a parent; dropped from the assembled set.
    Template,
    Codetest,
    Synthetic,
}

impl FormKind {
    pub const ALL: [FormKind; 5] = [
        FormKind::Runtime,
        FormKind::Training,
        FormKind::Template,
        FormKind::Codetest,
        FormKind::Synthetic,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FormKind::Runtime => "runtime",
            FormKind::Training => "training",
            FormKind::Template => "template",
            FormKind::Codetest => "codetest",
            FormKind::Synthetic => "synthetic",
        }
    }

    pub fn parse(s: &str) -> Option<FormKind> {
        FormKind::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

/// Reusable contract fragments merged into every form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub time: Vec<String>,
    pub geoloc: Vec<String>,
    pub participants: Vec<String>,
    pub expect: Vec<String>,
    pub finish: Vec<String>,
}

impl Dimensions {
    pub fn from_value(path: &str, value: &Value) -> Result<Dimensions, FormError> {
        let mut dims = Dimensions::default();
        for (key, value) in keyword_entries(path, value)? {
            let key_path = format!("{}.{}", path, key);
            let lines = contract_lines(&key_path, &value)?;
            match key.as_str() {
                "time" => dims.time.extend(lines),
                "geoloc" => dims.geoloc.extend(lines),
                "participants" => dims.participants.extend(lines),
                "expect" => dims.expect.extend(lines),
                "finish" => dims.finish.extend(lines),
                _ => {
                    return Err(FormError::UnrecognizedKeyword {
                        path: path.to_owned(),
                        keyword: key,
                    })
                }
            }
        }
        Ok(dims)
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
            && self.geoloc.is_empty()
            && self.participants.is_empty()
            && self.expect.is_empty()
            && self.finish.is_empty()
    }

    /// `self` followed by `other`, keyword by keyword.
    pub fn merged(&self, other: &Dimensions) -> Dimensions {
        let cat = |a: &[String], b: &[String]| a.iter().chain(b).cloned().collect::<Vec<_>>();
        Dimensions {
            time: cat(&self.time, &other.time),
            geoloc: cat(&self.geoloc, &other.geoloc),
            participants: cat(&self.participants, &other.participants),
            expect: cat(&self.expect, &other.expect),
            finish: cat(&self.finish, &other.finish),
        }
    }

    fn to_value(&self) -> Value {
        let mut map = Map::new();
        for (key, lines) in [
            ("time", &self.time),
            ("geoloc", &self.geoloc),
            ("participants", &self.participants),
            ("expect", &self.expect),
            ("finish", &self.finish),
        ] {
            if !lines.is_empty() {
                map.insert(key.to_owned(), strings_value(lines));
            }
        }
        Value::Object(map)
    }
}

/// `add`/`del` package lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependencies {
    pub add: Vec<String>,
    pub del: Vec<String>,
}

impl Dependencies {
    pub fn from_value(path: &str, value: &Value) -> Result<Dependencies, FormError> {
        let mut deps = Dependencies::default();
        for (key, value) in keyword_entries(path, value)? {
            let key_path = format!("{}.{}", path, key);
            match key.as_str() {
                "add" => deps.add.extend(string_list(&key_path, &value)?),
                "del" => deps.del.extend(string_list(&key_path, &value)?),
                _ => {
                    return Err(FormError::UnrecognizedKeyword {
                        path: path.to_owned(),
                        keyword: key,
                    })
                }
            }
        }
        Ok(deps)
    }

    /// Sorted, de-duplicated `add` minus `del`.
    pub fn flatten(&self) -> Vec<String> {
        let removed: BTreeSet<&String> = self.del.iter().collect();
        self.add
            .iter()
            .filter(|d| !removed.contains(d))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn to_value(&self) -> Value {
        let mut map = Map::new();
        if !self.add.is_empty() {
            map.insert("add".to_owned(), strings_value(&self.add));
        }
        if !self.del.is_empty() {
            map.insert("del".to_owned(), strings_value(&self.del));
        }
        Value::Object(map)
    }
}

// ──────────────────────────────────────────────
// FormSpec
// ──────────────────────────────────────────────

/// A form as declared, before inheritance and compilation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormSpec {
    pub name: String,
    /// `None` when the declaration leaves `type` unset.
    pub kind: Option<FormKind>,
    pub purpose: Option<String>,
    pub extends: Option<String>,
    pub authentication: Option<String>,
    /// Schema source text.
    pub interface: Option<String>,
    pub schema: Option<TypeSchema>,
    pub expect: Vec<String>,
    pub finish: Vec<String>,
    pub dimensions: Dimensions,
    pub dependencies: Dependencies,
    pub run: Option<String>,
}

impl FormSpec {
    /// Keyword-driven constructor shared by native and inherited forms.
    pub fn from_fields(name: &str, fields: &Map<String, Value>) -> Result<FormSpec, FormError> {
        let base = format!("forms.{}", name);
        let mut spec = FormSpec {
            name: name.to_owned(),
            ..FormSpec::default()
        };

        for (key, value) in fields {
            let path = format!("{}.{}", base, key);
            match key.as_str() {
                "type" => {
                    spec.kind = match value {
                        Value::Null => None,
                        Value::String(s) => Some(FormKind::parse(s).ok_or_else(|| {
                            let accepted: Vec<&str> =
                                FormKind::ALL.iter().map(|k| k.as_str()).collect();
                            invalid(
                                &path,
                                format!("invalid type `{}`, not one of: {}", s, accepted.join(", ")),
                            )
                        })?),
                        other => {
                            return Err(invalid(
                                &path,
                                format!("must be a string, not {}", type_label(other)),
                            ))
                        }
                    }
                }
                "purpose" => spec.purpose = opt_string(&path, value)?,
                "extends" => spec.extends = opt_string(&path, value)?,
                "authentication" => spec.authentication = opt_string(&path, value)?,
                "interface" => {
                    spec.interface = opt_string(&path, value)?;
                    if let Some(src) = &spec.interface {
                        let parsed = schema::parse_schema(src).map_err(|source| FormError::Schema {
                            form: name.to_owned(),
                            source,
                        })?;
                        spec.schema = Some(parsed);
                    }
                }
                "expect" => spec.expect = contract_lines(&path, value)?,
                "finish" => spec.finish = contract_lines(&path, value)?,
                "dimensions" => spec.dimensions = Dimensions::from_value(&path, value)?,
                "dependencies" => spec.dependencies = Dependencies::from_value(&path, value)?,
                "run" => {
                    spec.run = match value {
                        Value::Bool(false) => None,
                        other => opt_string(&path, other)?,
                    }
                }
                _ => {
                    return Err(FormError::UnrecognizedKeyword {
                        path: base,
                        keyword: key.clone(),
                    })
                }
            }
        }
        Ok(spec)
    }

    pub fn kind(&self) -> FormKind {
        self.kind.unwrap_or_default()
    }

    /// Export declared fields as a keyword map; unset fields are omitted.
    pub fn to_fields(&self) -> Map<String, Value> {
        let mut map = Map::new();
        let mut put_str = |key: &str, value: &Option<String>| {
            if let Some(v) = value {
                map.insert(key.to_owned(), Value::String(v.clone()));
            }
        };
        put_str("purpose", &self.purpose);
        put_str("extends", &self.extends);
        put_str("authentication", &self.authentication);
        put_str("interface", &self.interface);
        put_str("run", &self.run);
        if let Some(kind) = self.kind {
            map.insert("type".to_owned(), Value::String(kind.as_str().to_owned()));
        }
        if !self.expect.is_empty() {
            map.insert("expect".to_owned(), strings_value(&self.expect));
        }
        if !self.finish.is_empty() {
            map.insert("finish".to_owned(), strings_value(&self.finish));
        }
        if !self.dimensions.is_empty() {
            map.insert("dimensions".to_owned(), self.dimensions.to_value());
        }
        let deps = self.dependencies.to_value();
        if deps.as_object().is_some_and(|m| !m.is_empty()) {
            map.insert("dependencies".to_owned(), deps);
        }
        map
    }

    /// Rebuild this form on top of `parent`'s declaration.
    ///
    /// Interfaces are unioned type by type (child fields win), so a child can
    /// extend its parent's types as well as add new ones.
    pub fn inherit(&self, parent: &FormSpec) -> Result<FormSpec, FormError> {
        let mut parent_fields = parent.to_fields();
        parent_fields.remove("extends");
        let mut child_fields = self.to_fields();
        child_fields.remove("extends");

        let interface = match (&parent.schema, &self.schema) {
            (Some(p), Some(c)) => Some(p.union(c).to_source()),
            _ => self.interface.clone().or_else(|| parent.interface.clone()),
        };
        parent_fields.remove("interface");
        child_fields.remove("interface");

        let merged = deep_merge(&Value::Object(parent_fields), &Value::Object(child_fields));
        let mut fields = match merged {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        if let Some(src) = interface {
            fields.insert("interface".to_owned(), Value::String(src));
        }
        tracing::debug!(form = %self.name, parent = %parent.name, "replaying merged form");
        FormSpec::from_fields(&self.name, &fields)
    }
}

// ──────────────────────────────────────────────
// Assembled form
// ──────────────────────────────────────────────

/// A fully resolved form with compiled contract programs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Form {
    pub name: String,
    pub kind: FormKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    /// Parent the form was resolved from, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication: Option<String>,
    pub schema: TypeSchema,
    pub expect: ContractProgram,
    pub finish: ContractProgram,
    pub dependencies: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run: Option<String>,
}

impl Form {
    /// Compile a resolved declaration.
    ///
    /// Expect order: time, geoloc, participants, dimension expect, form
    /// expect. Finish order: dimension finish, form finish. `global` dimensions
    /// come before the form's own within each keyword.
    pub fn assemble(
        spec: &FormSpec,
        parent: Option<&str>,
        global: &Dimensions,
        cache: &ProgramCache,
    ) -> Result<Form, FormError> {
        let dims = global.merged(&spec.dimensions);
        let time_target = Path::key("time");
        let geoloc_target = Path::key("geoloc");

        let expect = Self::compile_phase(
            &spec.name,
            Phase::Expect,
            cache,
            &[
                (&dims.time, Some(&time_target)),
                (&dims.geoloc, Some(&geoloc_target)),
                (&dims.participants, None),
                (&dims.expect, None),
                (&spec.expect, None),
            ],
        )?;
        let finish = Self::compile_phase(
            &spec.name,
            Phase::Finish,
            cache,
            &[(&dims.finish, None), (&spec.finish, None)],
        )?;

        let schema = spec.schema.clone().unwrap_or_else(|| {
            tracing::warn!(form = %spec.name, "no interface declared; Input and Output default to empty");
            TypeSchema::empty()
        });
        if let Some((ty, field, missing)) = schema.undefined_references().into_iter().next() {
            return Err(invalid(
                &format!("forms.{}.interface", spec.name),
                format!("{}.{} refers to undefined type `{}`", ty, field, missing),
            ));
        }

        Ok(Form {
            name: spec.name.clone(),
            kind: spec.kind(),
            purpose: spec.purpose.clone(),
            extends: parent.map(str::to_owned),
            authentication: spec.authentication.clone(),
            schema,
            expect,
            finish,
            dependencies: spec.dependencies.flatten(),
            run: spec.run.clone(),
        })
    }

    fn compile_phase(
        form: &str,
        phase: Phase,
        cache: &ProgramCache,
        segments: &[(&Vec<String>, Option<&Path>)],
    ) -> Result<ContractProgram, FormError> {
        let mut expressions: Vec<ContractExpression> = Vec::new();
        for (lines, default_target) in segments {
            if lines.is_empty() {
                continue;
            }
            let compiled = cache
                .get_or_compile(phase, *default_target, lines.as_slice())
                .map_err(|source| FormError::Compile {
                    form: form.to_owned(),
                    phase,
                    source,
                })?;
            expressions.extend(compiled.iter().cloned());
        }
        Ok(ContractProgram::new(form, phase, expressions))
    }
}
