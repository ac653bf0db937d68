//! Whole-configuration assembly: meta, resources and the resolved form set.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::cache::ProgramCache;
use crate::error::FormError;
use crate::form::{opt_string, Dimensions, Form, FormKind, FormSpec};

pub const SCHEME_VERSION: &str = "1.0";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Meta {
    pub owner: Option<String>,
    pub name: Option<String>,
    pub domain: Option<String>,
    pub purpose: Option<String>,
    pub dimensions: Dimensions,
}

impl Meta {
    fn from_value(value: &Value) -> Result<Meta, FormError> {
        let map = object("meta", value)?;
        let mut meta = Meta::default();
        for (key, value) in map {
            let path = format!("meta.{}", key);
            match key.as_str() {
                "owner" => meta.owner = opt_string(&path, value)?,
                "name" => {
                    meta.name = opt_string(&path, value)?;
                    if let Some(name) = &meta.name {
                        check_charset(&path, name, |c| {
                            c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '.'
                        }, "a-z 0-9 _ and .")?;
                    }
                }
                "domain" => {
                    if let Some(domain) = opt_string(&path, value)? {
                        check_charset(&path, &domain, |c| {
                            c.is_ascii_alphanumeric() || c == '-' || c == '.'
                        }, "a-z A-Z 0-9 - and .")?;
                        meta.domain = Some(domain.to_lowercase());
                    }
                }
                "purpose" => meta.purpose = opt_string(&path, value)?,
                "dimensions" => meta.dimensions = Dimensions::from_value(&path, value)?,
                _ => {
                    return Err(FormError::UnrecognizedKeyword {
                        path: "meta".into(),
                        keyword: key.clone(),
                    })
                }
            }
        }
        Ok(meta)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Resources {
    pub authentication: Map<String, Value>,
    pub datastores: Map<String, Value>,
}

impl Resources {
    fn from_value(value: &Value) -> Result<Resources, FormError> {
        let mut resources = Resources::default();
        if value.is_null() {
            return Ok(resources);
        }
        for (key, value) in object("resources", value)? {
            let path = format!("resources.{}", key);
            match key.as_str() {
                "authentication" => resources.authentication = object(&path, value)?.clone(),
                "datastores" => resources.datastores = object(&path, value)?.clone(),
                _ => {
                    return Err(FormError::UnrecognizedKeyword {
                        path: "resources".into(),
                        keyword: key.clone(),
                    })
                }
            }
        }
        Ok(resources)
    }
}

fn object<'a>(path: &str, value: &'a Value) -> Result<&'a Map<String, Value>, FormError> {
    value.as_object().ok_or_else(|| FormError::InvalidField {
        path: path.to_owned(),
        message: "must be a map".into(),
    })
}

fn check_charset(
    path: &str,
    value: &str,
    allowed: impl Fn(char) -> bool,
    described: &str,
) -> Result<(), FormError> {
    if value.chars().all(allowed) {
        Ok(())
    } else {
        Err(FormError::InvalidField {
            path: path.to_owned(),
            message: format!("may only contain {}", described),
        })
    }
}

/// A loaded configuration with every form resolved and compiled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Polyform {
    pub scheme: String,
    pub meta: Meta,
    pub resources: Resources,
    /// Resolved forms by name. Templates are not included.
    pub forms: BTreeMap<String, Form>,
}

impl Polyform {
    /// Build from a parsed configuration document.
    pub fn from_value(doc: &Value) -> Result<Polyform, FormError> {
        Self::from_value_with_cache(doc, &ProgramCache::new())
    }

    pub fn from_value_with_cache(doc: &Value, cache: &ProgramCache) -> Result<Polyform, FormError> {
        let root = object("polyform", doc)?;
        for key in root.keys() {
            if !matches!(key.as_str(), "scheme" | "meta" | "resources" | "forms") {
                return Err(FormError::UnrecognizedKeyword {
                    path: "polyform".into(),
                    keyword: key.clone(),
                });
            }
        }
        let required = |key: &str| {
            root.get(key).ok_or_else(|| FormError::MissingKey {
                key: key.to_owned(),
            })
        };

        let scheme = match required("scheme")? {
            Value::String(s) if s == SCHEME_VERSION => s.clone(),
            other => {
                return Err(FormError::InvalidField {
                    path: "scheme".into(),
                    message: format!("scheme is not {} (got {})", SCHEME_VERSION, other),
                })
            }
        };
        let meta = Meta::from_value(required("meta")?)?;
        let resources = Resources::from_value(root.get("resources").unwrap_or(&Value::Null))?;

        let mut declared = BTreeMap::new();
        for (name, fields) in object("forms", required("forms")?)? {
            let fields = object(&format!("forms.{}", name), fields)?;
            declared.insert(name.clone(), FormSpec::from_fields(name, fields)?);
        }

        let resolved = resolve_inheritance(&declared)?;

        let mut forms = BTreeMap::new();
        for (name, spec) in &resolved {
            if spec.kind() == FormKind::Template {
                tracing::debug!(form = %name, "dropping template form");
                continue;
            }
            if let Some(scheme) = &spec.authentication {
                if !resources.authentication.contains_key(scheme) {
                    return Err(FormError::UndefinedAuthScheme {
                        form: name.clone(),
                        scheme: scheme.clone(),
                    });
                }
            }
            let parent = declared.get(name).and_then(|d| d.extends.as_deref());
            let form = Form::assemble(spec, parent, &meta.dimensions, cache)?;
            forms.insert(name.clone(), form);
        }

        tracing::info!(forms = forms.len(), "polyform assembled");
        Ok(Polyform {
            scheme,
            meta,
            resources,
            forms,
        })
    }

    pub fn form(&self, name: &str) -> Option<&Form> {
        self.forms.get(name)
    }
}

/// Replace every declared form by its parent-merged version.
fn resolve_inheritance(
    declared: &BTreeMap<String, FormSpec>,
) -> Result<BTreeMap<String, FormSpec>, FormError> {
    let mut resolved: BTreeMap<String, FormSpec> = BTreeMap::new();
    for name in declared.keys() {
        let mut stack: Vec<String> = Vec::new();
        let mut stack_set: HashSet<String> = HashSet::new();
        resolve_one(name, declared, &mut resolved, &mut stack, &mut stack_set)?;
    }
    Ok(resolved)
}

fn resolve_one(
    name: &str,
    declared: &BTreeMap<String, FormSpec>,
    resolved: &mut BTreeMap<String, FormSpec>,
    stack: &mut Vec<String>,
    stack_set: &mut HashSet<String>,
) -> Result<(), FormError> {
    if resolved.contains_key(name) {
        return Ok(());
    }
    if stack_set.contains(name) {
        let start = stack.iter().position(|s| s == name).unwrap_or(0);
        let mut cycle: Vec<String> = stack[start..].to_vec();
        cycle.push(name.to_owned());
        return Err(FormError::InheritanceCycle { cycle });
    }

    // Callers only pass declared names or parents checked below.
    let Some(spec) = declared.get(name) else {
        return Ok(());
    };

    let merged = match &spec.extends {
        None => spec.clone(),
        Some(parent) => {
            if !declared.contains_key(parent) {
                return Err(FormError::UnknownParent {
                    form: name.to_owned(),
                    parent: parent.clone(),
                });
            }
            stack_set.insert(name.to_owned());
            stack.push(name.to_owned());
            resolve_one(parent, declared, resolved, stack, stack_set)?;
            stack.pop();
            stack_set.remove(name);

            match resolved.get(parent) {
                Some(parent_spec) => spec.inherit(parent_spec)?,
                None => spec.clone(),
            }
        }
    };
    resolved.insert(name.to_owned(), merged);
    Ok(())
}
