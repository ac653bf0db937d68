//! Execution context and the generic path walker over nested values.

use std::collections::BTreeMap;

use polyform_core::{Path, PathSegment};

use crate::value::Value;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("cannot write `{path}`: {message}")]
pub struct PathError {
    pub path: String,
    pub message: String,
}

/// Read the value at `segments` below `root`. Keys address maps, indexes
/// address lists; tables are opaque to paths.
pub fn get_path<'a>(root: &'a Value, segments: &[PathSegment]) -> Option<&'a Value> {
    segments.iter().try_fold(root, |cur, seg| match (cur, seg) {
        (Value::Map(m), PathSegment::Key(k)) => m.get(k),
        (Value::List(l), PathSegment::Index(i)) => l.get(*i),
        _ => None,
    })
}

/// Write `value` at `segments` below `root`, creating intermediate maps for
/// keys and padding lists with nulls for indexes. A null on the way is
/// replaced by the container the next segment needs; any other scalar is an
/// error.
pub fn set_path(root: &mut Value, segments: &[PathSegment], value: Value) -> Result<(), PathError> {
    let Some((first, rest)) = segments.split_first() else {
        *root = value;
        return Ok(());
    };
    let fail = |message: String| PathError {
        path: Path::from_segments(segments.to_vec()).to_string(),
        message,
    };

    if matches!(root, Value::Null) {
        *root = match first {
            PathSegment::Key(_) => Value::empty_map(),
            PathSegment::Index(_) => Value::List(Vec::new()),
        };
    }

    let slot = match (root, first) {
        (Value::Map(m), PathSegment::Key(k)) => m.entry(k.clone()).or_insert(Value::Null),
        (Value::List(l), PathSegment::Index(i)) => {
            if l.len() <= *i {
                l.resize(*i + 1, Value::Null);
            }
            &mut l[*i]
        }
        (other, seg) => {
            let want = match seg {
                PathSegment::Key(_) => "a map",
                PathSegment::Index(_) => "a list",
            };
            return Err(fail(format!("expected {}, found {}", want, other.type_name())));
        }
    };
    set_path(slot, rest, value).map_err(|e| PathError {
        path: Path::from_segments(segments.to_vec()).to_string(),
        message: e.message,
    })
}

/// Mutable name-to-value mapping scoped to one invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionContext {
    root: BTreeMap<String, Value>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(root: BTreeMap<String, Value>) -> Self {
        ExecutionContext { root }
    }

    /// Context seeded from a JSON object; non-objects give an empty context.
    pub fn from_json(v: &serde_json::Value) -> Self {
        match Value::from_json(v) {
            Value::Map(root) => ExecutionContext { root },
            _ => Self::default(),
        }
    }

    pub fn get(&self, path: &Path) -> Option<&Value> {
        let (first, rest) = path.segments().split_first()?;
        match first {
            PathSegment::Key(k) => get_path(self.root.get(k)?, rest),
            PathSegment::Index(_) => None,
        }
    }

    pub fn get_key(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }

    /// Write `value` at `path`. The path must start with a key.
    pub fn set(&mut self, path: &Path, value: Value) -> Result<(), PathError> {
        match path.segments().split_first() {
            Some((PathSegment::Key(k), rest)) => {
                let slot = self.root.entry(k.clone()).or_insert(Value::Null);
                set_path(slot, rest, value).map_err(|e| PathError {
                    path: path.to_string(),
                    message: e.message,
                })
            }
            Some((PathSegment::Index(_), _)) => Err(PathError {
                path: path.to_string(),
                message: "the context is a map; paths must start with a key".into(),
            }),
            None => Err(PathError {
                path: String::new(),
                message: "cannot replace the whole context".into(),
            }),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.root.insert(key.into(), value);
    }

    pub fn as_map(&self) -> &BTreeMap<String, Value> {
        &self.root
    }

    pub fn into_map(self) -> BTreeMap<String, Value> {
        self.root
    }

    /// Snapshot of the whole context as a map value.
    pub fn to_value(&self) -> Value {
        Value::Map(self.root.clone())
    }

    pub fn to_json(&self) -> serde_json::Value {
        self.to_value().to_json()
    }
}
