//! Built-in verb table.
//!
//! Every verb receives its arguments already evaluated, in call order. For a
//! pipeline stage that is the piped value followed by the explicit arguments.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use base64::Engine;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use polyform_core::{Path, TypeSchema};
use polyform_storage::StorageBackend;

use crate::context::ExecutionContext;
use crate::error::VerbError;
use crate::host::HostVerb;
use crate::sanitize::Sanitizer;
use crate::table::Table;
use crate::validate::validate;
use crate::value::Value;

/// Everything a built-in verb may touch.
pub struct VerbEnv<'a> {
    pub context: &'a mut ExecutionContext,
    pub storage: &'a dyn StorageBackend,
    pub sanitizer: &'a dyn Sanitizer,
    pub schema: &'a TypeSchema,
    pub follow: Option<&'a HostVerb>,
}

pub type VerbFn = fn(&mut VerbEnv<'_>, Vec<Value>) -> Result<Value, VerbError>;

/// The fixed built-in verb table.
pub fn builtin_verbs() -> BTreeMap<&'static str, VerbFn> {
    let mut verbs: BTreeMap<&'static str, VerbFn> = BTreeMap::new();
    verbs.insert("assign", assign);
    verbs.insert("pull", pull);
    verbs.insert("push", push);
    verbs.insert("follow", follow);
    verbs.insert("in_range", in_range);
    verbs.insert("convert", convert);
    verbs.insert("to", convert);
    verbs.insert("is", is);
    verbs.insert("are", are);
    verbs.insert("inspect", inspect);
    verbs.insert("autoclean", autoclean);
    verbs.insert("b64enc", b64enc);
    verbs.insert("b64dec", b64dec);
    verbs
}

// ──────────────────────────────────────────────
// Argument helpers
// ──────────────────────────────────────────────

fn arity(verb: &str, args: &[Value], min: usize, max: usize) -> Result<(), VerbError> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            min.to_string()
        } else {
            format!("{}..={}", min, max)
        };
        return Err(VerbError::Arity {
            verb: verb.to_owned(),
            expected,
            got: args.len(),
        });
    }
    Ok(())
}

fn string_arg<'v>(verb: &str, value: &'v Value, what: &str) -> Result<&'v str, VerbError> {
    value
        .as_str()
        .ok_or_else(|| VerbError::argument(verb, format!("{} must be a string, got {}", what, value.type_name())))
}

/// Text or raw bytes as a byte slice.
fn byte_arg<'v>(verb: &str, value: &'v Value, what: &str) -> Result<&'v [u8], VerbError> {
    match value {
        Value::Bytes(b) => Ok(b.as_slice()),
        Value::Str(s) => Ok(s.as_bytes()),
        other => Err(VerbError::argument(
            verb,
            format!("{} must be bytes or a string, got {}", what, other.type_name()),
        )),
    }
}

/// Split a `"from>>to"` label. A bare word is the source for `pull` and the
/// target for `push`, so callers say which side it fills.
fn codec_pair(label: &str, bare_is_source: bool) -> (String, String) {
    let label = label.trim().to_ascii_lowercase();
    match label.split_once(">>") {
        Some((from, to)) => (from.trim().to_owned(), to.trim().to_owned()),
        None if bare_is_source => (label, "*".to_owned()),
        None => ("*".to_owned(), label),
    }
}

fn is_table_label(s: &str) -> bool {
    matches!(s, "table" | "dataframe" | "pandas:data_frame" | "pandas:dataframe")
}

// ──────────────────────────────────────────────
// Codecs
// ──────────────────────────────────────────────

fn parse_json(verb: &str, bytes: &[u8]) -> Result<Value, VerbError> {
    serde_json::from_slice::<serde_json::Value>(bytes)
        .map(|v| Value::from_json(&v))
        .map_err(|e| VerbError::codec(verb, format!("invalid JSON: {}", e)))
}

fn json_bytes(verb: &str, value: &Value) -> Result<Vec<u8>, VerbError> {
    serde_json::to_vec(&value.to_json()).map_err(|e| VerbError::codec(verb, e))
}

fn archive(verb: &str, value: &Value) -> Result<Vec<u8>, VerbError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&json_bytes(verb, value)?)
        .map_err(|e| VerbError::codec(verb, e))?;
    encoder.finish().map_err(|e| VerbError::codec(verb, e))
}

fn unarchive(verb: &str, bytes: &[u8]) -> Result<Value, VerbError> {
    let mut raw = Vec::new();
    GzDecoder::new(bytes)
        .read_to_end(&mut raw)
        .map_err(|e| VerbError::codec(verb, format!("not a gzip archive: {}", e)))?;
    parse_json(verb, &raw)
}

fn utf8(verb: &str, bytes: &[u8]) -> Result<String, VerbError> {
    String::from_utf8(bytes.to_vec()).map_err(|e| VerbError::codec(verb, e))
}

/// Decode stored bytes. The source side of the label picks the decoding.
fn decode(verb: &str, bytes: Vec<u8>, from: &str, to: &str) -> Result<Value, VerbError> {
    match from {
        "raw" | "bytes" | "*" => Ok(Value::Bytes(bytes)),
        "text" | "str" => Ok(Value::Str(utf8(verb, &bytes)?)),
        "json" => parse_json(verb, &bytes),
        "csv" if to == "*" || is_table_label(to) => Ok(Value::Table(Table::from_csv(&bytes)?)),
        "archive" | "pickle" => unarchive(verb, &bytes),
        _ => Err(VerbError::codec(verb, format!("unsupported typedef `{}>>{}`", from, to))),
    }
}

/// Encode a value for storage. The target side of the label picks the encoding.
fn encode(verb: &str, data: &Value, from: &str, to: &str) -> Result<Vec<u8>, VerbError> {
    match to {
        "raw" | "bytes" | "*" | "text" | "str" => Ok(byte_arg(verb, data, "data")?.to_vec()),
        "json" => json_bytes(verb, data),
        "csv" => match data {
            Value::Table(t) => Ok(t.to_csv()?.into_bytes()),
            other => Err(VerbError::argument(verb, format!("csv needs a table, got {}", other.type_name()))),
        },
        "archive" | "pickle" => archive(verb, data),
        _ => Err(VerbError::codec(verb, format!("unsupported typedef `{}>>{}`", from, to))),
    }
}

fn convert_value(verb: &str, data: Value, from: &str, to: &str) -> Result<Value, VerbError> {
    let table = |v: &Value| match v {
        Value::Table(t) => Ok(t.clone()),
        other => Err(VerbError::argument(verb, format!("expected a table, got {}", other.type_name()))),
    };
    match (from, to) {
        ("*" | "any", "json") => Ok(Value::Str(utf8(verb, &json_bytes(verb, &data)?)?)),
        ("json" | "raw", "*" | "any" | "dict") => parse_json(verb, byte_arg(verb, &data, "data")?),
        ("json", "raw") => Ok(Value::Bytes(byte_arg(verb, &data, "data")?.to_vec())),
        ("csv", t) if is_table_label(t) => Ok(Value::Table(Table::from_csv(byte_arg(verb, &data, "data")?)?)),
        (t, "csv") if is_table_label(t) => Ok(Value::Str(table(&data)?.to_csv()?)),
        (t, "dict") if is_table_label(t) => Ok(table(&data)?.to_dict()),
        (t, "json") if is_table_label(t) => {
            Ok(Value::Str(utf8(verb, &json_bytes(verb, &table(&data)?.to_dict())?)?))
        }
        ("dict-row", t) if is_table_label(t) => match &data {
            Value::Map(row) => Ok(Value::Table(Table::from_dict_row(row)?)),
            other => Err(VerbError::argument(verb, format!("dict-row needs a map, got {}", other.type_name()))),
        },
        _ => Err(VerbError::codec(verb, format!("no conversion `{}>>{}`", from, to))),
    }
}

// ──────────────────────────────────────────────
// Verbs
// ──────────────────────────────────────────────

/// `assign(value, ctx, path)`: write `value` at `path`; returns `value`.
fn assign(env: &mut VerbEnv<'_>, args: Vec<Value>) -> Result<Value, VerbError> {
    arity("assign", &args, 3, 3)?;
    let [value, ctx, path]: [Value; 3] = args
        .try_into()
        .map_err(|_| VerbError::argument("assign", "expected three arguments"))?;
    if !matches!(ctx, Value::Map(_)) {
        return Err(VerbError::argument(
            "assign",
            format!("ctx must be the context map, got {}", ctx.type_name()),
        ));
    }
    let path = Path::parse(string_arg("assign", &path, "path")?)
        .map_err(|e| VerbError::argument("assign", e.to_string()))?;
    env.context.set(&path, value.clone())?;
    Ok(value)
}

/// `pull(id, typedef?)`: read a blob and decode it.
fn pull(env: &mut VerbEnv<'_>, args: Vec<Value>) -> Result<Value, VerbError> {
    arity("pull", &args, 1, 2)?;
    let id = string_arg("pull", &args[0], "id")?;
    let (from, to) = match args.get(1) {
        Some(label) => codec_pair(string_arg("pull", label, "typedef")?, true),
        None => ("raw".to_owned(), "*".to_owned()),
    };
    tracing::info!(id, typedef = %format!("{}>>{}", from, to), "PULL");
    let bytes = env.storage.get(id)?;
    decode("pull", bytes, &from, &to)
}

/// `push(data, id, typedef?)`: encode and store; returns `true`.
fn push(env: &mut VerbEnv<'_>, args: Vec<Value>) -> Result<Value, VerbError> {
    arity("push", &args, 2, 3)?;
    let id = string_arg("push", &args[1], "id")?;
    let (from, to) = match args.get(2) {
        Some(label) => codec_pair(string_arg("push", label, "typedef")?, false),
        None => ("*".to_owned(), "raw".to_owned()),
    };
    tracing::info!(id, typedef = %format!("{}>>{}", from, to), "PUSH");
    let bytes = encode("push", &args[0], &from, &to)?;
    env.storage.put(id, &bytes)?;
    Ok(Value::Bool(true))
}

/// `follow(node, key)`: relationship traversal, only when the host provides one.
fn follow(env: &mut VerbEnv<'_>, args: Vec<Value>) -> Result<Value, VerbError> {
    arity("follow", &args, 2, 2)?;
    match env.follow {
        Some(traverse) => traverse(args),
        None => Err(VerbError::Unsupported {
            verb: "follow".into(),
        }),
    }
}

/// `in_range(value, lo, hi)`: inclusive on both ends.
fn in_range(_env: &mut VerbEnv<'_>, args: Vec<Value>) -> Result<Value, VerbError> {
    arity("in_range", &args, 3, 3)?;
    if let (Some(v), Some(lo), Some(hi)) = (args[0].as_f64(), args[1].as_f64(), args[2].as_f64()) {
        return Ok(Value::Bool(lo <= v && v <= hi));
    }
    if let (Some(v), Some(lo), Some(hi)) = (args[0].as_str(), args[1].as_str(), args[2].as_str()) {
        return Ok(Value::Bool(lo <= v && v <= hi));
    }
    Err(VerbError::argument(
        "in_range",
        format!(
            "cannot compare {} with bounds {} and {}",
            args[0].type_name(),
            args[1].type_name(),
            args[2].type_name()
        ),
    ))
}

/// `convert(data, "A>>B")`, also available as `to`.
fn convert(_env: &mut VerbEnv<'_>, mut args: Vec<Value>) -> Result<Value, VerbError> {
    arity("convert", &args, 2, 2)?;
    let label = args.pop().unwrap_or(Value::Null);
    let (from, to) = codec_pair(string_arg("convert", &label, "conversion")?, false);
    let data = args.pop().unwrap_or(Value::Null);
    convert_value("convert", data, &from, &to)
}

fn type_arg(verb: &str, value: &Value) -> Result<String, VerbError> {
    let name = string_arg(verb, value, "type name")?;
    Ok(if is_table_label(&name.to_ascii_lowercase()) {
        "Table".to_owned()
    } else {
        name.to_owned()
    })
}

/// `is(data, TypeName)`: validate and return the normalized value.
fn is(env: &mut VerbEnv<'_>, args: Vec<Value>) -> Result<Value, VerbError> {
    arity("is", &args, 2, 2)?;
    let type_name = type_arg("is", &args[1])?;
    Ok(validate(env.schema, &type_name, &args[0])?)
}

/// `are(items, TypeName)`: validate every element of a list.
fn are(env: &mut VerbEnv<'_>, args: Vec<Value>) -> Result<Value, VerbError> {
    arity("are", &args, 2, 2)?;
    let type_name = type_arg("are", &args[1])?;
    let Value::List(items) = &args[0] else {
        return Err(VerbError::argument(
            "are",
            format!("expected a list, got {}", args[0].type_name()),
        ));
    };
    items
        .iter()
        .map(|item| validate(env.schema, &type_name, item).map_err(VerbError::from))
        .collect::<Result<Vec<_>, _>>()
        .map(Value::List)
}

/// `inspect(data, label?)`: log and pass through.
fn inspect(_env: &mut VerbEnv<'_>, mut args: Vec<Value>) -> Result<Value, VerbError> {
    arity("inspect", &args, 1, 2)?;
    let label = match args.get(1) {
        Some(v) => string_arg("inspect", v, "label")?.to_owned(),
        None => String::new(),
    };
    args.truncate(1);
    let data = args.pop().unwrap_or(Value::Null);
    tracing::info!(target: "polyform::inspect", label = %label, value = %data, kind = data.type_name(), "inspect");
    Ok(data)
}

fn autoclean(env: &mut VerbEnv<'_>, mut args: Vec<Value>) -> Result<Value, VerbError> {
    arity("autoclean", &args, 1, 1)?;
    env.sanitizer.clean(args.pop().unwrap_or(Value::Null))
}

fn b64enc(_env: &mut VerbEnv<'_>, args: Vec<Value>) -> Result<Value, VerbError> {
    arity("b64enc", &args, 1, 1)?;
    let bytes = byte_arg("b64enc", &args[0], "data")?;
    Ok(Value::Str(base64::engine::general_purpose::STANDARD.encode(bytes)))
}

fn b64dec(_env: &mut VerbEnv<'_>, args: Vec<Value>) -> Result<Value, VerbError> {
    arity("b64dec", &args, 1, 1)?;
    let text = string_arg("b64dec", &args[0], "text")?;
    base64::engine::general_purpose::STANDARD
        .decode(text)
        .map(Value::Bytes)
        .map_err(|e| VerbError::codec("b64dec", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sanitize::ColumnSanitizer;
    use polyform_core::parse_schema;
    use polyform_storage::MemoryStorage;
    use serde_json::json;

    struct Fixture {
        context: ExecutionContext,
        storage: MemoryStorage,
        schema: TypeSchema,
    }

    impl Fixture {
        fn new() -> Self {
            Fixture {
                context: ExecutionContext::new(),
                storage: MemoryStorage::new(),
                schema: parse_schema("type Input { city: String! }").unwrap(),
            }
        }

        fn call(&mut self, verb: &str, args: Vec<Value>) -> Result<Value, VerbError> {
            let f = builtin_verbs()[verb];
            let mut env = VerbEnv {
                context: &mut self.context,
                storage: &self.storage,
                sanitizer: &ColumnSanitizer,
                schema: &self.schema,
                follow: None,
            };
            f(&mut env, args)
        }
    }

    fn s(text: &str) -> Value {
        Value::from(text)
    }

    #[test]
    fn in_range_is_inclusive() {
        let mut fx = Fixture::new();
        let check = |fx: &mut Fixture, v: i64| fx.call("in_range", vec![Value::Int(v), Value::Int(1), Value::Int(10)]).unwrap();
        assert_eq!(check(&mut fx, 5), Value::Bool(true));
        assert_eq!(check(&mut fx, 11), Value::Bool(false));
        assert_eq!(check(&mut fx, 1), Value::Bool(true));
        assert_eq!(check(&mut fx, 10), Value::Bool(true));
        assert_eq!(
            fx.call("in_range", vec![Value::Float(0.5), Value::Int(0), Value::Int(1)]).unwrap(),
            Value::Bool(true)
        );
        assert!(fx.call("in_range", vec![s("a"), Value::Int(0), Value::Int(1)]).is_err());
    }

    #[test]
    fn assign_writes_into_context() {
        let mut fx = Fixture::new();
        let out = fx
            .call("assign", vec![Value::Int(7), Value::empty_map(), s("model.score")])
            .unwrap();
        assert_eq!(out, Value::Int(7));
        assert_eq!(fx.context.to_json(), json!({"model": {"score": 7}}));
        assert!(fx.call("assign", vec![Value::Int(7), Value::Int(0), s("x")]).is_err());
    }

    #[test]
    fn push_then_pull_json_and_archive() {
        let mut fx = Fixture::new();
        let data = Value::from(json!({"a": [1, 2]}));
        for (push_label, pull_label) in [("*>>json", "json>>*"), ("*>>archive", "archive>>*")] {
            fx.call("push", vec![data.clone(), s("blob"), s(push_label)]).unwrap();
            assert_eq!(fx.call("pull", vec![s("blob"), s(pull_label)]).unwrap(), data);
        }
    }

    #[test]
    fn pull_defaults_to_raw_bytes() {
        let mut fx = Fixture::new();
        fx.call("push", vec![s("hello"), s("greeting")]).unwrap();
        assert_eq!(fx.call("pull", vec![s("greeting")]).unwrap(), Value::Bytes(b"hello".to_vec()));
    }

    #[test]
    fn pull_csv_as_table() {
        let mut fx = Fixture::new();
        fx.storage.put("rows.csv", b"a,b\n1,x\n").unwrap();
        match fx.call("pull", vec![s("rows.csv"), s("csv>>dataframe")]).unwrap() {
            Value::Table(t) => assert_eq!(t.rows, vec![vec![Value::Int(1), s("x")]]),
            other => panic!("expected table, got {other:?}"),
        }
    }

    #[test]
    fn pull_missing_blob_is_storage_error() {
        let mut fx = Fixture::new();
        let err = fx.call("pull", vec![s("nope")]).unwrap_err();
        assert!(matches!(err, VerbError::Storage(_)));
    }

    #[test]
    fn convert_pairs() {
        let mut fx = Fixture::new();
        let table = fx.call("convert", vec![s("a\n1\n2\n"), s("csv>>table")]).unwrap();
        assert_eq!(
            fx.call("to", vec![table.clone(), s("table>>dict")]).unwrap().to_json(),
            json!({"a": {"0": 1, "1": 2}})
        );
        assert_eq!(fx.call("convert", vec![table, s("table>>csv")]).unwrap(), s("a\n1\n2\n"));
        assert_eq!(
            fx.call("convert", vec![s("{\"k\": 1}"), s("json>>*")]).unwrap().to_json(),
            json!({"k": 1})
        );
        assert_eq!(fx.call("convert", vec![Value::Int(3), s("*>>json")]).unwrap(), s("3"));
        assert!(fx.call("convert", vec![Value::Int(3), s("yaml>>xml")]).is_err());
    }

    #[test]
    fn is_and_are_use_the_schema() {
        let mut fx = Fixture::new();
        let ok = Value::from(json!({"city": "x"}));
        assert_eq!(fx.call("is", vec![ok.clone(), s("Input")]).unwrap(), ok);
        assert!(fx.call("is", vec![Value::from(json!({"town": "x"})), s("Input")]).is_err());
        let list = Value::List(vec![ok.clone(), ok]);
        assert_eq!(fx.call("are", vec![list.clone(), s("Input")]).unwrap(), list);
        assert!(fx.call("is", vec![Value::Table(Table::default()), s("pandas:data_frame")]).is_ok());
    }

    #[test]
    fn follow_without_host_is_unsupported() {
        let mut fx = Fixture::new();
        let err = fx.call("follow", vec![s("a"), s("b")]).unwrap_err();
        assert!(matches!(err, VerbError::Unsupported { .. }));
    }

    #[test]
    fn base64_round_trip() {
        let mut fx = Fixture::new();
        let enc = fx.call("b64enc", vec![s("hi")]).unwrap();
        assert_eq!(enc, s("aGk="));
        assert_eq!(fx.call("b64dec", vec![enc]).unwrap(), Value::Bytes(b"hi".to_vec()));
    }

    #[test]
    fn arity_is_checked() {
        let mut fx = Fixture::new();
        let err = fx.call("in_range", vec![Value::Int(1)]).unwrap_err();
        assert!(matches!(err, VerbError::Arity { got: 1, .. }));
    }
}
