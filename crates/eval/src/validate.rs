//! Closed-world validation of values against a [`TypeSchema`].
//!
//! Scalars are checked by runtime kind, with `Int` promoted where `Float` is
//! declared. Object types keep only declared fields; anything else is an
//! [`ValidationError::UnexpectedField`].

use std::collections::BTreeMap;

use polyform_core::schema::is_scalar;
use polyform_core::TypeSchema;

use crate::value::Value;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("type `{type_name}` (at `{field}`) is not declared")]
    UnknownType { type_name: String, field: String },

    #[error("field `{field}` expected {expected}: {reason}")]
    MissingOrInvalidField {
        field: String,
        expected: String,
        reason: String,
    },

    #[error("unexpected field(s) on `{type_name}`: {}", fields.join(", "))]
    UnexpectedField { type_name: String, fields: Vec<String> },
}

/// Validate `data` as `type_name` and return the normalized value.
pub fn validate(schema: &TypeSchema, type_name: &str, data: &Value) -> Result<Value, ValidationError> {
    check(schema, type_name, data, type_name)
}

/// [`validate`] over JSON, returning normalized JSON.
pub fn validate_json(
    schema: &TypeSchema,
    type_name: &str,
    data: &serde_json::Value,
) -> Result<serde_json::Value, ValidationError> {
    validate(schema, type_name, &Value::from_json(data)).map(|v| v.to_json())
}

fn check(schema: &TypeSchema, type_name: &str, data: &Value, at: &str) -> Result<Value, ValidationError> {
    if is_scalar(type_name) {
        return check_scalar(type_name, data, at);
    }
    let fields = schema.get(type_name).ok_or_else(|| ValidationError::UnknownType {
        type_name: type_name.to_owned(),
        field: at.to_owned(),
    })?;
    let Value::Map(input) = data else {
        return Err(ValidationError::MissingOrInvalidField {
            field: at.to_owned(),
            expected: type_name.to_owned(),
            reason: format!("got {}", data.type_name()),
        });
    };

    let mut remaining: BTreeMap<&str, &Value> = input.iter().map(|(k, v)| (k.as_str(), v)).collect();
    let mut out = BTreeMap::new();
    for (name, spec) in fields {
        let path = format!("{}.{}", at, name);
        match remaining.remove(name.as_str()) {
            None | Some(Value::Null) if spec.nullable => {}
            None | Some(Value::Null) => {
                return Err(ValidationError::MissingOrInvalidField {
                    field: path,
                    expected: spec.type_name.clone(),
                    reason: "required field is missing or null".into(),
                })
            }
            Some(value) => {
                out.insert(name.clone(), check(schema, &spec.type_name, value, &path)?);
            }
        }
    }

    if !remaining.is_empty() {
        return Err(ValidationError::UnexpectedField {
            type_name: type_name.to_owned(),
            fields: remaining.keys().map(|k| (*k).to_owned()).collect(),
        });
    }
    Ok(Value::Map(out))
}

fn check_scalar(type_name: &str, data: &Value, at: &str) -> Result<Value, ValidationError> {
    let accepted = match (type_name, data) {
        ("Int", Value::Int(_)) => Some(data.clone()),
        ("Float", Value::Float(_)) => Some(data.clone()),
        ("Float", Value::Int(n)) => Some(Value::Float(*n as f64)),
        ("String" | "ID" | "ISO8601Date" | "Date" | "DateTime", Value::Str(_)) => Some(data.clone()),
        ("Boolean", Value::Bool(_)) => Some(data.clone()),
        ("Table", Value::Table(_)) => Some(data.clone()),
        _ => None,
    };
    accepted.ok_or_else(|| ValidationError::MissingOrInvalidField {
        field: at.to_owned(),
        expected: type_name.to_owned(),
        reason: format!("got {}", data.type_name()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyform_core::parse_schema;
    use serde_json::json;

    fn schema() -> TypeSchema {
        parse_schema(
            "type Input { city: String! year: Int }\n\
             type Point { x: Float! y: Float! }\n\
             type Output { at: Point! label: String }",
        )
        .unwrap()
    }

    #[test]
    fn nullable_field_may_be_absent() {
        let out = validate_json(&schema(), "Input", &json!({"city": "x"})).unwrap();
        assert_eq!(out, json!({"city": "x"}));
    }

    #[test]
    fn wrong_scalar_kind_is_rejected() {
        let err = validate_json(&schema(), "Input", &json!({"city": "x", "year": "2020"})).unwrap_err();
        match err {
            ValidationError::MissingOrInvalidField { field, expected, .. } => {
                assert_eq!(field, "Input.year");
                assert_eq!(expected, "Int");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(validate_json(&schema(), "Input", &json!({"city": "x", "year": true})).is_err());
        assert!(validate_json(&schema(), "Input", &json!({"city": "x", "year": 1.5})).is_err());
    }

    #[test]
    fn undeclared_keys_are_rejected() {
        let err = validate_json(&schema(), "Input", &json!({"city": "x", "extra": 1})).unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnexpectedField {
                type_name: "Input".into(),
                fields: vec!["extra".into()],
            }
        );
    }

    #[test]
    fn required_field_missing_or_null() {
        assert!(validate_json(&schema(), "Input", &json!({})).is_err());
        assert!(validate_json(&schema(), "Input", &json!({"city": null})).is_err());
    }

    #[test]
    fn declared_null_is_dropped() {
        let out = validate_json(&schema(), "Input", &json!({"city": "x", "year": null})).unwrap();
        assert_eq!(out, json!({"city": "x"}));
    }

    #[test]
    fn int_promotes_to_float_in_nested_objects() {
        let v = validate(
            &schema(),
            "Output",
            &Value::from(json!({"at": {"x": 1, "y": 2.5}})),
        )
        .unwrap();
        assert_eq!(v.as_map().unwrap()["at"].as_map().unwrap()["x"], Value::Float(1.0));
    }

    #[test]
    fn nested_errors_carry_full_path() {
        let err = validate_json(&schema(), "Output", &json!({"at": {"x": "a", "y": 1}})).unwrap_err();
        assert!(err.to_string().contains("Output.at.x"), "{err}");
    }

    #[test]
    fn synthesized_output_accepts_empty_object() {
        let s = parse_schema("type Input { a: Int }").unwrap();
        assert!(s.is_synthesized("Output"));
        assert_eq!(validate_json(&s, "Output", &json!({})).unwrap(), json!({}));
    }

    #[test]
    fn unknown_type_is_reported() {
        let err = validate_json(&schema(), "Nope", &json!({})).unwrap_err();
        assert!(matches!(err, ValidationError::UnknownType { .. }));
    }
}
