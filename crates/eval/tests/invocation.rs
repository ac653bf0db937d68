//! Gather → logic → finish over assembled forms.

use std::sync::Arc;

use polyform_core::Polyform;
use polyform_eval::{ContractErrorKind, Evaluator, Invocation, InvocationError, Value};
use polyform_storage::{MemoryStorage, StorageBackend};
use serde_json::json;

fn polyform() -> Polyform {
    Polyform::from_value(&json!({
        "scheme": "1.0",
        "meta": {
            "owner": "acme",
            "name": "loans",
            "dimensions": {"participants": "polydev.id"}
        },
        "forms": {
            "score": {
                "interface": "type Input { city: String! year: Int }\ntype Output { score: Float! }",
                "expect": "city = interface.input.city\nin_range(interface.input.year, 2000, 2030)",
                "finish": "interface.output.score = result |> is('Float')"
            },
            "echo": {
                "interface": "type Input { msg: String! }"
            },
            "passthrough": {
                "interface": "type Input { n: Int! }\ntype Output { n: Int! }"
            }
        }
    }))
    .unwrap()
}

fn evaluator() -> Evaluator {
    Evaluator::new(Arc::new(MemoryStorage::new()))
}

#[test]
fn full_invocation_validates_both_ends() {
    let pf = polyform();
    let ev = evaluator();
    let form = pf.form("score").unwrap();
    let inv = Invocation::new(form, &ev).with_owner("acme");

    let event = json!({"body": "{\"city\": \"Austin\", \"year\": 2020}"});
    let out = inv
        .run(&event, |ctx| {
            assert_eq!(ctx.get_key("city"), Some(&Value::from("Austin")));
            Ok(Value::Int(7))
        })
        .unwrap();
    assert_eq!(out.to_json(), json!({"score": 7.0}));
}

#[test]
fn expect_failure_skips_logic() {
    let pf = polyform();
    let ev = evaluator();
    let inv = Invocation::new(pf.form("score").unwrap(), &ev).with_owner("acme");

    let event = json!({"parsed_body": {"city": "Austin", "year": 1990}});
    let err = inv
        .run(&event, |_| panic!("logic must not run"))
        .unwrap_err();
    match err {
        InvocationError::Contract(e) => {
            assert!(matches!(e.kind, ContractErrorKind::Violation { .. }));
            // participants dimension statement comes first
            assert_eq!(e.index, 3);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn participants_dimension_needs_an_owner() {
    let pf = polyform();
    let ev = evaluator();
    let inv = Invocation::new(pf.form("echo").unwrap(), &ev);
    let err = inv.gather(&json!({"body": {"msg": "hi"}})).unwrap_err();
    assert!(matches!(err, InvocationError::Contract(ref e) if e.is_violation()));
}

#[test]
fn invalid_input_is_rejected_before_expect() {
    let pf = polyform();
    let ev = evaluator();
    let inv = Invocation::new(pf.form("score").unwrap(), &ev).with_owner("acme");
    let err = inv
        .gather(&json!({"parsed_body": {"city": "Austin", "extra": true}}))
        .unwrap_err();
    assert!(matches!(err, InvocationError::Validation(_)));

    let err = inv.gather(&json!({"body": "not json"})).unwrap_err();
    assert!(matches!(err, InvocationError::BadInput(_)));
}

#[test]
fn gather_seeds_roles_and_interface() {
    let pf = polyform();
    let ev = evaluator();
    let inv = Invocation::new(pf.form("echo").unwrap(), &ev).with_owner("acme");
    let ctx = inv.gather(&json!({"body": {"msg": "hi"}})).unwrap();
    let json = ctx.to_json();
    assert_eq!(json["interface"]["input"], json!({"msg": "hi"}));
    assert_eq!(json["interface"]["output"], json!({}));
    assert_eq!(json["polydev"], json!({"id": "acme"}));
    for role in ["creator", "invoker", "requestor", "appexdev"] {
        assert_eq!(json[role], json!(null));
    }
}

#[test]
fn undeclared_output_returns_empty_map() {
    let pf = polyform();
    let ev = evaluator();
    let inv = Invocation::new(pf.form("echo").unwrap(), &ev).with_owner("acme");
    let out = inv
        .run(&json!({"body": {"msg": "hi"}}), |_| Ok(Value::from("ignored")))
        .unwrap();
    assert_eq!(out, Value::empty_map());
}

#[test]
fn without_finish_program_the_result_is_the_output() {
    let pf = polyform();
    let ev = evaluator();
    let inv = Invocation::new(pf.form("passthrough").unwrap(), &ev).with_owner("acme");
    let out = inv
        .run(&json!({"body": {"n": 1}}), |ctx| {
            let n = ctx.get_key("interface").and_then(|i| i.as_map()).map(|i| i["input"].clone());
            Ok(n.unwrap_or(Value::Null))
        })
        .unwrap();
    assert_eq!(out.to_json(), json!({"n": 1}));

    let err = inv
        .run(&json!({"body": {"n": 1}}), |_| Ok(Value::from(json!({"n": "one"}))))
        .unwrap_err();
    assert!(matches!(err, InvocationError::Validation(_)));
}

#[test]
fn logic_errors_surface() {
    let pf = polyform();
    let ev = evaluator();
    let inv = Invocation::new(pf.form("passthrough").unwrap(), &ev).with_owner("acme");
    let err = inv
        .run(&json!({"body": {"n": 1}}), |_| Err("boom".to_owned()))
        .unwrap_err();
    assert_eq!(err.to_string(), "logic failed: boom");
}

#[test]
fn finish_program_can_push_results() {
    let storage = Arc::new(MemoryStorage::new());
    let pf = Polyform::from_value(&json!({
        "scheme": "1.0",
        "meta": {"owner": "acme"},
        "forms": {
            "save": {
                "interface": "type Input { n: Int! }\ntype Output { saved: Boolean! }",
                "finish": ["result |> push('results/latest', '*>>archive')", "interface.output.saved = true"]
            }
        }
    }))
    .unwrap();
    let ev = Evaluator::new(storage.clone());
    let inv = Invocation::new(pf.form("save").unwrap(), &ev).with_owner("acme");
    let out = inv
        .run(&json!({"body": {"n": 2}}), |_| Ok(Value::from(json!({"total": 4}))))
        .unwrap();
    assert_eq!(out.to_json(), json!({"saved": true}));
    assert!(storage.exists("results/latest").unwrap());
}

#[test]
fn undeclared_input_drops_the_request_body() {
    let pf = Polyform::from_value(&json!({
        "scheme": "1.0",
        "meta": {"owner": "acme"},
        "forms": {
            "quiet": {"interface": "type Output { n: Int }"},
            "nosy": {
                "interface": "type Output { n: Int }",
                "expect": "x = interface.input.secret"
            }
        }
    }))
    .unwrap();
    let ev = evaluator();
    let event = json!({"body": {"secret": "leak"}});

    let ctx = Invocation::new(pf.form("quiet").unwrap(), &ev)
        .gather(&event)
        .unwrap();
    assert_eq!(ctx.to_json()["interface"]["input"], json!({}));

    let err = Invocation::new(pf.form("nosy").unwrap(), &ev)
        .gather(&event)
        .unwrap_err();
    match err {
        InvocationError::Contract(e) => assert!(matches!(
            e.kind,
            ContractErrorKind::UnboundReference { ref reference } if reference.contains("secret")
        )),
        other => panic!("unexpected error: {other:?}"),
    }
}
