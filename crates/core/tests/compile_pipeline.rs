//! End-to-end checks over the public core API: raw contract text through
//! lexing and compilation, and configuration documents through form assembly.

use polyform_core::{
    compile, logical_statements, parse_schema, CompileError, FormError, Path, Phase, Polyform,
    ProgramCache,
};
use serde_json::json;

// ──────────────────────────────────────────────
// Contract source
// ──────────────────────────────────────────────

#[test]
fn commented_multiline_source_compiles_in_order() {
    let src = "# header comment\n\
               model = pull(\"X\")   # trailing\n\
               \n\
               in_range(model, \\\n    1, 5)\n";
    assert_eq!(
        logical_statements(src).unwrap(),
        vec!["model = pull(\"X\")", "in_range(model, 1, 5)"]
    );

    let program = compile("score", Phase::Expect, src, None).unwrap();
    assert_eq!(program.len(), 2);
    assert_eq!(program.render()[0], r#"assign(pull("X"), context, "model")"#);
}

#[test]
fn default_target_applies_to_first_statement_only() {
    let target = Path::key("time");
    let program = compile("f", Phase::Expect, "now()\nnow()\n", Some(&target)).unwrap();
    assert_eq!(
        program.render(),
        vec![r#"assign(now(), context, "time")"#, "now()"]
    );
}

#[test]
fn dangling_continuation_is_a_compile_error() {
    let err = compile("f", Phase::Finish, "push(result, \\", None).unwrap_err();
    assert!(matches!(err, CompileError::UnexpectedEndOfInput { line: 1 }));
}

// ──────────────────────────────────────────────
// Schemas
// ──────────────────────────────────────────────

#[test]
fn schema_round_trips_declared_types_only() {
    let schema = parse_schema("type Input {\n  city: String!\n  year: Int\n}\n").unwrap();
    assert!(schema.is_synthesized("Output"));
    assert_eq!(
        schema.to_source(),
        "type Input {\n    city: String!\n    year: Int\n}\n"
    );
}

// ──────────────────────────────────────────────
// Assembly
// ──────────────────────────────────────────────

fn config() -> serde_json::Value {
    json!({
        "scheme": "1.0",
        "meta": {"owner": "ops", "dimensions": {"time": "now()"}},
        "forms": {
            "base": {
                "type": "template",
                "interface": "type Input { year: Int! }",
                "expect": ["in_range(pull('year'), 1990, 2030)"],
            },
            "score": {"extends": "base", "finish": ["push(result, 'scores')"]},
            "audit": {"extends": "base"},
        },
    })
}

#[test]
fn inherited_forms_share_compiled_programs() {
    let cache = ProgramCache::new();
    let pf = Polyform::from_value_with_cache(&config(), &cache).unwrap();
    assert_eq!(pf.forms.keys().collect::<Vec<_>>(), vec!["audit", "score"]);

    let score = pf.form("score").unwrap();
    assert_eq!(score.expect.len(), 2);
    assert_eq!(score.finish.len(), 1);
    assert!(score.schema.contains("Input"));
    assert_eq!(pf.form("audit").unwrap().expect, {
        let mut p = score.expect.clone();
        p.form = "audit".into();
        p
    });

    let entries = cache.len();
    Polyform::from_value_with_cache(&config(), &cache).unwrap();
    assert_eq!(cache.len(), entries);
}

#[test]
fn compile_errors_name_the_form_and_phase() {
    let mut doc = config();
    doc["forms"]["score"]["finish"] = json!(["push(result,, 'x')"]);
    match Polyform::from_value(&doc).unwrap_err() {
        FormError::Compile { form, phase, .. } => {
            assert_eq!(form, "score");
            assert_eq!(phase, Phase::Finish);
        }
        other => panic!("unexpected error: {other}"),
    }
}
