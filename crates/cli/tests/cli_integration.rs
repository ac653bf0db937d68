//! CLI integration tests for all subcommands.
//!
//! Uses `assert_cmd` to spawn the `polyform` binary and verify exit codes,
//! stdout content, and stderr content.
//!
//! All tests set `current_dir` to the workspace root so that relative paths
//! to test fixtures resolve correctly.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const FIXTURES: &str = "crates/cli/tests/fixtures";
const LOANS_CONFIG: &str = "crates/cli/tests/fixtures/loans/Polyform.yml";

/// Locate the workspace root by walking up from CARGO_MANIFEST_DIR.
fn workspace_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    // crates/cli -> workspace root is two levels up
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .to_path_buf()
}

/// Helper: create a Command for the `polyform` binary, rooted at workspace.
fn polyform() -> Command {
    let mut cmd = cargo_bin_cmd!("polyform");
    cmd.current_dir(workspace_root());
    cmd
}

fn fixture(name: &str) -> String {
    format!("{}/{}", FIXTURES, name)
}

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    polyform()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Polyform contract toolchain"));
}

#[test]
fn version_exits_0() {
    polyform()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("polyform"));
}

// ──────────────────────────────────────────────
// 2. Compile subcommand
// ──────────────────────────────────────────────

#[test]
fn compile_prints_call_trees() {
    polyform()
        .args(["compile", &fixture("contract.pf")])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"assign(pull("X"), context, "model")"#))
        .stdout(predicate::str::contains(r#"f3(f2(f1("red"), "green"), "blue")"#))
        .stdout(predicate::str::contains(
            r#"is(follow($accept, "csv"), "pandas:data_frame")"#,
        ));
}

#[test]
fn compile_default_target_wraps_first_statement() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("time.pf");
    fs::write(&path, "now()\nlater()\n").unwrap();

    polyform()
        .args(["compile", path.to_str().unwrap(), "--default-target", "time"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"assign(now(), context, "time")"#))
        .stdout(predicate::str::contains("  2  later()"));
}

#[test]
fn compile_json_output_has_expressions() {
    let out = polyform()
        .args(["--output", "json", "compile", &fixture("contract.pf")])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(v["phase"], "expect");
    assert_eq!(v["form"], "contract");
    assert_eq!(v["expressions"].as_array().unwrap().len(), 3);
}

#[test]
fn compile_syntax_error_exits_1() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("bad.pf");
    fs::write(&path, "f(1,, 2)\n").unwrap();

    polyform()
        .args(["compile", path.to_str().unwrap()])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("compile error"));
}

#[test]
fn compile_nonexistent_file_exits_1() {
    polyform()
        .args(["compile", "nonexistent_contract_xyz.pf"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("error reading file"));
}

// ──────────────────────────────────────────────
// 3. Schema and validate subcommands
// ──────────────────────────────────────────────

#[test]
fn schema_synthesizes_missing_output() {
    polyform()
        .args(["schema", &fixture("loan.schema")])
        .assert()
        .success()
        .stdout(predicate::str::contains("city: String!"))
        .stderr(predicate::str::contains("no Output type declared"));
}

#[test]
fn validate_accepts_nullable_absent_field() {
    polyform()
        .args([
            "validate",
            &fixture("loan.schema"),
            "--data",
            &fixture("data_ok.json"),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("valid Input"));
}

#[test]
fn validate_rejects_undeclared_field() {
    polyform()
        .args([
            "validate",
            &fixture("loan.schema"),
            "--data",
            &fixture("data_extra.json"),
        ])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("unexpected field"));
}

#[test]
fn validate_json_error_is_an_object() {
    polyform()
        .args([
            "--output",
            "json",
            "validate",
            &fixture("loan.schema"),
            "--data",
            &fixture("data_extra.json"),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"error\""));
}

#[test]
fn validate_output_type_of_synthesized_schema() {
    let tmp = TempDir::new().unwrap();
    let data = tmp.path().join("empty.json");
    fs::write(&data, "{}").unwrap();

    polyform()
        .args([
            "validate",
            &fixture("loan.schema"),
            "--data",
            data.to_str().unwrap(),
            "--type",
            "Output",
        ])
        .assert()
        .success();
}

// ──────────────────────────────────────────────
// 4. Check subcommand
// ──────────────────────────────────────────────

#[test]
fn check_lists_assembled_forms() {
    polyform()
        .args(["check", "--config", LOANS_CONFIG])
        .assert()
        .success()
        .stdout(predicate::str::contains("score (runtime): 2 expect, 2 finish"))
        .stdout(predicate::str::contains("base").not());
}

#[test]
fn check_json_output_has_meta() {
    let out = polyform()
        .args(["--output", "json", "check", "--config", LOANS_CONFIG])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(v["meta"]["domain"], "acme.io");
    assert_eq!(v["forms"]["score"]["extends"], "base");
    assert!(v["forms"].get("base").is_none());
}

#[test]
fn check_missing_config_exits_1() {
    polyform()
        .args(["check", "--config", "nonexistent/Polyform.yml"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("error reading config"));
}

#[test]
fn check_inheritance_cycle_exits_1() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("Polyform.yml");
    fs::write(
        &path,
        "scheme: \"1.0\"\nmeta: {}\nforms:\n  a: {extends: b}\n  b: {extends: a}\n",
    )
    .unwrap();

    polyform()
        .args(["check", "--config", path.to_str().unwrap()])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("cycle"));
}

// ──────────────────────────────────────────────
// 5. Run subcommand
// ──────────────────────────────────────────────

#[test]
fn run_invokes_form_and_pushes_result() {
    let store = TempDir::new().unwrap();
    polyform()
        .args([
            "run",
            "score",
            "--config",
            LOANS_CONFIG,
            "--input",
            &fixture("loans/event.json"),
            "--result",
            &fixture("loans/result.json"),
            "--store",
            store.path().to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"score\": 3.0"));

    let pushed = fs::read_to_string(store.path().join("scores").join("latest")).unwrap();
    assert_eq!(pushed, r#"{"score":3}"#);
}

#[test]
fn run_binds_this_to_the_loaded_config() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("Polyform.yml");
    fs::write(
        &config,
        "scheme: \"1.0\"\n\
         meta: {owner: ops}\n\
         forms:\n\
         \x20 who:\n\
         \x20   interface: |\n\
         \x20     type Input { n: Int! }\n\
         \x20     type Output { owner: String! }\n\
         \x20   expect: owner = $this.meta.owner\n\
         \x20   finish: interface.output.owner = owner\n",
    )
    .unwrap();
    let event = tmp.path().join("event.json");
    fs::write(&event, r#"{"body": {"n": 1}}"#).unwrap();

    polyform()
        .args([
            "run",
            "who",
            "--config",
            config.to_str().unwrap(),
            "--input",
            event.to_str().unwrap(),
            "--store",
            tmp.path().join("store").to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"owner\": \"ops\""));
}

#[test]
fn run_contract_violation_exits_1() {
    let store = TempDir::new().unwrap();
    polyform()
        .args([
            "run",
            "score",
            "--config",
            LOANS_CONFIG,
            "--input",
            &fixture("loans/event_out_of_range.json"),
            "--store",
            store.path().to_str().unwrap(),
        ])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("contract violation"));
}

#[test]
fn run_unknown_form_lists_available() {
    polyform()
        .args([
            "run",
            "nope",
            "--config",
            LOANS_CONFIG,
            "--input",
            &fixture("loans/event.json"),
        ])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("available: score"));
}
