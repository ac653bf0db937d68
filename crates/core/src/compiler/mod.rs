//! Contract compiler: logical statements to call trees.
//!
//! Each statement goes through a fixed pipeline:
//!   1. tokenize
//!   2. parse an optional `target =` prefix
//!   3. parse the pipeline, rewriting `A->B` to `follow(A, "B")` and `$name`
//!      to scoped references
//!   4. fold `|>` stages so the first stage is innermost
//!   5. wrap the result in a trailing `assign(tree, context, "target")` when the
//!      statement has an explicit or default target
//!
//! Compilation is pure: the same text always yields an identical tree.

mod parser;
mod tokens;

use crate::ast::{ContextRef, ContractExpression, ContractProgram, Expr, Path, Phase};
use crate::error::CompileError;
use crate::lexer;

pub const ASSIGN_VERB: &str = "assign";

fn wrap_assign(tree: Expr, target: &Path) -> Expr {
    Expr::call(
        ASSIGN_VERB,
        vec![
            tree,
            Expr::Ref(ContextRef::context()),
            Expr::str(target.to_string()),
        ],
    )
}

/// Compile one logical statement.
///
/// `default_target` is honoured only when the statement has no explicit
/// target and does not already call `assign`; callers pass it for the first
/// statement of a list only.
pub fn compile_statement(
    statement: &str,
    default_target: Option<&Path>,
) -> Result<ContractExpression, CompileError> {
    let toks = tokens::tokenize(statement)?;
    let parsed = parser::Parser::new(&toks, statement).parse_statement()?;

    let target = match parsed.target {
        Some(path) => Some(path),
        None => default_target
            .filter(|_| !parsed.tree.mentions_verb(ASSIGN_VERB))
            .cloned(),
    };
    let tree = match &target {
        Some(path) => wrap_assign(parsed.tree, path),
        None => parsed.tree,
    };

    Ok(ContractExpression {
        source: statement.to_owned(),
        target,
        tree,
    })
}

fn compile_statements(
    statements: Vec<String>,
    default_target: Option<&Path>,
) -> Result<Vec<ContractExpression>, CompileError> {
    statements
        .iter()
        .enumerate()
        .map(|(i, stmt)| compile_statement(stmt, if i == 0 { default_target } else { None }))
        .collect()
}

/// Lex and compile a block of contract source.
pub fn compile_source(
    source: &str,
    default_target: Option<&Path>,
) -> Result<Vec<ContractExpression>, CompileError> {
    compile_statements(lexer::logical_statements(source)?, default_target)
}

/// Lex and compile contract source given as separate entries (YAML list form).
pub fn compile_lines<'a, I>(
    lines: I,
    default_target: Option<&Path>,
) -> Result<Vec<ContractExpression>, CompileError>
where
    I: IntoIterator<Item = &'a str>,
{
    compile_statements(lexer::statements_from_lines(lines)?, default_target)
}

/// Compile a whole phase program for one form.
pub fn compile(
    form: &str,
    phase: Phase,
    source: &str,
    default_target: Option<&Path>,
) -> Result<ContractProgram, CompileError> {
    let expressions = compile_source(source, default_target)?;
    tracing::debug!(form, %phase, statements = expressions.len(), "compiled contract");
    Ok(ContractProgram::new(form, phase, expressions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Literal, PathSegment, Scope};

    fn tree(src: &str) -> Expr {
        compile_statement(src, None).unwrap().tree
    }

    fn ctx_ref(key: &str) -> Expr {
        Expr::Ref(ContextRef::key(key))
    }

    #[test]
    fn compilation_is_deterministic() {
        let src = "result = pull($owner.id, \"json\") |> is('Input') |> inspect('x')";
        let a = compile_statement(src, None).unwrap();
        let b = compile_statement(src, None).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), b.to_string());
    }

    #[test]
    fn assignment_is_trailing_assign_call() {
        let compiled = compile_statement("model = pull(\"X\")", None).unwrap();
        let expected = Expr::call(
            "assign",
            vec![
                Expr::call("pull", vec![Expr::str("X")]),
                Expr::Ref(ContextRef::context()),
                Expr::str("model"),
            ],
        );
        assert_eq!(compiled.tree, expected);
        assert_eq!(compiled.target, Some(Path::key("model")));
        assert_eq!(
            compiled.to_string(),
            "assign(pull(\"X\"), context, \"model\")"
        );
    }

    #[test]
    fn pipeline_folds_first_stage_innermost() {
        let expected = Expr::call(
            "f3",
            vec![
                Expr::call(
                    "f2",
                    vec![Expr::call("f1", vec![Expr::str("red")]), Expr::str("green")],
                ),
                Expr::str("blue"),
            ],
        );
        assert_eq!(
            tree("f1(\"red\") |> f2(\"green\") |> f3(\"blue\")"),
            expected
        );
    }

    #[test]
    fn follow_sugar_inside_pipeline() {
        let expected = Expr::call(
            "is",
            vec![
                Expr::call("follow", vec![ctx_ref("accept"), Expr::str("csv")]),
                Expr::str("pandas:data_frame"),
            ],
        );
        assert_eq!(
            tree("accept->csv |> is(\"pandas:data_frame\")"),
            expected
        );
    }

    #[test]
    fn follow_chains_left_to_right() {
        assert_eq!(
            tree("$this->forms.*->log").to_string(),
            "follow(follow($this, \"forms.*\"), \"log\")"
        );
    }

    #[test]
    fn interpolation_scopes() {
        assert_eq!(
            tree("f($this.meta, $self, $form, $owner.id)"),
            Expr::call(
                "f",
                vec![
                    Expr::Ref(ContextRef {
                        scope: Scope::This,
                        path: Path::key("meta"),
                    }),
                    Expr::Ref(ContextRef {
                        scope: Scope::SelfName,
                        path: Path::root(),
                    }),
                    Expr::Ref(ContextRef {
                        scope: Scope::Form,
                        path: Path::root(),
                    }),
                    Expr::Ref(ContextRef {
                        scope: Scope::Context,
                        path: Path::parse("owner.id").unwrap(),
                    }),
                ],
            )
        );
    }

    #[test]
    fn bare_stage_is_partial_call_without_args() {
        assert_eq!(
            tree("pull('a') |> autoclean"),
            Expr::call("autoclean", vec![Expr::call("pull", vec![Expr::str("a")])])
        );
    }

    #[test]
    fn literals_and_bracketed_refs() {
        assert_eq!(
            tree("in_range(data[\"k\"][2], -1, 2.5)"),
            Expr::call(
                "in_range",
                vec![
                    Expr::Ref(ContextRef {
                        scope: Scope::Context,
                        path: Path::from_segments(vec![
                            PathSegment::Key("data".into()),
                            PathSegment::Key("k".into()),
                            PathSegment::Index(2),
                        ]),
                    }),
                    Expr::Literal(Literal::Int(-1)),
                    Expr::Literal(Literal::Float("2.5".into())),
                ],
            )
        );
        assert_eq!(tree("True"), Expr::Literal(Literal::Bool(true)));
        assert_eq!(tree("null"), Expr::Literal(Literal::Null));
    }

    #[test]
    fn dotted_assignment_target() {
        let compiled = compile_statement("interface.output[\"n\"] = 5", None).unwrap();
        assert_eq!(compiled.tree.to_string(), "assign(5, context, \"interface.output.n\")");
    }

    #[test]
    fn default_target_applies_to_first_statement_only() {
        let default = Path::key("time");
        let exprs = compile_source("now()\nnow()", Some(&default)).unwrap();
        assert_eq!(exprs[0].tree.to_string(), "assign(now(), context, \"time\")");
        assert_eq!(exprs[1].tree.to_string(), "now()");
        assert_eq!(exprs[1].target, None);
    }

    #[test]
    fn default_target_skipped_when_assign_present() {
        let default = Path::key("time");
        let exprs = compile_source("x = now()", Some(&default)).unwrap();
        assert_eq!(exprs[0].target, Some(Path::key("x")));

        let explicit = compile_source("assign(1, context, 'y')", Some(&default)).unwrap();
        assert_eq!(explicit[0].target, None);
        assert_eq!(explicit[0].tree.to_string(), "assign(1, context, \"y\")");
    }

    #[test]
    fn empty_target_is_an_error() {
        let err = compile_statement("= pull('x')", None).unwrap_err();
        assert!(matches!(err, CompileError::EmptyAssignmentTarget { .. }));
    }

    #[test]
    fn literal_stage_is_an_error() {
        let err = compile_statement("f() |> 'oops'", None).unwrap_err();
        assert!(matches!(err, CompileError::Syntax { .. }));
    }

    #[test]
    fn unbalanced_call_is_an_error() {
        assert!(compile_statement("f(1, 2", None).is_err());
        assert!(compile_statement("f(1) g(2)", None).is_err());
        assert!(compile_statement("x =", None).is_err());
    }

    #[test]
    fn compile_program_tags_phase_and_form() {
        let program = compile(
            "hello",
            Phase::Finish,
            "# header\nout = result \\\n  |> inspect('out')\n",
            None,
        )
        .unwrap();
        assert_eq!(program.form, "hello");
        assert_eq!(program.phase, Phase::Finish);
        assert_eq!(
            program.render(),
            vec!["assign(inspect($result, \"out\"), context, \"out\")"]
        );
    }

    #[test]
    fn compile_lines_matches_block_source() {
        let lines = ["a = f(1)", "g($a)"];
        assert_eq!(
            compile_lines(lines, None).unwrap(),
            compile_source("a = f(1)\ng($a)", None).unwrap()
        );
    }
}
