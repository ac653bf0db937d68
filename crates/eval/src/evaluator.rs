//! Sequential contract evaluation with the truthiness gate.
//!
//! Statements run strictly in order. Each call tree is evaluated bottom-up,
//! arguments before their call. Built-in verbs are looked up first, then the
//! host lookup. After every statement the result must pass the gate
//! ([`Value::passes_gate`]); the first falsy result aborts the program and the
//! partially mutated context is dropped.

use std::collections::BTreeMap;
use std::sync::Arc;

use polyform_core::{ContextRef, ContractExpression, ContractProgram, Expr, Literal, Scope, TypeSchema};
use polyform_storage::StorageBackend;

use crate::context::{get_path, ExecutionContext};
use crate::error::{ContractError, ContractErrorKind, VerbError};
use crate::host::{HostLookup, HostVerb, StaticHostLookup};
use crate::sanitize::{ColumnSanitizer, Sanitizer};
use crate::value::Value;
use crate::verbs::{builtin_verbs, VerbEnv, VerbFn};

/// Per-form bindings for `$this`, `$self` and `$form`, and the schema that
/// `is`/`are` validate against.
#[derive(Debug, Clone)]
pub struct EvalScope {
    pub this: Value,
    pub self_name: String,
    pub form: String,
    pub schema: TypeSchema,
}

impl EvalScope {
    pub fn new(form: impl Into<String>, schema: TypeSchema) -> Self {
        EvalScope {
            this: Value::empty_map(),
            self_name: String::new(),
            form: form.into(),
            schema,
        }
    }

    pub fn with_this(mut self, this: Value, self_name: impl Into<String>) -> Self {
        self.this = this;
        self.self_name = self_name.into();
        self
    }
}

impl Default for EvalScope {
    fn default() -> Self {
        EvalScope::new("", TypeSchema::empty())
    }
}

pub struct Evaluator {
    storage: Arc<dyn StorageBackend>,
    sanitizer: Arc<dyn Sanitizer>,
    host: Arc<dyn HostLookup>,
    follow: Option<HostVerb>,
    verbs: BTreeMap<&'static str, VerbFn>,
}

impl Evaluator {
    /// Evaluator over `storage` with the column sanitizer and no host verbs.
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Evaluator {
            storage,
            sanitizer: Arc::new(ColumnSanitizer),
            host: Arc::new(StaticHostLookup::empty()),
            follow: None,
            verbs: builtin_verbs(),
        }
    }

    pub fn with_sanitizer(mut self, sanitizer: Arc<dyn Sanitizer>) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn with_host(mut self, host: Arc<dyn HostLookup>) -> Self {
        self.host = host;
        self
    }

    /// Give `follow` a traversal. Without one it raises `UnsupportedVerb`.
    pub fn with_follow<F>(mut self, traverse: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Value, VerbError> + Send + Sync + 'static,
    {
        self.follow = Some(Arc::new(traverse));
        self
    }

    pub fn storage(&self) -> &dyn StorageBackend {
        self.storage.as_ref()
    }

    /// Run `program` against `context`, returning the updated context.
    pub fn evaluate(
        &self,
        program: &ContractProgram,
        mut context: ExecutionContext,
        scope: &EvalScope,
    ) -> Result<ExecutionContext, ContractError> {
        for (i, expr) in program.iter().enumerate() {
            let index = i + 1;
            tracing::debug!(
                form = %program.form,
                phase = %program.phase,
                index,
                statement = %expr,
                "evaluating statement"
            );
            let value = self
                .eval(&expr.tree, &mut context, scope)
                .map_err(|kind| tag(program, index, expr, kind))?;
            if !value.passes_gate() {
                tracing::warn!(
                    form = %program.form,
                    phase = %program.phase,
                    index,
                    statement = %expr.source,
                    "contract violation"
                );
                return Err(tag(program, index, expr, ContractErrorKind::Violation { value }));
            }
        }
        Ok(context)
    }

    fn eval(
        &self,
        expr: &Expr,
        context: &mut ExecutionContext,
        scope: &EvalScope,
    ) -> Result<Value, ContractErrorKind> {
        match expr {
            Expr::Literal(lit) => Ok(literal(lit)),
            Expr::Ref(r) => resolve(r, context, scope),
            Expr::Call(call) => {
                let args = call
                    .args
                    .iter()
                    .map(|arg| self.eval(arg, context, scope))
                    .collect::<Result<Vec<_>, _>>()?;
                self.dispatch(&call.verb, args, context, scope)
            }
        }
    }

    fn dispatch(
        &self,
        verb: &str,
        args: Vec<Value>,
        context: &mut ExecutionContext,
        scope: &EvalScope,
    ) -> Result<Value, ContractErrorKind> {
        if let Some(builtin) = self.verbs.get(verb) {
            let mut env = VerbEnv {
                context,
                storage: self.storage.as_ref(),
                sanitizer: self.sanitizer.as_ref(),
                schema: &scope.schema,
                follow: self.follow.as_ref(),
            };
            return builtin(&mut env, args).map_err(verb_error);
        }
        match self.host.resolve(verb) {
            Some(host_verb) => host_verb(args).map_err(verb_error),
            None => Err(ContractErrorKind::UnknownVerb {
                verb: verb.to_owned(),
            }),
        }
    }
}

fn tag(
    program: &ContractProgram,
    index: usize,
    expr: &ContractExpression,
    kind: ContractErrorKind,
) -> ContractError {
    ContractError {
        form: program.form.clone(),
        phase: program.phase,
        index,
        expression: expr.to_string(),
        source_text: expr.source.clone(),
        kind,
    }
}

fn verb_error(e: VerbError) -> ContractErrorKind {
    match e {
        VerbError::Unsupported { verb } => ContractErrorKind::UnsupportedVerb { verb },
        other => ContractErrorKind::Verb(other),
    }
}

fn literal(lit: &Literal) -> Value {
    match lit {
        Literal::Null => Value::Null,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int(n) => Value::Int(*n),
        Literal::Float(text) => match text.parse() {
            Ok(f) => Value::Float(f),
            Err(_) => Value::Str(text.clone()),
        },
        Literal::Str(s) => Value::Str(s.clone()),
    }
}

fn resolve(r: &ContextRef, context: &ExecutionContext, scope: &EvalScope) -> Result<Value, ContractErrorKind> {
    let unbound = || ContractErrorKind::UnboundReference {
        reference: r.to_string(),
    };
    match r.scope {
        Scope::Context if r.path.is_empty() => Ok(context.to_value()),
        Scope::Context => context.get(&r.path).cloned().ok_or_else(unbound),
        Scope::This => get_path(&scope.this, r.path.segments()).cloned().ok_or_else(unbound),
        Scope::SelfName if r.path.is_empty() => Ok(Value::Str(scope.self_name.clone())),
        Scope::Form if r.path.is_empty() => Ok(Value::Str(scope.form.clone())),
        Scope::SelfName | Scope::Form => Err(unbound()),
    }
}
