//! Gather, hosted logic, finish: one invocation of a form.

use std::collections::BTreeMap;

use polyform_core::schema::{INPUT, OUTPUT};
use polyform_core::{Form, Path, PathSegment};

use crate::context::{ExecutionContext, PathError};
use crate::error::ContractError;
use crate::evaluator::{EvalScope, Evaluator};
use crate::validate::{validate, ValidationError};
use crate::value::Value;

#[derive(Debug, thiserror::Error)]
pub enum InvocationError {
    #[error(transparent)]
    Contract(#[from] ContractError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error("bad input: {0}")]
    BadInput(String),

    #[error("logic failed: {0}")]
    Logic(String),
}

fn output_path() -> Path {
    Path::from_segments(vec![
        PathSegment::Key("interface".into()),
        PathSegment::Key("output".into()),
    ])
}

/// Drives one form through its phases. A fresh context is built per call to
/// [`Invocation::gather`]; nothing is shared between invocations.
pub struct Invocation<'a> {
    form: &'a Form,
    evaluator: &'a Evaluator,
    owner: Option<String>,
    scope: EvalScope,
}

impl<'a> Invocation<'a> {
    pub fn new(form: &'a Form, evaluator: &'a Evaluator) -> Self {
        Invocation {
            form,
            evaluator,
            owner: None,
            scope: EvalScope::new(form.name.clone(), form.schema.clone()),
        }
    }

    /// Owner id, seeded as `polydev.id`.
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Bindings for `$this` and `$self`.
    pub fn with_this(mut self, this: Value, self_name: impl Into<String>) -> Self {
        self.scope = self.scope.with_this(this, self_name);
        self
    }

    /// Read the event's payload from `parsed_body`, falling back to `body`.
    /// A string body is parsed as JSON.
    fn input(event: &serde_json::Value) -> Result<Value, InvocationError> {
        match event.get("parsed_body").or_else(|| event.get("body")) {
            None | Some(serde_json::Value::Null) => Ok(Value::empty_map()),
            Some(serde_json::Value::String(text)) => serde_json::from_str::<serde_json::Value>(text)
                .map(Value::from)
                .map_err(|e| InvocationError::BadInput(format!("body is not JSON: {}", e))),
            Some(body) => Ok(Value::from_json(body)),
        }
    }

    /// Seed a context from `event` and run the expect program.
    pub fn gather(&self, event: &serde_json::Value) -> Result<ExecutionContext, InvocationError> {
        tracing::info!(form = %self.form.name, "starting gather");

        let input = Self::input(event)?;
        let input = if self.form.schema.is_synthesized(INPUT) {
            tracing::debug!(form = %self.form.name, "no Input type declared; request body dropped");
            Value::empty_map()
        } else {
            validate(&self.form.schema, INPUT, &input)?
        };

        let mut context = ExecutionContext::new();
        let mut interface = BTreeMap::new();
        interface.insert("event".to_owned(), Value::from_json(event));
        interface.insert("input".to_owned(), input);
        interface.insert("output".to_owned(), Value::empty_map());
        context.insert("interface", Value::Map(interface));
        for role in ["creator", "invoker", "requestor", "appexdev"] {
            context.insert(role, Value::Null);
        }
        let mut polydev = BTreeMap::new();
        polydev.insert(
            "id".to_owned(),
            self.owner.as_deref().map(Value::from).unwrap_or(Value::Null),
        );
        context.insert("polydev", Value::Map(polydev));

        Ok(self.evaluator.evaluate(&self.form.expect, context, &self.scope)?)
    }

    /// Bind the logic's `result`, run the finish program and return the
    /// validated output.
    pub fn finish(&self, mut context: ExecutionContext, result: Value) -> Result<Value, InvocationError> {
        tracing::info!(form = %self.form.name, "starting finish");
        context.insert("result", result.clone());

        let context = if self.form.finish.is_empty() {
            context.set(&output_path(), result)?;
            context
        } else {
            context.set(&output_path(), Value::empty_map())?;
            self.evaluator.evaluate(&self.form.finish, context, &self.scope)?
        };

        if self.form.schema.is_synthesized(OUTPUT) {
            tracing::warn!(form = %self.form.name, "no Output type declared; returning an empty output");
            return Ok(Value::empty_map());
        }
        let output = context.get(&output_path()).cloned().unwrap_or(Value::Null);
        Ok(validate(&self.form.schema, OUTPUT, &output)?)
    }

    /// Gather, call `logic` with the gathered context, then finish.
    pub fn run<F>(&self, event: &serde_json::Value, logic: F) -> Result<Value, InvocationError>
    where
        F: FnOnce(&ExecutionContext) -> Result<Value, String>,
    {
        let context = self.gather(event)?;
        let result = logic(&context).map_err(InvocationError::Logic)?;
        self.finish(context, result)
    }
}
