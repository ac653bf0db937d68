use std::path::Path;
use std::sync::Arc;

use polyform_eval::{Evaluator, Invocation, Value};
use polyform_storage::FileSystemStorage;

use super::{fail, print_json, read_json};
use crate::config::{config_path, load_polyform};
use crate::OutputFormat;

pub(crate) struct RunOptions<'a> {
    pub form: &'a str,
    pub input: &'a Path,
    pub result: Option<&'a Path>,
    pub config: Option<&'a Path>,
    pub store: &'a Path,
    pub output: OutputFormat,
    pub quiet: bool,
}

/// Run one invocation. The CLI hosts no logic of its own: the result is the
/// `--result` document, or the validated input when none is given.
pub(crate) fn cmd_run(opts: RunOptions<'_>) {
    let (output, quiet) = (opts.output, opts.quiet);
    let polyform = match load_polyform(&config_path(opts.config)) {
        Ok(p) => p,
        Err(msg) => fail(&msg, output, quiet),
    };
    let Some(form) = polyform.form(opts.form) else {
        let known: Vec<&str> = polyform.forms.keys().map(String::as_str).collect();
        fail(
            &format!("unknown form '{}' (available: {})", opts.form, known.join(", ")),
            output,
            quiet,
        )
    };

    let event = read_json(opts.input, output, quiet);
    let result = opts.result.map(|p| Value::from_json(&read_json(p, output, quiet)));

    let storage = match FileSystemStorage::open(opts.store) {
        Ok(s) => s,
        Err(e) => fail(
            &format!("error opening store '{}': {}", opts.store.display(), e),
            output,
            quiet,
        ),
    };
    let evaluator = Evaluator::new(Arc::new(storage));

    let this = match serde_json::to_value(&polyform) {
        Ok(v) => Value::from_json(&v),
        Err(e) => fail(&format!("serialization error: {}", e), output, quiet),
    };
    let mut invocation = Invocation::new(form, &evaluator)
        .with_this(this, polyform.meta.name.clone().unwrap_or_default());
    if let Some(owner) = &polyform.meta.owner {
        invocation = invocation.with_owner(owner.clone());
    }

    let outcome = invocation.run(&event, |ctx| match result {
        Some(r) => Ok(r),
        None => Ok(ctx
            .get(&polyform_core::Path::parse("interface.input").map_err(|e| e.to_string())?)
            .cloned()
            .unwrap_or(Value::Null)),
    });

    match outcome {
        Ok(out) => match output {
            OutputFormat::Json => print_json(&serde_json::json!({
                "form": form.name,
                "output": out.to_json(),
            })),
            OutputFormat::Text => print_json(&out.to_json()),
        },
        Err(e) => fail(&format!("{} failed: {}", form.name, e), output, quiet),
    }
}
