use std::path::Path;

use super::{fail, print_json};
use crate::config::{config_path, load_polyform};
use crate::OutputFormat;

pub(crate) fn cmd_check(config: Option<&Path>, output: OutputFormat, quiet: bool) {
    let path = config_path(config);
    let polyform = match load_polyform(&path) {
        Ok(p) => p,
        Err(msg) => fail(&msg, output, quiet),
    };

    match output {
        OutputFormat::Json => match serde_json::to_value(&polyform) {
            Ok(v) => print_json(&v),
            Err(e) => fail(&format!("serialization error: {}", e), output, quiet),
        },
        OutputFormat::Text => {
            for (name, form) in &polyform.forms {
                println!(
                    "{} ({}): {} expect, {} finish",
                    name,
                    form.kind.as_str(),
                    form.expect.len(),
                    form.finish.len()
                );
                if !quiet {
                    for d in form.schema.diagnostics() {
                        eprintln!("  warning: {}", d);
                    }
                }
            }
            if !quiet {
                println!("{}: {} form(s) ok", path.display(), polyform.forms.len());
            }
        }
    }
}
