use std::path::Path;

use super::{fail, print_json, read_source};
use crate::OutputFormat;

pub(crate) fn cmd_schema(file: &Path, output: OutputFormat, quiet: bool) {
    let source = read_source(file, output, quiet);
    let schema = match polyform_core::parse_schema(&source) {
        Ok(s) => s,
        Err(e) => fail(
            &format!("schema error in '{}': {}", file.display(), e),
            output,
            quiet,
        ),
    };

    match output {
        OutputFormat::Json => match serde_json::to_value(&schema) {
            Ok(v) => print_json(&v),
            Err(e) => fail(&format!("serialization error: {}", e), output, quiet),
        },
        OutputFormat::Text => {
            print!("{}", schema.to_source());
            if !quiet {
                for d in schema.diagnostics() {
                    eprintln!("warning: {}", d);
                }
            }
        }
    }
}
