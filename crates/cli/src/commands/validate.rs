use std::path::Path;

use super::{fail, print_json, read_json, read_source};
use crate::OutputFormat;

pub(crate) fn cmd_validate(
    schema_path: &Path,
    data_path: &Path,
    type_name: &str,
    output: OutputFormat,
    quiet: bool,
) {
    let source = read_source(schema_path, output, quiet);
    let schema = match polyform_core::parse_schema(&source) {
        Ok(s) => s,
        Err(e) => fail(
            &format!("schema error in '{}': {}", schema_path.display(), e),
            output,
            quiet,
        ),
    };
    let data = read_json(data_path, output, quiet);

    match polyform_eval::validate_json(&schema, type_name, &data) {
        Ok(normalized) => match output {
            OutputFormat::Json => print_json(&serde_json::json!({
                "valid": true,
                "type": type_name,
                "data": normalized,
            })),
            OutputFormat::Text => {
                if !quiet {
                    println!("valid {}", type_name);
                }
                print_json(&normalized);
            }
        },
        Err(e) => fail(&format!("validation failed: {}", e), output, quiet),
    }
}
