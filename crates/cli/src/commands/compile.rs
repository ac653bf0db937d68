use std::path::Path;

use polyform_core::Phase;

use super::{fail, print_json, read_source};
use crate::OutputFormat;

pub(crate) fn cmd_compile(
    file: &Path,
    default_target: Option<&str>,
    phase: Phase,
    output: OutputFormat,
    quiet: bool,
) {
    let source = read_source(file, output, quiet);

    let target = match default_target.map(polyform_core::Path::parse).transpose() {
        Ok(t) => t,
        Err(e) => fail(&format!("invalid --default-target: {}", e), output, quiet),
    };
    let form = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let program = match polyform_core::compile(&form, phase, &source, target.as_ref()) {
        Ok(p) => p,
        Err(e) => fail(
            &format!("compile error in '{}': {}", file.display(), e),
            output,
            quiet,
        ),
    };

    match output {
        OutputFormat::Json => match serde_json::to_value(&program) {
            Ok(v) => print_json(&v),
            Err(e) => fail(&format!("serialization error: {}", e), output, quiet),
        },
        OutputFormat::Text => {
            for (i, line) in program.render().iter().enumerate() {
                println!("{:>3}  {}", i + 1, line);
            }
        }
    }
}
