mod commands;
mod config;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Contract phase selector for `compile`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum PhaseArg {
    Expect,
    Finish,
}

impl From<PhaseArg> for polyform_core::Phase {
    fn from(p: PhaseArg) -> Self {
        match p {
            PhaseArg::Expect => polyform_core::Phase::Expect,
            PhaseArg::Finish => polyform_core::Phase::Finish,
        }
    }
}

/// Polyform contract toolchain.
#[derive(Parser)]
#[command(name = "polyform", version, about = "Polyform contract toolchain")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Log evaluation steps at debug level
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile contract source and print the call trees
    Compile {
        /// Path to the contract source file
        file: PathBuf,
        /// Assignment target for the first statement when it has none
        #[arg(long)]
        default_target: Option<String>,
        /// Phase to tag the program with
        #[arg(long, default_value = "expect", value_enum)]
        phase: PhaseArg,
    },

    /// Parse a type schema and print the type table
    Schema {
        /// Path to the schema source file
        file: PathBuf,
    },

    /// Validate a JSON document against a type schema
    Validate {
        /// Path to the schema source file
        schema: PathBuf,
        /// Path to the JSON data file
        #[arg(long)]
        data: PathBuf,
        /// Root type to validate against
        #[arg(long = "type", default_value = "Input")]
        type_name: String,
    },

    /// Load a Polyform.yml and compile every form
    Check {
        /// Path to the configuration file (default: ./Polyform.yml)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Invoke a form: gather, hosted result, finish
    Run {
        /// Form name
        form: String,
        /// Path to the invocation event JSON
        #[arg(long)]
        input: PathBuf,
        /// Path to a JSON file holding the hosted logic's result
        /// (default: the validated input)
        #[arg(long)]
        result: Option<PathBuf>,
        /// Path to the configuration file (default: ./Polyform.yml)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Blob store root for pull/push
        #[arg(long, default_value = ".polyform/store")]
        store: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Compile {
            file,
            default_target,
            phase,
        } => commands::compile::cmd_compile(
            &file,
            default_target.as_deref(),
            phase.into(),
            cli.output,
            cli.quiet,
        ),
        Commands::Schema { file } => commands::schema::cmd_schema(&file, cli.output, cli.quiet),
        Commands::Validate {
            schema,
            data,
            type_name,
        } => commands::validate::cmd_validate(&schema, &data, &type_name, cli.output, cli.quiet),
        Commands::Check { config } => {
            commands::check::cmd_check(config.as_deref(), cli.output, cli.quiet)
        }
        Commands::Run {
            form,
            input,
            result,
            config,
            store,
        } => commands::run::cmd_run(commands::run::RunOptions {
            form: &form,
            input: &input,
            result: result.as_deref(),
            config: config.as_deref(),
            store: &store,
            output: cli.output,
            quiet: cli.quiet,
        }),
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => eprintln!("{}", serde_json::json!({ "error": msg })),
    }
}
