use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub(crate) const DEFAULT_LOG_FILTER: &str = "polyform=info";

/// Initialize tracing to stderr. `RUST_LOG` overrides the default filter;
/// `--verbose` and `--quiet` override both.
pub(crate) fn init_logging(verbose: bool, quiet: bool) {
    let filter = if verbose {
        EnvFilter::new("polyform=debug")
    } else if quiet {
        EnvFilter::new("polyform=error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    };

    let result = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(filter),
        )
        .try_init();
    if let Err(e) = result {
        eprintln!("warning: logging not initialised: {}", e);
    }
}
