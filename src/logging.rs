//! Logging initialization
//!
//! Installs the global tracing subscriber. Honors `RUST_LOG` when set,
//! otherwise `--verbose` bumps the crate to debug. `--json-output` swaps the
//! human format for JSON lines on stderr.

use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber. Call once, before any command runs.
pub fn init(verbose: bool, json_output: bool) -> anyhow::Result<()> {
    let default_directive = if verbose { "vvvwatch=debug,warn" } else { "vvvwatch=info,warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if json_output {
        builder.json().try_init().map_err(|e| anyhow::anyhow!("{}", e))?;
    } else {
        builder.try_init().map_err(|e| anyhow::anyhow!("{}", e))?;
    }

    Ok(())
}
