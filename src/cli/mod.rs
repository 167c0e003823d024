//! CLI module - command-line interface
//!
//! - `vvvwatch` - defaults to the usage command
//! - `vvvwatch usage` - one-shot account usage report
//! - `vvvwatch price` - one-shot token price report
//! - `vvvwatch watch` - live polling dashboard
//! - `vvvwatch config` - inspect and edit settings

pub mod config;
pub mod price;
pub mod render;
pub mod usage;
pub mod watch;

use clap::{Parser, Subcommand};

/// Exit codes
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const UNEXPECTED_FAILURE: i32 = 1;
    pub const CREDENTIAL_MISSING: i32 = 2;
    pub const PARSE_ERROR: i32 = 3;
    pub const FETCH_TIMEOUT: i32 = 4;
}

/// Version with build metadata from the build script
const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_COMMIT"),
    ", ",
    env!("BUILD_DATE"),
    ")"
);

/// vvvwatch - Monitor Venice AI usage, billing and VVV token price
///
/// Defaults to the usage command when no subcommand is given.
#[derive(Parser, Debug)]
#[command(name = "vvvwatch")]
#[command(author, version, long_version = LONG_VERSION, about, long_about = None)]
pub struct Cli {
    // === Global flags ===

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit machine-readable logs (JSON) to stderr
    #[arg(long = "json-output", global = true)]
    pub json_output: bool,

    /// Disable ANSI colors in output
    #[arg(long = "no-color")]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,

    // === Top-level args for the default usage command ===

    /// Source to query (usage, web-usage, cost, all)
    #[arg(short, long)]
    pub source: Option<String>,

    /// Output format: text or json
    #[arg(short, long, value_parser = ["text", "json"])]
    pub format: Option<String>,

    /// Shorthand for --format json
    #[arg(long)]
    pub json: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print account usage, web usage or cost as text or JSON (default command)
    Usage(usage::UsageArgs),

    /// Print the current VVV token price and holding value
    Price(price::PriceArgs),

    /// Run the live polling dashboard in the terminal
    Watch(watch::WatchArgs),

    /// Show or change settings
    Config(config::ConfigArgs),
}

impl Cli {
    /// Convert top-level args to UsageArgs for the default command
    pub fn to_usage_args(&self) -> usage::UsageArgs {
        usage::UsageArgs {
            source: self.source.clone(),
            format: if self.json {
                usage::OutputFormat::Json
            } else if let Some(ref f) = self.format {
                f.parse().unwrap_or_default()
            } else {
                usage::OutputFormat::Text
            },
            json: self.json,
            pretty: self.pretty,
            no_color: self.no_color,
        }
    }
}
