//! Usage command implementation

use clap::Args;

use crate::core::{FetchError, SourceFetcher as _, SourceId};
use crate::settings::{resolve_admin_key, Settings};
use crate::sources::create_fetcher;

use super::render;

/// Arguments for the usage command
#[derive(Args, Debug, Default)]
pub struct UsageArgs {
    /// Source to query (usage, web-usage, cost, all)
    #[arg(short, long)]
    pub source: Option<String>,

    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Shorthand for --format json
    #[arg(long)]
    pub json: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Disable ANSI colors in text output
    #[arg(long = "no-color")]
    pub no_color: bool,
}

/// Output format enum
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid format: {}. Use 'text' or 'json'", s)),
        }
    }
}

impl clap::builder::ValueParserFactory for OutputFormat {
    type Parser = clap::builder::ValueParser;

    fn value_parser() -> Self::Parser {
        clap::builder::ValueParser::new(|s: &str| s.parse::<OutputFormat>())
    }
}

/// Source selection from CLI args
#[derive(Debug, Clone)]
pub enum SourceSelection {
    Single(SourceId),
    All,
}

impl SourceSelection {
    pub fn from_arg(arg: Option<&str>) -> Result<Self, String> {
        match arg.map(|s| s.to_lowercase()).as_deref() {
            Some("all") => Ok(SourceSelection::All),
            Some(name) => SourceId::from_cli_name(name)
                .map(SourceSelection::Single)
                .ok_or_else(|| format!("unknown source: {}", name)),
            None => Ok(SourceSelection::Single(SourceId::Usage)),
        }
    }

    pub fn as_list(&self) -> Vec<SourceId> {
        match self {
            SourceSelection::Single(id) => vec![*id],
            // Price has its own command; "all" here means the Venice sources
            SourceSelection::All => vec![SourceId::Usage, SourceId::WebUsage, SourceId::Cost],
        }
    }
}

/// Run the usage command
pub async fn run(args: UsageArgs) -> anyhow::Result<()> {
    let format = if args.json {
        OutputFormat::Json
    } else {
        args.format
    };
    let selection = SourceSelection::from_arg(args.source.as_deref())
        .map_err(|e| anyhow::anyhow!(e))?;
    let use_color = !args.no_color && is_terminal();

    let settings = Settings::load();
    let sources = selection.as_list();
    let admin_key = resolve_admin_key();
    // The public price source runs without a credential
    if admin_key.is_none() && sources.iter().any(|id| id.requires_admin_key()) {
        anyhow::bail!(
            "admin API key not configured (set VENICE_ADMIN_API_KEY or run `vvvwatch config`)"
        );
    }

    tracing::debug!(sources = ?sources, format = ?format, "running usage command");

    let mut results: Vec<serde_json::Value> = Vec::new();
    let mut text_sections: Vec<String> = Vec::new();

    for id in sources.iter().copied() {
        let fetcher = match create_fetcher(id, &settings, admin_key.as_deref()) {
            Ok(f) => f,
            Err(e) => return Err(e.into()),
        };

        match fetcher.fetch().await {
            Ok(payload) => {
                if format == OutputFormat::Text {
                    let body = match &payload {
                        crate::core::SourcePayload::Usage(s) => render::render_usage(s, use_color),
                        crate::core::SourcePayload::WebUsage(s) => render::render_web_usage(s),
                        crate::core::SourcePayload::Cost(s) => render::render_cost(s),
                        crate::core::SourcePayload::Price(s) => {
                            render::render_price(s, settings.holding_amount, use_color)
                        }
                    };
                    text_sections.push(format!("{}\n{}", section_header(id, use_color), body));
                } else {
                    results.push(serde_json::to_value(&payload)?);
                }
            }
            Err(e) => {
                if matches!(e, FetchError::Auth(_)) || sources.len() == 1 {
                    return Err(e.into());
                }
                if format == OutputFormat::Text {
                    text_sections.push(format!(
                        "{}\n  Error: {}",
                        section_header(id, use_color),
                        e
                    ));
                } else {
                    results.push(serde_json::json!({
                        "source": id.cli_name(),
                        "error": e.to_string(),
                    }));
                }
            }
        }
    }

    match format {
        OutputFormat::Text => {
            println!("{}", text_sections.join("\n\n"));
        }
        OutputFormat::Json => {
            let output = if args.pretty {
                serde_json::to_string_pretty(&results)?
            } else {
                serde_json::to_string(&results)?
            };
            println!("{}", output);
        }
    }

    Ok(())
}

fn section_header(id: SourceId, use_color: bool) -> String {
    if use_color {
        format!("\x1b[1m{}\x1b[0m", id.display_name())
    } else {
        id.display_name().to_string()
    }
}

/// Check if stdout is a terminal
fn is_terminal() -> bool {
    use std::io::IsTerminal;
    std::io::stdout().is_terminal()
}
