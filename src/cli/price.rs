//! Price command implementation

use clap::Args;

use crate::core::SourcePayload;
use crate::settings::Settings;
use crate::sources::PriceFetcher;

use super::render;
use super::usage::OutputFormat;

/// Arguments for the price command
#[derive(Args, Debug, Default)]
pub struct PriceArgs {
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

    /// Override the configured holding amount for this run
    #[arg(long)]
    pub holding: Option<f64>,
}

/// Run the price command
pub async fn run(args: PriceArgs) -> anyhow::Result<()> {
    let format = if args.json {
        OutputFormat::Json
    } else {
        args.format
    };
    let settings = Settings::load();
    let holding = args.holding.unwrap_or(settings.holding_amount);

    let fetcher = PriceFetcher::new(settings.token_id.clone(), &settings.currencies)?;
    let payload = crate::core::SourceFetcher::fetch(&fetcher).await?;

    match format {
        OutputFormat::Text => {
            if let SourcePayload::Price(ref snapshot) = payload {
                println!("VVV Price");
                println!("{}", render::render_price(snapshot, holding, !args.no_color));
            }
        }
        OutputFormat::Json => {
            let mut value = serde_json::to_value(&payload)?;
            // Holding value is derived for display; expose it alongside the
            // stored prices without persisting it anywhere
            if let SourcePayload::Price(ref snapshot) = payload {
                if let Some(holding_value) = snapshot.holding_value("usd", holding) {
                    value["holding_amount"] = serde_json::json!(holding);
                    value["holding_value_usd"] = serde_json::json!(holding_value);
                }
            }
            let output = if args.pretty {
                serde_json::to_string_pretty(&value)?
            } else {
                serde_json::to_string(&value)?
            };
            println!("{}", output);
        }
    }

    Ok(())
}
