//! Config command - inspect and edit settings

use clap::{Args, Subcommand};

use crate::core::SourceId;
use crate::settings::{mask_key, resolve_admin_key, Settings, VeniceKeys};

/// Arguments for the config command
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: Option<ConfigCommand>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print current settings (default)
    Show,

    /// Set the VVV holding amount used for the derived value line
    SetHolding {
        /// Token quantity, must be a positive number
        amount: f64,
    },

    /// Set the polling interval for a source
    SetInterval {
        /// Source name (usage, web-usage, price, cost)
        source: String,
        /// Interval in seconds, 0 restores the default
        secs: u64,
    },

    /// Enable or disable a source in the watch dashboard
    Toggle {
        /// Source name (usage, web-usage, price, cost)
        source: String,
    },

    /// Store the Venice admin API key
    SetKey {
        /// The admin API key; stored in the user config directory
        key: String,
    },
}

/// Run the config command
pub async fn run(args: ConfigArgs) -> anyhow::Result<()> {
    match args.command.unwrap_or(ConfigCommand::Show) {
        ConfigCommand::Show => show(),
        ConfigCommand::SetHolding { amount } => {
            let mut settings = Settings::load();
            settings
                .set_holding_amount(amount)
                .map_err(|e| anyhow::anyhow!(e))?;
            settings.save()?;
            println!("holding amount set to {}", amount);
            Ok(())
        }
        ConfigCommand::SetInterval { source, secs } => {
            let id = parse_source(&source)?;
            let mut settings = Settings::load();
            match id {
                SourceId::Usage => settings.usage_interval_secs = secs,
                SourceId::WebUsage => settings.web_usage_interval_secs = secs,
                SourceId::Price => settings.price_interval_secs = secs,
                SourceId::Cost => settings.cost_interval_secs = secs,
            }
            settings.save()?;
            println!(
                "{} interval set to {}s",
                id.cli_name(),
                settings.interval_for(id).as_secs()
            );
            Ok(())
        }
        ConfigCommand::Toggle { source } => {
            let id = parse_source(&source)?;
            let mut settings = Settings::load();
            let enabled = settings.toggle_source(id);
            settings.save()?;
            println!(
                "{} {}",
                id.cli_name(),
                if enabled { "enabled" } else { "disabled" }
            );
            Ok(())
        }
        ConfigCommand::SetKey { key } => {
            let mut keys = VeniceKeys::load();
            keys.admin_key = Some(key);
            keys.save()?;
            println!("admin API key stored");
            Ok(())
        }
    }
}

fn show() -> anyhow::Result<()> {
    let settings = Settings::load();

    println!("Sources:");
    for id in SourceId::all() {
        let enabled = if settings.is_source_enabled(*id) {
            "enabled"
        } else {
            "disabled"
        };
        println!(
            "  {:<10} {:<9} every {}s",
            id.cli_name(),
            enabled,
            settings.interval_for(*id).as_secs()
        );
    }

    println!("Token:     {}", settings.token_id);
    println!("Currencies: {}", settings.currencies.join(", "));
    println!("Holding:   {} VVV", settings.holding_amount);
    println!("Window:    {} days", settings.analysis_days);

    match resolve_admin_key() {
        Some(key) => println!("Admin key: {}", mask_key(&key)),
        None => println!("Admin key: not configured"),
    }

    if let Some(path) = Settings::settings_path() {
        println!("Settings:  {}", path.display());
    }

    Ok(())
}

fn parse_source(name: &str) -> anyhow::Result<SourceId> {
    SourceId::from_cli_name(name)
        .ok_or_else(|| anyhow::anyhow!("unknown source: {} (use usage, web-usage, price or cost)", name))
}
