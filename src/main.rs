//! vvvwatch - terminal dashboard for Venice AI usage, billing and VVV price
//!
//! - CLI for one-shot usage and price queries (default command)
//! - `vvvwatch watch` - live polling dashboard
//! - `vvvwatch config` - settings management

mod cache;
mod cli;
mod core;
mod logging;
mod settings;
mod sources;

use clap::Parser;
use cli::{exit_codes, Cli, Commands};

use crate::core::FetchError;

fn main() {
    let exit_code = run();
    std::process::exit(exit_code);
}

fn run() -> i32 {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose, cli.json_output) {
        eprintln!("Failed to initialize logging: {}", e);
        return exit_codes::UNEXPECTED_FAILURE;
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create runtime: {}", e);
            return exit_codes::UNEXPECTED_FAILURE;
        }
    };

    match cli.command {
        Some(Commands::Usage(args)) => rt.block_on(async {
            match cli::usage::run(args).await {
                Ok(()) => exit_codes::SUCCESS,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    categorize_error(&e)
                }
            }
        }),
        Some(Commands::Price(args)) => rt.block_on(async {
            match cli::price::run(args).await {
                Ok(()) => exit_codes::SUCCESS,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    categorize_error(&e)
                }
            }
        }),
        Some(Commands::Watch(args)) => rt.block_on(async {
            match cli::watch::run(args).await {
                Ok(()) => exit_codes::SUCCESS,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    categorize_error(&e)
                }
            }
        }),
        Some(Commands::Config(args)) => rt.block_on(async {
            match cli::config::run(args).await {
                Ok(()) => exit_codes::SUCCESS,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    exit_codes::UNEXPECTED_FAILURE
                }
            }
        }),
        None => {
            // Default: run usage command with args from top-level CLI
            let args = cli.to_usage_args();
            rt.block_on(async {
                match cli::usage::run(args).await {
                    Ok(()) => exit_codes::SUCCESS,
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        categorize_error(&e)
                    }
                }
            })
        }
    }
}

/// Categorize an error into the appropriate exit code
fn categorize_error(e: &anyhow::Error) -> i32 {
    if let Some(fetch_error) = e.downcast_ref::<FetchError>() {
        return match fetch_error {
            FetchError::Auth(_) => exit_codes::CREDENTIAL_MISSING,
            FetchError::Parse(_) => exit_codes::PARSE_ERROR,
            FetchError::Timeout(_) => exit_codes::FETCH_TIMEOUT,
            FetchError::Network(_) => exit_codes::UNEXPECTED_FAILURE,
        };
    }

    let msg = e.to_string().to_lowercase();
    if msg.contains("key not configured") {
        exit_codes::CREDENTIAL_MISSING
    } else if msg.contains("parse") || msg.contains("invalid") {
        exit_codes::PARSE_ERROR
    } else if msg.contains("timeout") || msg.contains("timed out") {
        exit_codes::FETCH_TIMEOUT
    } else {
        exit_codes::UNEXPECTED_FAILURE
    }
}
