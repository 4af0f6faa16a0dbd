//! tscache CLI - Thunderstore catalog suggestions, profile import and author stats
//!
//! Entry point: parse arguments, set up logging, dispatch to a command.

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod output;
mod utils;

use cli::{Cli, Commands};
use utils::logging::initialize_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    initialize_logging(&cli)?;

    let config = commands::load_config(&cli)?;

    match cli.command {
        Commands::Suggest { target } => commands::suggest(&config, target).await,
        Commands::Profile {
            code,
            timeout,
            format,
        } => commands::import_profile(&config, &code, timeout, format.resolve()).await,
        Commands::Stats { target } => commands::show_stats(&config, target).await,
        Commands::Watch { interval } => commands::watch(&config, interval).await,
    }
}
