//! Logging initialization and color control.

use anyhow::Result;
use colored::control as color_control;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::cli::{Cli, Commands};
use crate::output::OutputFormat;

/// Install the global tracing subscriber for this invocation.
///
/// Logs go to stderr. JSON output keeps logging at errors only unless
/// `--verbose` was given, so stdout stays machine-readable.
pub fn initialize_logging(cli: &Cli) -> Result<()> {
    let machine_output = cli
        .command
        .format_arg()
        .is_some_and(|format| format.resolve() == OutputFormat::Json);

    let level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet || machine_output {
        Level::ERROR
    } else if matches!(cli.command, Commands::Watch { .. }) {
        // Refresh outcomes are the only output of `watch`.
        Level::INFO
    } else {
        Level::WARN
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let env_no_color = std::env::var_os("NO_COLOR").is_some();
    if cli.no_color || env_no_color || machine_output {
        color_control::set_override(false);
    }
    Ok(())
}
