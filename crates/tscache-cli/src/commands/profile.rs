//! Legacy profile import

use anyhow::{Context, Result};
use colored::Colorize;
use std::io::Write;
use std::time::Duration;
use tscache_core::{Config, ImportPipeline, ImportedProfile};

use crate::output::{OutputFormat, print_json};

/// Execute `tscache profile <code>`.
///
/// Without `--timeout` the configured `[profile] timeout_secs` bounds the import.
pub async fn execute(
    config: &Config,
    code: &str,
    timeout_secs: Option<u64>,
    format: OutputFormat,
) -> Result<()> {
    let pipeline = ImportPipeline::new(config).context("Failed to create import pipeline")?;
    let timeout = timeout_secs.map_or_else(|| config.profile.timeout(), Duration::from_secs);
    let deadline = tokio::time::Instant::now() + timeout;

    let profile = pipeline
        .import(code.trim(), Some(deadline))
        .await
        .with_context(|| format!("Failed to import profile '{}'", code.trim()))?;

    match format {
        OutputFormat::Json => print_json(&profile),
        OutputFormat::Text => print_text(&profile),
    }
}

fn print_text(profile: &ImportedProfile) -> Result<()> {
    let mut out = std::io::stdout().lock();

    let title = profile.profile_name.as_deref().unwrap_or("(unnamed profile)");
    writeln!(out, "{} {}", title.bold(), format!("[{}]", profile.community).dimmed())?;
    if profile.mods.is_empty() {
        writeln!(out, "No mods found in this profile.")?;
        return Ok(());
    }

    for reference in &profile.mods {
        write!(out, "  {} {}", reference.display.green(), reference.version)?;
        if let Some(description) = &reference.description {
            write!(out, "  {}", description.dimmed())?;
        }
        writeln!(out)?;
    }
    writeln!(out, "{} mods", profile.mods.len())?;
    Ok(())
}
