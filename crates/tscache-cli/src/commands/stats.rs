//! Author statistics and catalog queries

use anyhow::{Result, bail};
use colored::Colorize;
use serde::Serialize;
use std::io::Write;
use tscache_core::stats::{self, AuthorStats, Leaderboard};
use tscache_core::{Config, Package};

use super::fresh_snapshot;
use crate::cli::StatsTarget;
use crate::output::{OutputFormat, print_json, thousands};

/// Row printed by `stats latest`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LatestRow<'a> {
    author: &'a str,
    name: &'a str,
    package_url: Option<&'a str>,
    date_created: Option<&'a str>,
    downloads: u64,
}

impl<'a> From<&'a Package> for LatestRow<'a> {
    fn from(package: &'a Package) -> Self {
        Self {
            author: &package.owner,
            name: &package.name,
            package_url: package.package_url.as_deref(),
            date_created: package.date_created.as_deref(),
            downloads: package.total_downloads(),
        }
    }
}

/// Row printed by the package-list queries.
#[derive(Serialize)]
struct PackageRow<'a> {
    author: &'a str,
    name: &'a str,
    versions: usize,
    downloads: u64,
}

impl<'a> From<&'a Package> for PackageRow<'a> {
    fn from(package: &'a Package) -> Self {
        Self {
            author: &package.owner,
            name: &package.name,
            versions: package.versions.len(),
            downloads: package.total_downloads(),
        }
    }
}

/// Execute `tscache stats <target>`.
pub async fn execute(config: &Config, target: StatsTarget) -> Result<()> {
    let snapshot = fresh_snapshot(config).await?;

    match target {
        StatsTarget::Author { name, format } => {
            let Some(author) = stats::author_stats(&snapshot, &name) else {
                bail!(
                    "No packages by '{name}' in community '{}'",
                    config.registry.community
                );
            };
            match format.resolve() {
                OutputFormat::Json => print_json(&author),
                OutputFormat::Text => print_author(&author),
            }
        },
        StatsTarget::Leaderboard {
            min_mods,
            limit,
            format,
        } => {
            let mut board = stats::leaderboard(&snapshot, min_mods);
            board.rows.truncate(limit);
            match format.resolve() {
                OutputFormat::Json => print_json(&board),
                OutputFormat::Text => print_leaderboard(&board),
            }
        },
        StatsTarget::Latest { count, format } => {
            let rows: Vec<LatestRow<'_>> = stats::latest_packages(&snapshot, count)
                .into_iter()
                .map(LatestRow::from)
                .collect();
            match format.resolve() {
                OutputFormat::Json => print_json(&rows),
                OutputFormat::Text => print_latest(&rows),
            }
        },
        StatsTarget::Dependencies { author, name, format } => {
            let Some(dependencies) = stats::dependencies(&snapshot, &author, &name) else {
                bail!("Unknown mod '{author}-{name}'");
            };
            match format.resolve() {
                OutputFormat::Json => print_json(&dependencies),
                OutputFormat::Text => print_lines(dependencies, "No dependencies."),
            }
        },
        StatsTarget::Dependents {
            author,
            name,
            limit,
            format,
        } => {
            let rows: Vec<PackageRow<'_>> =
                stats::dependents(&snapshot, &author, &name, usize::from(limit))
                    .into_iter()
                    .map(PackageRow::from)
                    .collect();
            match format.resolve() {
                OutputFormat::Json => print_json(&rows),
                OutputFormat::Text => print_packages(&rows, "Nothing depends on it."),
            }
        },
        StatsTarget::Deprecated { author, format } => {
            let rows: Vec<PackageRow<'_>> = stats::deprecated_by(&snapshot, &author)
                .into_iter()
                .map(PackageRow::from)
                .collect();
            match format.resolve() {
                OutputFormat::Json => print_json(&rows),
                OutputFormat::Text => print_packages(&rows, "No deprecated mods."),
            }
        },
        StatsTarget::MostVersions { format } => {
            let Some(package) = stats::most_versions(&snapshot) else {
                bail!("The catalog has no ranked packages");
            };
            let row = PackageRow::from(package);
            match format.resolve() {
                OutputFormat::Json => print_json(&row),
                OutputFormat::Text => print_packages(std::slice::from_ref(&row), ""),
            }
        },
    }
}

fn print_author(author: &AuthorStats) -> Result<()> {
    let mut out = std::io::stdout().lock();
    writeln!(out, "{}", author.author.bold())?;
    writeln!(out, "  Mods:              {}", author.mods_count)?;
    writeln!(out, "  Total downloads:   {}", thousands(author.total_downloads))?;
    writeln!(out, "  Average downloads: {}", thousands(author.average_downloads))?;
    writeln!(out, "  Median downloads:  {}", thousands(author.median_downloads))?;
    if let Some(top) = &author.most_downloaded {
        writeln!(
            out,
            "  Most downloaded:   {} ({})",
            top.name.green(),
            thousands(top.downloads)
        )?;
    }
    Ok(())
}

fn print_leaderboard(board: &Leaderboard) -> Result<()> {
    let mut out = std::io::stdout().lock();
    writeln!(
        out,
        "Catalog median downloads: {}",
        thousands(board.median_downloads).bold()
    )?;
    if board.rows.is_empty() {
        writeln!(out, "No authors qualify.")?;
        return Ok(());
    }
    for (rank, author) in board.rows.iter().enumerate() {
        writeln!(
            out,
            "{:>3}. {:<24} {:>4} mods  median {:>10}  score {:>12}",
            rank + 1,
            author.author.bold(),
            author.mods_count,
            thousands(author.median_downloads),
            thousands(author.median_downloads_multiplied)
        )?;
    }
    Ok(())
}

fn print_latest(rows: &[LatestRow<'_>]) -> Result<()> {
    let mut out = std::io::stdout().lock();
    for row in rows {
        writeln!(
            out,
            "{}  {}-{}",
            row.date_created.unwrap_or("unknown").dimmed(),
            row.author,
            row.name.green()
        )?;
    }
    Ok(())
}

fn print_lines(lines: &[String], empty: &str) -> Result<()> {
    let mut out = std::io::stdout().lock();
    if lines.is_empty() {
        writeln!(out, "{empty}")?;
    }
    for line in lines {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

fn print_packages(rows: &[PackageRow<'_>], empty: &str) -> Result<()> {
    let mut out = std::io::stdout().lock();
    if rows.is_empty() {
        writeln!(out, "{empty}")?;
    }
    for row in rows {
        writeln!(
            out,
            "{}-{}  {} versions  {} downloads",
            row.author,
            row.name.green(),
            row.versions,
            thousands(row.downloads)
        )?;
    }
    Ok(())
}
