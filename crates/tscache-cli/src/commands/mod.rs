//! Command implementations for the tscache CLI

mod profile;
mod stats;
mod suggest;
mod watch;

pub use profile::execute as import_profile;
pub use stats::execute as show_stats;
pub use suggest::execute as suggest;
pub use watch::execute as watch;

use anyhow::{Context, Result, anyhow};
use std::sync::Arc;
use tracing::debug;
use tscache_core::{Config, RefreshOutcome, RegistryClient, Snapshot, SnapshotCache};

use crate::cli::Cli;

/// Resolve the configuration for this run, then apply `--community`.
pub fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(community) = cli.community.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        community.clone_into(&mut config.registry.community);
    }
    debug!(
        base_url = %config.registry.base_url,
        community = %config.registry.community,
        "Configuration loaded"
    );
    Ok(config)
}

/// Build a cache for the configured community and publish one snapshot.
async fn fresh_cache(config: &Config) -> Result<SnapshotCache> {
    let client = RegistryClient::new(config).context("Failed to create registry client")?;
    let cache = SnapshotCache::new(Arc::new(client));
    match cache.refresh_now().await {
        RefreshOutcome::Published { .. } => Ok(cache),
        RefreshOutcome::Retained { error } => Err(anyhow!(error).context(format!(
            "Failed to fetch the package catalog for '{}'",
            config.registry.community
        ))),
    }
}

/// One freshly fetched snapshot of the configured community.
async fn fresh_snapshot(config: &Config) -> Result<Arc<Snapshot>> {
    Ok(fresh_cache(config).await?.snapshot())
}
