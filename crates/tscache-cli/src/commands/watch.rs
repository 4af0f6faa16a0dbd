//! Foreground refresh loop

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tscache_core::{Config, RegistryClient, SnapshotCache};

/// Execute `tscache watch`: refresh on an interval until Ctrl-C.
pub async fn execute(config: &Config, interval_secs: Option<u64>) -> Result<()> {
    let interval = interval_secs.map_or_else(|| config.refresh.interval(), Duration::from_secs);
    if interval.is_zero() {
        anyhow::bail!("Refresh interval must be at least one second");
    }

    let client = RegistryClient::new(config).context("Failed to create registry client")?;
    let cache = SnapshotCache::new(Arc::new(client));

    info!(
        community = %config.registry.community,
        interval_secs = interval.as_secs(),
        "Watching catalog; press Ctrl-C to stop"
    );
    let handle = cache.start(interval);

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    handle.shutdown().await;
    let snapshot = cache.snapshot();
    info!(
        packages = snapshot.packages().len(),
        authors = snapshot.authors().len(),
        "Stopped"
    );
    Ok(())
}
