//! Periodic catalog refresh and snapshot publication.
//!
//! [`SnapshotCache`] owns the currently published [`Snapshot`]. Readers call
//! [`SnapshotCache::snapshot`] and get an `Arc` that stays valid for as long
//! as they hold it; a refresh builds a complete replacement off to the side
//! and publishes it with a single atomic store. A failed refresh is logged
//! and leaves the published snapshot untouched.

use crate::{Package, RegistryClient, Result, Snapshot};
use arc_swap::ArcSwap;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Anything that can produce a full package catalog.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch every package in the catalog.
    async fn fetch_catalog(&self) -> Result<Vec<Package>>;
}

#[async_trait]
impl CatalogSource for RegistryClient {
    async fn fetch_catalog(&self) -> Result<Vec<Package>> {
        Self::fetch_catalog(self).await
    }
}

/// Result of one refresh iteration.
#[derive(Debug)]
pub enum RefreshOutcome {
    /// A new snapshot was built and published.
    Published {
        /// Packages in the new snapshot.
        packages: usize,
        /// Distinct authors in the new snapshot.
        authors: usize,
        /// Wall time spent fetching and building.
        elapsed: Duration,
    },
    /// The fetch failed and the previous snapshot was kept.
    Retained {
        /// Why the fetch failed.
        error: crate::Error,
    },
}

impl RefreshOutcome {
    /// Whether a new snapshot was published.
    pub const fn is_published(&self) -> bool {
        matches!(self, Self::Published { .. })
    }
}

struct Shared {
    current: ArcSwap<Snapshot>,
    source: Arc<dyn CatalogSource>,
    // Serializes refreshes so a manual refresh never overlaps the loop.
    gate: Mutex<()>,
}

impl Shared {
    async fn refresh(&self) -> RefreshOutcome {
        let _guard = self.gate.lock().await;
        let started = Instant::now();
        info!("Refreshing package catalog");

        match self.source.fetch_catalog().await {
            Ok(catalog) => {
                let fetched = catalog.len();
                let snapshot = Snapshot::build(catalog);
                let packages = snapshot.packages().len();
                let authors = snapshot.authors().len();
                self.current.store(Arc::new(snapshot));

                let elapsed = started.elapsed();
                info!(
                    fetched,
                    packages,
                    authors,
                    elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                    "Published catalog snapshot"
                );
                RefreshOutcome::Published {
                    packages,
                    authors,
                    elapsed,
                }
            },
            Err(error) => {
                warn!(
                    category = error.category(),
                    "Catalog refresh failed, keeping previous snapshot: {error}"
                );
                RefreshOutcome::Retained { error }
            },
        }
    }
}

/// Holds the published snapshot and the source used to rebuild it.
#[derive(Clone)]
pub struct SnapshotCache {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for SnapshotCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.shared.current.load();
        f.debug_struct("SnapshotCache")
            .field("packages", &snapshot.packages().len())
            .field("built_at", &snapshot.built_at())
            .finish_non_exhaustive()
    }
}

impl SnapshotCache {
    /// Create a cache serving an empty snapshot until the first refresh.
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self {
            shared: Arc::new(Shared {
                current: ArcSwap::from_pointee(Snapshot::empty()),
                source,
                gate: Mutex::new(()),
            }),
        }
    }

    /// The snapshot published most recently.
    ///
    /// Callers should load once per query and work against that `Arc`.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.shared.current.load_full()
    }

    /// Run one refresh iteration now and wait for it.
    pub async fn refresh_now(&self) -> RefreshOutcome {
        self.shared.refresh().await
    }

    /// Spawn the refresh loop: refresh immediately, then once per `interval`.
    ///
    /// The loop runs until [`RefreshHandle::shutdown`] is called or the
    /// handle is dropped.
    pub fn start(&self, interval: Duration) -> RefreshHandle {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_loop(
            Arc::clone(&self.shared),
            interval,
            cancel.clone(),
        ));
        RefreshHandle {
            cancel,
            task: Some(task),
        }
    }
}

async fn run_loop(shared: Arc<Shared>, interval: Duration, cancel: CancellationToken) {
    debug!(interval_secs = interval.as_secs(), "Refresh loop started");
    loop {
        if cancel.is_cancelled() {
            break;
        }

        tokio::select! {
            () = cancel.cancelled() => break,
            _ = shared.refresh() => {},
        }

        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(interval) => {},
        }
    }
    debug!("Refresh loop stopped");
}

/// Handle to a running refresh loop.
#[derive(Debug)]
pub struct RefreshHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl RefreshHandle {
    /// Cancel the loop and wait for it to finish.
    ///
    /// An in-flight fetch is abandoned; the published snapshot is unaffected.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Refresh loop ended abnormally: {e}");
            }
        }
    }

    /// Whether the loop task is still alive.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
