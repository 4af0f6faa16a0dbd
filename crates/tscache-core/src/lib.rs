//! # tscache-core
//!
//! Core functionality for tscache - a refreshing cache of a Thunderstore
//! package catalog with fast suggestion lookups and legacy profile import.
//!
//! ## Architecture
//!
//! - **Registry client**: HTTP access to the package list and legacy profile endpoints
//! - **Snapshots**: immutable, fully indexed views of one catalog fetch
//! - **Refresh**: a background loop that rebuilds and atomically swaps snapshots
//! - **Suggestions**: ranked, case-insensitive lookups for authors, mods, versions, categories
//! - **Profiles**: decoding `#r2modman` profile codes into mod references
//! - **Resolver**: enriching references with versions, icons and descriptions
//! - **Stats**: author download statistics over a snapshot
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tscache_core::{Config, RegistryClient, SnapshotCache, DEFAULT_SUGGESTION_LIMIT};
//!
//! # async fn run() -> tscache_core::Result<()> {
//! let config = Config::load()?;
//! let client = RegistryClient::new(&config)?;
//! let cache = SnapshotCache::new(Arc::new(client));
//!
//! cache.refresh_now().await;
//! for author in cache.suggest_authors("azu", DEFAULT_SUGGESTION_LIMIT) {
//!     println!("{author}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T, Error>`]. Refresh failures never
//! surface to readers: the previous snapshot stays published.
//!
//! ```rust,no_run
//! use tscache_core::{Config, Error, ImportPipeline};
//!
//! # async fn run() -> tscache_core::Result<()> {
//! let pipeline = ImportPipeline::new(&Config::default())?;
//! match pipeline.import("01234567-89ab-cdef", None).await {
//!     Ok(profile) => println!("{} mods", profile.mods.len()),
//!     Err(Error::KeyNotFound(code)) => eprintln!("No profile {code}"),
//!     Err(e) if e.is_recoverable() => eprintln!("Try again later: {e}"),
//!     Err(e) => eprintln!("Import failed: {e}"),
//! }
//! # Ok(())
//! # }
//! ```

/// HTTP access to the registry
pub mod client;
/// Configuration loading and defaults
pub mod config;
/// Error types and result aliases
pub mod error;
/// Legacy profile decoding
pub mod profile;
/// Snapshot refresh loop
pub mod refresh;
/// Mod reference enrichment and the import pipeline
pub mod resolver;
/// Immutable indexed catalog views
pub mod snapshot;
/// Author download statistics
pub mod stats;
/// Suggestion queries over snapshots
pub mod suggest;
/// Core data types
pub mod types;

// Re-export commonly used types
pub use client::RegistryClient;
pub use config::{Config, RefreshConfig, RegistryConfig, ResolverConfig, RetryPolicy};
pub use error::{Error, Result};
pub use profile::{DecodedProfile, ProfileDecoder, ProfileStrategy};
pub use refresh::{CatalogSource, RefreshHandle, RefreshOutcome, SnapshotCache};
pub use resolver::{ImportPipeline, ImportedProfile, MetadataSource, Resolver, VersionOrdering};
pub use snapshot::{RankedList, Snapshot};
pub use stats::AuthorStats;
pub use suggest::{DEFAULT_CATEGORY_LIMIT, DEFAULT_SUGGESTION_LIMIT, MODPACKS_CATEGORY};
pub use types::*;
