//! Resolve mod references against live community metadata.
//!
//! The [`Resolver`] fetches a community's package list (reusing it for a
//! configurable TTL), picks the exact or newest version for each reference,
//! and attaches icon and description. References the registry does not know
//! are passed through rather than dropped.
//!
//! [`ImportPipeline`] ties this to [`ProfileDecoder`]: one call turns a
//! profile code into a sorted list of enriched references.

use crate::profile::{DecodedProfile, ProfileDecoder, ProfileStrategy};
use crate::{
    Config, EnrichedModReference, Error, ModReference, Package, RegistryClient, Result, Version,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

/// How "newest" is decided when a reference carries no usable version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionOrdering {
    /// Compare the first three dot-separated components as integers, then
    /// whatever follows the third dot as text.
    ///
    /// Missing or non-numeric components count as zero, so `1.2` equals
    /// `1.2.0` and `1.x.3` sorts like `1.0.3`.
    #[default]
    Dotted,
    /// Semantic versioning, pre-releases below their release.
    ///
    /// Versions that are not valid semver are compared as [`Dotted`](Self::Dotted).
    Semver,
}

impl VersionOrdering {
    /// Order two version strings under this policy.
    pub fn compare(self, a: &str, b: &str) -> Ordering {
        if self == Self::Semver {
            if let (Ok(a), Ok(b)) = (semver::Version::parse(a.trim()), semver::Version::parse(b.trim())) {
                return a.cmp(&b);
            }
        }
        dotted_key(a).cmp(&dotted_key(b))
    }

    /// Highest version; the earliest one wins ties.
    pub fn newest<'a>(self, versions: &'a [Version]) -> Option<&'a Version> {
        versions.iter().fold(None, |best: Option<&Version>, candidate| match best {
            Some(current)
                if self.compare(&candidate.version_number, &current.version_number)
                    != Ordering::Greater =>
            {
                Some(current)
            },
            _ => Some(candidate),
        })
    }
}

fn dotted_key(version: &str) -> (u64, u64, u64, &str) {
    let mut parts = version.trim().splitn(4, '.');
    let mut number = || parts.next().map_or(0, |p| p.trim().parse().unwrap_or(0));
    let (major, minor, patch) = (number(), number(), number());
    (major, minor, patch, parts.next().unwrap_or(""))
}

/// Per-community package metadata used during enrichment.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Every package listed for `community`.
    async fn fetch_community_packages(&self, community: &str) -> Result<Vec<Package>>;
}

#[async_trait]
impl MetadataSource for RegistryClient {
    async fn fetch_community_packages(&self, community: &str) -> Result<Vec<Package>> {
        Self::fetch_community_packages(self, community).await
    }
}

type PackageIndex = HashMap<String, Package>;

struct CachedMetadata {
    fetched_at: Instant,
    index: Arc<PackageIndex>,
}

/// Case-insensitive index preferring the entry with more versions.
fn build_index(packages: Vec<Package>) -> PackageIndex {
    let mut index: PackageIndex = HashMap::with_capacity(packages.len());
    for package in packages {
        let key = package.display_name().to_lowercase();
        if key.trim_matches('-').is_empty() {
            continue;
        }
        match index.get(&key) {
            Some(existing) if existing.versions.len() >= package.versions.len() => {},
            _ => {
                index.insert(key, package);
            },
        }
    }
    index
}

/// Enriches [`ModReference`]s with registry metadata.
pub struct Resolver {
    source: Arc<dyn MetadataSource>,
    ttl: Duration,
    ordering: VersionOrdering,
    cache: RwLock<HashMap<String, CachedMetadata>>,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("ttl", &self.ttl)
            .field("ordering", &self.ordering)
            .finish_non_exhaustive()
    }
}

impl Resolver {
    /// Resolver reusing fetched metadata for `ttl`.
    pub fn new(source: Arc<dyn MetadataSource>, ttl: Duration, ordering: VersionOrdering) -> Self {
        Self {
            source,
            ttl,
            ordering,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve every reference, sorted by author then name ignoring case.
    ///
    /// An empty input returns immediately without touching the network.
    #[instrument(skip(self, mods), fields(mods = mods.len()))]
    pub async fn enrich(&self, mods: &[ModReference], community: &str) -> Result<Vec<EnrichedModReference>> {
        if mods.is_empty() {
            return Ok(Vec::new());
        }

        let index = self.metadata(community).await?;
        let mut enriched: Vec<EnrichedModReference> = mods
            .iter()
            .map(|reference| self.resolve(&index, reference))
            .collect();
        enriched.sort_by_cached_key(|m| {
            (
                m.author.to_lowercase(),
                m.name.to_lowercase(),
                m.author.clone(),
                m.name.clone(),
            )
        });

        let unknown = enriched.iter().filter(|m| m.icon_url.is_none()).count();
        debug!(resolved = enriched.len(), without_metadata = unknown, "Enriched mod references");
        Ok(enriched)
    }

    fn resolve(&self, index: &PackageIndex, reference: &ModReference) -> EnrichedModReference {
        let Some(package) = index.get(&reference.lookup_key()) else {
            return EnrichedModReference::passthrough(reference);
        };

        let exact = reference.version.as_deref().and_then(|wanted| {
            package
                .versions
                .iter()
                .find(|v| v.version_number.eq_ignore_ascii_case(wanted.trim()))
        });
        let version = exact.or_else(|| self.ordering.newest(&package.versions));

        EnrichedModReference {
            author: reference.author.clone(),
            name: reference.name.clone(),
            display: package
                .full_name
                .clone()
                .unwrap_or_else(|| format!("{}-{}", reference.author, reference.name)),
            version: version
                .map(|v| v.version_number.clone())
                .or_else(|| reference.version.clone())
                .unwrap_or_else(|| "unknown".to_string()),
            icon_url: version.and_then(|v| v.icon.clone()),
            description: version.and_then(|v| v.description.clone()),
        }
    }

    /// Cached index for `community`, fetched when missing or older than the TTL.
    ///
    /// The lock is released while fetching, so concurrent misses may both
    /// fetch; the last one to finish is kept.
    async fn metadata(&self, community: &str) -> Result<Arc<PackageIndex>> {
        let key = community.trim().to_lowercase();
        if key.is_empty() {
            return Err(Error::InvalidInput("Community must not be empty".into()));
        }

        if let Some(hit) = self.cache.read().await.get(&key) {
            if hit.fetched_at.elapsed() < self.ttl {
                debug!(community = %key, "Metadata cache hit");
                return Ok(Arc::clone(&hit.index));
            }
        }

        let started = Instant::now();
        let packages = self.source.fetch_community_packages(&key).await?;
        let index = Arc::new(build_index(packages));
        info!(
            community = %key,
            packages = index.len(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Fetched community metadata"
        );

        self.cache.write().await.insert(
            key,
            CachedMetadata {
                fetched_at: Instant::now(),
                index: Arc::clone(&index),
            },
        );
        Ok(index)
    }
}

/// A decoded and enriched profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportedProfile {
    /// Name the profile was exported under, when it records one.
    pub profile_name: Option<String>,
    /// Community the mods were resolved against.
    pub community: String,
    /// Decoding strategy that produced the mod list.
    pub strategy: Option<ProfileStrategy>,
    /// Enriched mods, sorted by author then name.
    pub mods: Vec<EnrichedModReference>,
}

/// Profile code in, enriched mod list out.
#[derive(Debug, Clone)]
pub struct ImportPipeline {
    decoder: ProfileDecoder,
    resolver: Arc<Resolver>,
    default_community: String,
}

impl ImportPipeline {
    /// Build the pipeline against the configured registry.
    pub fn new(config: &Config) -> Result<Self> {
        let client = RegistryClient::new(config)?;
        let resolver = Resolver::new(
            Arc::new(client.clone()),
            config.resolver.metadata_ttl(),
            config.resolver.version_ordering,
        );
        Ok(Self::from_parts(
            ProfileDecoder::new(client),
            Arc::new(resolver),
            config.registry.community.clone(),
        ))
    }

    /// Assemble a pipeline from already-built parts.
    pub fn from_parts(decoder: ProfileDecoder, resolver: Arc<Resolver>, default_community: impl Into<String>) -> Self {
        Self {
            decoder,
            resolver,
            default_community: default_community.into(),
        }
    }

    /// Decode `code` and enrich its mods.
    ///
    /// Resolves against the community the profile declares, or the default
    /// community when it declares none. `deadline` bounds both steps.
    pub async fn import(&self, code: &str, deadline: Option<tokio::time::Instant>) -> Result<ImportedProfile> {
        let DecodedProfile {
            mods,
            community,
            profile_name,
            strategy,
        } = self.decoder.decode_profile(code, deadline).await?;

        let community = community
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| self.default_community.clone());

        let enrich = self.resolver.enrich(&mods, &community);
        let mods = match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, enrich).await.map_err(|_| {
                Error::Timeout(format!("Resolving mods for profile {} timed out", code.trim()))
            })??,
            None => enrich.await?,
        };

        Ok(ImportedProfile {
            profile_name,
            community,
            strategy,
            mods,
        })
    }
}
