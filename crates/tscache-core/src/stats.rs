//! Author download statistics and catalog queries computed from a [`Snapshot`].
//!
//! Modpacks are bundles of other authors' work, so they are left out of
//! totals and medians. Pinned packages and anything named like a modpack are
//! also excluded from rankings.

use crate::suggest::MODPACKS_CATEGORY;
use crate::{Package, Snapshot, Version};
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::HashMap;

/// Median of `values`; the lower-rounded mean of the middle pair for even counts.
///
/// ```
/// use tscache_core::stats::median;
///
/// assert_eq!(median(&[1, 2, 3, 4]), 2);
/// assert_eq!(median(&[5, 9, 1]), 5);
/// assert_eq!(median(&[]), 0);
/// ```
pub fn median(values: &[u64]) -> u64 {
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let half = sorted.len() / 2;
    match sorted.len() {
        0 => 0,
        n if n % 2 == 0 => {
            let (a, b) = (sorted[half - 1], sorted[half]);
            a / 2 + b / 2 + (a % 2 + b % 2) / 2
        },
        _ => sorted[half],
    }
}

/// A package reduced to what stats output shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModSummary {
    /// Package name.
    pub name: String,
    /// Registry page, when listed.
    pub package_url: Option<String>,
    /// Downloads summed over every version.
    pub downloads: u64,
}

impl From<&Package> for ModSummary {
    fn from(package: &Package) -> Self {
        Self {
            name: package.name.clone(),
            package_url: package.package_url.clone(),
            downloads: package.total_downloads(),
        }
    }
}

/// Aggregate download figures for one author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorStats {
    /// Owner name as the registry spells it.
    pub author: String,
    /// Packages counted for this author.
    pub mods_count: usize,
    /// Downloads summed over counted packages.
    pub total_downloads: u64,
    /// `total_downloads / mods_count`, rounded down.
    pub average_downloads: u64,
    /// Median of per-package download totals.
    pub median_downloads: u64,
    /// `median_downloads * mods_count`, the leaderboard score.
    pub median_downloads_multiplied: u64,
    /// The author's single most downloaded package.
    pub most_downloaded: Option<ModSummary>,
    /// Eligible mods, most downloaded first.
    pub top_mods: Vec<ModSummary>,
}

fn is_modpack(package: &Package) -> bool {
    package.has_category(MODPACKS_CATEGORY)
}

/// Neither pinned nor a modpack by category or name.
fn is_ranked(package: &Package) -> bool {
    !package.is_pinned && !is_modpack(package) && !package.name.to_lowercase().contains("modpack")
}

/// Stats for one author (case-insensitive), or `None` if they own nothing.
pub fn author_stats(snapshot: &Snapshot, author: &str) -> Option<AuthorStats> {
    let packages: Vec<&Package> = snapshot.packages_by(author).collect();
    let first = packages.first()?;

    let counted: Vec<u64> = packages
        .iter()
        .filter(|p| !is_modpack(p))
        .map(|p| p.total_downloads())
        .collect();
    let total: u64 = counted.iter().sum();
    let median_downloads = median(&counted);
    let mods_count = packages.len();

    Some(AuthorStats {
        author: first.owner.clone(),
        mods_count,
        total_downloads: total,
        average_downloads: total / mods_count as u64,
        median_downloads,
        median_downloads_multiplied: median_downloads.saturating_mul(mods_count as u64),
        // Snapshot order is by downloads, so the first package is the most downloaded.
        most_downloaded: Some(ModSummary::from(*first)),
        top_mods: packages
            .iter()
            .filter(|p| is_ranked(p))
            .map(|p| ModSummary::from(*p))
            .collect(),
    })
}

/// Packages left out of the catalog-wide median: mod loaders and the manager itself.
const MEDIAN_EXCLUDED_NAMES: [&str; 2] = ["r2modman", "BepInExPack_Valheim"];
/// Packages whose versions pull in more dependencies than this are treated as bundles.
const MEDIAN_MAX_DEPENDENCIES: usize = 4;

/// Leaderboard rows plus the catalog-wide baseline they are compared against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Leaderboard {
    /// Median per-version downloads across every ranked package, excluding
    /// loaders and bundle-like packages.
    pub median_downloads: u64,
    /// Qualifying authors, best median × count first.
    pub rows: Vec<AuthorStats>,
}

/// Catalog-wide median of per-version downloads.
fn global_median(snapshot: &Snapshot) -> u64 {
    let downloads: Vec<u64> = snapshot
        .packages()
        .iter()
        .filter(|p| is_ranked(p))
        .filter(|p| !MEDIAN_EXCLUDED_NAMES.contains(&p.name.as_str()))
        .filter(|p| {
            p.versions
                .iter()
                .all(|v| v.dependencies.len() <= MEDIAN_MAX_DEPENDENCIES)
        })
        .flat_map(|p| p.versions.iter().map(|v| v.downloads))
        .collect();
    median(&downloads)
}

/// Authors with at least `min_mods` ranked packages, best median × count first.
///
/// Only ranked packages (see module docs) count toward any figure here.
pub fn leaderboard(snapshot: &Snapshot, min_mods: usize) -> Leaderboard {
    let mut groups: Vec<Vec<&Package>> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();

    for package in snapshot.packages().iter().filter(|p| is_ranked(p)) {
        let slot = *slots
            .entry(package.owner.trim().to_lowercase())
            .or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
        groups[slot].push(package);
    }

    let mut rows: Vec<AuthorStats> = groups
        .into_iter()
        .filter(|group| !group.is_empty() && group.len() >= min_mods)
        .map(|group| {
            let downloads: Vec<u64> = group.iter().map(|p| p.total_downloads()).collect();
            let total: u64 = downloads.iter().sum();
            let median_downloads = median(&downloads);
            let mods_count = group.len();
            AuthorStats {
                author: group[0].owner.clone(),
                mods_count,
                total_downloads: total,
                average_downloads: total / mods_count as u64,
                median_downloads,
                median_downloads_multiplied: median_downloads.saturating_mul(mods_count as u64),
                most_downloaded: Some(ModSummary::from(group[0])),
                top_mods: group.iter().map(|p| ModSummary::from(*p)).collect(),
            }
        })
        .collect();

    rows.sort_by_key(|stats| Reverse(stats.median_downloads_multiplied));
    Leaderboard {
        median_downloads: global_median(snapshot),
        rows,
    }
}

/// The `n` most recently created packages.
pub fn latest_packages(snapshot: &Snapshot, n: usize) -> Vec<&Package> {
    let mut packages: Vec<&Package> = snapshot.packages().iter().collect();
    packages.sort_by_key(|p| Reverse(p.created_at()));
    packages.truncate(n);
    packages
}

/// Newest version of `author`/`name`, as ranked in the snapshot.
pub fn latest_version<'a>(snapshot: &'a Snapshot, author: &str, name: &str) -> Option<&'a Version> {
    let package = snapshot.package(author, name)?;
    let newest = snapshot.versions_for(author, name)?.items().first()?;
    package.versions.iter().find(|v| &v.version_number == newest)
}

/// Dependency strings of the newest version of `author`/`name`.
///
/// `None` when the package is unknown; an empty slice when it depends on nothing.
pub fn dependencies<'a>(snapshot: &'a Snapshot, author: &str, name: &str) -> Option<&'a [String]> {
    snapshot.package(author, name)?;
    Some(
        latest_version(snapshot, author, name)
            .map(|v| v.dependencies.as_slice())
            .unwrap_or_default(),
    )
}

/// Packages with any version depending on `author`/`name`, most downloaded first.
pub fn dependents<'a>(snapshot: &'a Snapshot, author: &str, name: &str, limit: usize) -> Vec<&'a Package> {
    let prefix = format!("{}-{}-", author.trim(), name.trim()).to_lowercase();
    snapshot
        .packages()
        .iter()
        .filter(|p| {
            p.versions.iter().any(|v| {
                v.dependencies
                    .iter()
                    .any(|d| d.to_lowercase().starts_with(&prefix))
            })
        })
        .take(limit)
        .collect()
}

/// Ranked package with the most published versions; the more downloaded one wins ties.
pub fn most_versions(snapshot: &Snapshot) -> Option<&Package> {
    snapshot
        .packages()
        .iter()
        .filter(|p| is_ranked(p))
        .fold(None, |best: Option<&Package>, candidate| match best {
            Some(current) if current.versions.len() >= candidate.versions.len() => Some(current),
            _ => Some(candidate),
        })
}

/// Packages by `author` (case-insensitive) marked deprecated on the registry.
pub fn deprecated_by<'a>(snapshot: &'a Snapshot, author: &'a str) -> Vec<&'a Package> {
    snapshot.packages_by(author).filter(|p| p.is_deprecated).collect()
}
