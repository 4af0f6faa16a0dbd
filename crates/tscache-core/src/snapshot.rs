//! Immutable, fully indexed views of one catalog fetch.
//!
//! A [`Snapshot`] is built in one pass from a package list and never mutated
//! afterwards; the refresh loop replaces it wholesale. Every ranked list is
//! stored next to a lower-cased mirror at the same positions so that
//! suggestion queries can filter case-insensitively without folding strings
//! on every keystroke.
//!
//! ## Ranking rules
//!
//! - **Authors**: total downloads across all their packages, descending
//! - **Mods of an author**: package downloads, descending
//! - **Versions of a mod**: creation date descending, then version string descending
//! - **Categories**: number of packages tagged, descending
//!
//! Ties keep first-seen catalog order, so building twice from the same
//! catalog yields identical lists.

use crate::Package;
use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use std::collections::HashMap;

/// Display strings in rank order, paired with their lower-cased mirror.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankedList {
    items: Vec<String>,
    lower: Vec<String>,
}

impl RankedList {
    /// Rank list over `items`, lower-casing each once.
    pub fn new(items: Vec<String>) -> Self {
        let lower = items.iter().map(|s| s.to_lowercase()).collect();
        Self { items, lower }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the list has no entries.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Ranked display strings.
    pub fn items(&self) -> &[String] {
        &self.items
    }

    /// Lower-cased mirror, aligned with [`items`](Self::items).
    pub fn lower(&self) -> &[String] {
        &self.lower
    }

    /// `(display, lower)` pairs in rank order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.items
            .iter()
            .map(String::as_str)
            .zip(self.lower.iter().map(String::as_str))
    }
}

impl FromIterator<String> for RankedList {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Lookup key for the per-mod version index.
pub(crate) fn version_key(author: &str, name: &str) -> String {
    format!("{}|{}", author.trim(), name.trim()).to_lowercase()
}

/// An immutable catalog view with derived suggestion indexes.
#[derive(Debug, Clone)]
pub struct Snapshot {
    packages: Vec<Package>,
    package_names: RankedList,
    authors: RankedList,
    mods_by_author: HashMap<String, RankedList>,
    versions_by_key: HashMap<String, RankedList>,
    categories: RankedList,
    built_at: DateTime<Utc>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl Snapshot {
    /// The snapshot served before the first refresh completes.
    pub fn empty() -> Self {
        Self::build(Vec::new())
    }

    /// Build every index from one catalog fetch. Never fails.
    pub fn build(catalog: Vec<Package>) -> Self {
        let mut packages = dedupe(catalog);

        // Stable sort: equal totals keep first-seen order.
        packages.sort_by_key(|p| Reverse(p.total_downloads()));

        let package_names = packages.iter().map(|p| p.name.clone()).collect();
        let (authors, mods_by_author) = rank_authors(&packages);
        let versions_by_key = rank_versions(&packages);
        let categories = rank_categories(&packages);

        Self {
            packages,
            package_names,
            authors,
            mods_by_author,
            versions_by_key,
            categories,
            built_at: Utc::now(),
        }
    }

    /// Packages ranked by total downloads, one per (owner, name).
    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    /// Names of [`packages`](Self::packages), aligned by position.
    pub fn package_names(&self) -> &RankedList {
        &self.package_names
    }

    /// Authors ranked by total downloads.
    pub fn authors(&self) -> &RankedList {
        &self.authors
    }

    /// Ranked mod names for an author (case-insensitive).
    pub fn mods_for(&self, author: &str) -> Option<&RankedList> {
        self.mods_by_author.get(&author.trim().to_lowercase())
    }

    /// Newest-first version strings for a mod (case-insensitive).
    pub fn versions_for(&self, author: &str, name: &str) -> Option<&RankedList> {
        self.versions_by_key.get(&version_key(author, name))
    }

    /// Categories ranked by how many packages use them.
    pub fn categories(&self) -> &RankedList {
        &self.categories
    }

    /// Look up a single package by identity.
    pub fn package(&self, author: &str, name: &str) -> Option<&Package> {
        let (author, name) = (author.trim(), name.trim());
        self.packages
            .iter()
            .find(|p| p.owner.eq_ignore_ascii_case(author) && p.name.eq_ignore_ascii_case(name))
    }

    /// All packages owned by `author`, in rank order.
    pub fn packages_by<'a>(&'a self, author: &'a str) -> impl Iterator<Item = &'a Package> + 'a {
        let author = author.trim();
        self.packages
            .iter()
            .filter(move |p| p.owner.eq_ignore_ascii_case(author))
    }

    /// When this snapshot was built.
    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// True when the catalog had no usable packages.
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

/// Drop nameless entries and collapse duplicate identities.
///
/// The entry with more versions wins; on a tie the first one seen stays.
/// The survivor occupies the first-seen position.
fn dedupe(catalog: Vec<Package>) -> Vec<Package> {
    let mut kept: Vec<Package> = Vec::with_capacity(catalog.len());
    let mut index: HashMap<String, usize> = HashMap::with_capacity(catalog.len());

    for package in catalog {
        if package.owner.trim().is_empty() || package.name.trim().is_empty() {
            continue;
        }
        let key = version_key(&package.owner, &package.name);
        match index.get(&key) {
            Some(&slot) => {
                if package.versions.len() > kept[slot].versions.len() {
                    kept[slot] = package;
                }
            },
            None => {
                index.insert(key, kept.len());
                kept.push(package);
            },
        }
    }
    kept
}

fn rank_authors(packages: &[Package]) -> (RankedList, HashMap<String, RankedList>) {
    struct AuthorGroup<'a> {
        display: &'a str,
        total: u64,
        mods: Vec<&'a Package>,
    }

    let mut order: Vec<AuthorGroup<'_>> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();

    for package in packages {
        let key = package.owner.trim().to_lowercase();
        let slot = *slots.entry(key).or_insert_with(|| {
            order.push(AuthorGroup {
                display: package.owner.trim(),
                total: 0,
                mods: Vec::new(),
            });
            order.len() - 1
        });
        let group = &mut order[slot];
        group.total += package.total_downloads();
        group.mods.push(package);
    }

    order.sort_by_key(|g| Reverse(g.total));

    let mut mods_by_author = HashMap::with_capacity(order.len());
    for group in &order {
        // `packages` is already ranked by downloads, so group order is rank order.
        let mut seen = std::collections::HashSet::new();
        let names: RankedList = group
            .mods
            .iter()
            .filter(|p| seen.insert(p.name.to_lowercase()))
            .map(|p| p.name.clone())
            .collect();
        mods_by_author.insert(group.display.to_lowercase(), names);
    }

    let authors = order.iter().map(|g| g.display.to_string()).collect();
    (authors, mods_by_author)
}

fn rank_versions(packages: &[Package]) -> HashMap<String, RankedList> {
    packages
        .iter()
        .map(|package| {
            let mut versions: Vec<(Option<DateTime<Utc>>, &str)> = package
                .versions
                .iter()
                .filter(|v| !v.version_number.trim().is_empty())
                .map(|v| (v.created_at(), v.version_number.as_str()))
                .collect();
            versions.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(a.1)));

            let ranked = versions.into_iter().map(|(_, v)| v.to_string()).collect();
            (version_key(&package.owner, &package.name), ranked)
        })
        .collect()
}

fn rank_categories(packages: &[Package]) -> RankedList {
    let mut order: Vec<(String, usize)> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();

    for category in packages.iter().flat_map(|p| p.categories.iter()) {
        let trimmed = category.trim();
        if trimmed.is_empty() {
            continue;
        }
        match slots.get(&trimmed.to_lowercase()) {
            Some(&slot) => order[slot].1 += 1,
            None => {
                slots.insert(trimmed.to_lowercase(), order.len());
                order.push((trimmed.to_string(), 1));
            },
        }
    }

    order.sort_by_key(|(_, count)| Reverse(*count));
    order.into_iter().map(|(name, _)| name).collect()
}
