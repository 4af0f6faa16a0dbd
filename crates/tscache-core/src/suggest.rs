//! Prefix-free, case-insensitive substring suggestions over a [`Snapshot`].
//!
//! Every query is total: unknown authors or mods yield an empty list, a blank
//! needle matches everything, and results come back in rank order capped at
//! the requested maximum.

use crate::snapshot::RankedList;
use crate::{Snapshot, SnapshotCache};
use std::collections::HashSet;

/// Default cap for author, mod and version suggestions.
pub const DEFAULT_SUGGESTION_LIMIT: usize = 20;
/// Default cap for category suggestions.
pub const DEFAULT_CATEGORY_LIMIT: usize = 25;
/// Pseudo-category that groups modpacks rather than mods.
pub const MODPACKS_CATEGORY: &str = "Modpacks";

fn normalize(needle: &str) -> String {
    needle.trim().to_lowercase()
}

fn take_matching(list: &RankedList, needle: &str, max: usize) -> Vec<String> {
    list.iter()
        .filter(|(_, lower)| needle.is_empty() || lower.contains(needle))
        .take(max)
        .map(|(display, _)| display.to_string())
        .collect()
}

impl Snapshot {
    /// Authors whose name contains `needle`, most downloaded first.
    pub fn suggest_authors(&self, needle: &str, max: usize) -> Vec<String> {
        take_matching(self.authors(), &normalize(needle), max)
    }

    /// Mod names containing `needle`.
    ///
    /// With an author, searches that author's ranked mods. Without one,
    /// searches every package by downloads and folds duplicate names.
    pub fn suggest_mods(&self, author: Option<&str>, needle: &str, max: usize) -> Vec<String> {
        let needle = normalize(needle);
        match author.map(str::trim).filter(|a| !a.is_empty()) {
            Some(author) => self
                .mods_for(author)
                .map(|mods| take_matching(mods, &needle, max))
                .unwrap_or_default(),
            None => {
                let mut seen = HashSet::new();
                self.package_names()
                    .iter()
                    .filter(|(_, lower)| needle.is_empty() || lower.contains(needle.as_str()))
                    .filter(|(_, lower)| seen.insert(*lower))
                    .take(max)
                    .map(|(display, _)| display.to_string())
                    .collect()
            },
        }
    }

    /// Versions of one mod containing `needle`, newest first.
    pub fn suggest_versions(&self, author: &str, name: &str, needle: &str, max: usize) -> Vec<String> {
        self.versions_for(author, name)
            .map(|versions| take_matching(versions, &normalize(needle), max))
            .unwrap_or_default()
    }

    /// Categories containing `needle`, most used first.
    ///
    /// [`MODPACKS_CATEGORY`] is left out unless `include_modpacks` is set.
    pub fn suggest_categories(&self, needle: &str, include_modpacks: bool, max: usize) -> Vec<String> {
        let needle = normalize(needle);
        self.categories()
            .iter()
            .filter(|(display, _)| include_modpacks || !display.eq_ignore_ascii_case(MODPACKS_CATEGORY))
            .filter(|(_, lower)| needle.is_empty() || lower.contains(needle.as_str()))
            .take(max)
            .map(|(display, _)| display.to_string())
            .collect()
    }
}

impl SnapshotCache {
    /// See [`Snapshot::suggest_authors`].
    pub fn suggest_authors(&self, needle: &str, max: usize) -> Vec<String> {
        self.snapshot().suggest_authors(needle, max)
    }

    /// See [`Snapshot::suggest_mods`].
    pub fn suggest_mods(&self, author: Option<&str>, needle: &str, max: usize) -> Vec<String> {
        self.snapshot().suggest_mods(author, needle, max)
    }

    /// See [`Snapshot::suggest_versions`].
    pub fn suggest_versions(&self, author: &str, name: &str, needle: &str, max: usize) -> Vec<String> {
        self.snapshot().suggest_versions(author, name, needle, max)
    }

    /// See [`Snapshot::suggest_categories`].
    pub fn suggest_categories(&self, needle: &str, include_modpacks: bool, max: usize) -> Vec<String> {
        self.snapshot()
            .suggest_categories(needle, include_modpacks, max)
    }
}
