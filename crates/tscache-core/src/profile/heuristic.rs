//! Best-effort guesses from BepInEx config file names.
//!
//! Plugins usually write `BepInEx/config/<Author>.<Name>.cfg` (or
//! `<Author>_<Name>.cfg`), which is enough to recover an author/name pair
//! when the archive carries no mod list at all. Versions are unknown.

use crate::ModReference;
use std::collections::HashSet;

const CONFIG_DIR: &str = "bepinex/config/";
const CONFIG_EXT: &str = ".cfg";
/// Framework configs, not mods.
const FRAMEWORK_PREFIX: &str = "org.bepinex";

/// Guess mod references from archive entry names, first-seen order, no duplicates.
pub fn guess<'a>(entry_names: impl IntoIterator<Item = &'a str>) -> Vec<ModReference> {
    let mut seen = HashSet::new();
    entry_names
        .into_iter()
        .filter_map(guess_one)
        .filter(|m| seen.insert(m.lookup_key()))
        .collect()
}

fn guess_one(entry_name: &str) -> Option<ModReference> {
    let path = entry_name.replace('\\', "/");
    let lower = path.to_lowercase();
    if !lower.starts_with(CONFIG_DIR) || !lower.ends_with(CONFIG_EXT) {
        return None;
    }

    let file = path.rsplit('/').next()?;
    let stem = file.get(..file.len().saturating_sub(CONFIG_EXT.len()))?;
    if stem.trim().is_empty() || stem.to_lowercase().starts_with(FRAMEWORK_PREFIX) {
        return None;
    }

    let (author, name) = split_pair(stem, '.').or_else(|| split_pair(stem, '_'))?;
    Some(ModReference {
        original: Some(format!("{author}-{name}")),
        author,
        name,
        version: None,
    })
}

/// `A.B.C` -> (`A`, `B.C`) ignoring empty segments.
fn split_pair(stem: &str, separator: char) -> Option<(String, String)> {
    let parts: Vec<&str> = stem.split(separator).filter(|p| !p.is_empty()).collect();
    match parts.as_slice() {
        [author, rest @ ..] if !rest.is_empty() => {
            let separator = separator.to_string();
            Some(((*author).to_string(), rest.join(separator.as_str())))
        },
        _ => None,
    }
}
