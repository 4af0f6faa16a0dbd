//! Line scanner for r2modman `export.r2x` documents.
//!
//! The format is a small YAML document:
//!
//! ```text
//! profileName: Building
//! community: valheim
//! mods:
//!   - name: Azumatt-AzuCraftyBoxes
//!     version:
//!       major: 1
//!       minor: 6
//!       patch: 1
//!     enabled: true
//! ```
//!
//! Only the handful of keys above are recognized; everything else is ignored.

use crate::ModReference;
use regex::Regex;
use std::sync::LazyLock;

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static PROFILE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*profileName\s*:\s*(.+?)\s*$").unwrap());

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static COMMUNITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*community\s*:\s*([A-Za-z0-9_\-]+)\s*$").unwrap());

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static MODS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*mods\s*:\s*$").unwrap());

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*-\s*name\s*:\s*(.+?)\s*$").unwrap());

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static PART_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(major|minor|patch)\s*:\s*(\d+)\s*$").unwrap());

/// `version: { major: 1, minor: 2, patch: 3 }` on one line.
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static INLINE_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*version\s*:\s*\{\s*major\s*:\s*(\d+)\s*,\s*minor\s*:\s*(\d+)\s*,\s*patch\s*:\s*(\d+)\s*\}\s*$",
    )
    .unwrap()
});

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static ENABLED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*enabled\s*:\s*(true|false)\s*$").unwrap());

/// What an `export.r2x` document declares.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Export {
    /// `profileName:` value, if present.
    pub profile_name: Option<String>,
    /// `community:` value, if present.
    pub community: Option<String>,
    /// Enabled mods with a complete version.
    pub mods: Vec<ModReference>,
}

#[derive(Debug)]
struct PendingItem {
    full_name: String,
    major: Option<u64>,
    minor: Option<u64>,
    patch: Option<u64>,
    enabled: bool,
}

impl PendingItem {
    fn new(full_name: &str) -> Self {
        Self {
            full_name: full_name.trim().to_string(),
            major: None,
            minor: None,
            patch: None,
            enabled: true,
        }
    }

    /// Disabled items and items missing any version part are dropped.
    fn finish(self) -> Option<ModReference> {
        if !self.enabled {
            return None;
        }
        let version = format!("{}.{}.{}", self.major?, self.minor?, self.patch?);
        let (author, name) = self.full_name.split_once('-')?;
        if author.is_empty() || name.is_empty() {
            return None;
        }
        Some(ModReference {
            author: author.to_string(),
            name: name.to_string(),
            original: Some(format!("{author}-{name}-{version}")),
            version: Some(version),
        })
    }
}

/// Scan an export document.
///
/// Never fails: unrecognized lines are skipped and malformed items dropped.
pub fn scan(text: &str) -> Export {
    let text = text.trim_start_matches('\u{feff}');

    let profile_name = PROFILE_NAME_RE
        .captures(text)
        .map(|c| c[1].trim().to_string())
        .filter(|s| !s.is_empty());
    let community = COMMUNITY_RE.captures(text).map(|c| c[1].to_string());

    let mut mods = Vec::new();
    let mut pending: Option<PendingItem> = None;
    let mut in_mods = false;

    for line in text.lines() {
        if !in_mods {
            in_mods = MODS_RE.is_match(line);
            continue;
        }

        if let Some(caps) = ITEM_RE.captures(line) {
            mods.extend(pending.take().and_then(PendingItem::finish));
            pending = Some(PendingItem::new(&caps[1]));
            continue;
        }

        let Some(item) = pending.as_mut() else {
            continue;
        };

        if let Some(caps) = PART_RE.captures(line) {
            let value = caps[2].parse().ok();
            match &caps[1] {
                "major" => item.major = value,
                "minor" => item.minor = value,
                _ => item.patch = value,
            }
        } else if let Some(caps) = INLINE_VERSION_RE.captures(line) {
            item.major = caps[1].parse().ok();
            item.minor = caps[2].parse().ok();
            item.patch = caps[3].parse().ok();
        } else if let Some(caps) = ENABLED_RE.captures(line) {
            item.enabled = caps[1].eq_ignore_ascii_case("true");
        }
    }
    mods.extend(pending.and_then(PendingItem::finish));

    Export {
        profile_name,
        community,
        mods,
    }
}
