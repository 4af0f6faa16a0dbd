use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A package as listed by the registry's `api/v1/package/` endpoint.
///
/// The same shape is returned for the full catalog and for a single
/// community, so both the snapshot builder and the resolver consume it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Package {
    /// Namespace that owns the package.
    #[serde(alias = "namespace")]
    pub owner: String,
    /// Package name.
    pub name: String,
    /// `Owner-Name`, as listed.
    pub full_name: Option<String>,
    /// Registry page for the package.
    pub package_url: Option<String>,
    /// Community category labels.
    pub categories: Vec<String>,
    /// Pinned by the community moderators.
    pub is_pinned: bool,
    /// Flagged deprecated by the owner or moderators.
    pub is_deprecated: bool,
    /// RFC 3339 creation timestamp.
    pub date_created: Option<String>,
    /// RFC 3339 timestamp of the last upload.
    pub date_updated: Option<String>,
    /// Versions as listed (newest first upstream, not guaranteed).
    pub versions: Vec<Version>,
}

/// One published version of a [`Package`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Version {
    /// Version string, usually `major.minor.patch`.
    pub version_number: String,
    /// Download count for this version alone.
    pub downloads: u64,
    /// Archive size in bytes.
    pub file_size: u64,
    /// RFC 3339 upload timestamp.
    pub date_created: Option<String>,
    /// `Author-Name-Version` dependency strings.
    pub dependencies: Vec<String>,
    /// Archive download link.
    pub download_url: Option<String>,
    /// Icon URL.
    pub icon: Option<String>,
    /// Short description shown in listings.
    pub description: Option<String>,
}

impl Package {
    /// Sum of downloads across every version.
    pub fn total_downloads(&self) -> u64 {
        self.versions.iter().map(|v| v.downloads).sum()
    }

    /// `Owner-Name`, preferring the registry-provided full name.
    pub fn display_name(&self) -> String {
        match self.full_name.as_deref().map(str::trim) {
            Some(full) if !full.is_empty() => full.to_string(),
            _ => format!("{}-{}", self.owner.trim(), self.name.trim()),
        }
    }

    /// Parsed [`date_created`](Self::date_created).
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.date_created.as_deref().and_then(parse_timestamp)
    }

    /// Parsed [`date_updated`](Self::date_updated).
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.date_updated.as_deref().and_then(parse_timestamp)
    }

    /// Whether the package carries the given category (case-insensitive).
    pub fn has_category(&self, category: &str) -> bool {
        self.categories
            .iter()
            .any(|c| c.eq_ignore_ascii_case(category))
    }
}

impl Version {
    /// Parsed [`date_created`](Self::date_created).
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.date_created.as_deref().and_then(parse_timestamp)
    }
}

/// Parse the registry's ISO-8601 timestamps.
///
/// Accepts RFC 3339 with an offset and the offset-less form, which is read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

/// A reference to a mod as found in a profile export.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModReference {
    /// Package owner.
    pub author: String,
    /// Package name, which may contain dashes.
    pub name: String,
    /// Absent when the export did not record one.
    pub version: Option<String>,
    /// The dependency string the reference was parsed from, if any.
    pub original: Option<String>,
}

impl ModReference {
    /// Reference with an optional version; blank versions become `None`.
    pub fn new(author: impl Into<String>, name: impl Into<String>, version: Option<String>) -> Self {
        Self {
            author: author.into(),
            name: name.into(),
            version: version.filter(|v| !v.trim().is_empty()),
            original: None,
        }
    }

    /// Parse an `Author-Name-Version` dependency string.
    ///
    /// Splits from the right: the last token is the version, the first token
    /// is the author and everything between is the name, so names containing
    /// dashes survive. Returns `None` with fewer than three non-empty tokens.
    ///
    /// ```
    /// use tscache_core::ModReference;
    ///
    /// let m = ModReference::from_dependency("Org-My-Mod-2.0.0").unwrap();
    /// assert_eq!((m.author.as_str(), m.name.as_str()), ("Org", "My-Mod"));
    /// assert_eq!(m.version.as_deref(), Some("2.0.0"));
    /// ```
    pub fn from_dependency(dependency: &str) -> Option<Self> {
        let parts: Vec<&str> = dependency
            .split('-')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        let [author, middle @ .., version] = parts.as_slice() else {
            return None;
        };
        if middle.is_empty() {
            return None;
        }
        Some(Self {
            author: (*author).to_string(),
            name: middle.join("-"),
            version: Some((*version).to_string()),
            original: Some(dependency.to_string()),
        })
    }

    /// Case-insensitive `author-name` lookup key.
    pub fn lookup_key(&self) -> String {
        format!("{}-{}", self.author, self.name).to_lowercase()
    }
}

impl fmt::Display for ModReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.version.as_deref() {
            Some(version) if !version.is_empty() => {
                write!(f, "{}-{}-{version}", self.author, self.name)
            },
            _ => write!(f, "{}-{}", self.author, self.name),
        }
    }
}

/// A [`ModReference`] resolved against live registry metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedModReference {
    /// Package owner as the registry spells it.
    pub author: String,
    /// Package name as the registry spells it.
    pub name: String,
    /// `Author-Name` as the registry spells it.
    pub display: String,
    /// Exact version when the reference carried one, otherwise the newest.
    pub version: String,
    /// Icon of the resolved version.
    pub icon_url: Option<String>,
    /// Description of the resolved version.
    pub description: Option<String>,
}

impl EnrichedModReference {
    /// Record for a reference the registry does not know about.
    pub fn passthrough(reference: &ModReference) -> Self {
        Self {
            author: reference.author.clone(),
            name: reference.name.clone(),
            display: format!("{}-{}", reference.author, reference.name),
            version: reference
                .version
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
            icon_url: None,
            description: None,
        }
    }
}

impl fmt::Display for EnrichedModReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.author, self.name, self.version)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_dependency_string_parsing() {
        let m = ModReference::from_dependency("Azumatt-AzuCraftyBoxes-1.6.1").unwrap();
        assert_eq!(m.author, "Azumatt");
        assert_eq!(m.name, "AzuCraftyBoxes");
        assert_eq!(m.version.as_deref(), Some("1.6.1"));
        assert_eq!(m.original.as_deref(), Some("Azumatt-AzuCraftyBoxes-1.6.1"));
    }

    #[test]
    fn test_dependency_name_with_separators_splits_from_right() {
        let m = ModReference::from_dependency("Org-My-Mod-2.0.0").unwrap();
        assert_eq!(m.author, "Org");
        assert_eq!(m.name, "My-Mod");
        assert_eq!(m.version.as_deref(), Some("2.0.0"));
    }

    #[test]
    fn test_dependency_rejects_short_strings() {
        assert!(ModReference::from_dependency("").is_none());
        assert!(ModReference::from_dependency("Author-1.0.0").is_none());
        assert!(ModReference::from_dependency("--").is_none());
        assert!(ModReference::from_dependency("Author--1.0.0").is_none());
    }

    #[test]
    fn test_mod_reference_display() {
        let with_version = ModReference::new("A", "B", Some("1.0.0".to_string()));
        assert_eq!(with_version.to_string(), "A-B-1.0.0");

        let without = ModReference::new("A", "B", Some("  ".to_string()));
        assert_eq!(without.version, None);
        assert_eq!(without.to_string(), "A-B");
    }

    #[test]
    fn test_passthrough_uses_reference_version_or_unknown() {
        let known = ModReference::new("A", "B", Some("2.1.0".to_string()));
        let rec = EnrichedModReference::passthrough(&known);
        assert_eq!(rec.version, "2.1.0");
        assert_eq!(rec.display, "A-B");
        assert!(rec.icon_url.is_none());
        assert!(rec.description.is_none());

        let unknown = ModReference::new("A", "B", None);
        assert_eq!(EnrichedModReference::passthrough(&unknown).version, "unknown");
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let with_offset = parse_timestamp("2024-03-05T10:20:30.123456Z").unwrap();
        assert_eq!((with_offset.year(), with_offset.month(), with_offset.day()), (2024, 3, 5));

        let naive = parse_timestamp("2024-03-05T10:20:30").unwrap();
        assert_eq!(naive.hour(), 10);

        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_package_deserializes_registry_shape() {
        let json = r#"{
            "name": "AzuCraftyBoxes",
            "full_name": "Azumatt-AzuCraftyBoxes",
            "owner": "Azumatt",
            "package_url": "https://thunderstore.io/c/valheim/p/Azumatt/AzuCraftyBoxes/",
            "date_created": "2022-01-01T00:00:00Z",
            "is_pinned": false,
            "is_deprecated": false,
            "categories": ["Mods", "Crafting"],
            "uuid4": "ignored",
            "versions": [
                {"version_number": "1.6.1", "downloads": 10, "file_size": 100,
                 "dependencies": ["denikson-BepInExPack_Valheim-5.4.2202"],
                 "icon": "https://example/icon.png", "description": "boxes"}
            ]
        }"#;
        let package: Package = serde_json::from_str(json).unwrap();
        assert_eq!(package.display_name(), "Azumatt-AzuCraftyBoxes");
        assert_eq!(package.total_downloads(), 10);
        assert!(package.has_category("crafting"));
        assert!(package.created_at().is_some());
    }

    #[test]
    fn test_package_accepts_namespace_alias() {
        let package: Package =
            serde_json::from_str(r#"{"namespace": "Azumatt", "name": "Mod"}"#).unwrap();
        assert_eq!(package.owner, "Azumatt");
        assert_eq!(package.display_name(), "Azumatt-Mod");
    }
}
