//! Legacy profile codes: fetch, unwrap and read the mod list.
//!
//! A legacy profile is served as the text `#r2modman` followed by a base64
//! encoded ZIP archive. The archive is read with a chain of strategies, each
//! tried in order until one yields at least one mod:
//!
//! 1. **Export**: the structured `export.r2x` document ([`r2x`])
//! 2. **Manifest**: the `dependencies` of a `manifest.json` ([`manifest`])
//! 3. **Config heuristic**: `BepInEx/config/*.cfg` file names ([`heuristic`])
//!
//! An archive that yields nothing from any strategy decodes to an empty
//! profile rather than an error.

/// `mods:` scanner for `export.r2x` files.
pub mod heuristic;
/// Lenient `manifest.json` dependency parsing.
pub mod manifest;
/// Best-effort guesses from BepInEx config file names.
pub mod r2x;

use crate::{Error, ModReference, RegistryClient, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use std::io::{Cursor, Read, Seek};
use tokio::time::Instant;
use tracing::{debug, info, instrument};
use zip::ZipArchive;

/// Marker every legacy profile payload starts with.
pub const PROFILE_MARKER: &str = "#r2modman";

const EXPORT_ENTRY: &str = "export.r2x";
const MANIFEST_ENTRY: &str = "manifest.json";
/// Upper bound on the decompressed size of a single entry we read.
const MAX_ENTRY_BYTES: u64 = 8 * 1024 * 1024;

/// Which strategy produced a [`DecodedProfile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileStrategy {
    /// Structured `export.r2x` written by the mod manager.
    Export,
    /// `manifest.json` dependency list.
    Manifest,
    /// Guessed from `BepInEx/config/*.cfg` file names.
    ConfigHeuristic,
}

/// Mods and metadata recovered from a profile archive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedProfile {
    /// Mod references in export order.
    pub mods: Vec<ModReference>,
    /// Only the export document declares one.
    pub community: Option<String>,
    /// Name the profile was exported under.
    pub profile_name: Option<String>,
    /// `None` when no strategy found anything.
    pub strategy: Option<ProfileStrategy>,
}

impl DecodedProfile {
    fn from_mods(mods: Vec<ModReference>, strategy: ProfileStrategy) -> Self {
        Self {
            mods,
            strategy: Some(strategy),
            ..Self::default()
        }
    }
}

/// Fetches legacy profiles and decodes them into mod references.
#[derive(Debug, Clone)]
pub struct ProfileDecoder {
    client: RegistryClient,
}

impl ProfileDecoder {
    /// Decoder fetching through `client`.
    pub const fn new(client: RegistryClient) -> Self {
        Self { client }
    }

    /// Fetch `code` and decode its mod list.
    ///
    /// Network retries and the deadline are handled by
    /// [`RegistryClient::fetch_legacy_profile`].
    #[instrument(skip(self, deadline), fields(code = %code.trim()))]
    pub async fn decode_profile(&self, code: &str, deadline: Option<Instant>) -> Result<DecodedProfile> {
        let text = self.client.fetch_legacy_profile(code, deadline).await?;
        let profile = decode_text(&text)?;
        info!(
            mods = profile.mods.len(),
            strategy = ?profile.strategy,
            community = profile.community.as_deref().unwrap_or("-"),
            "Decoded legacy profile"
        );
        Ok(profile)
    }
}

/// Decode a full `#r2modman` payload.
pub fn decode_text(text: &str) -> Result<DecodedProfile> {
    let bytes = decode_payload(text)?;
    read_archive(&bytes)
}

/// Strip the marker and base64-decode the archive bytes.
///
/// Whitespace inside the base64 body (line wrapping) is ignored.
pub fn decode_payload(text: &str) -> Result<Vec<u8>> {
    let body = text.strip_prefix(PROFILE_MARKER).ok_or_else(|| {
        Error::Format(format!("Profile data does not start with {PROFILE_MARKER}"))
    })?;

    let compact: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err(Error::Format("Profile data is empty".into()));
    }
    Ok(STANDARD.decode(compact.as_bytes())?)
}

/// Read a profile ZIP archive through the strategy chain.
pub fn read_archive(bytes: &[u8]) -> Result<DecodedProfile> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let strategies: [(ProfileStrategy, Strategy<Cursor<&[u8]>>); 3] = [
        (ProfileStrategy::Export, from_export),
        (ProfileStrategy::Manifest, from_manifest),
        (ProfileStrategy::ConfigHeuristic, from_configs),
    ];

    for (strategy, run) in strategies {
        if let Some(profile) = run(&mut archive)? {
            if !profile.mods.is_empty() {
                debug!(?strategy, mods = profile.mods.len(), "Profile strategy matched");
                return Ok(profile);
            }
        }
        debug!(?strategy, "Profile strategy found nothing");
    }
    Ok(DecodedProfile::default())
}

type Strategy<R> = fn(&mut ZipArchive<R>) -> Result<Option<DecodedProfile>>;

fn from_export<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Option<DecodedProfile>> {
    let Some(index) = find_entry(archive, |name| name.eq_ignore_ascii_case(EXPORT_ENTRY)) else {
        return Ok(None);
    };
    let export = r2x::scan(&read_entry(archive, index)?);
    Ok(Some(DecodedProfile {
        mods: export.mods,
        community: export.community,
        profile_name: export.profile_name,
        strategy: Some(ProfileStrategy::Export),
    }))
}

fn from_manifest<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Option<DecodedProfile>> {
    let nested = format!("/{MANIFEST_ENTRY}");
    let index = find_entry(archive, |name| name.eq_ignore_ascii_case(MANIFEST_ENTRY)).or_else(|| {
        find_entry(archive, |name| name.to_ascii_lowercase().ends_with(&nested))
    });
    let Some(index) = index else {
        return Ok(None);
    };

    match manifest::parse(&read_entry(archive, index)?) {
        Ok(mods) => Ok(Some(DecodedProfile::from_mods(mods, ProfileStrategy::Manifest))),
        Err(e) => {
            debug!("Ignoring unreadable manifest: {e}");
            Ok(None)
        },
    }
}

// Infallible: only entry names are inspected.
#[allow(clippy::unnecessary_wraps)]
fn from_configs<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Option<DecodedProfile>> {
    let names = (0..archive.len()).filter_map(|i| archive.name_for_index(i));
    let mods = heuristic::guess(names);
    Ok(Some(DecodedProfile::from_mods(mods, ProfileStrategy::ConfigHeuristic)))
}

fn find_entry<R: Read + Seek>(archive: &ZipArchive<R>, matches: impl Fn(&str) -> bool) -> Option<usize> {
    (0..archive.len()).find(|&i| archive.name_for_index(i).is_some_and(&matches))
}

fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, index: usize) -> Result<String> {
    let entry = archive.by_index(index)?;
    let name = entry.name().to_string();

    let mut buf = Vec::new();
    entry
        .take(MAX_ENTRY_BYTES)
        .read_to_end(&mut buf)
        .map_err(|e| Error::Format(format!("Failed to read {name} from profile archive: {e}")))?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
