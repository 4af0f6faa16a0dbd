//! Configuration management for tscache.
//!
//! Configuration is stored in TOML format and layered:
//!
//! 1. **Built-in defaults** (Thunderstore, the `valheim` community, hourly refresh)
//! 2. **Global config**: `global.toml` in the platform config directory
//! 3. **Environment variables**: `TSCACHE_BASE_URL`, `TSCACHE_COMMUNITY`,
//!    `TSCACHE_REFRESH_SECS`
//!
//! ## Example Configuration File
//!
//! ```toml
//! [registry]
//! base_url = "https://thunderstore.io"
//! community = "valheim"
//! request_timeout_secs = 30
//!
//! [refresh]
//! interval_secs = 3600
//!
//! [profile]
//! max_attempts = 5
//! initial_backoff_ms = 750
//! backoff_factor = 1.8
//! max_backoff_ms = 5000
//!
//! [resolver]
//! metadata_ttl_secs = 300
//! version_ordering = "dotted"
//! ```

use crate::resolver::VersionOrdering;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding [`RegistryConfig::base_url`].
pub const ENV_BASE_URL: &str = "TSCACHE_BASE_URL";
/// Environment variable overriding [`RegistryConfig::community`].
pub const ENV_COMMUNITY: &str = "TSCACHE_COMMUNITY";
/// Environment variable overriding [`RefreshConfig::interval_secs`].
pub const ENV_REFRESH_SECS: &str = "TSCACHE_REFRESH_SECS";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where and how to reach the registry.
    pub registry: RegistryConfig,
    /// Snapshot refresh cadence.
    pub refresh: RefreshConfig,
    /// Legacy profile fetch retry policy.
    pub profile: RetryPolicy,
    /// Metadata cache and version ranking used during enrichment.
    pub resolver: ResolverConfig,
}

/// Registry connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Scheme and host of the registry, without a trailing slash.
    pub base_url: String,
    /// Community whose catalog feeds the snapshot, and the default community
    /// for profiles that do not declare one.
    pub community: String,
    /// Per-request timeout applied by the HTTP client.
    pub request_timeout_secs: u64,
    /// User agent sent with every request.
    pub user_agent: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: "https://thunderstore.io".to_string(),
            community: "valheim".to_string(),
            request_timeout_secs: 30,
            user_agent: concat!("tscache/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl RegistryConfig {
    /// Per-request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Snapshot refresh settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Delay between the end of one refresh and the start of the next.
    pub interval_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self { interval_secs: 3600 }
    }
}

impl RefreshConfig {
    /// Delay between refreshes.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

/// Exponential backoff policy for the legacy profile endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total number of requests, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_backoff_ms: u64,
    /// Multiplier applied after each retry.
    pub backoff_factor: f64,
    /// Upper bound for the computed delay.
    pub max_backoff_ms: u64,
    /// Upper bound for a server-provided `Retry-After`.
    pub max_retry_after_secs: u64,
    /// Default overall deadline for an import, used by the CLI.
    pub timeout_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff_ms: 750,
            backoff_factor: 1.8,
            max_backoff_ms: 5000,
            max_retry_after_secs: 60,
            timeout_secs: 20,
        }
    }
}

impl RetryPolicy {
    /// Delay to sleep before retry number `retry` (1-based).
    ///
    /// ```
    /// use std::time::Duration;
    /// use tscache_core::RetryPolicy;
    ///
    /// let policy = RetryPolicy::default();
    /// assert_eq!(policy.backoff(1), Duration::from_millis(750));
    /// assert_eq!(policy.backoff(2), Duration::from_millis(1350));
    /// assert_eq!(policy.backoff(10), Duration::from_millis(5000));
    /// ```
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss,
        clippy::cast_possible_wrap
    )]
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(64) as i32;
        let millis = (self.initial_backoff_ms as f64) * self.backoff_factor.max(1.0).powi(exponent);
        let capped = millis.min(self.max_backoff_ms as f64).max(0.0);
        Duration::from_millis(capped.round() as u64)
    }

    /// Clamp a server-provided `Retry-After` value.
    pub fn retry_after(&self, seconds: u64) -> Duration {
        Duration::from_secs(seconds.min(self.max_retry_after_secs))
    }

    /// Overall import deadline applied when the caller gives none.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Resolver settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// How long per-community metadata is reused before refetching.
    pub metadata_ttl_secs: u64,
    /// Policy used to pick the newest version when a reference has none.
    pub version_ordering: VersionOrdering,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            metadata_ttl_secs: 300,
            version_ordering: VersionOrdering::default(),
        }
    }
}

impl ResolverConfig {
    /// How long fetched community metadata is reused.
    pub fn metadata_ttl(&self) -> Duration {
        Duration::from_secs(self.metadata_ttl_secs)
    }
}

impl Config {
    /// Load configuration from the default location, falling back to defaults.
    ///
    /// Environment overrides are applied last.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => Self::read(&path)?,
            _ => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from an explicit file, then apply environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::read(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config {}: {e}", path.display())))
    }

    /// Apply overrides from a variable lookup (the process environment in production).
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.registry.base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(community) = lookup(ENV_COMMUNITY).filter(|v| !v.trim().is_empty()) {
            self.registry.community = community.trim().to_string();
        }
        if let Some(secs) = lookup(ENV_REFRESH_SECS) {
            self.refresh.interval_secs = secs.trim().parse().map_err(|e| {
                Error::Config(format!("{ENV_REFRESH_SECS} must be a number of seconds: {e}"))
            })?;
        }
        Ok(())
    }

    /// Path of `global.toml` in the platform config directory, if one exists.
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "tscache", "tscache")
            .map(|dirs| dirs.config_dir().join("global.toml"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.registry.base_url, "https://thunderstore.io");
        assert_eq!(config.refresh.interval(), Duration::from_secs(3600));
        assert_eq!(config.profile.max_attempts, 5);
        assert_eq!(config.resolver.metadata_ttl(), Duration::from_secs(300));
        assert_eq!(config.resolver.version_ordering, VersionOrdering::Dotted);
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = RetryPolicy::default();
        let delays: Vec<u64> = (1..=6)
            .map(|n| u64::try_from(policy.backoff(n).as_millis()).unwrap())
            .collect();
        assert_eq!(delays, vec![750, 1350, 2430, 4374, 5000, 5000]);
    }

    #[test]
    fn test_retry_after_is_clamped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.retry_after(3), Duration::from_secs(3));
        assert_eq!(policy.retry_after(3600), Duration::from_secs(60));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[registry]\ncommunity = \"lethal-company\"\n\n[resolver]\nversion_ordering = \"semver\""
        )
        .unwrap();

        let config = Config::read(file.path()).unwrap();
        assert_eq!(config.registry.community, "lethal-company");
        assert_eq!(config.registry.base_url, "https://thunderstore.io");
        assert_eq!(config.resolver.version_ordering, VersionOrdering::Semver);
        assert_eq!(config.profile.backoff_factor, 1.8);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[registry\nbase_url = ").unwrap();
        assert!(matches!(Config::read(file.path()), Err(Error::Config(_))));
    }

    #[test]
    fn test_unreadable_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        let err = Config::read(&missing).unwrap_err();
        assert_eq!(err.category(), "io");
        assert!(matches!(err, Error::Io(ref e) if e.kind() == std::io::ErrorKind::NotFound));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_BASE_URL, "http://127.0.0.1:8080/"),
            (ENV_COMMUNITY, "riskofrain2"),
            (ENV_REFRESH_SECS, "120"),
        ]);
        let mut config = Config::default();
        config
            .apply_env_overrides(|key| env.get(key).map(ToString::to_string))
            .unwrap();
        assert_eq!(config.registry.base_url, "http://127.0.0.1:8080");
        assert_eq!(config.registry.community, "riskofrain2");
        assert_eq!(config.refresh.interval_secs, 120);
    }

    #[test]
    fn test_env_override_rejects_bad_interval() {
        let mut config = Config::default();
        let result = config.apply_env_overrides(|key| {
            (key == ENV_REFRESH_SECS).then(|| "soon".to_string())
        });
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
