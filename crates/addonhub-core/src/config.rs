//! Centralized configuration for AddonHub.
//!
//! Constant groups hold the fixed defaults; `AggregatorConfig` is the runtime
//! configuration a deployment loads from JSON and/or command line flags.

use crate::error::{AddonHubError, Result};
use crate::platform::Platform;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application-level configuration.
pub struct AppConfig;

impl AppConfig {
    pub const APP_NAME: &'static str = "addonhub";
    pub const USER_AGENT: &'static str = "AddonHub/0.3";
    pub const ENTRIES_FILE_NAME: &'static str = "entries.json";
    pub const DEFAULT_PORT: u16 = 8080;
}

/// Network-related configuration.
pub struct NetworkConfig;

impl NetworkConfig {
    pub const GITHUB_API_BASE: &'static str = "https://api.github.com";
    pub const GITHUB_API_VERSION: &'static str = "2022-11-28";
    pub const GITHUB_JSON_ACCEPT: &'static str = "application/vnd.github+json";
    pub const GITHUB_RAW_ACCEPT: &'static str = "application/vnd.github.raw";
    pub const OCTET_STREAM_ACCEPT: &'static str = "application/octet-stream";
    /// Timeout for the "entries changed" notification sent to a running server.
    pub const NOTIFY_TIMEOUT: Duration = Duration::from_secs(2);
}

/// Cache defaults.
pub struct CacheDefaults;

impl CacheDefaults {
    pub const TTL_SECS: u64 = 60 * 60;
    pub const MAX_ENTRIES: usize = 128;
    /// The manifest cache only ever holds the single aggregate document.
    pub const MANIFEST_MAX_ENTRIES: usize = 1;
}

/// Aggregate manifest configuration.
pub struct ManifestConfig;

impl ManifestConfig {
    pub const ADDON_DESCRIPTOR: &'static str = "addon.xml";
    pub const ROOT_ELEMENT: &'static str = "addons";
    pub const ZIP_ASSET: &'static str = "zip";
    pub const ZIP_EXTENSION: &'static str = ".zip";
    pub const VERSION_SEPARATOR: &'static str = "-";
    pub const RELEASE_ASSET_PREFIX: &'static str = "release_asset://";
}

/// A place AddonEntry records are loaded from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySource {
    /// Local JSON file.
    File(PathBuf),
    /// Remote URL serving the same JSON shape.
    Url(String),
}

impl std::fmt::Display for EntrySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntrySource::File(path) => write!(f, "{}", path.display()),
            EntrySource::Url(url) => write!(f, "{}", url),
        }
    }
}

/// Runtime configuration for a `RepositoryAggregator`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Entry sources, loaded in this order.
    pub sources: Vec<EntrySource>,
    /// Upper bound on concurrent descriptor fetches while building the manifest.
    pub max_threads: usize,
    /// Time-to-live for every cache entry.
    pub cache_ttl_secs: u64,
    /// Capacity of the ref and tag caches.
    pub max_cache_entries: usize,
    /// Whether a cache hit refreshes the entry (LRU) instead of pure TTL.
    pub touch_on_read: bool,
    /// Last resort of the ref fallback chain.
    pub default_branch: String,
    /// Token used for addons that don't carry their own.
    pub default_token: Option<String>,
    /// Base URL of the GitHub REST API.
    pub api_base: String,
    /// Value of the `X-GitHub-Api-Version` header.
    pub api_version: String,
    /// Platform override; detected when absent.
    pub platform: Option<Platform>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            max_threads: 5,
            cache_ttl_secs: CacheDefaults::TTL_SECS,
            max_cache_entries: CacheDefaults::MAX_ENTRIES,
            touch_on_read: false,
            default_branch: "main".to_string(),
            default_token: None,
            api_base: NetworkConfig::GITHUB_API_BASE.to_string(),
            api_version: NetworkConfig::GITHUB_API_VERSION.to_string(),
            platform: None,
        }
    }
}

impl AggregatorConfig {
    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| AddonHubError::io_with_path(e, path))?;
        serde_json::from_str(&content).map_err(|e| AddonHubError::Config {
            message: format!("Failed to parse config {}: {}", path.display(), e),
        })
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Resolve the platform, detecting it when no override is set.
    pub fn resolved_platform(&self) -> Platform {
        self.platform.clone().unwrap_or_else(Platform::detect)
    }
}

/// Default location of the locally editable entries file.
pub fn default_entries_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| {
        dir.join(AppConfig::APP_NAME)
            .join(AppConfig::ENTRIES_FILE_NAME)
    })
}
