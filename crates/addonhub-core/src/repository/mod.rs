//! The repository aggregator.
//!
//! Owns the configured addon entries and the three caches (resolved refs, tag
//! lists and the aggregate manifest), and answers the route layer's questions:
//! what is the manifest, and where does a given asset come from.
//!
//! Lock order when caches nest: manifest, then ref, then tag.

mod assets;
mod manifest;
mod resolve;
mod template;

pub use manifest::{normalize_fragment, Manifest};
pub use template::{render, TemplateVars};

use crate::cache::{CacheConfig, LoadingCache};
use crate::config::{AggregatorConfig, CacheDefaults, ManifestConfig};
use crate::entries::{load_source, AddonEntry};
use crate::network::{GitHubRepoClient, HttpClient, RepoIdentity};
use crate::platform::Platform;
use crate::{AddonHubError, Result};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// Resolved-ref cache key: repository identity plus the tag pattern source.
pub(crate) type RefKey = (RepoIdentity, Option<String>);

/// Addon entries in insertion order, indexed by id.
#[derive(Debug, Default)]
struct AddonRegistry {
    order: Vec<Arc<AddonEntry>>,
    index: HashMap<String, usize>,
}

impl AddonRegistry {
    /// Insert, or replace in place when the id is already known.
    fn insert(&mut self, entry: AddonEntry) {
        let entry = Arc::new(entry);
        match self.index.get(&entry.id) {
            Some(&position) => self.order[position] = entry,
            None => {
                self.index.insert(entry.id.clone(), self.order.len());
                self.order.push(entry);
            }
        }
    }

    fn get(&self, id: &str) -> Option<Arc<AddonEntry>> {
        self.index
            .get(id)
            .map(|&position| self.order[position].clone())
    }

    fn clear(&mut self) {
        self.order.clear();
        self.index.clear();
    }
}

/// Aggregates many GitHub-hosted addons into one repository.
pub struct RepositoryAggregator {
    config: AggregatorConfig,
    platform: Platform,
    http: Arc<HttpClient>,
    addons: RwLock<AddonRegistry>,
    ref_cache: LoadingCache<RefKey, String>,
    tag_cache: LoadingCache<RepoIdentity, Arc<Vec<String>>>,
    manifest_cache: LoadingCache<(), Arc<Manifest>>,
}

impl RepositoryAggregator {
    /// Create an aggregator with no entries loaded. Call [`update`](Self::update) to load them.
    pub fn new(config: AggregatorConfig) -> Result<Self> {
        let http = Arc::new(HttpClient::new()?);
        Ok(Self::with_http_client(config, http))
    }

    pub fn with_http_client(config: AggregatorConfig, http: Arc<HttpClient>) -> Self {
        let cache_config = CacheConfig::from_aggregator(&config);
        let platform = config.resolved_platform();
        info!(
            "Repository aggregator for platform {} with {} entry sources",
            platform,
            config.sources.len()
        );
        Self {
            platform,
            http,
            addons: RwLock::new(AddonRegistry::default()),
            ref_cache: LoadingCache::new("ref", cache_config.clone()),
            tag_cache: LoadingCache::new("tags", cache_config.clone()),
            manifest_cache: LoadingCache::new(
                "manifest",
                cache_config.with_max_entries(CacheDefaults::MANIFEST_MAX_ENTRIES),
            ),
            config,
        }
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Reload entries from every configured source, in configured order.
    ///
    /// A source that fails to load or validate aborts the call; entries from
    /// sources before it stay applied. Returns the number of entries held.
    pub async fn update(&self, clear_first: bool) -> Result<usize> {
        if clear_first {
            self.registry_mut().clear();
        }

        for source in &self.config.sources {
            let entries = load_source(&self.http, source).await.map_err(|e| {
                warn!("Failed to load entries from {}: {}", source, e);
                e
            })?;
            let added = self.add_entries(entries);
            info!("Loaded {} entries from {}", added, source);
        }

        Ok(self.len())
    }

    /// Add already-validated entries, dropping those not supported on this platform.
    ///
    /// Returns how many were kept.
    pub fn add_entries(&self, entries: impl IntoIterator<Item = AddonEntry>) -> usize {
        let platform_name = self.platform.name();
        let mut registry = self.registry_mut();
        let mut added = 0;
        for entry in entries {
            if !entry.supports_platform(&platform_name) {
                debug!(
                    "Skipping addon {} as it does not support platform {}",
                    entry.id, platform_name
                );
                continue;
            }
            registry.insert(entry);
            added += 1;
        }
        added
    }

    pub fn entry(&self, addon_id: &str) -> Option<Arc<AddonEntry>> {
        self.registry().get(addon_id)
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> Vec<Arc<AddonEntry>> {
        self.registry().order.clone()
    }

    pub fn addon_ids(&self) -> Vec<String> {
        self.registry()
            .order
            .iter()
            .map(|entry| entry.id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.registry().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached ref, tag list and manifest. Entries are kept.
    pub async fn clear_cache(&self) {
        self.manifest_cache.clear().await;
        self.ref_cache.clear().await;
        self.tag_cache.clear().await;
        debug!("Repository caches cleared");
    }

    /// The cached aggregate manifest, built on a miss.
    pub async fn manifest(&self) -> Result<Arc<Manifest>> {
        self.manifest_cache
            .get((), || async move {
                Ok::<_, AddonHubError>(Arc::new(self.build_manifest().await))
            })
            .await
    }

    /// Build the manifest from each addon's descriptor, bypassing the cache.
    ///
    /// Descriptors are fetched by up to `max_threads` concurrent tasks and
    /// merged in entry order. An addon whose descriptor fails to fetch or
    /// parse is left out.
    pub async fn build_manifest(&self) -> Manifest {
        let entries = self.entries();
        let workers = self.config.max_threads.min(entries.len()).max(1);
        debug!(
            "Building manifest for {} addons with {} workers",
            entries.len(),
            workers
        );

        let fragments: Vec<Option<Vec<u8>>> = stream::iter(
            entries
                .iter()
                .cloned()
                .map(|entry| async move { self.fetch_fragment(&entry).await }),
        )
        .buffered(workers)
        .collect()
        .await;

        let manifest = Manifest::from_fragments(fragments.into_iter().flatten());
        info!(
            "Built manifest with {} bytes, md5 {}",
            manifest.len(),
            manifest.md5()
        );
        manifest
    }

    async fn fetch_fragment(&self, entry: &AddonEntry) -> Option<Vec<u8>> {
        match self.fetch_descriptor(entry).await {
            Ok(fragment) => Some(fragment),
            Err(e) => {
                warn!("Leaving {} out of the manifest: {}", entry.id, e);
                None
            }
        }
    }

    async fn fetch_descriptor(&self, entry: &AddonEntry) -> Result<Vec<u8>> {
        let body = self
            .resolve_entry_asset(entry, ManifestConfig::ADDON_DESCRIPTOR)
            .await?;
        let bytes = body.bytes().await?;
        normalize_fragment(&bytes)
    }

    /// Repository client for `entry`, using its token or the default one.
    pub fn client_for(&self, entry: &AddonEntry) -> GitHubRepoClient {
        let token = entry
            .access_token
            .clone()
            .or_else(|| self.config.default_token.clone());
        let identity = RepoIdentity::new(
            &self.config.api_base,
            &entry.owner,
            entry.repository(),
            &self.config.api_version,
            token,
        );
        GitHubRepoClient::new(self.http.clone(), identity)
    }

    fn registry(&self) -> std::sync::RwLockReadGuard<'_, AddonRegistry> {
        self.addons.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn registry_mut(&self) -> std::sync::RwLockWriteGuard<'_, AddonRegistry> {
        self.addons.write().unwrap_or_else(PoisonError::into_inner)
    }
}
