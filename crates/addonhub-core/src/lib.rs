//! AddonHub Core - Headless engine for proxied addon repositories.
//!
//! Aggregates addons hosted in independent GitHub repositories into a single
//! repository: one synthesized `addons.xml` manifest plus asset lookups that
//! resolve to the right branch, tag or release of each addon. It can be used
//! programmatically without any HTTP layer.
//!
//! For the HTTP server and command line, see the `addonhub-server` crate.
//!
//! # Example
//!
//! ```rust,ignore
//! use addonhub_core::{AggregatorConfig, EntrySource, RepositoryAggregator};
//!
//! #[tokio::main]
//! async fn main() -> addonhub_core::Result<()> {
//!     let config = AggregatorConfig {
//!         sources: vec![EntrySource::File("entries.json".into())],
//!         ..AggregatorConfig::default()
//!     };
//!     let aggregator = RepositoryAggregator::new(config)?;
//!     aggregator.update(true).await?;
//!
//!     let manifest = aggregator.manifest().await?;
//!     println!("addons.xml md5 {}", manifest.md5());
//!
//!     let zip = aggregator
//!         .resolve_asset("plugin.video.foo", "plugin.video.foo-1.2.0.zip")
//!         .await?;
//!     println!("Serving {}", zip.url());
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod entries;
pub mod error;
pub mod models;
pub mod network;
pub mod platform;
pub mod repository;
pub mod version;

// Re-export commonly used types
pub use cache::{CacheConfig, CacheEntry, LoadingCache};
pub use config::{AggregatorConfig, AppConfig, EntrySource, NetworkConfig};
pub use entries::{AddonEntry, EntriesFile, TagPattern};
pub use error::{AddonHubError, Result};
pub use network::{GitHubRepoClient, HttpClient, RemoteBody, RepoIdentity};
pub use platform::Platform;
pub use repository::{Manifest, RepositoryAggregator};
pub use version::{compare_tilde, versions_match, DottedVersion, TildeVersion};
