//! In-memory caching for the aggregator.
//!
//! Every cache is an independent `LoadingCache` instance owned by its
//! aggregator; nothing here is process-global.

mod loading;
mod traits;

pub use loading::LoadingCache;
pub use traits::{CacheConfig, CacheEntry};
