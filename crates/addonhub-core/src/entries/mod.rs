//! Addon entries: schema validation, loading from sources, and the local store.

mod schema;
mod store;

pub use schema::{
    parse_entries, validate_entries, AddonEntry, FieldShape, FieldSpec, TagPattern, ENTRY_FIELDS,
};
pub use store::EntriesFile;

use crate::config::EntrySource;
use crate::network::HttpClient;
use crate::{AddonHubError, Result};
use tracing::debug;

/// Fetch and validate every entry of one source.
pub async fn load_source(http: &HttpClient, source: &EntrySource) -> Result<Vec<AddonEntry>> {
    debug!("Loading entries from {}", source);
    let content = match source {
        EntrySource::File(path) => tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AddonHubError::io_with_path(e, path))?,
        EntrySource::Url(url) => http.get(url).await?.text().await?,
    };
    parse_entries(&content)
}
