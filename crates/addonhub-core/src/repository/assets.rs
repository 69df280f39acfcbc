//! Asset resolution: map `/<addon id>/<asset name>` to a remote body.

use super::template::{render, TemplateVars};
use super::RepositoryAggregator;
use crate::config::ManifestConfig;
use crate::entries::AddonEntry;
use crate::network::{is_http_like, GitHubRepoClient, RemoteBody};
use crate::{AddonHubError, Result};
use tracing::debug;

/// Split `<id>-<version>.zip` into the logical `zip` asset and its version.
fn split_versioned_zip<'a>(addon_id: &str, asset_name: &'a str) -> Option<&'a str> {
    asset_name
        .strip_prefix(addon_id)?
        .strip_prefix(ManifestConfig::VERSION_SEPARATOR)?
        .strip_suffix(ManifestConfig::ZIP_EXTENSION)
}

impl RepositoryAggregator {
    /// Resolve and fetch `asset_name` of the addon `addon_id`.
    pub async fn resolve_asset(&self, addon_id: &str, asset_name: &str) -> Result<RemoteBody> {
        let entry = self
            .entry(addon_id)
            .ok_or_else(|| AddonHubError::AddonNotFound {
                id: addon_id.to_string(),
            })?;
        self.resolve_entry_asset(&entry, asset_name).await
    }

    pub(crate) async fn resolve_entry_asset(
        &self,
        entry: &AddonEntry,
        asset_name: &str,
    ) -> Result<RemoteBody> {
        let git_ref = self.resolve_ref(entry).await;
        let client = self.client_for(entry);

        let version = split_versioned_zip(&entry.id, asset_name);
        let logical_name = if version.is_some() {
            ManifestConfig::ZIP_ASSET
        } else {
            asset_name
        };

        let vars = TemplateVars {
            id: &entry.id,
            owner: &entry.owner,
            repository: entry.repository(),
            git_ref: &git_ref,
            system: &self.platform.system,
            arch: &self.platform.arch,
            version,
        };

        if let Some(template) = entry.asset_overrides.get(logical_name) {
            let path = render(template, &vars)?;
            debug!("Asset {}/{} overridden to {}", entry.id, asset_name, path);
            return self
                .fetch_override(&client, template, &path, &git_ref)
                .await;
        }

        if logical_name == ManifestConfig::ZIP_ASSET {
            let archive_ref = match version {
                Some(version) => self
                    .resolve_version_tag(entry, version)
                    .await
                    .unwrap_or(git_ref),
                None => git_ref,
            };
            debug!(
                "Asset {}/{} is the archive at {}",
                entry.id, asset_name, archive_ref
            );
            return client.get_archive(&archive_ref).await;
        }

        let prefix = render(&entry.asset_path_prefix, &vars)?;
        let path = format!("{}{}", prefix, logical_name);
        debug!(
            "Asset {}/{} is {} at {}",
            entry.id, asset_name, path, git_ref
        );
        client.get_file_contents(&path, &git_ref).await
    }

    async fn fetch_override(
        &self,
        client: &GitHubRepoClient,
        template: &str,
        path: &str,
        git_ref: &str,
    ) -> Result<RemoteBody> {
        if let Some(release_path) = path.strip_prefix(ManifestConfig::RELEASE_ASSET_PREFIX) {
            let (tag, file_name) = release_path
                .rsplit_once('/')
                .filter(|(tag, file_name)| !tag.is_empty() && !file_name.is_empty())
                .ok_or_else(|| AddonHubError::InvalidAssetTemplate {
                    template: template.to_string(),
                    message: format!(
                        "expected {}<release tag>/<file name>, got {:?}",
                        ManifestConfig::RELEASE_ASSET_PREFIX,
                        path
                    ),
                })?;

            let release = client.get_release_by_tag(tag).await?;
            let asset =
                release
                    .asset(file_name)
                    .ok_or_else(|| AddonHubError::ReleaseAssetNotFound {
                        release: tag.to_string(),
                        asset: file_name.to_string(),
                    })?;
            return client.get_release_asset(asset.id).await;
        }

        if is_http_like(path) {
            return Ok(RemoteBody::new(self.http.get(path).await?));
        }

        client.get_file_contents(path, git_ref).await
    }
}
