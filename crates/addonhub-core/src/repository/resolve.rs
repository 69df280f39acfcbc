//! Ref resolution: turn an entry's version rules into a fetchable branch or tag.

use super::{RefKey, RepositoryAggregator};
use crate::entries::{AddonEntry, TagPattern};
use crate::network::GitHubRepoClient;
use crate::version::versions_match;
use crate::{AddonHubError, Result};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, warn};

impl RepositoryAggregator {
    /// The ref assets of `entry` are served from. Never fails.
    ///
    /// An explicit ref is returned as-is. Otherwise the result of the fallback
    /// chain is cached per repository identity and tag pattern:
    /// - with a pattern: first matching tag (newest first), latest release tag
    /// - without: latest release tag, newest tag
    ///
    /// then the repository's default branch, then the configured default branch.
    pub async fn resolve_ref(&self, entry: &AddonEntry) -> String {
        if let Some(explicit) = entry.explicit_ref() {
            return explicit.to_string();
        }

        let client = self.client_for(entry);
        let key: RefKey = (
            client.identity().clone(),
            entry.tag_pattern.as_ref().map(|p| p.as_str().to_string()),
        );
        let resolved = self
            .ref_cache
            .get(key, || async move {
                Ok::<_, Infallible>(self.fallback_ref(&client, entry.tag_pattern.as_ref()).await)
            })
            .await;
        match resolved {
            Ok(git_ref) => git_ref,
            Err(never) => match never {},
        }
    }

    async fn fallback_ref(
        &self,
        client: &GitHubRepoClient,
        pattern: Option<&TagPattern>,
    ) -> String {
        let base_url = &client.identity().base_url;

        let found = match pattern {
            Some(pattern) => match self.first_tag(client, |tag| pattern.is_match(tag)).await {
                Some(tag) => Some(tag),
                None => self.latest_release_tag(client).await,
            },
            None => match self.latest_release_tag(client).await {
                Some(tag) => Some(tag),
                None => self.first_tag(client, |_| true).await,
            },
        };
        if let Some(tag) = found {
            debug!("Resolved {} to tag {}", base_url, tag);
            return tag;
        }

        match client.get_repository_info().await {
            Ok(info) => {
                debug!(
                    "Resolved {} to default branch {}",
                    base_url, info.default_branch
                );
                info.default_branch
            }
            Err(e) => {
                warn!(
                    "Failed to get repository info for {}, using {}: {}",
                    base_url, self.config.default_branch, e
                );
                self.config.default_branch.clone()
            }
        }
    }

    async fn latest_release_tag(&self, client: &GitHubRepoClient) -> Option<String> {
        match client.get_latest_release().await {
            Ok(release) => Some(release.tag_name),
            Err(e) => {
                warn!(
                    "No latest release for {}: {}",
                    client.identity().base_url,
                    e
                );
                None
            }
        }
    }

    /// First tag, newest first, accepted by `predicate`. Tag list failures yield `None`.
    async fn first_tag<P>(&self, client: &GitHubRepoClient, predicate: P) -> Option<String>
    where
        P: Fn(&str) -> bool,
    {
        match self.tags(client).await {
            Ok(tags) => tags.iter().find(|tag| predicate(tag)).cloned(),
            Err(e) => {
                warn!(
                    "Failed to list tags for {}: {}",
                    client.identity().base_url,
                    e
                );
                None
            }
        }
    }

    /// Tag names, newest first, through the tag cache.
    pub async fn tags(&self, client: &GitHubRepoClient) -> Result<Arc<Vec<String>>> {
        self.tag_cache
            .get(client.identity().clone(), || async move {
                let refs = client.get_tag_refs().await?;
                let tags: Vec<String> = refs
                    .iter()
                    .rev()
                    .map(|git_ref| git_ref.tag_name().to_string())
                    .collect();
                Ok::<_, AddonHubError>(Arc::new(tags))
            })
            .await
    }

    /// Newest tag naming `version`.
    ///
    /// With a tag pattern, only matching tags are considered and their
    /// captured version is compared; without one the raw tag is. Versions
    /// match by string, as equal dotted releases (`v1.2` and `1.2.0`), or
    /// as equal under the tilde ordering.
    pub async fn resolve_version_tag(&self, entry: &AddonEntry, version: &str) -> Option<String> {
        let client = self.client_for(entry);
        let pattern = entry.tag_pattern.as_ref();
        let tag = self
            .first_tag(&client, |tag| {
                let candidate = match pattern {
                    Some(pattern) => match pattern.captured_version(tag) {
                        Some(captured) => captured,
                        None => return false,
                    },
                    None => tag,
                };
                versions_match(candidate, version)
            })
            .await;
        match &tag {
            Some(tag) => debug!("Version {} of {} is tag {}", version, entry.id, tag),
            None => debug!("No tag of {} matches version {}", entry.id, version),
        }
        tag
    }
}
