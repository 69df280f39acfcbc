//! GitHub REST client scoped to one repository.
//!
//! Every call is a single anonymous-or-bearer GET. Nothing is cached here;
//! the aggregator caches resolved refs and tag lists keyed by [`RepoIdentity`].

use crate::config::NetworkConfig;
use crate::models::{GitHubRelease, GitRef, RepositoryInfo};
use crate::network::client::{HttpClient, RemoteBody};
use crate::{AddonHubError, Result};
use reqwest::Response;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

/// Configuration a repository client is equal by.
///
/// `base_url` already includes `/repos/{owner}/{repository}`, so the triple
/// `(base_url, api_version, token)` identifies one repository as seen with one
/// credential.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct RepoIdentity {
    pub base_url: String,
    pub api_version: String,
    pub token: Option<String>,
}

impl RepoIdentity {
    pub fn new(
        api_base: &str,
        owner: &str,
        repository: &str,
        api_version: &str,
        token: Option<String>,
    ) -> Self {
        Self {
            base_url: format!(
                "{}/repos/{}/{}",
                api_base.trim_end_matches('/'),
                owner,
                repository
            ),
            api_version: api_version.to_string(),
            token,
        }
    }
}

impl std::fmt::Debug for RepoIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepoIdentity")
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Client for one `(owner, repository, token)`.
#[derive(Clone)]
pub struct GitHubRepoClient {
    http: Arc<HttpClient>,
    identity: RepoIdentity,
}

impl GitHubRepoClient {
    pub fn new(http: Arc<HttpClient>, identity: RepoIdentity) -> Self {
        Self { http, identity }
    }

    pub fn identity(&self) -> &RepoIdentity {
        &self.identity
    }

    /// Repository metadata, including its default branch.
    pub async fn get_repository_info(&self) -> Result<RepositoryInfo> {
        self.get_json("").await
    }

    /// Tag refs in the order the API returns them (oldest first).
    pub async fn get_tag_refs(&self) -> Result<Vec<GitRef>> {
        self.get_json("/git/refs/tags").await
    }

    /// Release by numeric id or by the literal `latest`.
    pub async fn get_release(&self, identifier: &str) -> Result<GitHubRelease> {
        self.get_json(&format!("/releases/{}", urlencoding::encode(identifier)))
            .await
    }

    pub async fn get_latest_release(&self) -> Result<GitHubRelease> {
        self.get_release("latest").await
    }

    pub async fn get_release_by_tag(&self, tag: &str) -> Result<GitHubRelease> {
        self.get_json(&format!("/releases/tags/{}", encode_path(tag)))
            .await
    }

    /// Binary body of a release asset.
    pub async fn get_release_asset(&self, asset_id: u64) -> Result<RemoteBody> {
        let response = self
            .get(
                &format!("/releases/assets/{}", asset_id),
                NetworkConfig::OCTET_STREAM_ACCEPT,
                &[],
            )
            .await?;
        Ok(RemoteBody::new(response))
    }

    /// Zip archive of the whole tree at `git_ref`.
    pub async fn get_archive(&self, git_ref: &str) -> Result<RemoteBody> {
        let response = self
            .get(
                &format!("/zipball/{}", encode_path(git_ref)),
                NetworkConfig::GITHUB_JSON_ACCEPT,
                &[],
            )
            .await?;
        Ok(RemoteBody::new(response))
    }

    /// Raw contents of one file at `git_ref`.
    pub async fn get_file_contents(&self, path: &str, git_ref: &str) -> Result<RemoteBody> {
        let response = self
            .get(
                &format!("/contents/{}", encode_path(path.trim_start_matches('/'))),
                NetworkConfig::GITHUB_RAW_ACCEPT,
                &[("ref", git_ref)],
            )
            .await?;
        Ok(RemoteBody::new(response))
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let response = self
            .get(endpoint, NetworkConfig::GITHUB_JSON_ACCEPT, &[])
            .await?;
        let url = response.url().to_string();
        response.json::<T>().await.map_err(|e| AddonHubError::Json {
            message: format!("Failed to parse response from {}: {}", url, e),
            source: None,
        })
    }

    async fn get(&self, endpoint: &str, accept: &str, query: &[(&str, &str)]) -> Result<Response> {
        let url = format!("{}{}", self.identity.base_url, endpoint);
        let mut headers = vec![
            ("Accept", accept.to_string()),
            ("X-GitHub-Api-Version", self.identity.api_version.clone()),
        ];
        if let Some(token) = &self.identity.token {
            headers.push(("Authorization", format!("Bearer {}", token)));
        }
        debug!("GitHub request {}", url);
        self.http.get_with_headers(&url, &headers, query).await
    }
}

/// Percent-encode each `/`-separated segment of a ref, tag or file path.
///
/// Git allows `#`, `%` and `?` in ref names; unencoded they would end the URL path.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("/")
}

impl PartialEq for GitHubRepoClient {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
    }
}

impl Eq for GitHubRepoClient {}

impl std::fmt::Debug for GitHubRepoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubRepoClient")
            .field("identity", &self.identity)
            .finish()
    }
}
