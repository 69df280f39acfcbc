//! GitHub REST API response types.

use serde::{Deserialize, Serialize};

/// Repository metadata from `GET /repos/{owner}/{repo}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    pub default_branch: String,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub html_url: Option<String>,
}

/// Object a git ref points at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitObject {
    pub sha: String,
    #[serde(rename = "type")]
    pub object_type: String,
}

/// Entry of `GET /repos/{owner}/{repo}/git/refs/tags`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitRef {
    #[serde(rename = "ref")]
    pub ref_name: String,
    #[serde(default)]
    pub object: Option<GitObject>,
}

impl GitRef {
    pub const TAG_PREFIX: &'static str = "refs/tags/";

    /// Tag name without the `refs/tags/` prefix.
    pub fn tag_name(&self) -> &str {
        self.ref_name
            .strip_prefix(Self::TAG_PREFIX)
            .unwrap_or(&self.ref_name)
    }
}

/// GitHub release asset information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubAsset {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(rename = "browser_download_url", default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
}

/// GitHub release information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubRelease {
    #[serde(default)]
    pub id: u64,
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub assets: Vec<GitHubAsset>,
}

impl GitHubRelease {
    /// Find an asset by exact file name.
    pub fn asset(&self, name: &str) -> Option<&GitHubAsset> {
        self.assets.iter().find(|asset| asset.name == name)
    }
}
