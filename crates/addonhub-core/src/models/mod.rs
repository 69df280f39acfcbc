//! Data models shared across the engine.

pub mod github;

pub use github::{GitHubAsset, GitHubRelease, GitObject, GitRef, RepositoryInfo};
