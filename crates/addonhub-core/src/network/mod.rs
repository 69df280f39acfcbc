//! Network utilities for talking to GitHub and other HTTP hosts.
//!
//! This module provides:
//! - HTTP client with rate limiting awareness
//! - Per-repository GitHub REST client

mod client;
mod github;

pub use client::{check_status, is_http_like, HttpClient, RateLimitState, RemoteBody};
pub use github::{GitHubRepoClient, RepoIdentity};
