//! In-process fake of the GitHub REST endpoints the aggregator uses.

#![allow(dead_code)]

use addonhub_core::{AggregatorConfig, EntrySource, Platform, RepositoryAggregator};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Contents of one fake repository. `None` makes the matching endpoint fail.
#[derive(Debug, Clone, Default)]
pub struct FakeRepo {
    pub default_branch: Option<String>,
    /// Tag names, oldest first (the order GitHub returns them).
    pub tags: Option<Vec<String>>,
    pub latest_release: Option<String>,
    /// Release tag -> assets `(id, name, body)`.
    pub releases: HashMap<String, Vec<(u64, String, Vec<u8>)>>,
    /// `(path, ref)` -> file body.
    pub files: HashMap<(String, String), Vec<u8>>,
}

impl FakeRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_branch(mut self, branch: &str) -> Self {
        self.default_branch = Some(branch.to_string());
        self
    }

    pub fn tags(mut self, tags: &[&str]) -> Self {
        self.tags = Some(tags.iter().map(|t| t.to_string()).collect());
        self
    }

    pub fn latest_release(mut self, tag: &str) -> Self {
        self.latest_release = Some(tag.to_string());
        self
    }

    pub fn release_asset(mut self, tag: &str, id: u64, name: &str, body: &[u8]) -> Self {
        self.releases.entry(tag.to_string()).or_default().push((
            id,
            name.to_string(),
            body.to_vec(),
        ));
        self
    }

    pub fn file(mut self, path: &str, git_ref: &str, body: &[u8]) -> Self {
        self.files
            .insert((path.to_string(), git_ref.to_string()), body.to_vec());
        self
    }
}

/// A request the fake server received.
#[derive(Debug, Clone)]
pub struct Call {
    pub label: String,
    pub authorization: Option<String>,
    pub api_version: Option<String>,
}

#[derive(Default)]
struct FakeState {
    repos: Mutex<HashMap<(String, String), FakeRepo>>,
    calls: Mutex<Vec<Call>>,
    entries: Mutex<Option<String>>,
}

impl FakeState {
    fn record(&self, label: String, headers: &HeaderMap) {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        self.calls.lock().unwrap().push(Call {
            label,
            authorization: header("authorization"),
            api_version: header("x-github-api-version"),
        });
    }

    fn repo(&self, owner: &str, repo: &str) -> Option<FakeRepo> {
        self.repos
            .lock()
            .unwrap()
            .get(&(owner.to_string(), repo.to_string()))
            .cloned()
    }
}

pub struct FakeGitHub {
    pub base_url: String,
    state: Arc<FakeState>,
}

impl FakeGitHub {
    pub async fn start() -> Self {
        let state = Arc::new(FakeState::default());
        let app = Router::new()
            .route("/repos/:owner/:repo", get(repo_info))
            .route("/repos/:owner/:repo/git/refs/tags", get(tag_refs))
            .route("/repos/:owner/:repo/releases/latest", get(latest_release))
            .route(
                "/repos/:owner/:repo/releases/tags/:tag",
                get(release_by_tag),
            )
            .route(
                "/repos/:owner/:repo/releases/assets/:id",
                get(release_asset),
            )
            .route("/repos/:owner/:repo/zipball/:git_ref", get(zipball))
            .route("/repos/:owner/:repo/contents/*path", get(contents))
            .route("/external/*path", get(external))
            .route("/entries.json", get(entries))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    pub fn add_repo(&self, owner: &str, repo: &str, contents: FakeRepo) {
        self.state
            .repos
            .lock()
            .unwrap()
            .insert((owner.to_string(), repo.to_string()), contents);
    }

    /// Serve `body` at `/entries.json`.
    pub fn set_entries(&self, body: &str) {
        *self.state.entries.lock().unwrap() = Some(body.to_string());
    }

    pub fn entries_url(&self) -> String {
        format!("{}/entries.json", self.base_url)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.calls.lock().unwrap().clone()
    }

    pub fn count(&self, label_prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.label.starts_with(label_prefix))
            .count()
    }

    pub fn reset_calls(&self) {
        self.state.calls.lock().unwrap().clear();
    }

    /// Aggregator pointed at this server, on `linux-x64`.
    pub fn config(&self) -> AggregatorConfig {
        AggregatorConfig {
            api_base: self.base_url.clone(),
            platform: Some(Platform::new("linux", "x64")),
            ..AggregatorConfig::default()
        }
    }

    /// Aggregator loading entries from `/entries.json`.
    pub async fn aggregator(&self, entries: serde_json::Value) -> RepositoryAggregator {
        self.set_entries(&entries.to_string());
        let config = AggregatorConfig {
            sources: vec![EntrySource::Url(self.entries_url())],
            ..self.config()
        };
        let aggregator = RepositoryAggregator::new(config).unwrap();
        aggregator.update(true).await.unwrap();
        self.reset_calls();
        aggregator
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"message": "Not Found"}))).into_response()
}

async fn repo_info(
    State(state): State<Arc<FakeState>>,
    Path((owner, repo)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    state.record(format!("repo:{}/{}", owner, repo), &headers);
    match state.repo(&owner, &repo).and_then(|r| r.default_branch) {
        Some(branch) => Json(json!({
            "name": repo,
            "full_name": format!("{}/{}", owner, repo),
            "default_branch": branch,
            "private": false
        }))
        .into_response(),
        None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

async fn tag_refs(
    State(state): State<Arc<FakeState>>,
    Path((owner, repo)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    state.record(format!("tags:{}/{}", owner, repo), &headers);
    match state.repo(&owner, &repo).and_then(|r| r.tags) {
        Some(tags) => {
            let refs: Vec<_> = tags
                .iter()
                .map(|tag| {
                    json!({
                        "ref": format!("refs/tags/{}", tag),
                        "object": {"sha": "0000000000000000000000000000000000000000", "type": "commit"}
                    })
                })
                .collect();
            Json(refs).into_response()
        }
        None => not_found(),
    }
}

fn release_json(repo: &FakeRepo, tag: &str) -> serde_json::Value {
    let assets: Vec<_> = repo
        .releases
        .get(tag)
        .map(|assets| {
            assets
                .iter()
                .map(|(id, name, body)| json!({"id": id, "name": name, "size": body.len()}))
                .collect()
        })
        .unwrap_or_default();
    json!({"id": 1, "tag_name": tag, "name": tag, "prerelease": false, "draft": false, "assets": assets})
}

async fn latest_release(
    State(state): State<Arc<FakeState>>,
    Path((owner, repo)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    state.record(format!("latest:{}/{}", owner, repo), &headers);
    match state.repo(&owner, &repo) {
        Some(fake) => match &fake.latest_release {
            Some(tag) => Json(release_json(&fake, tag)).into_response(),
            None => not_found(),
        },
        None => not_found(),
    }
}

async fn release_by_tag(
    State(state): State<Arc<FakeState>>,
    Path((owner, repo, tag)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Response {
    state.record(format!("release:{}", tag), &headers);
    match state.repo(&owner, &repo) {
        Some(fake) if fake.releases.contains_key(&tag) => {
            Json(release_json(&fake, &tag)).into_response()
        }
        _ => not_found(),
    }
}

async fn release_asset(
    State(state): State<Arc<FakeState>>,
    Path((owner, repo, id)): Path<(String, String, u64)>,
    headers: HeaderMap,
) -> Response {
    state.record(format!("asset:{}", id), &headers);
    let body = state.repo(&owner, &repo).and_then(|fake| {
        fake.releases
            .values()
            .flatten()
            .find(|(asset_id, _, _)| *asset_id == id)
            .map(|(_, _, body)| body.clone())
    });
    match body {
        Some(body) => ([("content-type", "application/octet-stream")], body).into_response(),
        None => not_found(),
    }
}

async fn zipball(
    State(state): State<Arc<FakeState>>,
    Path((owner, repo, git_ref)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Response {
    state.record(format!("zipball:{}", git_ref), &headers);
    match state.repo(&owner, &repo) {
        Some(_) => (
            [("content-type", "application/zip")],
            format!("zip:{}", git_ref),
        )
            .into_response(),
        None => not_found(),
    }
}

async fn contents(
    State(state): State<Arc<FakeState>>,
    Path((owner, repo, path)): Path<(String, String, String)>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let path = path.trim_start_matches('/').to_string();
    let git_ref = query.get("ref").cloned().unwrap_or_default();
    state.record(format!("contents:{}@{}", path, git_ref), &headers);
    let body = state
        .repo(&owner, &repo)
        .and_then(|fake| fake.files.get(&(path.clone(), git_ref.clone())).cloned());
    match body {
        Some(body) => ([("content-type", "text/plain")], body).into_response(),
        None => not_found(),
    }
}

async fn external(
    State(state): State<Arc<FakeState>>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> Response {
    let path = path.trim_start_matches('/');
    state.record(format!("external:{}", path), &headers);
    format!("external:{}", path).into_response()
}

async fn entries(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    state.record("entries".to_string(), &headers);
    match state.entries.lock().unwrap().clone() {
        Some(body) => ([("content-type", "application/json")], body).into_response(),
        None => not_found(),
    }
}
