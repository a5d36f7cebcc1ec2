// Copyright 2026 Benchwatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! GitHub Contents API document store.
//!
//! Documents are files in a repository. Content travels base64-encoded and
//! the blob SHA serves as the version token: an update must name the SHA it
//! replaces and GitHub answers `409 Conflict` when that SHA is stale.
//!
//! Files over 1 MB come back from the contents endpoint without inline
//! content (`encoding: "none"`); those are fetched again through the Git
//! blobs API using the same SHA.
//!
//! # Example
//!
//! ```ignore
//! use benchwatch_storage::github::{GithubContentsStore, GithubStoreConfig};
//!
//! let store = GithubContentsStore::new(GithubStoreConfig::new("acme/dashboard", token))?;
//! let manifest = store.get("data/manifest.json").await?;
//! ```

use crate::store::{DocumentStore, DocumentWrite, Result, StoreError, StoredDocument, VersionToken};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default GitHub REST endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Connection settings for [`GithubContentsStore`].
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubStoreConfig {
    /// REST API base URL (default `https://api.github.com`).
    pub api_url: String,
    /// Repository in `owner/name` form.
    pub repository: String,
    /// Access token with contents write permission.
    pub token: String,
    /// Branch to read and write; the repository default when unset.
    pub branch: Option<String>,
    /// Per-request timeout in seconds (default 30).
    pub timeout_secs: u64,
}

impl Default for GithubStoreConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            repository: String::new(),
            token: String::new(),
            branch: None,
            timeout_secs: 30,
        }
    }
}

impl std::fmt::Debug for GithubStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubStoreConfig")
            .field("api_url", &self.api_url)
            .field("repository", &self.repository)
            .field("token", &"<redacted>")
            .field("branch", &self.branch)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl GithubStoreConfig {
    /// Settings for `repository` with default endpoint and timeout.
    pub fn new(repository: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            token: token.into(),
            ..Self::default()
        }
    }

    /// Contents URL of a file.
    pub fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/contents/{}",
            self.api_url.trim_end_matches('/'),
            self.repository,
            path.trim_start_matches('/')
        )
    }

    /// Git blob URL of a file version.
    pub fn blob_url(&self, sha: &str) -> String {
        format!(
            "{}/repos/{}/git/blobs/{}",
            self.api_url.trim_end_matches('/'),
            self.repository,
            sha
        )
    }
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    sha: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BlobResponse {
    content: String,
    #[serde(default)]
    encoding: Option<String>,
}

/// Where the text of a contents response lives.
#[derive(Debug, PartialEq)]
enum Payload {
    /// Decoded inline content.
    Inline(String),
    /// Too large to inline; fetch the blob.
    Blob,
}

fn contents_payload(body: &ContentsResponse) -> std::result::Result<Payload, String> {
    match body.encoding.as_deref() {
        Some("none") => Ok(Payload::Blob),
        None | Some("base64") => {
            let encoded = body
                .content
                .as_deref()
                .ok_or_else(|| "response has no inline content".to_string())?;
            decode_content(encoded).map(Payload::Inline)
        }
        Some(other) => Err(format!("unsupported encoding {:?}", other)),
    }
}

fn blob_payload(body: &BlobResponse) -> std::result::Result<String, String> {
    match body.encoding.as_deref() {
        None | Some("base64") => decode_content(&body.content),
        Some(other) => Err(format!("unsupported blob encoding {:?}", other)),
    }
}

#[derive(Debug, Serialize)]
struct PutRequest<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

/// Decode the base64 payload of a contents response. GitHub wraps it at 60 columns.
pub fn decode_content(encoded: &str) -> std::result::Result<String, String> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD.decode(compact).map_err(|e| e.to_string())?;
    String::from_utf8(bytes).map_err(|e| e.to_string())
}

/// Encode document text for a contents write.
pub fn encode_content(content: &str) -> String {
    STANDARD.encode(content.as_bytes())
}

/// Map a rejected write status to a store error.
///
/// `409` is a stale SHA. `422` on a create means the file appeared since it
/// was read as absent, which is the same race.
fn classify_put_status(path: &str, status: StatusCode, had_version: bool, body: &str) -> StoreError {
    match status {
        StatusCode::CONFLICT => StoreError::Conflict {
            path: path.to_string(),
        },
        StatusCode::UNPROCESSABLE_ENTITY if !had_version => StoreError::Conflict {
            path: path.to_string(),
        },
        _ => StoreError::Transport {
            path: path.to_string(),
            message: format!("PUT returned {}: {}", status, body),
        },
    }
}

/// [`DocumentStore`] backed by a GitHub repository.
pub struct GithubContentsStore {
    client: reqwest::Client,
    config: GithubStoreConfig,
}

impl GithubContentsStore {
    /// Build a store client.
    pub fn new(config: GithubStoreConfig) -> Result<Self> {
        let transport = |message: String| StoreError::Transport {
            path: config.repository.clone(),
            message,
        };

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github.v3+json"),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("benchwatch/", env!("CARGO_PKG_VERSION"))),
        );
        let mut auth = HeaderValue::from_str(&format!("token {}", config.token))
            .map_err(|e| transport(format!("invalid token: {}", e)))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| transport(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Store settings.
    pub fn config(&self) -> &GithubStoreConfig {
        &self.config
    }

    fn transport(&self, path: &str, err: impl std::fmt::Display) -> StoreError {
        StoreError::Transport {
            path: path.to_string(),
            message: err.to_string(),
        }
    }

    fn invalid(&self, path: &str, message: String) -> StoreError {
        StoreError::InvalidContent {
            path: path.to_string(),
            message,
        }
    }

    async fn fetch_blob(&self, path: &str, sha: &str) -> Result<String> {
        debug!(path, sha, "Content not inlined, fetching blob");
        let response = self
            .client
            .get(self.config.blob_url(sha))
            .send()
            .await
            .map_err(|e| self.transport(path, e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.transport(path, format!("GET blob returned {}: {}", status, body)));
        }

        let body: BlobResponse = response.json().await.map_err(|e| self.transport(path, e))?;
        blob_payload(&body).map_err(|message| self.invalid(path, message))
    }
}

#[async_trait]
impl DocumentStore for GithubContentsStore {
    async fn get(&self, path: &str) -> Result<Option<StoredDocument>> {
        let mut request = self.client.get(self.config.contents_url(path));
        if let Some(branch) = &self.config.branch {
            request = request.query(&[("ref", branch)]);
        }

        let response = request.send().await.map_err(|e| self.transport(path, e))?;
        let status = response.status();
        debug!(path, %status, "GET contents");

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.transport(path, format!("GET returned {}: {}", status, body)));
        }

        let body: ContentsResponse = response.json().await.map_err(|e| self.transport(path, e))?;
        let content = match contents_payload(&body).map_err(|message| self.invalid(path, message))? {
            Payload::Inline(content) => content,
            Payload::Blob => self.fetch_blob(path, &body.sha).await?,
        };

        Ok(Some(StoredDocument {
            content,
            version: VersionToken::new(body.sha),
        }))
    }

    async fn put(&self, path: &str, write: DocumentWrite) -> Result<()> {
        let body = PutRequest {
            message: &write.message,
            content: encode_content(&write.content),
            sha: write.version.as_ref().map(VersionToken::as_str),
            branch: self.config.branch.as_deref(),
        };

        let response = self
            .client
            .put(self.config.contents_url(path))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport(path, e))?;
        let status = response.status();
        debug!(path, %status, "PUT contents");

        if status.is_success() {
            return Ok(());
        }
        let text = response.text().await.unwrap_or_default();
        Err(classify_put_status(path, status, write.version.is_some(), &text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contents_url() {
        let mut config = GithubStoreConfig::new("acme/dashboard", "t");
        assert_eq!(
            config.contents_url("data/manifest.json"),
            "https://api.github.com/repos/acme/dashboard/contents/data/manifest.json"
        );

        config.api_url = "https://ghe.example.com/api/v3/".to_string();
        assert_eq!(
            config.contents_url("/data/x/history.json"),
            "https://ghe.example.com/api/v3/repos/acme/dashboard/contents/data/x/history.json"
        );
    }

    #[test]
    fn test_blob_url() {
        let config = GithubStoreConfig::new("acme/dashboard", "t");
        assert_eq!(
            config.blob_url("3a4b"),
            "https://api.github.com/repos/acme/dashboard/git/blobs/3a4b"
        );
    }

    #[test]
    fn test_large_file_falls_back_to_blob() {
        let large: ContentsResponse = serde_json::from_value(serde_json::json!({
            "sha": "3a4b", "content": "", "encoding": "none", "size": 1_500_000
        }))
        .unwrap();
        assert_eq!(contents_payload(&large), Ok(Payload::Blob));

        let blob: BlobResponse = serde_json::from_value(serde_json::json!({
            "sha": "3a4b", "content": encode_content("{\"commits\": []}"), "encoding": "base64"
        }))
        .unwrap();
        assert_eq!(blob_payload(&blob).unwrap(), "{\"commits\": []}");
    }

    #[test]
    fn test_inline_payload() {
        let inline: ContentsResponse = serde_json::from_value(serde_json::json!({
            "sha": "1", "content": encode_content("{}"), "encoding": "base64"
        }))
        .unwrap();
        assert_eq!(contents_payload(&inline), Ok(Payload::Inline("{}".to_string())));

        let missing: ContentsResponse =
            serde_json::from_value(serde_json::json!({"sha": "1", "encoding": "base64"})).unwrap();
        assert!(contents_payload(&missing).is_err());

        let odd: ContentsResponse =
            serde_json::from_value(serde_json::json!({"sha": "1", "content": "x", "encoding": "utf-16"}))
                .unwrap();
        assert!(contents_payload(&odd).unwrap_err().contains("utf-16"));
    }

    #[test]
    fn test_decode_wrapped_content() {
        let encoded = encode_content("{\"commits\": []}\n");
        let wrapped = format!("{}\n{}\n", &encoded[..8], &encoded[8..]);
        assert_eq!(decode_content(&wrapped).unwrap(), "{\"commits\": []}\n");
        assert!(decode_content("not base64!").is_err());
    }

    #[test]
    fn test_put_status_mapping() {
        assert!(classify_put_status("p", StatusCode::CONFLICT, true, "").is_conflict());
        assert!(classify_put_status("p", StatusCode::UNPROCESSABLE_ENTITY, false, "").is_conflict());
        assert!(!classify_put_status("p", StatusCode::UNPROCESSABLE_ENTITY, true, "").is_conflict());
        assert!(!classify_put_status("p", StatusCode::FORBIDDEN, true, "").is_conflict());
    }

    #[test]
    fn test_put_request_omits_missing_sha() {
        let body = PutRequest {
            message: "m",
            content: encode_content("{}"),
            sha: None,
            branch: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("sha").is_none());
        assert_eq!(json["content"], "e30=");
    }

    #[test]
    fn test_config_debug_redacts_token() {
        let config = GithubStoreConfig::new("acme/dashboard", "secret-token");
        assert!(!format!("{:?}", config).contains("secret-token"));
    }
}
