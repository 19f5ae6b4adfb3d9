//! Remote content store.
//!
//! [`ContentStore`] is the capability the publisher needs from the remote
//! repository: look up the current revision of a path, and create or update
//! that path. [`GitHubStore`] implements it on top of the GitHub Contents API:
//!
//! | Call | Request |
//! |------|---------|
//! | existence check | `GET {api_base}/repos/{owner}/{repo}/contents/{path}?ref={branch}` |
//! | create / update | `PUT {api_base}/repos/{owner}/{repo}/contents/{path}` |
//!
//! Both carry `Authorization: token {access_token}`. The `PUT` body is a
//! [`WriteRequest`]; it must include the existing blob `sha` when the file
//! already exists, otherwise GitHub rejects the write as a conflict.

use anyhow::anyhow;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde_json::Value;
use std::time::Duration;

use crate::config::GitHubConfig;
use crate::error::UploadError;
use crate::models::WriteRequest;

/// A repository bound to one branch and one credential.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// `owner/name` identifier of the repository.
    fn repository(&self) -> &str;

    /// Branch that reads and writes target.
    fn branch(&self) -> &str;

    /// Version token of the object at `path`, or `None` if the store does
    /// not report one.
    ///
    /// Any non-success status counts as "does not exist"; 404 is not
    /// distinguished from other refusals.
    async fn existing_version(&self, path: &str) -> Result<Option<String>, UploadError>;

    /// Create or update `path`. Succeeds only on 200 or 201.
    async fn write(&self, path: &str, request: &WriteRequest) -> Result<(), UploadError>;
}

/// Build the shared HTTP client for Contents API calls.
pub fn build_client(config: &GitHubConfig) -> anyhow::Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
    if let Some(secs) = config.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    Ok(builder.build()?)
}

/// Split `owner/name` into its two parts. Returns `None` for anything else.
pub fn split_repo(repo: &str) -> Option<(&str, &str)> {
    let (owner, name) = repo.trim().split_once('/')?;
    if owner.is_empty() || name.is_empty() || name.contains('/') {
        return None;
    }
    Some((owner, name))
}

/// GitHub Contents API store for one repository, branch and token.
#[derive(Clone)]
pub struct GitHubStore {
    client: reqwest::Client,
    api_base: Url,
    repo: String,
    owner: String,
    name: String,
    branch: String,
    token: String,
}

impl std::fmt::Debug for GitHubStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubStore")
            .field("api_base", &self.api_base.as_str())
            .field("repo", &self.repo)
            .field("branch", &self.branch)
            .finish_non_exhaustive()
    }
}

impl GitHubStore {
    /// Bind a client to a repository.
    ///
    /// # Errors
    ///
    /// [`UploadError::InvalidRequest`] if `repo` is not `owner/name`;
    /// [`UploadError::Internal`] if the configured API base is not a URL.
    pub fn new(
        client: reqwest::Client,
        config: &GitHubConfig,
        repo: &str,
        branch: &str,
        token: &str,
    ) -> Result<Self, UploadError> {
        let (owner, name) = split_repo(repo).ok_or_else(|| {
            UploadError::InvalidRequest(format!(
                "repo_name must be in owner/name form, got '{}'",
                repo
            ))
        })?;
        let api_base = Url::parse(&config.api_base)
            .map_err(|e| UploadError::Internal(anyhow!("invalid github.api_base: {}", e)))?;

        Ok(Self {
            client,
            api_base,
            repo: format!("{}/{}", owner, name),
            owner: owner.to_string(),
            name: name.to_string(),
            branch: branch.to_string(),
            token: token.to_string(),
        })
    }

    /// Contents API URL for a repository-relative path, each segment
    /// percent-encoded.
    pub fn contents_url(&self, path: &str) -> Result<Url, UploadError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| UploadError::Internal(anyhow!("github.api_base cannot hold a path")))?
            .pop_if_empty()
            .extend(["repos", self.owner.as_str(), self.name.as_str(), "contents"])
            .extend(path.split('/'));
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", "application/vnd.github.v3+json")
    }
}

#[async_trait]
impl ContentStore for GitHubStore {
    fn repository(&self) -> &str {
        &self.repo
    }

    fn branch(&self) -> &str {
        &self.branch
    }

    async fn existing_version(&self, path: &str) -> Result<Option<String>, UploadError> {
        let url = self.contents_url(path)?;
        let resp = self
            .request(Method::GET, url)
            .query(&[("ref", self.branch.as_str())])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            tracing::debug!(repo = %self.repo, path, %status, "no existing object");
            return Ok(None);
        }

        let body: Value = resp.json().await?;
        match body.get("sha").and_then(Value::as_str) {
            Some(sha) => Ok(Some(sha.to_string())),
            None => Err(UploadError::Internal(anyhow!(
                "existing object at {} reported no sha",
                path
            ))),
        }
    }

    async fn write(&self, path: &str, request: &WriteRequest) -> Result<(), UploadError> {
        let url = self.contents_url(path)?;
        let resp = self.request(Method::PUT, url).json(request).send().await?;

        let status = resp.status();
        if status == StatusCode::OK || status == StatusCode::CREATED {
            return Ok(());
        }

        let body = match resp.bytes().await {
            Ok(body) => body,
            Err(err) => {
                tracing::debug!(repo = %self.repo, path, %status, error = %err, "failed to read rejection body");
                Default::default()
            }
        };
        Err(UploadError::PublishFailed(publish_failure_message(
            status.as_u16(),
            &body,
        )))
    }
}

/// Render a rejected write: the remote `message` when the body is a JSON
/// object, otherwise the status code.
pub fn publish_failure_message(status: u16, body: &[u8]) -> String {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => {
            let message = match map.get("message") {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => "unknown error".to_string(),
            };
            format!("file upload failed: {}", message)
        }
        _ => format!("file upload failed, status code: {}", status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(api_base: &str, repo: &str) -> Result<GitHubStore, UploadError> {
        let config = GitHubConfig {
            api_base: api_base.to_string(),
            ..GitHubConfig::default()
        };
        GitHubStore::new(reqwest::Client::new(), &config, repo, "main", "t0k3n")
    }

    #[test]
    fn test_split_repo() {
        assert_eq!(split_repo("org/repo"), Some(("org", "repo")));
        assert_eq!(split_repo(" org/repo "), Some(("org", "repo")));
        assert_eq!(split_repo("org"), None);
        assert_eq!(split_repo("/repo"), None);
        assert_eq!(split_repo("org/"), None);
        assert_eq!(split_repo("a/b/c"), None);
    }

    #[test]
    fn test_invalid_repo_is_request_error() {
        let err = store("https://api.github.com", "nope").unwrap_err();
        assert!(matches!(err, UploadError::InvalidRequest(_)));
    }

    #[test]
    fn test_contents_url_plain() {
        let s = store("https://api.github.com", "org/repo").unwrap();
        let url = s.contents_url("book-sources/Test.json").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/org/repo/contents/book-sources/Test.json"
        );
    }

    #[test]
    fn test_contents_url_encodes_segments() {
        let s = store("http://127.0.0.1:9000/api/v3/", "org/repo").unwrap();
        let url = s.contents_url("book-sources/My Source #1.json").unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:9000/api/v3/repos/org/repo/contents/book-sources/My%20Source%20%231.json"
        );
    }

    #[test]
    fn test_debug_hides_token() {
        let s = store("https://api.github.com", "org/repo").unwrap();
        assert!(!format!("{:?}", s).contains("t0k3n"));
    }

    #[test]
    fn test_failure_message_uses_remote_message() {
        let msg = publish_failure_message(409, br#"{"message":"sha wasn't supplied"}"#);
        assert_eq!(msg, "file upload failed: sha wasn't supplied");
    }

    #[test]
    fn test_failure_message_without_message_field() {
        let msg = publish_failure_message(422, br#"{"errors":[]}"#);
        assert_eq!(msg, "file upload failed: unknown error");
    }

    #[test]
    fn test_failure_message_falls_back_to_status() {
        assert_eq!(
            publish_failure_message(502, b"<html>Bad Gateway</html>"),
            "file upload failed, status code: 502"
        );
        assert_eq!(
            publish_failure_message(500, b"[1,2]"),
            "file upload failed, status code: 500"
        );
    }

    #[test]
    fn test_failure_message_for_unreadable_body() {
        // An unreadable rejection body is treated as empty.
        assert_eq!(
            publish_failure_message(503, b""),
            "file upload failed, status code: 503"
        );
    }
}
