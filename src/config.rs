//! TOML configuration.
//!
//! Every section is optional; a missing file or section falls back to the
//! built-in defaults, so `srcup serve` works without any config at all.
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:8000"
//! max_upload_bytes = 10485760
//!
//! [github]
//! api_base = "https://api.github.com"
//! user_agent = "srcup"
//! # timeout_secs = 30
//!
//! [defaults]
//! repo_name = "NineDrm/sourcezip"
//! branch = "main"
//! commit_message = "upload source file"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub defaults: UploadDefaults,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}
fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

/// Remote Contents API settings.
#[derive(Debug, Deserialize, Clone)]
pub struct GitHubConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Per-request timeout. Unset means the HTTP client default.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            user_agent: default_user_agent(),
            timeout_secs: None,
        }
    }
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}
fn default_user_agent() -> String {
    "srcup".to_string()
}

/// Fallback coordinates for `POST /upload-simple` and `srcup upload`.
#[derive(Debug, Deserialize, Clone)]
pub struct UploadDefaults {
    #[serde(default = "default_repo_name")]
    pub repo_name: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default = "default_commit_message")]
    pub commit_message: String,
}

impl Default for UploadDefaults {
    fn default() -> Self {
        Self {
            repo_name: default_repo_name(),
            branch: default_branch(),
            commit_message: default_commit_message(),
        }
    }
}

fn default_repo_name() -> String {
    "NineDrm/sourcezip".to_string()
}
fn default_branch() -> String {
    "main".to_string()
}
fn default_commit_message() -> String {
    "upload source file".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;

    Ok(config)
}

/// Like [`load_config`], but a missing file yields [`Config::default`].
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Ok(Config::default())
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.server.bind.trim().is_empty() {
            anyhow::bail!("server.bind must not be empty");
        }
        if self.server.max_upload_bytes == 0 {
            anyhow::bail!("server.max_upload_bytes must be > 0");
        }

        let api_base = reqwest::Url::parse(&self.github.api_base)
            .with_context(|| format!("github.api_base is not a URL: {}", self.github.api_base))?;
        if !matches!(api_base.scheme(), "http" | "https") {
            anyhow::bail!(
                "github.api_base must be an http(s) URL, got scheme '{}'",
                api_base.scheme()
            );
        }
        if self.github.timeout_secs == Some(0) {
            anyhow::bail!("github.timeout_secs must be > 0 when set");
        }

        if crate::store::split_repo(&self.defaults.repo_name).is_none() {
            anyhow::bail!(
                "defaults.repo_name must be in owner/name form, got '{}'",
                self.defaults.repo_name
            );
        }
        if self.defaults.branch.trim().is_empty() {
            anyhow::bail!("defaults.branch must not be empty");
        }

        Ok(())
    }
}
