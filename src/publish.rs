//! Remote publisher.
//!
//! Writes normalized content to `{folder}/{display_name}.json` in the
//! store's repository. The sequence is read-then-write and is not atomic:
//! if two uploads race on the same path, one of them gets a conflict back
//! from the remote store, which surfaces as [`UploadError::PublishFailed`].

use base64::Engine;

use crate::error::UploadError;
use crate::models::{ClassifiedContent, RemoteFileRef};
use crate::normalize::normalize;
use crate::store::ContentStore;

/// Publish already-normalized content and return its repository path.
pub async fn publish(
    store: &dyn ContentStore,
    content: &ClassifiedContent,
    commit_message: &str,
) -> Result<String, UploadError> {
    let path = content.target_path();
    let sha = store.existing_version(&path).await?;

    let file = RemoteFileRef {
        repo: store.repository().to_string(),
        branch: store.branch().to_string(),
        path,
        sha,
    };

    let encoded = base64::engine::general_purpose::STANDARD.encode(&content.canonical_bytes);
    let request = file.write_request(commit_message, encoded);
    store.write(&file.path, &request).await?;

    tracing::info!(
        repo = %file.repo,
        branch = %file.branch,
        path = %file.path,
        kind = %content.kind,
        update = file.is_update(),
        "published source file"
    );

    Ok(file.path)
}

/// Normalize `raw` and publish it. Invalid content never reaches the store.
pub async fn upload(
    store: &dyn ContentStore,
    raw: &[u8],
    commit_message: &str,
) -> Result<String, UploadError> {
    let content = normalize(raw)?;
    publish(store, &content, commit_message).await
}
