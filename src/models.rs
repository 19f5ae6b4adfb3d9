//! Core data models used throughout the uploader.
//!
//! These types describe a source document as it moves from raw upload bytes
//! to a file in the remote repository.

use serde::{Deserialize, Serialize};

/// The two recognized source document shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// A reader "book source" (`bookSourceName`).
    BookSource,
    /// A reader "subscription source" (`sourceName`).
    SubscriptionSource,
}

/// Discriminator table probed in order during classification.
///
/// The first field present on the inspected object decides the kind.
pub const DISCRIMINATORS: &[(&str, SourceKind)] = &[
    ("bookSourceName", SourceKind::BookSource),
    ("sourceName", SourceKind::SubscriptionSource),
];

impl SourceKind {
    /// JSON field carrying the display name for this kind.
    pub fn name_field(self) -> &'static str {
        match self {
            SourceKind::BookSource => "bookSourceName",
            SourceKind::SubscriptionSource => "sourceName",
        }
    }

    /// Repository folder that files of this kind are published under.
    pub fn folder(self) -> &'static str {
        match self {
            SourceKind::BookSource => "book-sources",
            SourceKind::SubscriptionSource => "subscription-sources",
        }
    }

    /// Stable snake_case label used in logs and CLI output.
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::BookSource => "book_source",
            SourceKind::SubscriptionSource => "subscription_source",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of the normalizer: what will be published and where.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedContent {
    pub kind: SourceKind,
    /// Sanitized, non-empty name used as the file stem.
    pub display_name: String,
    /// Canonical JSON text (always an array with at least one element).
    pub canonical_bytes: Vec<u8>,
}

impl ClassifiedContent {
    /// Repository-relative path: `{folder}/{display_name}.json`.
    pub fn target_path(&self) -> String {
        target_path(self.kind, &self.display_name)
    }
}

/// Build the repository-relative path for a kind and sanitized name.
pub fn target_path(kind: SourceKind, display_name: &str) -> String {
    format!("{}/{}.json", kind.folder(), display_name)
}

/// A file location in the remote repository, plus the revision currently
/// stored there (if any).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFileRef {
    pub repo: String,
    pub branch: String,
    pub path: String,
    /// Blob SHA of the existing file. `None` means the write creates it.
    pub sha: Option<String>,
}

impl RemoteFileRef {
    pub fn is_update(&self) -> bool {
        self.sha.is_some()
    }

    /// Build the create-or-update body for this location.
    pub fn write_request(&self, message: &str, content_b64: String) -> WriteRequest {
        WriteRequest {
            message: message.to_string(),
            content: content_b64,
            branch: self.branch.clone(),
            sha: self.sha.clone(),
        }
    }
}

/// JSON body of the Contents API `PUT` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteRequest {
    pub message: String,
    /// Base64 (standard alphabet, padded) file content.
    pub content: String,
    pub branch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
}

/// Fixed two-field response body of `POST /upload-simple`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Exactly `"ok"` or `"error"`.
    pub message: String,
    /// The published path on success, the error text on failure.
    pub data: String,
}

impl Envelope {
    pub fn ok(path: String) -> Self {
        Self {
            message: "ok".to_string(),
            data: path,
        }
    }

    pub fn error(detail: impl std::fmt::Display) -> Self {
        Self {
            message: "error".to_string(),
            data: format!("upload failed: {}", detail),
        }
    }
}
