//! Error taxonomy for the upload pipeline.
//!
//! Every failure that can reach an HTTP client is an [`UploadError`]. The
//! variant decides the status code; the `Display` text is the human-readable
//! detail returned to the caller.
//!
//! | Variant | Status | Meaning |
//! |---------|--------|---------|
//! | `InvalidContent` | 400 | The uploaded file is not a recognizable source document |
//! | `InvalidRequest` | 400 | A form field or the repository identifier is missing or malformed |
//! | `PublishFailed` | 400 | The remote store rejected the write |
//! | `Internal` | 500 | Transport failure or anything unanticipated |

use axum::http::StatusCode;
use thiserror::Error;

/// Errors raised while normalizing or publishing an uploaded source file.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The uploaded bytes are not a valid book or subscription source.
    #[error("{0}")]
    InvalidContent(String),

    /// The request itself is incomplete (missing form field, bad repo name).
    #[error("{0}")]
    InvalidRequest(String),

    /// The remote store refused the create-or-update call.
    #[error("{0}")]
    PublishFailed(String),

    /// Network errors and other unexpected faults.
    #[error("internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl UploadError {
    /// HTTP status used when this error is returned from `POST /upload`.
    pub fn status(&self) -> StatusCode {
        match self {
            UploadError::InvalidContent(_)
            | UploadError::InvalidRequest(_)
            | UploadError::PublishFailed(_) => StatusCode::BAD_REQUEST,
            UploadError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Shorthand for a structural problem found while processing the JSON.
    pub(crate) fn content(reason: impl std::fmt::Display) -> Self {
        UploadError::InvalidContent(format!("error processing JSON content: {}", reason))
    }
}

impl From<reqwest::Error> for UploadError {
    fn from(err: reqwest::Error) -> Self {
        UploadError::Internal(err.into())
    }
}
