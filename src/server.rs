//! HTTP server.
//!
//! Accepts source files as `multipart/form-data`, normalizes them and
//! publishes them to a GitHub repository.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Service info and usage |
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/upload` | Upload with explicit repository coordinates |
//! | `POST` | `/upload-simple` | Upload with defaulted coordinates, reader-app response format |
//!
//! # Form fields
//!
//! | Field | `/upload` | `/upload-simple` |
//! |-------|-----------|------------------|
//! | `file` | required | required |
//! | `access_token` | required | required |
//! | `repo_name` | required | defaults to `[defaults].repo_name` |
//! | `branch` | required | defaults to `[defaults].branch` |
//! | `commit_message` | required | defaults to `[defaults].commit_message` |
//!
//! # Error Contract
//!
//! `POST /upload` answers `200` with the repository path as a JSON string
//! (`"book-sources/Foo.json"`). Failures are `400` (bad content, bad form,
//! rejected write) or `500` (transport or unexpected fault) with
//!
//! ```json
//! { "detail": "uploaded file is not valid JSON" }
//! ```
//!
//! `POST /upload-simple` always answers `200`; clients must inspect
//! `message`:
//!
//! ```json
//! { "message": "ok", "data": "book-sources/Foo.json" }
//! { "message": "error", "data": "upload failed: uploaded file is not valid JSON" }
//! ```
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser-based reader
//! apps can upload directly.

use anyhow::Context;
use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::{Config, UploadDefaults};
use crate::error::UploadError;
use crate::models::Envelope;
use crate::normalize::normalize;
use crate::publish::publish;
use crate::store::{build_client, GitHubStore};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
///
/// Nothing in here changes after start-up.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    /// One connection pool for all Contents API calls.
    client: reqwest::Client,
}

/// Starts the HTTP server on `[server].bind`.
///
/// Runs until the process is terminated. Returns an error if binding fails.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = router(config.clone())?;

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    tracing::info!("upload server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the application router without binding a socket.
pub fn router(config: Config) -> anyhow::Result<Router> {
    let client = build_client(&config.github)?;
    let body_limit = config.server.max_upload_bytes;

    let state = AppState {
        config: Arc::new(config),
        client,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Ok(Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/upload", post(handle_upload))
        .route("/upload-simple", post(handle_upload_simple))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state))
}

// ============ Error response ============

/// JSON error body for `POST /upload`.
#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "upload failed");
        } else {
            tracing::warn!(error = %self, "upload rejected");
        }
        let body = ErrorBody {
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

// ============ Form parsing ============

/// Raw multipart fields, before required/default rules are applied.
#[derive(Default)]
struct UploadForm {
    repo_name: Option<String>,
    branch: Option<String>,
    commit_message: Option<String>,
    access_token: Option<String>,
    file: Option<Vec<u8>>,
}

/// A complete upload request. Not `Debug`: it holds the access token.
struct UploadRequest {
    repo_name: String,
    branch: String,
    commit_message: String,
    access_token: String,
    file: Vec<u8>,
}

fn multipart_error(err: impl std::fmt::Display) -> UploadError {
    UploadError::InvalidRequest(format!("invalid multipart data: {}", err))
}

/// Blank text fields count as absent.
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn required(value: Option<String>, field: &str) -> Result<String, UploadError> {
    present(value).ok_or_else(|| UploadError::InvalidRequest(format!("missing form field: {}", field)))
}

impl UploadForm {
    async fn read(multipart: Result<Multipart, MultipartRejection>) -> Result<Self, UploadError> {
        let mut multipart = multipart.map_err(multipart_error)?;
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "file" => form.file = Some(field.bytes().await.map_err(multipart_error)?.to_vec()),
                "repo_name" => form.repo_name = Some(field.text().await.map_err(multipart_error)?),
                "branch" => form.branch = Some(field.text().await.map_err(multipart_error)?),
                "commit_message" => {
                    form.commit_message = Some(field.text().await.map_err(multipart_error)?)
                }
                "access_token" => {
                    form.access_token = Some(field.text().await.map_err(multipart_error)?)
                }
                _ => tracing::debug!(field = %name, "ignoring unknown form field"),
            }
        }

        Ok(form)
    }

    /// Every field must be supplied (`POST /upload`).
    fn into_strict(self) -> Result<UploadRequest, UploadError> {
        Ok(UploadRequest {
            repo_name: required(self.repo_name, "repo_name")?,
            branch: required(self.branch, "branch")?,
            commit_message: required(self.commit_message, "commit_message")?,
            access_token: required(self.access_token, "access_token")?,
            file: self
                .file
                .ok_or_else(|| UploadError::InvalidRequest("missing form field: file".to_string()))?,
        })
    }

    /// Repository coordinates fall back to configured defaults (`POST /upload-simple`).
    fn into_defaulted(self, defaults: &UploadDefaults) -> Result<UploadRequest, UploadError> {
        Ok(UploadRequest {
            repo_name: present(self.repo_name).unwrap_or_else(|| defaults.repo_name.clone()),
            branch: present(self.branch).unwrap_or_else(|| defaults.branch.clone()),
            commit_message: present(self.commit_message)
                .unwrap_or_else(|| defaults.commit_message.clone()),
            access_token: required(self.access_token, "access_token")?,
            file: self
                .file
                .ok_or_else(|| UploadError::InvalidRequest("missing form field: file".to_string()))?,
        })
    }
}

impl AppState {
    /// Normalize, then publish. Content is validated before any remote call.
    async fn upload(&self, req: UploadRequest) -> Result<String, UploadError> {
        tracing::debug!(
            repo = %req.repo_name,
            branch = %req.branch,
            bytes = req.file.len(),
            "upload received"
        );

        let content = normalize(&req.file)?;
        let store = GitHubStore::new(
            self.client.clone(),
            &self.config.github,
            &req.repo_name,
            &req.branch,
            &req.access_token,
        )?;
        publish(&store, &content, &req.commit_message).await
    }
}

// ============ GET / ============

/// Handler for `GET /`. Static service description.
async fn handle_root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "source upload service is running",
        "version": env!("CARGO_PKG_VERSION"),
        "usage": {
            "upload": "POST /upload",
            "simple_upload": "POST /upload-simple",
            "simple_response": "{\"message\": \"ok\" | \"error\", \"data\": <path> | <error>}",
        },
    }))
}

// ============ GET /health ============

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    /// Always `"ok"` when the server is running.
    status: String,
    /// The crate version from `Cargo.toml`.
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /upload ============

/// Handler for `POST /upload`.
///
/// Returns the published path as a JSON string, or an [`UploadError`]
/// rendered as `{detail}` with status 400/500.
#[tracing::instrument(name = "upload", skip_all)]
async fn handle_upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<String>, UploadError> {
    let req = UploadForm::read(multipart).await?.into_strict()?;
    let path = state.upload(req).await?;
    Ok(Json(path))
}

// ============ POST /upload-simple ============

/// Handler for `POST /upload-simple`.
///
/// Never fails at the HTTP level: every outcome is rendered into an
/// [`Envelope`] with status 200.
#[tracing::instrument(name = "upload_simple", skip_all)]
async fn handle_upload_simple(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Json<Envelope> {
    let result: Result<String, UploadError> = async {
        let req = UploadForm::read(multipart)
            .await?
            .into_defaulted(&state.config.defaults)?;
        state.upload(req).await
    }
    .await;

    match result {
        Ok(path) => Json(Envelope::ok(path)),
        Err(err) => {
            tracing::warn!(error = %err, "simple upload failed");
            Json(Envelope::error(err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> UploadForm {
        UploadForm {
            repo_name: Some("org/repo".into()),
            branch: Some("dev".into()),
            commit_message: Some("msg".into()),
            access_token: Some("tok".into()),
            file: Some(b"{}".to_vec()),
        }
    }

    #[test]
    fn test_strict_form_requires_every_field() {
        let mut f = form();
        f.branch = None;
        match f.into_strict() {
            Err(UploadError::InvalidRequest(msg)) => assert_eq!(msg, "missing form field: branch"),
            _ => panic!("expected missing branch"),
        }

        let mut f = form();
        f.file = None;
        assert!(matches!(f.into_strict(), Err(UploadError::InvalidRequest(_))));
    }

    #[test]
    fn test_blank_field_counts_as_missing() {
        let mut f = form();
        f.access_token = Some("   ".into());
        assert!(f.into_strict().is_err());
    }

    #[test]
    fn test_defaulted_form_fills_coordinates() {
        let defaults = UploadDefaults::default();
        let f = UploadForm {
            access_token: Some("tok".into()),
            file: Some(b"{}".to_vec()),
            ..UploadForm::default()
        };
        let req = f.into_defaulted(&defaults).unwrap();
        assert_eq!(req.repo_name, "NineDrm/sourcezip");
        assert_eq!(req.branch, "main");
        assert_eq!(req.commit_message, "upload source file");
    }

    #[test]
    fn test_defaulted_form_keeps_supplied_values() {
        let req = form().into_defaulted(&UploadDefaults::default()).unwrap();
        assert_eq!(req.repo_name, "org/repo");
        assert_eq!(req.branch, "dev");
    }

    #[test]
    fn test_defaulted_form_still_requires_token() {
        let mut f = form();
        f.access_token = None;
        assert!(f.into_defaulted(&UploadDefaults::default()).is_err());
    }
}
