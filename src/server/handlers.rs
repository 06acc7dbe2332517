// file: src/server/handlers.rs
// description: http handlers mapping api requests onto the sync orchestrator
// reference: https://docs.rs/axum/latest/axum/extract

use crate::error::{Result, SyncError};
use crate::models::{CommitRequest, FileEntry, StatusEntry, SyncRequest};
use crate::server::AppState;
use crate::server::response::{
    CommitResponse, ContentResponse, Success, SyncResponse, UploadResponse,
};
use crate::utils::HealthReport;
use axum::Json;
use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{FromRequest, Multipart, Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::{debug, info};

/// `Json` extractor whose rejections answer with the usual `{error}` body.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(SyncError))]
pub struct JsonBody<T>(pub T);

#[derive(Debug, Deserialize)]
pub struct SwitchBranchBody {
    pub branch: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ContentBody {
    #[serde(default)]
    pub content: String,
}

pub async fn health(State(state): State<AppState>) -> Result<Json<HealthReport>> {
    Ok(Json(state.orchestrator.health().await?))
}

pub async fn sync_repository(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<SyncRequest>,
) -> Result<Json<SyncResponse>> {
    let handle = state.orchestrator.sync(&request).await?;
    info!("Synced {}/{}", handle.identity, handle.name);
    Ok(Json(handle.into()))
}

pub async fn commit(
    State(state): State<AppState>,
    Path(repo): Path<String>,
    JsonBody(request): JsonBody<CommitRequest>,
) -> Result<Json<CommitResponse>> {
    let outcome = state.orchestrator.commit_and_push(&repo, &request).await?;
    Ok(Json(outcome.into()))
}

pub async fn list_branches(
    State(state): State<AppState>,
    Path(repo): Path<String>,
) -> Result<Json<Vec<String>>> {
    Ok(Json(state.orchestrator.branches(&repo).await?))
}

pub async fn repository_status(
    State(state): State<AppState>,
    Path(repo): Path<String>,
) -> Result<Json<Vec<StatusEntry>>> {
    Ok(Json(state.orchestrator.status(&repo).await?))
}

pub async fn switch_branch(
    State(state): State<AppState>,
    Path(repo): Path<String>,
    JsonBody(body): JsonBody<SwitchBranchBody>,
) -> Result<Json<Success>> {
    state.orchestrator.switch_branch(&repo, &body.branch).await?;
    Ok(Success::ok())
}

pub async fn list_files(
    State(state): State<AppState>,
    Path(repo): Path<String>,
) -> Result<Json<Vec<FileEntry>>> {
    Ok(Json(state.orchestrator.list_files(&repo).await?))
}

pub async fn read_file(
    State(state): State<AppState>,
    Path((repo, path)): Path<(String, String)>,
) -> Result<Json<ContentResponse>> {
    let content = state.orchestrator.read_file(&repo, &path).await?;
    Ok(Json(ContentResponse { content }))
}

pub async fn read_image(
    State(state): State<AppState>,
    Path((repo, path)): Path<(String, String)>,
) -> Result<Response> {
    let (bytes, content_type) = state.orchestrator.read_image(&repo, &path).await?;
    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}

pub async fn write_file(
    State(state): State<AppState>,
    Path((repo, path)): Path<(String, String)>,
    JsonBody(body): JsonBody<ContentBody>,
) -> Result<Json<Success>> {
    state
        .orchestrator
        .write_file(&repo, &path, &body.content)
        .await?;
    Ok(Success::ok())
}

/// The body is optional; an empty request creates an empty file.
pub async fn create_file(
    State(state): State<AppState>,
    Path((repo, path)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<Success>> {
    let body = if body.is_empty() {
        ContentBody::default()
    } else {
        serde_json::from_slice::<ContentBody>(&body)
            .map_err(|e| SyncError::InvalidArgument(format!("Invalid request body: {}", e)))?
    };

    state
        .orchestrator
        .create_file(&repo, &path, &body.content)
        .await?;
    Ok(Success::ok())
}

pub async fn delete_file(
    State(state): State<AppState>,
    Path((repo, path)): Path<(String, String)>,
) -> Result<Json<Success>> {
    state.orchestrator.delete_file(&repo, &path).await?;
    Ok(Success::ok())
}

pub async fn create_folder(
    State(state): State<AppState>,
    Path((repo, path)): Path<(String, String)>,
) -> Result<Json<Success>> {
    state.orchestrator.create_folder(&repo, &path).await?;
    Ok(Success::ok())
}

pub async fn delete_folder(
    State(state): State<AppState>,
    Path((repo, path)): Path<(String, String)>,
) -> Result<Json<Success>> {
    state.orchestrator.delete_folder(&repo, &path).await?;
    Ok(Success::ok())
}

pub async fn upload_to_root(
    State(state): State<AppState>,
    Path(repo): Path<String>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>> {
    receive_upload(&state, &repo, "", multipart?).await
}

pub async fn upload_file(
    State(state): State<AppState>,
    Path((repo, path)): Path<(String, String)>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>> {
    receive_upload(&state, &repo, &path, multipart?).await
}

/// Stores the first multipart field named `file`; other fields are ignored.
async fn receive_upload(
    state: &AppState,
    repo: &str,
    rel_dir: &str,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| SyncError::InvalidArgument(format!("Malformed upload: {}", e)))?
    {
        if field.name() != Some("file") {
            debug!("Ignoring multipart field {:?}", field.name());
            continue;
        }

        let original_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| SyncError::InvalidArgument("Upload has no file name".to_string()))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| SyncError::InvalidArgument(format!("Malformed upload: {}", e)))?;

        let filename = state
            .orchestrator
            .store_upload(repo, rel_dir, &original_name, bytes.to_vec())
            .await?;

        return Ok(Json(UploadResponse {
            success: true,
            filename,
        }));
    }

    Err(SyncError::InvalidArgument("No file uploaded".to_string()))
}
