// file: src/server/response.rs
// description: json response bodies and error to status mapping
// reference: https://docs.rs/axum/latest/axum/response/trait.IntoResponse.html

use crate::error::SyncError;
use crate::models::RepositoryHandle;
use crate::workflow::CommitOutcome;
use axum::Json;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, warn};

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct Success {
    pub success: bool,
}

impl Success {
    pub fn ok() -> Json<Self> {
        Json(Self { success: true })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub success: bool,
    pub repo_path: String,
    pub identity: String,
    pub synced_at: DateTime<Utc>,
}

impl From<RepositoryHandle> for SyncResponse {
    fn from(handle: RepositoryHandle) -> Self {
        Self {
            success: true,
            repo_path: handle.name,
            identity: handle.identity,
            synced_at: handle.synced_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ContentResponse {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub filename: String,
}

#[derive(Debug, Serialize)]
pub struct CommitResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    #[serde(flatten)]
    pub outcome: Option<CommitOutcome>,
}

impl From<CommitOutcome> for CommitResponse {
    fn from(outcome: CommitOutcome) -> Self {
        match outcome {
            CommitOutcome::NoChanges => Self {
                success: true,
                message: Some("No changes to commit"),
                outcome: None,
            },
            pushed => Self {
                success: true,
                message: None,
                outcome: Some(pushed),
            },
        }
    }
}

impl SyncError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            SyncError::AuthRequired
            | SyncError::AlreadyExists(_)
            | SyncError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            SyncError::NotFound(_) => StatusCode::NOT_FOUND,
            SyncError::RebaseConflict { .. } => StatusCode::CONFLICT,
            SyncError::Vcs(_)
            | SyncError::FileOperation { .. }
            | SyncError::Io(_)
            | SyncError::Config(_)
            | SyncError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for SyncError {
    fn from(rejection: JsonRejection) -> Self {
        SyncError::InvalidArgument(format!("Malformed request body: {}", rejection.body_text()))
    }
}

impl From<MultipartRejection> for SyncError {
    fn from(rejection: MultipartRejection) -> Self {
        SyncError::InvalidArgument(format!("Malformed upload: {}", rejection.body_text()))
    }
}

impl IntoResponse for SyncError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected ({}): {}", status.as_u16(), self);
        }

        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
