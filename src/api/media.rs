use axum::{extract::State, http::StatusCode, routing::post, Extension, Json, Router};
use serde::Deserialize;
use validator::{Validate, ValidationError};

use super::{ApiJson, ApiResponse};
use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::models::MediaModule;
use crate::services::media_service::{UploadRequest, UploadTicket};
use crate::services::MediaService;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/upload-url", post(upload_url))
}

fn no_path_traversal(name: &str) -> std::result::Result<(), ValidationError> {
    if name.contains("..") || name.contains('/') || name.contains('\\') {
        let mut error = ValidationError::new("path_traversal");
        error.message = Some("Invalid fileName: no path traversal".into());
        return Err(error);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UploadUrlRequest {
    #[validate(length(min = 1, max = 255), custom(function = "no_path_traversal"))]
    pub file_name: String,
    #[validate(length(min = 1, message = "fileType required"))]
    pub file_type: String,
    #[validate(range(min = 1, message = "fileSize must be positive"))]
    pub file_size: i64,
    pub module: MediaModule,
}

async fn upload_url(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiJson(payload): ApiJson<UploadUrlRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UploadTicket>>)> {
    let payload = UploadUrlRequest {
        file_name: payload.file_name.trim().to_string(),
        file_type: payload.file_type.trim().to_string(),
        ..payload
    };
    payload.validate()?;

    let ticket = MediaService::new(&state)
        .upload_url(
            user.id,
            UploadRequest {
                file_name: payload.file_name,
                file_type: payload.file_type,
                file_size: payload.file_size,
                module: payload.module,
            },
        )
        .await?;
    Ok(ApiResponse::created(ticket))
}
