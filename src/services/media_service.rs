//! Direct-to-storage uploads.
//!
//! The API never handles file bytes: it validates the declared file, hands out
//! a pre-signed PUT URL and records a PENDING media row for moderation.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use tracing::info;

use crate::error::{AppError, Result};
use crate::models::{MediaFileType, MediaModule, NewMediaFile};
use crate::repository::MediaRepository;
use crate::services::storage::ObjectStorage;
use crate::AppState;

pub const IMAGE_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png"];
pub const VIDEO_TYPES: &[&str] = &["video/mp4"];
pub const IMAGE_MAX_BYTES: i64 = 5 * 1024 * 1024;
pub const VIDEO_MAX_BYTES: i64 = 15 * 1024 * 1024;

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_name: String,
    pub file_type: String,
    pub file_size: i64,
    pub module: MediaModule,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTicket {
    pub upload_url: String,
    pub public_url: String,
    pub key: String,
    pub media_file_id: i64,
}

pub fn classify_mime(mime: &str) -> Option<MediaFileType> {
    let mime = mime.trim().to_lowercase();
    if IMAGE_TYPES.contains(&mime.as_str()) {
        Some(MediaFileType::Image)
    } else if VIDEO_TYPES.contains(&mime.as_str()) {
        Some(MediaFileType::Video)
    } else {
        None
    }
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

fn random_suffix(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}

/// `{base36 millis}_{suffix}{.ext}`; `.bin` when the name has no extension.
pub fn unique_file_name(original: &str, millis: u64, suffix: &str) -> String {
    let ext = Path::new(original)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_else(|| ".bin".to_string());
    format!("{}_{}{}", to_base36(millis), suffix, ext)
}

/// Replace anything outside `[A-Za-z0-9._-]` with `_`.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Profile media lives under the owner; everything else under its module.
pub fn object_key(prefix: &str, module: MediaModule, user_id: i64, file_name: &str) -> String {
    let base = Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(file_name);
    let safe = sanitize_name(base);
    match module {
        MediaModule::Profile => format!("{prefix}/profile/{user_id}/{safe}"),
        other => format!("{prefix}/posts/{}/{safe}", other.as_str()),
    }
}

pub struct MediaService {
    media: Arc<dyn MediaRepository>,
    storage: Arc<dyn ObjectStorage>,
}

impl MediaService {
    pub fn new(state: &AppState) -> Self {
        Self {
            media: state.repos.media.clone(),
            storage: state.storage.clone(),
        }
    }

    pub async fn upload_url(&self, user_id: i64, request: UploadRequest) -> Result<UploadTicket> {
        let mime = request.file_type.trim().to_lowercase();
        let file_type =
            classify_mime(&mime).ok_or_else(|| AppError::BadRequest("Unsupported file type".to_string()))?;

        match file_type {
            MediaFileType::Image if request.file_size > IMAGE_MAX_BYTES => {
                return Err(AppError::BadRequest("Image size exceeds 5 MB".to_string()))
            }
            MediaFileType::Video if request.file_size > VIDEO_MAX_BYTES => {
                return Err(AppError::BadRequest("Video size exceeds 15 MB".to_string()))
            }
            _ => {}
        }

        let millis = Utc::now().timestamp_millis().max(0) as u64;
        let name = unique_file_name(&request.file_name, millis, &random_suffix(8));
        let key = object_key(self.storage.key_prefix(), request.module, user_id, &name);

        let upload_url = self.storage.presign_put(&key, &mime).await?;
        let public_url = self.storage.public_url(&key)?;

        let media_file = self
            .media
            .create(&NewMediaFile {
                user_id,
                module: request.module,
                file_url: public_url.clone(),
                file_type,
            })
            .await?;

        info!(
            user_id = %user_id,
            media_file_id = %media_file.id,
            module = %request.module.as_str(),
            "upload URL issued"
        );

        Ok(UploadTicket {
            upload_url,
            public_url,
            key,
            media_file_id: media_file.id,
        })
    }
}
