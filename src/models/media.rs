use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::ReviewStatus;

/// Upload destination; decides the object key folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MediaModule {
    Profile,
    Posts,
    Jobs,
    Marketplace,
    Matrimony,
    Help,
}

impl MediaModule {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaModule::Profile => "profile",
            MediaModule::Posts => "posts",
            MediaModule::Jobs => "jobs",
            MediaModule::Marketplace => "marketplace",
            MediaModule::Matrimony => "matrimony",
            MediaModule::Help => "help",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MediaFileType {
    Image,
    Video,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFile {
    pub id: i64,
    pub user_id: i64,
    pub module: MediaModule,
    pub file_url: String,
    pub file_type: MediaFileType,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMediaFile {
    pub user_id: i64,
    pub module: MediaModule,
    pub file_url: String,
    pub file_type: MediaFileType,
}
