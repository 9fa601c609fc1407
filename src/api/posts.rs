use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{double_option, parse_id, trimmed, ApiJson, ApiQuery, ApiResponse, MessageBody, PageQuery};
use crate::error::{AppError, Result};
use crate::middleware::CurrentUser;
use crate::models::{JobStatus, NewPost, PostPatch, PostType};
use crate::services::post_service::{CommentView, CommentsPage, PostDetail};
use crate::services::PostService;
use crate::AppState;

const MAX_COMMENTS_PAGE: i64 = 50;
const INVALID_POST_ID: &str = "Invalid post id";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_post))
        .route("/:id", get(get_post).put(update_post).delete(delete_post))
        .route("/:id/like", post(like_post))
        .route("/:id/comments", get(list_comments).post(add_comment))
        .route("/:id/report", post(report_post))
        .route("/:id/save", post(save_post))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreatePostRequest {
    pub post_type: PostType,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(url, length(max = 500))]
    pub media_url: Option<String>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub urgent: bool,
    pub meetup_at: Option<DateTime<Utc>>,
    pub job_status: Option<JobStatus>,
}

async fn create_post(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiJson(payload): ApiJson<CreatePostRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PostDetail>>)> {
    let payload = CreatePostRequest {
        title: payload.title.trim().to_string(),
        description: payload.description.map(|d| d.trim().to_string()),
        media_url: trimmed(payload.media_url),
        ..payload
    };
    payload.validate()?;

    let new_post = NewPost {
        user_id: user.id,
        post_type: payload.post_type,
        title: payload.title,
        description: payload.description,
        media_url: payload.media_url,
        pinned: payload.pinned,
        urgent: payload.urgent,
        meetup_at: payload.meetup_at,
        job_status: payload.job_status,
    };
    let detail = PostService::new(&state).create(&user, new_post).await?;
    Ok(ApiResponse::created(detail))
}

async fn get_post(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<PostDetail>>> {
    let post_id = parse_id(&id, INVALID_POST_ID)?;
    let detail = PostService::new(&state).get(&user, post_id).await?;
    Ok(ApiResponse::ok(detail))
}

/// Absent keys are left alone; `null` clears the nullable ones.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub media_url: Option<Option<String>>,
    pub pinned: Option<bool>,
    pub urgent: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub meetup_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    pub job_status: Option<Option<JobStatus>>,
}

impl UpdatePostRequest {
    fn into_patch(self) -> Result<PostPatch> {
        let title = self.title.map(|t| t.trim().to_string());
        if let Some(t) = &title {
            let len = t.chars().count();
            if len == 0 || len > 255 {
                return Err(AppError::validation("title must be 1 to 255 characters"));
            }
        }

        let description = self.description.map(|d| d.map(|s| s.trim().to_string()));
        if let Some(Some(d)) = &description {
            if d.chars().count() > 5000 {
                return Err(AppError::validation("description must be at most 5000 characters"));
            }
        }

        let media_url = self.media_url.map(trimmed);
        if let Some(Some(url)) = &media_url {
            if url.len() > 500 || !validator::ValidateUrl::validate_url(url) {
                return Err(AppError::validation("media_url must be a valid URL"));
            }
        }

        Ok(PostPatch {
            title,
            description,
            media_url,
            pinned: self.pinned,
            urgent: self.urgent,
            meetup_at: self.meetup_at,
            job_status: self.job_status,
        })
    }
}

async fn update_post(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UpdatePostRequest>,
) -> Result<Json<ApiResponse<PostDetail>>> {
    let post_id = parse_id(&id, INVALID_POST_ID)?;
    let patch = payload.into_patch()?;
    let detail = PostService::new(&state).update(&user, post_id, patch).await?;
    Ok(ApiResponse::ok(detail))
}

async fn delete_post(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<MessageBody>>> {
    let post_id = parse_id(&id, INVALID_POST_ID)?;
    PostService::new(&state).delete(user.id, post_id).await?;
    Ok(ApiResponse::ok(MessageBody {
        message: "Post deleted",
    }))
}

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub liked: bool,
    pub like_count: i64,
}

async fn like_post(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<LikeResponse>>> {
    let post_id = parse_id(&id, INVALID_POST_ID)?;
    let toggle = PostService::new(&state).toggle_like(&user, post_id).await?;
    Ok(ApiResponse::ok(LikeResponse {
        liked: toggle.liked,
        like_count: toggle.like_count,
    }))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CommentRequest {
    #[validate(length(min = 1, max = 2000))]
    pub body: String,
}

async fn add_comment(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<CommentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CommentView>>)> {
    let post_id = parse_id(&id, INVALID_POST_ID)?;
    let payload = CommentRequest {
        body: payload.body.trim().to_string(),
    };
    payload.validate()?;

    let comment = PostService::new(&state).add_comment(&user, post_id, &payload.body).await?;
    Ok(ApiResponse::created(comment))
}

async fn list_comments(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Json<ApiResponse<CommentsPage>>> {
    let post_id = parse_id(&id, INVALID_POST_ID)?;
    let (page, limit) = query.resolve(MAX_COMMENTS_PAGE)?;
    let comments = PostService::new(&state).comments(&user, post_id, page, limit).await?;
    Ok(ApiResponse::ok(comments))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ReportRequest {
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub id: i64,
}

async fn report_post(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<ReportRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ReportResponse>>)> {
    let post_id = parse_id(&id, INVALID_POST_ID)?;
    let payload = ReportRequest {
        reason: payload.reason.trim().to_string(),
    };
    payload.validate()?;

    let id = PostService::new(&state).report(&user, post_id, &payload.reason).await?;
    Ok(ApiResponse::created(ReportResponse { id }))
}

#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub saved: bool,
}

async fn save_post(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<SaveResponse>>> {
    let post_id = parse_id(&id, INVALID_POST_ID)?;
    let saved = PostService::new(&state).toggle_save(&user, post_id).await?;
    Ok(ApiResponse::ok(SaveResponse { saved }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_post_defaults_and_strictness() {
        let payload: CreatePostRequest =
            serde_json::from_str(r#"{"post_type":"MEETUP","title":"Pongal meetup"}"#).unwrap();
        assert!(!payload.pinned);
        assert!(!payload.urgent);
        assert!(payload.validate().is_ok());

        let unknown: std::result::Result<CreatePostRequest, _> =
            serde_json::from_str(r#"{"post_type":"JOB","title":"x","user_id":3}"#);
        assert!(unknown.is_err());
    }

    #[test]
    fn test_update_patch_distinguishes_null() {
        let payload: UpdatePostRequest =
            serde_json::from_str(r#"{"description":null,"pinned":true}"#).unwrap();
        let patch = payload.into_patch().unwrap();
        assert_eq!(patch.description, Some(None));
        assert_eq!(patch.media_url, None);
        assert_eq!(patch.pinned, Some(true));
    }

    #[test]
    fn test_update_rejects_blank_title() {
        let payload: UpdatePostRequest = serde_json::from_str(r#"{"title":"   "}"#).unwrap();
        assert!(matches!(payload.into_patch(), Err(AppError::Validation { .. })));
    }
}
