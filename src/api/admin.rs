use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use super::{parse_id, ApiJson, ApiQuery, ApiResponse, MessageBody, PageQuery};
use crate::error::{AppError, Result};
use crate::middleware::CurrentAdmin;
use crate::models::{
    AdminVerification, MediaFile, RestrictedSection, ReviewStatus, SectionData, User, UserStatus,
};
use crate::services::admin_service::{DashboardStats, QueuedUpdate};
use crate::services::{AdminService, AuthService};
use crate::AppState;

const MAX_USERS_PAGE: i64 = 100;

pub fn public_routes() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/stats", get(stats))
        .route("/users", get(list_users))
        .route("/pending", get(list_pending))
        .route("/users/:id", get(get_user))
        .route("/users/:id/approve", post(approve_user))
        .route("/users/:id/reject", post(reject_user))
        .route("/media/pending", get(list_pending_media))
        .route("/media/:id/approve", post(approve_media))
        .route("/media/:id/reject", post(reject_media))
        .route("/pending-updates", get(list_pending_updates))
        .route("/approve-update", post(approve_update))
        .route("/reject-update", post(reject_update))
}

#[derive(Debug, Deserialize, Validate)]
pub struct AdminLoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, message = "Password required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AdminLoginResponse {
    pub token: String,
    pub email: String,
}

async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<AdminLoginRequest>,
) -> Result<Json<ApiResponse<AdminLoginResponse>>> {
    payload.validate()?;

    let (email, token) = AuthService::new(&state)
        .admin_login(&payload.email, &payload.password)
        .await?;

    Ok(ApiResponse::ok(AdminLoginResponse { token, email }))
}

async fn stats(State(state): State<AppState>) -> Result<Json<ApiResponse<DashboardStats>>> {
    let stats = AdminService::new(&state).dashboard_stats().await?;
    Ok(ApiResponse::ok(stats))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<User>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

async fn list_users(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListUsersQuery>,
) -> Result<Json<ApiResponse<UserListResponse>>> {
    let (page, limit) = PageQuery {
        page: query.page,
        limit: query.limit,
    }
    .resolve(MAX_USERS_PAGE)?;

    let status = match query.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Some(
            UserStatus::parse(raw).ok_or_else(|| AppError::validation(format!("Unknown status: {raw}")))?,
        ),
        None => None,
    };

    let (users, total) = AdminService::new(&state).list_users(status, page, limit).await?;

    Ok(ApiResponse::ok(UserListResponse {
        users,
        total,
        page,
        limit,
    }))
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<User>,
}

async fn list_pending(State(state): State<AppState>) -> Result<Json<ApiResponse<UsersResponse>>> {
    let users = AdminService::new(&state).list_pending_users().await?;
    Ok(ApiResponse::ok(UsersResponse { users }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetailResponse {
    pub user: User,
    pub verification_history: Vec<AdminVerification>,
}

async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<UserDetailResponse>>> {
    let user_id = parse_id(&id, "Invalid user id")?;
    let (user, verification_history) = AdminService::new(&state).user_detail(user_id).await?;
    Ok(ApiResponse::ok(UserDetailResponse {
        user,
        verification_history,
    }))
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ApproveRequest {
    #[validate(length(max = 500))]
    pub remarks: Option<String>,
}

/// Blank remarks fall back to the service default.
#[derive(Debug, Deserialize, Validate)]
pub struct RejectRequest {
    #[serde(default)]
    #[validate(length(max = 500))]
    pub remarks: String,
}

async fn approve_user(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentAdmin>,
    Path(id): Path<String>,
    body: Option<ApiJson<ApproveRequest>>,
) -> Result<Json<ApiResponse<MessageBody>>> {
    let user_id = parse_id(&id, "Invalid user id")?;
    let payload = body.map(|ApiJson(p)| p).unwrap_or_default();
    payload.validate()?;

    AdminService::new(&state)
        .approve_user(user_id, &admin.identity, payload.remarks.as_deref())
        .await?;

    Ok(ApiResponse::ok(MessageBody {
        message: "User approved.",
    }))
}

async fn reject_user(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentAdmin>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<RejectRequest>,
) -> Result<Json<ApiResponse<MessageBody>>> {
    let user_id = parse_id(&id, "Invalid user id")?;
    payload.validate()?;

    AdminService::new(&state)
        .reject_user(user_id, &admin.identity, &payload.remarks)
        .await?;

    Ok(ApiResponse::ok(MessageBody {
        message: "User rejected.",
    }))
}

#[derive(Debug, Serialize)]
pub struct MediaListResponse {
    pub media: Vec<MediaFile>,
}

async fn list_pending_media(State(state): State<AppState>) -> Result<Json<ApiResponse<MediaListResponse>>> {
    let media = AdminService::new(&state).pending_media().await?;
    Ok(ApiResponse::ok(MediaListResponse { media }))
}

async fn approve_media(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<MessageBody>>> {
    let media_id = parse_id(&id, "Invalid media id")?;
    AdminService::new(&state).review_media(media_id, true).await?;
    Ok(ApiResponse::ok(MessageBody {
        message: "Media approved.",
    }))
}

async fn reject_media(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<MessageBody>>> {
    let media_id = parse_id(&id, "Invalid media id")?;
    AdminService::new(&state).review_media(media_id, false).await?;
    Ok(ApiResponse::ok(MessageBody {
        message: "Media rejected.",
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedUserView {
    pub id: i64,
    pub full_name: String,
    pub email: String,
}

/// A staged edit next to the member's currently approved section.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedUpdateView {
    pub id: i64,
    pub user_id: i64,
    pub section: RestrictedSection,
    pub data: Value,
    pub status: ReviewStatus,
    pub submitted_at: DateTime<Utc>,
    pub user: Option<QueuedUserView>,
    pub current_data: Option<SectionData>,
}

impl From<QueuedUpdate> for QueuedUpdateView {
    fn from(queued: QueuedUpdate) -> Self {
        let QueuedUpdate {
            update,
            user,
            current_data,
        } = queued;
        Self {
            id: update.id,
            user_id: update.user_id,
            section: update.section,
            data: update.data,
            status: update.status,
            submitted_at: update.submitted_at,
            user: user.map(|u| QueuedUserView {
                id: u.id,
                full_name: u.full_name,
                email: u.email,
            }),
            current_data,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UpdatesResponse {
    pub updates: Vec<QueuedUpdateView>,
}

async fn list_pending_updates(State(state): State<AppState>) -> Result<Json<ApiResponse<UpdatesResponse>>> {
    let queued = AdminService::new(&state).pending_profile_updates().await?;
    Ok(ApiResponse::ok(UpdatesResponse {
        updates: queued.into_iter().map(QueuedUpdateView::from).collect(),
    }))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ApproveUpdateRequest {
    #[validate(range(min = 1))]
    pub update_id: i64,
    #[validate(length(max = 500))]
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RejectUpdateRequest {
    #[validate(range(min = 1))]
    pub update_id: i64,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub remarks: String,
}

async fn approve_update(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentAdmin>,
    ApiJson(payload): ApiJson<ApproveUpdateRequest>,
) -> Result<Json<ApiResponse<MessageBody>>> {
    payload.validate()?;

    AdminService::new(&state)
        .approve_profile_update(payload.update_id, &admin.identity, payload.remarks.as_deref())
        .await?;

    Ok(ApiResponse::ok(MessageBody {
        message: "Profile update approved.",
    }))
}

async fn reject_update(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentAdmin>,
    ApiJson(payload): ApiJson<RejectUpdateRequest>,
) -> Result<Json<ApiResponse<MessageBody>>> {
    payload.validate()?;

    AdminService::new(&state)
        .reject_profile_update(payload.update_id, &admin.identity, &payload.remarks)
        .await?;

    Ok(ApiResponse::ok(MessageBody {
        message: "Profile update rejected.",
    }))
}
