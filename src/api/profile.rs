use axum::{
    extract::{Path, State},
    routing::{get, patch, post, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use validator::Validate;

use super::{double_option, ApiJson, ApiQuery, ApiResponse};
use crate::error::{AppError, Result};
use crate::middleware::CurrentUser;
use crate::models::{ActivityTab, ProfileSection};
use crate::services::profile_service::{
    ActivityPage, ProfileEdit, ProfileOverview, ProfileStats, UploadTarget,
};
use crate::services::ProfileService;
use crate::AppState;

const MAX_ACTIVITY_PAGE: i64 = 50;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_profile))
        .route("/me", get(get_profile).put(update_profile))
        .route("/me/sections/:section", patch(update_section))
        .route("/me/horoscope-upload-url", post(horoscope_upload_url))
        .route("/stats", get(stats))
        .route("/activity", get(activity))
        .route("/:section", put(update_section))
}

async fn get_profile(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<ProfileOverview>>> {
    let overview = ProfileService::new(&state).overview(user.id).await?;
    Ok(ApiResponse::ok(overview))
}

/// Editable profile columns. Unknown keys are rejected; `null` or blank clears.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 500))]
    pub profile_image: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 80))]
    pub city: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 80))]
    pub district: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 500))]
    pub education: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 80))]
    pub job_title: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 120))]
    pub company_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 120))]
    pub work_location: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 255))]
    pub skills: Option<Option<String>>,
}

impl From<UpdateProfileRequest> for ProfileEdit {
    fn from(request: UpdateProfileRequest) -> Self {
        ProfileEdit {
            profile_image: request.profile_image,
            city: request.city,
            district: request.district,
            education: request.education,
            job_title: request.job_title,
            company_name: request.company_name,
            work_location: request.work_location,
            skills: request.skills,
        }
    }
}

async fn update_profile(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiJson(payload): ApiJson<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<ProfileOverview>>> {
    payload.validate()?;
    let overview = ProfileService::new(&state)
        .update_profile(user.id, payload.into())
        .await?;
    Ok(ApiResponse::ok(overview))
}

async fn update_section(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(section): Path<String>,
    ApiJson(payload): ApiJson<Value>,
) -> Result<Json<ApiResponse<ProfileOverview>>> {
    let section = ProfileSection::parse(&section)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown profile section: {section}")))?;
    let Value::Object(data) = payload else {
        return Err(AppError::validation("Section body must be a JSON object"));
    };

    let overview = ProfileService::new(&state)
        .update_section(user.id, section, data)
        .await?;
    Ok(ApiResponse::ok(overview))
}

async fn stats(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<ProfileStats>>> {
    let stats = ProfileService::new(&state).stats(user.id).await?;
    Ok(ApiResponse::ok(stats))
}

#[derive(Debug, Default, Deserialize)]
pub struct ActivityQuery {
    pub tab: Option<ActivityTab>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

async fn activity(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiQuery(query): ApiQuery<ActivityQuery>,
) -> Result<Json<ApiResponse<ActivityPage>>> {
    let (page, limit) = super::PageQuery {
        page: query.page,
        limit: query.limit,
    }
    .resolve(MAX_ACTIVITY_PAGE)?;
    let tab = query.tab.unwrap_or(ActivityTab::My);

    let page = ProfileService::new(&state).activity(user.id, tab, page, limit).await?;
    Ok(ApiResponse::ok(page))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct HoroscopeUploadRequest {
    #[validate(length(min = 1, max = 255))]
    pub file_name: String,
    #[validate(length(min = 1))]
    pub file_type: String,
    #[validate(range(min = 1))]
    pub file_size: i64,
}

async fn horoscope_upload_url(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiJson(payload): ApiJson<HoroscopeUploadRequest>,
) -> Result<Json<ApiResponse<UploadTarget>>> {
    payload.validate()?;
    let target = ProfileService::new(&state)
        .horoscope_upload_url(user.id, &payload.file_name, &payload.file_type, payload.file_size)
        .await?;
    Ok(ApiResponse::ok(target))
}
